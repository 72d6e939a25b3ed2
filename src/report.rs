//! Search report formatting
//!
//! Renders the formatted text artifact returned to agents: a header with the
//! total match count and echoed query, then one block per message on the
//! requested page.

use std::fmt::Write;

/// Per-message content alternative: provider snippet or extracted full body
#[derive(Debug, Clone)]
pub enum EmailContent {
    /// Short provider-supplied preview
    Snippet(Option<String>),
    /// Full plain-text body extracted from the payload tree
    FullBody(Option<String>),
}

/// One formatted report entry
#[derive(Debug, Clone)]
pub struct EmailEntry {
    /// Provider message identifier
    pub id: String,
    /// From header, if present
    pub from: Option<String>,
    /// Subject header, if present
    pub subject: Option<String>,
    /// Snippet or full body
    pub content: EmailContent,
}

/// Render the search report
///
/// The header always states the full match count even when the requested
/// page is past the end and `entries` is empty.
pub fn format_report(query: &str, total: usize, entries: &[EmailEntry]) -> String {
    let mut out = format!("Found {total} messages for query: {query}\n");
    out.push_str("--- Email Report ---\n");
    for entry in entries {
        let _ = write!(out, "{0} Message ID: {1} {0}\n", "#".repeat(10), entry.id);
        let _ = writeln!(
            out,
            "From: {}",
            entry.from.as_deref().unwrap_or("Unknown Sender")
        );
        let _ = writeln!(
            out,
            "Subject: {}",
            entry.subject.as_deref().unwrap_or("No Subject")
        );
        match &entry.content {
            EmailContent::Snippet(snippet) => {
                let _ = writeln!(
                    out,
                    "Snippet: {}",
                    snippet.as_deref().unwrap_or("No snippet available")
                );
            }
            EmailContent::FullBody(body) => {
                let _ = writeln!(out, "Mail body: {}", body.as_deref().unwrap_or_default());
            }
        }
    }
    out
}

/// Render the zero-match report
///
/// Zero matches is a normal outcome, never an error.
pub fn format_no_results(query: &str) -> String {
    format!("No messages found for query: {query}")
}

#[cfg(test)]
mod tests {
    use super::{EmailContent, EmailEntry, format_no_results, format_report};

    fn entry(id: &str, content: EmailContent) -> EmailEntry {
        EmailEntry {
            id: id.to_owned(),
            from: Some("alice@example.com".to_owned()),
            subject: Some("Weekly sync".to_owned()),
            content,
        }
    }

    #[test]
    fn report_contains_header_and_snippet_blocks() {
        let entries = vec![entry(
            "m1",
            EmailContent::Snippet(Some("See you at 10".to_owned())),
        )];
        let report = format_report("to:me", 2, &entries);
        assert!(report.starts_with("Found 2 messages for query: to:me\n"));
        assert!(report.contains("--- Email Report ---"));
        assert!(report.contains("########## Message ID: m1 ##########"));
        assert!(report.contains("From: alice@example.com"));
        assert!(report.contains("Subject: Weekly sync"));
        assert!(report.contains("Snippet: See you at 10"));
    }

    #[test]
    fn full_body_entries_use_the_mail_body_line() {
        let entries = vec![entry(
            "m2",
            EmailContent::FullBody(Some("hello body".to_owned())),
        )];
        let report = format_report("to:me", 1, &entries);
        assert!(report.contains("Mail body: hello body"));
        assert!(!report.contains("Snippet:"));
    }

    #[test]
    fn empty_page_keeps_the_full_match_count() {
        let report = format_report("to:me", 25, &[]);
        assert!(report.starts_with("Found 25 messages for query: to:me\n"));
        assert!(report.ends_with("--- Email Report ---\n"));
    }

    #[test]
    fn missing_headers_fall_back_to_placeholders() {
        let entries = vec![EmailEntry {
            id: "m3".to_owned(),
            from: None,
            subject: None,
            content: EmailContent::Snippet(None),
        }];
        let report = format_report("to:me", 1, &entries);
        assert!(report.contains("From: Unknown Sender"));
        assert!(report.contains("Subject: No Subject"));
        assert!(report.contains("Snippet: No snippet available"));
    }

    #[test]
    fn zero_matches_reads_as_a_normal_message() {
        assert_eq!(
            format_no_results("from:nobody"),
            "No messages found for query: from:nobody"
        );
    }
}
