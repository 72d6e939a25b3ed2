//! Conversational agent tool adapter
//!
//! Exposes the search pipeline to a chat agent as callable tools. Unlike the
//! MCP surface, the agent boundary receives arguments as loose JSON (language
//! models frequently send `"count": "5"`), so numeric and boolean fields are
//! coerced here before anything touches the network.

use serde_json::Value;

use crate::errors::AppResult;
use crate::query;
use crate::search::SearchContext;

/// Description of one agent-callable tool
#[derive(Debug, Clone, Copy)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
}

/// Tools offered to the agent, in presentation order
pub const TOOL_CATALOG: &[ToolSpec] = &[
    ToolSpec {
        name: "gmail_search",
        description: "Search Gmail messages with a Gmail query string and return a \
                      formatted report. Supports pagination via count and page, and \
                      full_body to include extracted plain-text bodies.",
    },
    ToolSpec {
        name: "get_todays_date",
        description: "Return today's date in YYYY-MM-DD format, for building \
                      date-bounded Gmail queries (after:/before:).",
    },
];

/// Arguments for the `gmail_search` tool, pre-coercion
#[derive(Debug, Clone)]
pub struct GmailSearchArgs {
    pub gmail_query: String,
    pub count: Value,
    pub page: Value,
    pub full_body: Value,
}

/// Run the `gmail_search` tool
///
/// Coercion failures surface as errors naming the offending field; past that
/// point the search itself always resolves to report text.
pub async fn gmail_search(context: &SearchContext, args: GmailSearchArgs) -> AppResult<String> {
    let count = query::coerce_positive(&args.count, "count")?;
    let page = query::coerce_positive(&args.page, "page")?;
    let full_body = query::coerce_bool(&args.full_body, "full_body")?;
    Ok(context
        .get_emails(&args.gmail_query, count, page, full_body)
        .await)
}

/// Run the `get_todays_date` tool
pub fn todays_date() -> String {
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{GmailSearchArgs, TOOL_CATALOG, todays_date};
    use crate::query;

    #[test]
    fn catalog_lists_both_tools() {
        let names: Vec<&str> = TOOL_CATALOG.iter().map(|t| t.name).collect();
        assert_eq!(names, ["gmail_search", "get_todays_date"]);
    }

    #[test]
    fn string_arguments_coerce_before_dispatch() {
        let args = GmailSearchArgs {
            gmail_query: "to:me".to_owned(),
            count: json!("10"),
            page: json!(2),
            full_body: json!("true"),
        };
        assert_eq!(query::coerce_positive(&args.count, "count").unwrap(), 10);
        assert_eq!(query::coerce_positive(&args.page, "page").unwrap(), 2);
        assert!(query::coerce_bool(&args.full_body, "full_body").unwrap());
    }

    #[test]
    fn coercion_failure_names_the_field() {
        let err = query::coerce_positive(&json!("lots"), "count").unwrap_err();
        assert!(err.to_string().contains("count"));
    }

    #[test]
    fn todays_date_is_iso_formatted() {
        let date = todays_date();
        assert_eq!(date.len(), 10);
        let parts: Vec<&str> = date.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert!(parts.iter().all(|p| p.chars().all(|c| c.is_ascii_digit())));
    }
}
