//! Gmail REST client
//!
//! Thin wrapper over the Gmail v1 HTTP API: message-ID listing with
//! `nextPageToken` enumeration and single-message fetches. No retry or
//! backoff layer beyond what `reqwest` itself provides.

use serde::de::DeserializeOwned;

use crate::errors::{AppError, AppResult};
use crate::models::{Message, MessageList};

const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1";

/// Upstream error bodies are truncated to this length before reporting
const REDACTED_BODY_MAX_LEN: usize = 200;

/// Gmail v1 HTTP client
///
/// Holds a shared `reqwest` client; all calls take a bearer token minted by
/// the auth module.
#[derive(Debug, Clone)]
pub struct GmailClient {
    http: reqwest::Client,
    base_url: String,
}

impl Default for GmailClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GmailClient {
    /// Create a client against the production Gmail endpoint
    pub fn new() -> Self {
        Self::with_base_url(GMAIL_API_BASE.to_owned())
    }

    /// Create a client against an alternate endpoint (tests)
    pub fn with_base_url(base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    /// Enumerate the IDs of every message matching `query`
    ///
    /// Follows `nextPageToken` across listing pages so the caller can report
    /// a meaningful total match count and slice pages out of the full list.
    /// Enumeration stops once `max_scanned` IDs have been collected.
    pub async fn list_message_ids(
        &self,
        token: &str,
        query: &str,
        page_size: usize,
        max_scanned: usize,
    ) -> AppResult<Vec<String>> {
        let url = format!("{}/users/me/messages", self.base_url);
        let page_size = page_size.to_string();
        let mut ids = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = vec![("q", query), ("maxResults", page_size.as_str())];
            if let Some(pt) = page_token.as_deref() {
                params.push(("pageToken", pt));
            }
            let list: MessageList = self.get_json(token, &url, &params).await?;

            for stub in list.messages.unwrap_or_default() {
                ids.push(stub.id);
            }
            if ids.len() >= max_scanned {
                tracing::warn!(
                    max_scanned,
                    "search matched more messages than the scan cap, truncating"
                );
                ids.truncate(max_scanned);
                return Ok(ids);
            }

            page_token = list.next_page_token;
            if page_token.is_none() {
                return Ok(ids);
            }
        }
    }

    /// Fetch a message with its full payload tree
    pub async fn get_message_full(&self, token: &str, id: &str) -> AppResult<Message> {
        let url = format!("{}/users/me/messages/{id}", self.base_url);
        self.get_json(token, &url, &[("format", "full")]).await
    }

    /// Fetch a message in metadata format (headers + snippet, no body parts)
    pub async fn get_message_metadata(&self, token: &str, id: &str) -> AppResult<Message> {
        let url = format!("{}/users/me/messages/{id}", self.base_url);
        self.get_json(token, &url, &[("format", "metadata")]).await
    }

    /// Issue an authenticated GET and decode the JSON response
    async fn get_json<T: DeserializeOwned>(
        &self,
        token: &str,
        url: &str,
        params: &[(&str, &str)],
    ) -> AppResult<T> {
        let response = self
            .http
            .get(url)
            .query(params)
            .bearer_auth(token)
            .header("accept", "application/json")
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("gmail api request {url}: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Upstream(format!("read gmail api response body: {e}")))?;
        if !status.is_success() {
            return Err(AppError::Upstream(format!(
                "gmail api request failed: status={status} body={}",
                redact_response_body(&body)
            )));
        }

        serde_json::from_str(&body)
            .map_err(|e| AppError::Upstream(format!("decode gmail api response from {url}: {e}")))
    }
}

/// Trim upstream error bodies so logs and reports stay bounded
fn redact_response_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.len() <= REDACTED_BODY_MAX_LEN {
        return trimmed.to_owned();
    }
    let cut = trimmed
        .char_indices()
        .map(|(i, _)| i)
        .take_while(|&i| i <= REDACTED_BODY_MAX_LEN)
        .last()
        .unwrap_or(0);
    format!(
        "{}…[truncated {} of {} bytes]",
        &trimmed[..cut],
        trimmed.len() - cut,
        trimmed.len()
    )
}

#[cfg(test)]
mod tests {
    use super::redact_response_body;

    #[test]
    fn short_bodies_pass_through_trimmed() {
        assert_eq!(redact_response_body("  {\"error\": 1}  "), "{\"error\": 1}");
    }

    #[test]
    fn long_bodies_are_truncated_with_a_marker() {
        let body = "x".repeat(500);
        let redacted = redact_response_body(&body);
        assert!(redacted.len() < body.len());
        assert!(redacted.contains("[truncated 300 of 500 bytes]"));
    }
}
