//! Gmail API DTOs and MCP schema-bearing types
//!
//! The Gmail structures mirror the REST API response shapes (camelCase field
//! names mapped via `#[serde(rename)]`). MCP input/output types are annotated
//! with `JsonSchema` for automatic schema generation.

use chrono::{SecondsFormat, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Metadata included in all tool responses
///
/// Provides timing information and current UTC timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Meta {
    /// Current UTC timestamp in RFC 3339 format with milliseconds
    pub now_utc: String,
    /// Tool execution duration in milliseconds
    pub duration_ms: u64,
}

impl Meta {
    /// Create metadata populated with current time and elapsed duration
    pub fn now(duration_ms: u64) -> Self {
        Self {
            now_utc: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            duration_ms,
        }
    }
}

/// Standard response envelope for all tools
///
/// Wraps tool-specific data with human-readable summary and execution metadata.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ToolEnvelope<T>
where
    T: JsonSchema,
{
    /// Human-readable summary of the operation outcome
    pub summary: String,
    /// Tool-specific data payload
    pub data: T,
    /// Execution metadata (timestamp, duration)
    pub meta: Meta,
}

/// Input: fetch emails matching a Gmail query
///
/// Used by `gmail_get_emails`. `count`, `page`, and `full_body` are accepted
/// as loose JSON values and coerced at the boundary so clients sending
/// `"count": "10"` still work; coercion failure reports the offending field.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetEmailsInput {
    /// Gmail query to filter emails, or a structured query literal.
    /// Dates can be given as `after:YYYY-MM-DD before:YYYY-MM-DD`.
    #[serde(default = "default_gmail_query")]
    pub gmail_query: String,
    /// Number of emails per page (positive integer, default 100)
    #[serde(default = "default_count")]
    pub count: serde_json::Value,
    /// Page number for pagination (positive integer, default 1)
    #[serde(default = "default_page")]
    pub page: serde_json::Value,
    /// If true, fetch the full plain-text body; otherwise only the snippet
    #[serde(default = "default_full_body")]
    pub full_body: serde_json::Value,
}

/// Default value for `gmail_query`
pub fn default_gmail_query() -> String {
    "to:me in:inbox".to_owned()
}

/// Default value for `count` (matches the tool-server contract)
fn default_count() -> serde_json::Value {
    serde_json::Value::from(100u64)
}

/// Default value for `page`
fn default_page() -> serde_json::Value {
    serde_json::Value::from(1u64)
}

/// Default value for `full_body`
fn default_full_body() -> serde_json::Value {
    serde_json::Value::Bool(false)
}

/// Response of `users/me/messages` (message listing)
#[derive(Debug, Clone, Deserialize)]
pub struct MessageList {
    /// Message ID stubs for this page; absent when nothing matched
    pub messages: Option<Vec<MessageStub>>,
    /// Token for the next listing page, if any
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

/// Lightweight message reference returned by the list endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct MessageStub {
    /// Provider-assigned message identifier
    pub id: String,
}

/// Full or metadata-format message returned by `users/me/messages/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    /// Provider-assigned message identifier
    pub id: String,
    /// Short provider-supplied preview string
    pub snippet: Option<String>,
    /// Payload tree (headers always; body parts only in `full` format)
    pub payload: Option<MessagePayload>,
}

impl Message {
    /// Look up a header value by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.payload
            .as_ref()?
            .headers
            .as_deref()
            .unwrap_or_default()
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }
}

/// One node of the multi-part message payload tree
///
/// A multipart container carries `parts`; a leaf carries `body`. The body
/// extractor tolerates nodes with both, checking the multipart branch first.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessagePayload {
    /// Declared content type, e.g. `text/plain` or `multipart/mixed`
    #[serde(rename = "mimeType")]
    pub mime_type: Option<String>,
    /// Message headers (name/value pairs)
    pub headers: Option<Vec<Header>>,
    /// Leaf body carrying base64url-encoded data
    pub body: Option<MessageBody>,
    /// Ordered child parts for multipart containers
    pub parts: Option<Vec<MessagePayload>>,
}

/// Header name/value pair
#[derive(Debug, Clone, Deserialize)]
pub struct Header {
    /// Header name as sent by the provider
    pub name: String,
    /// Header value
    pub value: String,
}

/// Encoded body of a leaf payload node
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageBody {
    /// Base64url-encoded content; absent for container or attachment stubs
    pub data: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::{GetEmailsInput, Message};

    #[test]
    fn get_emails_input_fills_defaults() {
        let input: GetEmailsInput =
            serde_json::from_value(serde_json::json!({})).expect("empty input must deserialize");
        assert_eq!(input.gmail_query, "to:me in:inbox");
        assert_eq!(input.count, serde_json::json!(100));
        assert_eq!(input.page, serde_json::json!(1));
        assert_eq!(input.full_body, serde_json::json!(false));
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let message: Message = serde_json::from_value(serde_json::json!({
            "id": "m1",
            "payload": {
                "headers": [
                    { "name": "From", "value": "sender@example.com" },
                    { "name": "Subject", "value": "Hi" }
                ]
            }
        }))
        .expect("message must deserialize");

        assert_eq!(message.header("from"), Some("sender@example.com"));
        assert_eq!(message.header("SUBJECT"), Some("Hi"));
        assert_eq!(message.header("date"), None);
    }
}
