//! Plain-text body extraction from the Gmail payload tree
//!
//! Gmail returns message bodies as a tree of typed parts. Only `text/plain`
//! extraction is attempted here; HTML and attachment parts are skipped.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

use crate::errors::{AppError, AppResult};
use crate::models::MessagePayload;

/// Find and decode the first `text/plain` body in a payload tree
///
/// Depth-first, pre-order, first match wins:
///
/// 1. For each child of a multipart node, in order: a child declaring
///    `text/plain` with body data is decoded and returned immediately;
///    a child that is itself multipart is searched recursively, and any hit
///    short-circuits the remaining siblings.
/// 2. A node without children but with body data is decoded and returned
///    regardless of its declared content type.
/// 3. `Ok(None)` when the subtree holds no decodable plain text.
///
/// # Errors
///
/// Returns `Decode` when a located body is not valid base64url or not valid
/// UTF-8. A decode failure is never silently reported as an empty body.
pub fn extract_plain_text(payload: &MessagePayload) -> AppResult<Option<String>> {
    tracing::debug!(mime_type = payload.mime_type.as_deref(), "scanning payload part");
    if let Some(parts) = &payload.parts {
        for part in parts {
            if part.mime_type.as_deref() == Some("text/plain")
                && let Some(data) = part.body.as_ref().and_then(|b| b.data.as_deref())
            {
                tracing::debug!("found text/plain part, decoding body");
                return decode_body_data(data).map(Some);
            }
            // Recurse into nested multipart messages
            if part.parts.is_some()
                && let Some(body) = extract_plain_text(part)?
            {
                return Ok(Some(body));
            }
        }
    } else if let Some(data) = payload.body.as_ref().and_then(|b| b.data.as_deref()) {
        tracing::debug!("found body in non-multipart message, decoding");
        return decode_body_data(data).map(Some);
    }
    Ok(None)
}

/// Decode base64url body data into UTF-8 text
///
/// Gmail emits unpadded base64url, but padded input is tolerated too.
pub fn decode_body_data(data: &str) -> AppResult<String> {
    let bytes = URL_SAFE_NO_PAD
        .decode(data.trim_end_matches('='))
        .map_err(|e| AppError::Decode(format!("base64url decode of message body: {e}")))?;
    String::from_utf8(bytes)
        .map_err(|e| AppError::Decode(format!("message body is not valid UTF-8: {e}")))
}

#[cfg(test)]
mod tests {
    use base64::Engine;
    use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};

    use super::{decode_body_data, extract_plain_text};
    use crate::errors::AppError;
    use crate::models::{MessageBody, MessagePayload};

    fn encoded(text: &str) -> String {
        URL_SAFE_NO_PAD.encode(text.as_bytes())
    }

    fn leaf(mime_type: &str, data: Option<String>) -> MessagePayload {
        MessagePayload {
            mime_type: Some(mime_type.to_owned()),
            headers: None,
            body: data.map(|data| MessageBody { data: Some(data) }),
            parts: None,
        }
    }

    fn container(mime_type: &str, parts: Vec<MessagePayload>) -> MessagePayload {
        MessagePayload {
            mime_type: Some(mime_type.to_owned()),
            headers: None,
            body: None,
            parts: Some(parts),
        }
    }

    #[test]
    fn non_multipart_leaf_returns_decoded_body() {
        let payload = leaf("text/plain", Some(encoded("Hello there")));
        let body = extract_plain_text(&payload).expect("decode must succeed");
        assert_eq!(body.as_deref(), Some("Hello there"));
    }

    #[test]
    fn non_multipart_leaf_decodes_regardless_of_content_type() {
        let payload = leaf("text/html", Some(encoded("<p>hi</p>")));
        let body = extract_plain_text(&payload).expect("decode must succeed");
        assert_eq!(body.as_deref(), Some("<p>hi</p>"));
    }

    #[test]
    fn finds_deeply_nested_plain_text() {
        let payload = container(
            "multipart/mixed",
            vec![
                leaf("application/pdf", None),
                container(
                    "multipart/alternative",
                    vec![
                        leaf("text/html", Some(encoded("<b>nope</b>"))),
                        container(
                            "multipart/related",
                            vec![leaf("text/plain", Some(encoded("deep body")))],
                        ),
                    ],
                ),
            ],
        );
        let body = extract_plain_text(&payload).expect("decode must succeed");
        assert_eq!(body.as_deref(), Some("deep body"));
    }

    #[test]
    fn first_plain_text_sibling_wins() {
        let payload = container(
            "multipart/alternative",
            vec![
                leaf("text/plain", Some(encoded("first"))),
                leaf("text/plain", Some(encoded("second"))),
            ],
        );
        let body = extract_plain_text(&payload).expect("decode must succeed");
        assert_eq!(body.as_deref(), Some("first"));
    }

    #[test]
    fn returns_none_when_no_plain_text_exists() {
        let payload = container(
            "multipart/mixed",
            vec![
                leaf("text/html", Some(encoded("<p>only html</p>"))),
                container("multipart/related", vec![leaf("image/png", None)]),
            ],
        );
        let body = extract_plain_text(&payload).expect("traversal must succeed");
        assert!(body.is_none());
    }

    #[test]
    fn malformed_base64_is_a_decode_error() {
        let payload = leaf("text/plain", Some("!!not-base64!!".to_owned()));
        let err = extract_plain_text(&payload).expect_err("must fail");
        assert!(matches!(err, AppError::Decode(_)));
    }

    #[test]
    fn located_plain_text_with_bad_encoding_is_not_silently_empty() {
        let payload = container(
            "multipart/alternative",
            vec![leaf("text/plain", Some("%%%".to_owned()))],
        );
        let err = extract_plain_text(&payload).expect_err("must fail");
        assert!(matches!(err, AppError::Decode(_)));
    }

    #[test]
    fn invalid_utf8_is_a_decode_error() {
        let data = URL_SAFE_NO_PAD.encode([0xff, 0xfe, 0xfd]);
        let err = decode_body_data(&data).expect_err("must fail");
        assert!(matches!(err, AppError::Decode(_)));
    }

    #[test]
    fn padded_and_unpadded_base64url_both_decode() {
        let padded = URL_SAFE.encode("padded body".as_bytes());
        assert!(padded.ends_with('='));
        assert_eq!(
            decode_body_data(&padded).expect("padded must decode"),
            "padded body"
        );
        assert_eq!(
            decode_body_data(&encoded("plain body")).expect("unpadded must decode"),
            "plain body"
        );
    }
}
