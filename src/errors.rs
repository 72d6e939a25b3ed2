//! Application error model with MCP error mapping
//!
//! Defines a typed error hierarchy using `thiserror` for internal error handling,
//! and maps each variant to the appropriate MCP `ErrorData` type for protocol
//! compliance.

use rmcp::model::ErrorData;
use serde_json::json;
use thiserror::Error;

/// Application error type
///
/// Covers all error cases the Gmail search server may encounter. Each variant
/// maps to an appropriate MCP error code in [`ErrorData`].
///
/// Zero search matches is not an error; it is reported as a normal result by
/// the invocation surface.
#[derive(Debug, Error)]
pub enum AppError {
    /// Structured query literal could not be parsed by either convention
    #[error("malformed query: {0}")]
    MalformedQuery(String),
    /// Parameter coercion failed; `field` names the offending parameter
    #[error("invalid parameter '{field}': {message}")]
    InvalidParameter {
        /// Name of the parameter that failed coercion
        field: String,
        /// What went wrong
        message: String,
    },
    /// Message body content undecodable (malformed base64url or invalid UTF-8)
    #[error("decode error: {0}")]
    Decode(String),
    /// Authentication failure (token refresh, interactive login, credentials file)
    #[error("authentication failed: {0}")]
    Auth(String),
    /// Any failure reported by the Gmail API
    #[error("gmail api failure: {0}")]
    Upstream(String),
    /// Internal error (unexpected failure, external crate error)
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Convenience constructor for `InvalidParameter`
    pub fn invalid_parameter(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Convert to MCP `ErrorData`
    ///
    /// # Mappings
    ///
    /// - `MalformedQuery` → `invalid_params`
    /// - `InvalidParameter` → `invalid_params`
    /// - `Decode` → `internal_error`
    /// - `Auth` → `invalid_request`
    /// - `Upstream` → `internal_error`
    /// - `Internal` → `internal_error`
    pub fn to_error_data(&self) -> ErrorData {
        match self {
            Self::MalformedQuery(msg) => {
                ErrorData::invalid_params(msg.clone(), Some(json!({ "code": "malformed_query" })))
            }
            Self::InvalidParameter { field, .. } => ErrorData::invalid_params(
                self.to_string(),
                Some(json!({ "code": "invalid_parameter", "field": field })),
            ),
            Self::Decode(msg) => {
                ErrorData::internal_error(msg.clone(), Some(json!({ "code": "decode_error" })))
            }
            Self::Auth(msg) => {
                ErrorData::invalid_request(msg.clone(), Some(json!({ "code": "auth_failed" })))
            }
            Self::Upstream(msg) => {
                ErrorData::internal_error(msg.clone(), Some(json!({ "code": "upstream_failure" })))
            }
            Self::Internal(msg) => {
                ErrorData::internal_error(msg.clone(), Some(json!({ "code": "internal" })))
            }
        }
    }
}

/// Type alias for fallible return values
///
/// Use this for all internal functions that can fail. Provides a consistent
/// error type throughout the codebase.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::AppError;

    #[test]
    fn invalid_parameter_display_names_the_field() {
        let err = AppError::invalid_parameter("count", "must be a positive integer");
        assert_eq!(
            err.to_string(),
            "invalid parameter 'count': must be a positive integer"
        );
    }
}
