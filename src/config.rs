//! Configuration module for credentials, token storage, and search limits
//!
//! All configuration is loaded from environment variables. `CREDENTIALS_FILE`
//! selects the OAuth client-secrets file; the remaining settings have sensible
//! defaults and exist mostly for test and deployment overrides.

use std::env;
use std::env::VarError;
use std::path::PathBuf;

use crate::errors::{AppError, AppResult};

/// Environment variable naming the OAuth client-secrets file
pub const CREDENTIALS_FILE_ENV: &str = "CREDENTIALS_FILE";

/// OAuth scopes requested during login. Changing these invalidates any
/// previously stored token file.
pub const SCOPES: &[&str] = &["https://www.googleapis.com/auth/gmail.readonly"];

/// Server-wide configuration
///
/// Cloned into the search context via `Arc` for shared access between the
/// MCP tool handlers and the CLI front-end.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Path to the OAuth client-secrets JSON (Google installed-app format)
    pub credentials_file: PathBuf,
    /// Path where the authorized-user token is persisted between runs
    pub token_file: PathBuf,
    /// `maxResults` used per Gmail list call while enumerating match IDs
    pub list_page_size: usize,
    /// Upper bound on total message IDs enumerated for one search
    pub max_results_scanned: usize,
    /// Seconds to wait for the OAuth redirect during interactive login
    pub login_timeout_secs: u64,
}

impl ServerConfig {
    /// Load all configuration from environment variables
    ///
    /// `CREDENTIALS_FILE` falls back to `~/.config/credentials.json` when
    /// unset; the `serve` entry point separately requires the variable to be
    /// present (see [`require_credentials_env`]).
    ///
    /// # Errors
    ///
    /// Returns `Internal` if a variable is set but malformed.
    pub fn load_from_env() -> AppResult<Self> {
        let credentials_file = match env::var(CREDENTIALS_FILE_ENV) {
            Ok(v) if !v.trim().is_empty() => PathBuf::from(v),
            _ => default_credentials_file(),
        };

        Ok(Self {
            credentials_file,
            token_file: path_env("GMAIL_TOKEN_FILE", "token.json"),
            list_page_size: parse_usize_env("GMAIL_LIST_PAGE_SIZE", 500)?,
            max_results_scanned: parse_usize_env("GMAIL_MAX_RESULTS", 5_000)?,
            login_timeout_secs: parse_u64_env("GMAIL_LOGIN_TIMEOUT_SECS", 120)?,
        })
    }
}

/// Require `CREDENTIALS_FILE` to be set
///
/// The tool-server entry point calls this before serving; a missing variable
/// is a fatal startup condition rather than a per-request failure.
pub fn require_credentials_env() -> AppResult<()> {
    match env::var(CREDENTIALS_FILE_ENV) {
        Ok(v) if !v.trim().is_empty() => Ok(()),
        _ => Err(AppError::Auth(format!(
            "{CREDENTIALS_FILE_ENV} environment variable is not set for the server to run"
        ))),
    }
}

/// Default client-secrets location: `~/.config/credentials.json`
fn default_credentials_file() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("credentials.json")
}

/// Read a path environment variable with default fallback
fn path_env(key: &str, default: &str) -> PathBuf {
    match env::var(key) {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v),
        _ => PathBuf::from(default),
    }
}

/// Parse a `usize` environment variable with default fallback
///
/// Returns `default` if unset.
///
/// # Errors
///
/// Returns `Internal` if the variable is set but not a valid positive `usize`.
fn parse_usize_env(key: &str, default: usize) -> AppResult<usize> {
    match env::var(key) {
        Ok(v) => match v.parse::<usize>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(AppError::Internal(format!(
                "invalid usize environment variable {key}: '{v}'"
            ))),
        },
        Err(VarError::NotPresent) => Ok(default),
        Err(VarError::NotUnicode(_)) => Err(AppError::Internal(format!(
            "environment variable {key} contains non-unicode data"
        ))),
    }
}

/// Parse a `u64` environment variable with default fallback
///
/// Returns `default` if unset.
///
/// # Errors
///
/// Returns `Internal` if the variable is set but not a valid `u64`.
fn parse_u64_env(key: &str, default: u64) -> AppResult<u64> {
    match env::var(key) {
        Ok(v) => v.parse::<u64>().map_err(|_| {
            AppError::Internal(format!("invalid u64 environment variable {key}: '{v}'"))
        }),
        Err(VarError::NotPresent) => Ok(default),
        Err(VarError::NotUnicode(_)) => Err(AppError::Internal(format!(
            "environment variable {key} contains non-unicode data"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::default_credentials_file;

    #[test]
    fn default_credentials_file_ends_with_expected_name() {
        let path = default_credentials_file();
        assert_eq!(
            path.file_name().and_then(|n| n.to_str()),
            Some("credentials.json")
        );
    }
}
