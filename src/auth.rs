//! OAuth token lifecycle for the Gmail API
//!
//! Credentials follow Google's installed-app flow: client secrets come from
//! the `CREDENTIALS_FILE` JSON, and the authorized-user token (access token,
//! refresh token, expiry) is persisted to a local token file between runs.
//! Each invocation reads the file, refreshes the access token when expired,
//! and rewrites the file. Concurrent invocations racing on this file are a
//! known hazard; no locking is attempted.
//!
//! When no usable token exists an interactive authorization-code + PKCE flow
//! runs: the system browser is opened and the redirect is captured by a
//! short-lived loopback HTTP server.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::{Duration, Instant};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use oauth2::basic::{BasicClient, BasicTokenResponse};
use oauth2::reqwest::async_http_client;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge, RedirectUrl,
    RefreshToken, Scope, TokenResponse, TokenUrl,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tiny_http::{Response, Server};
use url::Url;

use crate::config::{SCOPES, ServerConfig};
use crate::errors::{AppError, AppResult};

const GOOGLE_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Tokens within this many seconds of expiry are refreshed eagerly
const EXPIRY_SKEW_SECONDS: i64 = 60;

/// Persisted authorized-user token (Google `token.json` shape)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    /// Current access token, if one was issued
    pub token: Option<String>,
    /// Long-lived refresh token
    pub refresh_token: Option<String>,
    /// Token endpoint used for refresh grants
    pub token_uri: String,
    /// OAuth client identifier
    pub client_id: String,
    /// OAuth client secret (already at rest in this file)
    pub client_secret: String,
    /// Scopes the token was granted for
    pub scopes: Vec<String>,
    /// Access token expiry timestamp
    pub expiry: Option<DateTime<Utc>>,
}

impl StoredToken {
    /// Whether the access token can be used without a refresh
    pub fn is_fresh(&self) -> bool {
        self.token.is_some()
            && self.expiry.is_some_and(|expiry| {
                expiry - ChronoDuration::seconds(EXPIRY_SKEW_SECONDS) > Utc::now()
            })
    }
}

/// OAuth client secrets loaded from the credentials file
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    /// OAuth client identifier
    pub client_id: String,
    /// OAuth client secret, kept out of logs
    pub client_secret: SecretString,
    /// Authorization endpoint
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    /// Token endpoint
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

/// Google client-secrets JSON carries the entry under `installed` or `web`
#[derive(Debug, Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

fn default_auth_uri() -> String {
    GOOGLE_AUTH_URI.to_owned()
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_owned()
}

/// Produce a valid access token, refreshing or logging in as needed
///
/// Order of preference: unexpired token from the token file, refresh-token
/// grant, interactive login. Any path that mints a new token rewrites the
/// token file.
///
/// # Errors
///
/// Returns `Auth` when the token file is unreadable, the refresh grant is
/// rejected, or the interactive flow fails or times out.
pub async fn ensure_access_token(config: &ServerConfig) -> AppResult<String> {
    let stored = load_stored_token(&config.token_file)?;

    if let Some(stored) = &stored
        && stored.is_fresh()
        && let Some(token) = &stored.token
    {
        tracing::debug!("using cached access token");
        return Ok(token.clone());
    }

    let renewed = match stored {
        Some(stored) if stored.refresh_token.is_some() => {
            tracing::info!("access token expired, refreshing");
            refresh_token_grant(&stored).await?
        }
        _ => {
            tracing::info!("no valid credentials found, starting interactive login");
            interactive_login(config).await?
        }
    };

    save_stored_token(&config.token_file, &renewed)?;
    renewed
        .token
        .ok_or_else(|| AppError::Auth("token endpoint returned no access token".to_owned()))
}

/// Load the persisted token, if the file exists
///
/// # Errors
///
/// Returns `Auth` when the file exists but cannot be read or parsed.
pub fn load_stored_token(path: &Path) -> AppResult<Option<StoredToken>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(path)
        .map_err(|e| AppError::Auth(format!("cannot read token file {}: {e}", path.display())))?;
    let token = serde_json::from_str(&raw)
        .map_err(|e| AppError::Auth(format!("token file {} is malformed: {e}", path.display())))?;
    Ok(Some(token))
}

/// Persist the token for the next run
///
/// # Errors
///
/// Returns `Internal` on I/O or serialization failure.
pub fn save_stored_token(path: &Path, token: &StoredToken) -> AppResult<()> {
    tracing::info!(path = %path.display(), "saving credentials to token file");
    let raw = serde_json::to_string_pretty(token)
        .map_err(|e| AppError::Internal(format!("serialize token file: {e}")))?;
    std::fs::write(path, raw)
        .map_err(|e| AppError::Internal(format!("write token file {}: {e}", path.display())))
}

/// Load client secrets from the configured credentials file
///
/// # Errors
///
/// Returns `Auth` when the file is missing, unreadable, or lacks an
/// `installed`/`web` section.
pub fn load_client_secrets(path: &Path) -> AppResult<ClientSecrets> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        AppError::Auth(format!(
            "cannot read credentials file {}: {e}",
            path.display()
        ))
    })?;
    let parsed: ClientSecretsFile = serde_json::from_str(&raw).map_err(|e| {
        AppError::Auth(format!(
            "credentials file {} is malformed: {e}",
            path.display()
        ))
    })?;
    parsed.installed.or(parsed.web).ok_or_else(|| {
        AppError::Auth("credentials file has neither an 'installed' nor a 'web' section".to_owned())
    })
}

/// Exchange the stored refresh token for a fresh access token
async fn refresh_token_grant(stored: &StoredToken) -> AppResult<StoredToken> {
    let refresh_token = stored
        .refresh_token
        .clone()
        .ok_or_else(|| AppError::Auth("token file has no refresh token".to_owned()))?;

    let client = BasicClient::new(
        ClientId::new(stored.client_id.clone()),
        Some(ClientSecret::new(stored.client_secret.clone())),
        parse_auth_url(GOOGLE_AUTH_URI)?,
        Some(parse_token_url(&stored.token_uri)?),
    );

    let response = client
        .exchange_refresh_token(&RefreshToken::new(refresh_token.clone()))
        .request_async(async_http_client)
        .await
        .map_err(|e| AppError::Auth(format!("refresh token grant failed: {e}")))?;

    Ok(stored_token_from_response(
        &stored.client_id,
        &stored.client_secret,
        &stored.token_uri,
        Some(refresh_token),
        &response,
    ))
}

/// Run the interactive authorization-code + PKCE flow
///
/// Binds a loopback callback server on an ephemeral port, opens the system
/// browser (best effort), waits for the redirect up to the configured
/// timeout, then exchanges the authorization code for tokens.
pub async fn interactive_login(config: &ServerConfig) -> AppResult<StoredToken> {
    let secrets = load_client_secrets(&config.credentials_file)?;

    // Start listening before handing out the redirect URI
    let bind_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0);
    let server = Server::http(bind_addr)
        .map_err(|e| AppError::Auth(format!("failed to bind OAuth callback server: {e}")))?;
    let port = server
        .server_addr()
        .to_ip()
        .map(|addr| addr.port())
        .ok_or_else(|| AppError::Internal("callback server has no IP address".to_owned()))?;
    let redirect_uri = format!("http://127.0.0.1:{port}");

    let client = BasicClient::new(
        ClientId::new(secrets.client_id.clone()),
        Some(ClientSecret::new(
            secrets.client_secret.expose_secret().to_owned(),
        )),
        parse_auth_url(&secrets.auth_uri)?,
        Some(parse_token_url(&secrets.token_uri)?),
    )
    .set_redirect_uri(
        RedirectUrl::new(redirect_uri.clone())
            .map_err(|e| AppError::Internal(format!("invalid redirect uri: {e}")))?,
    );

    let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
    let mut auth_request = client
        .authorize_url(CsrfToken::new_random)
        .set_pkce_challenge(pkce_challenge);
    for scope in SCOPES {
        auth_request = auth_request.add_scope(Scope::new((*scope).to_owned()));
    }
    let (auth_url, _csrf_token) = auth_request.url();

    // stdout belongs to the MCP transport; user-facing prompts go to stderr
    eprintln!("Open this URL in your browser:\n{auth_url}");
    if let Err(e) = open::that(auth_url.as_str()) {
        tracing::warn!(error = %e, "could not open browser automatically");
    }

    let timeout = Duration::from_secs(config.login_timeout_secs);
    let code = tokio::task::spawn_blocking(move || wait_for_authorization_code(&server, timeout))
        .await
        .map_err(|e| AppError::Internal(format!("callback wait task failed: {e}")))??;

    let response = client
        .exchange_code(AuthorizationCode::new(code))
        .set_pkce_verifier(pkce_verifier)
        .request_async(async_http_client)
        .await
        .map_err(|e| AppError::Auth(format!("authorization code exchange failed: {e}")))?;

    Ok(stored_token_from_response(
        &secrets.client_id,
        secrets.client_secret.expose_secret(),
        &secrets.token_uri,
        None,
        &response,
    ))
}

/// Block until the OAuth redirect delivers a code or the timeout elapses
fn wait_for_authorization_code(server: &Server, timeout: Duration) -> AppResult<String> {
    let deadline = Instant::now() + timeout;

    while Instant::now() < deadline {
        let Ok(Some(request)) = server.recv_timeout(Duration::from_millis(500)) else {
            continue;
        };

        // request.url() is a path+query like "/?code=...&state=..."
        let full = format!("http://127.0.0.1{}", request.url());
        let Ok(parsed) = Url::parse(&full) else {
            let _ = request.respond(Response::from_string("Bad redirect"));
            continue;
        };

        let code = parsed
            .query_pairs()
            .find(|(k, _)| k == "code")
            .map(|(_, v)| v.into_owned());

        if let Some(code) = code {
            let _ = request.respond(Response::from_string(
                "Authorization received. You can close this tab.",
            ));
            return Ok(code);
        }
        let _ = request.respond(Response::from_string(
            "No code found in redirect. You can close this tab.",
        ));
    }

    Err(AppError::Auth(format!(
        "no authorization code received within {} seconds",
        timeout.as_secs()
    )))
}

/// Build a [`StoredToken`] from a token-endpoint response
///
/// A response without a refresh token keeps the previous one, so refresh
/// grants do not lose the long-lived credential.
fn stored_token_from_response(
    client_id: &str,
    client_secret: &str,
    token_uri: &str,
    previous_refresh_token: Option<String>,
    response: &BasicTokenResponse,
) -> StoredToken {
    let expiry = response
        .expires_in()
        .and_then(|d| ChronoDuration::from_std(d).ok())
        .map(|d| Utc::now() + d);

    StoredToken {
        token: Some(response.access_token().secret().clone()),
        refresh_token: response
            .refresh_token()
            .map(|r| r.secret().clone())
            .or(previous_refresh_token),
        token_uri: token_uri.to_owned(),
        client_id: client_id.to_owned(),
        client_secret: client_secret.to_owned(),
        scopes: SCOPES.iter().map(|s| (*s).to_owned()).collect(),
        expiry,
    }
}

fn parse_auth_url(uri: &str) -> AppResult<AuthUrl> {
    AuthUrl::new(uri.to_owned())
        .map_err(|e| AppError::Auth(format!("invalid authorization uri '{uri}': {e}")))
}

fn parse_token_url(uri: &str) -> AppResult<TokenUrl> {
    TokenUrl::new(uri.to_owned()).map_err(|e| AppError::Auth(format!("invalid token uri '{uri}': {e}")))
}
