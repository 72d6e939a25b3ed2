//! Search orchestration
//!
//! Ties the pipeline together: normalize the caller's query literal, mint an
//! access token, enumerate matching message IDs, slice the requested page and
//! fetch each message on it, then render the text report. Every failure along
//! the way is folded into a caller-visible error sentence so agents always
//! receive text back.

use crate::auth;
use crate::config::ServerConfig;
use crate::errors::AppResult;
use crate::gmail::GmailClient;
use crate::mime;
use crate::pagination;
use crate::query::{self, SearchDefaults, SearchRequest};
use crate::report::{self, EmailContent, EmailEntry};

/// Shared state for search invocations
///
/// One context is created at startup and shared by the MCP tool and the agent
/// adapter, so every invocation reuses the same HTTP connection pool.
#[derive(Debug, Clone)]
pub struct SearchContext {
    config: ServerConfig,
    client: GmailClient,
}

impl SearchContext {
    pub fn new(config: ServerConfig) -> Self {
        Self::with_client(config, GmailClient::new())
    }

    pub fn with_client(config: ServerConfig, client: GmailClient) -> Self {
        Self { config, client }
    }

    /// Run a search and always return report text
    ///
    /// Errors never propagate out of this call: they are rendered into the
    /// returned string so conversational callers can relay them verbatim.
    pub async fn get_emails(
        &self,
        raw_query: &str,
        count: usize,
        page: usize,
        full_body: bool,
    ) -> String {
        let defaults = SearchDefaults {
            count,
            page,
            full_body,
        };
        match self.run(raw_query, defaults).await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(error = %e, "email search failed");
                format!("An error occurred while fetching emails: {e}")
            }
        }
    }

    async fn run(&self, raw_query: &str, defaults: SearchDefaults) -> AppResult<String> {
        let request = query::normalize(raw_query, defaults)?;
        tracing::info!(
            query = %request.query,
            count = request.count,
            page = request.page,
            full_body = request.full_body,
            "searching messages"
        );

        let token = auth::ensure_access_token(&self.config).await?;
        let ids = self
            .client
            .list_message_ids(
                &token,
                &request.query,
                self.config.list_page_size,
                self.config.max_results_scanned,
            )
            .await?;
        if ids.is_empty() {
            tracing::info!(query = %request.query, "no messages matched");
            return Ok(report::format_no_results(&request.query));
        }

        let total = ids.len();
        let page_ids = pagination::slice_page(&ids, request.count, request.page);
        tracing::debug!(total, page_len = page_ids.len(), "fetching page of messages");

        let mut entries = Vec::with_capacity(page_ids.len());
        for id in page_ids {
            entries.push(self.fetch_entry(&token, id, &request).await?);
        }
        Ok(report::format_report(&request.query, total, &entries))
    }

    async fn fetch_entry(
        &self,
        token: &str,
        id: &str,
        request: &SearchRequest,
    ) -> AppResult<EmailEntry> {
        // The snippet path only needs headers, so it skips the payload tree.
        let (message, content) = if request.full_body {
            let message = self.client.get_message_full(token, id).await?;
            let body = match message.payload.as_ref() {
                Some(payload) => mime::extract_plain_text(payload)?,
                None => None,
            };
            (message, EmailContent::FullBody(body))
        } else {
            let message = self.client.get_message_metadata(token, id).await?;
            let snippet = message.snippet.clone();
            (message, EmailContent::Snippet(snippet))
        };

        let from = message.header("From").map(str::to_owned);
        let subject = message.header("Subject").map(str::to_owned);
        Ok(EmailEntry {
            id: message.id,
            from,
            subject,
            content,
        })
    }
}
