//! MCP server implementation with tool handlers
//!
//! Implements the `ServerHandler` trait and registers the Gmail search tools.
//! Handles boundary coercion of loosely-typed arguments and response
//! formatting; the search pipeline itself lives in `search`.

use std::sync::Arc;
use std::time::Instant;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{ErrorData, ServerCapabilities, ServerInfo};
use rmcp::{Json, ServerHandler, tool, tool_handler, tool_router};

use crate::agent;
use crate::errors::AppResult;
use crate::models::{GetEmailsInput, Meta, ToolEnvelope};
use crate::query;
use crate::search::SearchContext;

/// Gmail search MCP server
///
/// Holds the shared search context. Implements MCP tool handlers via the
/// `#[tool]` attribute macro and `ServerHandler` trait.
#[derive(Clone)]
pub struct GmailSearchServer {
    /// Shared config and HTTP client for search invocations
    context: Arc<SearchContext>,
    /// Tool router for dispatching MCP tool calls
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl GmailSearchServer {
    /// Create a new MCP server instance
    pub fn new(context: SearchContext) -> Self {
        Self {
            context: Arc::new(context),
            tool_router: Self::tool_router(),
        }
    }

    /// Tool: Search Gmail and return a formatted report
    ///
    /// Accepts a Gmail query string (or a structured query literal carrying
    /// its own count/page/full_body), fetches the matching messages, and
    /// returns report text. Search failures past argument coercion are
    /// rendered into the report rather than raised.
    #[tool(
        name = "gmail_get_emails",
        description = "Get emails from Gmail matching a query, with pagination. \
                       gmail_query accepts Gmail search syntax (e.g. 'from:alice \
                       after:2025-01-01'); count and page select the result page; \
                       full_body=true includes extracted plain-text bodies instead \
                       of snippets."
    )]
    async fn get_emails(
        &self,
        Parameters(input): Parameters<GetEmailsInput>,
    ) -> Result<Json<ToolEnvelope<String>>, ErrorData> {
        let started = Instant::now();
        finalize_tool(started, self.get_emails_impl(input).await)
    }

    /// Tool: Today's date for building date-bounded queries
    #[tool(
        name = "get_todays_date",
        description = "Get today's date in YYYY-MM-DD format, for use in Gmail \
                       after:/before: query operators."
    )]
    async fn get_todays_date(&self) -> Result<Json<ToolEnvelope<String>>, ErrorData> {
        let started = Instant::now();
        let date = agent::todays_date();
        finalize_tool(started, Ok((format!("Today is {date}"), date)))
    }
}

/// Tool implementation methods
///
/// Private methods handle argument coercion and dispatch, separated from the
/// public `#[tool]` methods that handle response formatting.
impl GmailSearchServer {
    async fn get_emails_impl(&self, input: GetEmailsInput) -> AppResult<(String, String)> {
        let count = query::coerce_positive(&input.count, "count")?;
        let page = query::coerce_positive(&input.page, "page")?;
        let full_body = query::coerce_bool(&input.full_body, "full_body")?;

        let report = self
            .context
            .get_emails(&input.gmail_query, count, page, full_body)
            .await;
        let summary = report
            .lines()
            .next()
            .unwrap_or("Email search completed")
            .to_owned();
        Ok((summary, report))
    }
}

/// MCP server handler implementation
///
/// Provides server info and capabilities to the MCP client.
#[tool_handler(router = self.tool_router)]
impl ServerHandler for GmailSearchServer {
    fn get_info(&self) -> ServerInfo {
        let mut info = ServerInfo::default();
        info.instructions = Some(
            "Gmail search MCP server. Use gmail_get_emails to search messages with \
             Gmail query syntax; use get_todays_date to resolve relative dates into \
             after:/before: bounds. Requires CREDENTIALS_FILE to point at an OAuth \
             client secrets file."
                .to_owned(),
        );
        info.capabilities = ServerCapabilities::builder().enable_tools().build();
        info
    }
}

/// Calculate elapsed milliseconds
fn duration_ms(started: Instant) -> u64 {
    started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64
}

/// Build a standardized MCP tool response envelope from business logic output
fn finalize_tool<T>(
    started: Instant,
    result: AppResult<(String, T)>,
) -> Result<Json<ToolEnvelope<T>>, ErrorData>
where
    T: schemars::JsonSchema,
{
    match result {
        Ok((summary, data)) => Ok(Json(ToolEnvelope {
            summary,
            data,
            meta: Meta::now(duration_ms(started)),
        })),
        Err(e) => Err(e.to_error_data()),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::{duration_ms, finalize_tool};
    use crate::errors::AppError;

    #[test]
    fn finalize_wraps_success_in_an_envelope() {
        let result = finalize_tool(
            Instant::now(),
            Ok(("done".to_owned(), "report".to_owned())),
        );
        let envelope = result.expect("success must produce an envelope").0;
        assert_eq!(envelope.summary, "done");
        assert_eq!(envelope.data, "report");
    }

    #[test]
    fn finalize_maps_coercion_errors_to_invalid_params() {
        let result = finalize_tool::<String>(
            Instant::now(),
            Err(AppError::invalid_parameter("count", "must be positive")),
        );
        let error = result.err().expect("failure must map to ErrorData");
        assert_eq!(error.code, rmcp::model::ErrorCode::INVALID_PARAMS);
    }

    #[test]
    fn duration_is_measured_from_start() {
        assert!(duration_ms(Instant::now()) < 1_000);
    }
}
