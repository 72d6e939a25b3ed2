//! gmail-search-mcp-rs: Gmail search MCP server over stdio
//!
//! This server exposes Gmail search to conversational agents via the Model
//! Context Protocol (MCP) over stdio, backed by the Gmail REST API with OAuth
//! installed-app authentication. It also ships `search` and `login` CLI
//! subcommands for running the same pipeline without an MCP client.
//!
//! # Architecture
//!
//! - [`main`]: Process entry point with env loading, CLI dispatch, and stdio serving
//! - [`config`]: Environment-driven configuration for credentials and search limits
//! - [`errors`]: Application error model with MCP error mapping
//! - [`auth`]: OAuth token lifecycle (stored token, refresh grant, interactive login)
//! - [`gmail`]: Gmail REST client with listing-page enumeration
//! - [`models`]: Gmail API DTOs and schema-bearing MCP types
//! - [`query`]: Query-literal normalization and boundary type coercion
//! - [`mime`]: Plain-text extraction from multipart payload trees
//! - [`pagination`]: Client-side page slicing over full result lists
//! - [`report`]: Text report rendering
//! - [`search`]: Search orchestration and error-to-text policy
//! - [`agent`]: Conversational agent tool adapter
//! - [`server`]: MCP tool handlers

mod agent;
mod auth;
mod config;
mod errors;
mod gmail;
mod mime;
mod models;
mod pagination;
mod query;
mod report;
mod search;
mod server;

use clap::{Parser, Subcommand};
use rmcp::ServiceExt;
use rmcp::transport::stdio;
use tracing_subscriber::EnvFilter;

use config::ServerConfig;
use search::SearchContext;

/// Gmail search for conversational agents: MCP server and CLI
#[derive(Debug, Parser)]
#[command(name = "gmail-search-mcp-rs", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve MCP over stdio (default when no subcommand is given)
    Serve,
    /// Run one search and print the report
    Search {
        /// Gmail query string, e.g. "from:alice after:2025-01-01"
        query: String,
        /// Messages per page
        #[arg(long, default_value_t = 100)]
        count: usize,
        /// Page number (1-based)
        #[arg(long, default_value_t = 1)]
        page: usize,
        /// Include extracted plain-text bodies instead of snippets
        #[arg(long)]
        full_body: bool,
    },
    /// Run the interactive OAuth login and store the token
    Login,
    /// List the tools offered to conversational agents
    Tools,
}

/// Application entry point
///
/// Initializes tracing from environment and dispatches on the subcommand.
/// Logs go to stderr; under `serve`, stdout belongs to the MCP transport.
///
/// # Environment Variables
///
/// See [`ServerConfig::load_from_env`] for full configuration options.
/// `serve` requires `CREDENTIALS_FILE` to be set.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ServerConfig::load_from_env()?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            config::require_credentials_env()?;
            let context = SearchContext::new(config);
            let service = server::GmailSearchServer::new(context)
                .serve(stdio())
                .await?;
            service.waiting().await?;
        }
        Command::Search {
            query,
            count,
            page,
            full_body,
        } => {
            let context = SearchContext::new(config);
            let args = agent::GmailSearchArgs {
                gmail_query: query,
                count: serde_json::Value::from(count),
                page: serde_json::Value::from(page),
                full_body: serde_json::Value::Bool(full_body),
            };
            let report = agent::gmail_search(&context, args).await?;
            println!("{report}");
        }
        Command::Login => {
            let token = auth::interactive_login(&config).await?;
            auth::save_stored_token(&config.token_file, &token)?;
            println!("Stored authorized token at {}", config.token_file.display());
        }
        Command::Tools => {
            for tool in agent::TOOL_CATALOG {
                println!("{}\n  {}", tool.name, tool.description);
            }
        }
    }
    Ok(())
}
