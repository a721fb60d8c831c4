//! # sitedeploy-mcp
//!
//! Local agent for deploying static websites, usable from a terminal or by
//! an AI assistant over MCP.
//!
//! ## Quick Start
//!
//! ```no_run
//! use sitedeploy_mcp::{AgentConfig, DeployRequest, WebsiteClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = WebsiteClient::from_config(AgentConfig::from_env()?)?;
//!
//!     let request = DeployRequest::builder().zip_file("./dist").build();
//!     let receipt = client.deploy(&request).await?;
//!     println!("{receipt}");
//!     Ok(())
//! }
//! ```
//!
//! The first call opens the browser to sign in. The resulting credential is
//! cached on disk for 30 days and reused until it is within 5 minutes of
//! expiry.
//!
//! ## Core Features
//!
//! ### 1. Browser Login
//!
//! [`auth::AuthorizationFlow`] runs a one-hop redirect login against a
//! loopback listener on port 39897, guarded by a random `state` token and a
//! 5 minute timeout. See the [`auth`] module.
//!
//! ### 2. Authenticated Calls with One Retry
//!
//! [`CallDispatcher`] supplies a token to every backend call. If the backend
//! rejects it, the dispatcher logs in again and retries exactly once.
//!
//! ### 3. Deploy Inputs
//!
//! A deploy accepts a local directory, a `.zip` file, or an `https` URL of a
//! `.zip` file. See [`archive::DeployInput`]. Archives over 500 MB are
//! rejected before anything is uploaded.
//!
//! ### 4. MCP Tools
//!
//! [`mcp::DeployServer`] serves `deploy_website`, `list_websites`,
//! `get_website` and `delete_website` over stdio.
//!
//! ## Architecture
//!
//! - [`config`]: Endpoints, ports and limits
//! - [`auth`]: Browser login and credential storage
//! - [`dispatch`]: Token supply and re-login retry
//! - [`backend`]: Backend call envelope and archive upload
//! - [`archive`]: Deploy input classification and packaging
//! - [`client`]: Website operations
//! - [`mcp`]: MCP server
//! - [`types`]: Wire and display types
//! - [`error`]: Error types and handling
//!
//! ## Logging
//!
//! This crate uses [`tracing`](https://crates.io/crates/tracing) for structured logging.
//! Tracing events are always emitted but are zero-cost when no subscriber is attached.
//! The `sitedeploy` binary logs to stderr, filtered by `SITEDEPLOY_LOG`.
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T, DeployError>`](Result):
//!
//! ```no_run
//! # use sitedeploy_mcp::{DeployError, WebsiteClient};
//! # async fn example(client: WebsiteClient) {
//! match client.list_websites().await {
//!     Ok(list) => println!("{list}"),
//!     Err(DeployError::Backend { code, suggestion, .. }) => {
//!         eprintln!("Backend refused ({code}): {suggestion:?}");
//!     }
//!     Err(e) => eprintln!("Error: {e}"),
//! }
//! # }
//! ```
//!
//! ## Requirements
//!
//! - Rust 1.85.0 or later
//! - The `zip` utility, for deploying directories

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod archive;
pub mod auth;
pub mod backend;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod mcp;
pub mod types;

// Re-export commonly used types
pub use archive::{DeployInput, ResolvedArchive};
pub use auth::{AuthorizationFlow, Authorizer, CredentialRecord, CredentialStore};
pub use backend::BackendClient;
pub use client::{DeployRequest, WebsiteClient};
pub use config::AgentConfig;
pub use dispatch::CallDispatcher;
pub use error::{DeployError, Result};
pub use types::{DeployReceipt, McpClientConfig, Website, WebsiteList};

/// Version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
