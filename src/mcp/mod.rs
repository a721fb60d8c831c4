//! MCP (Model Context Protocol) surface
//!
//! [`DeployServer`] exposes four tools to an assistant over stdio:
//!
//! - `deploy_website{zipFile, websiteId?, fileName?}`
//! - `list_websites{}`
//! - `get_website{websiteId}`
//! - `delete_website{websiteId}`
//!
//! Each tool returns human-readable text. Failures are reported as tool
//! results with `isError` set, not as protocol errors, so the assistant can
//! show the backend's message and suggestion to the operator.
//!
//! # Serving
//!
//! ```no_run
//! use sitedeploy_mcp::mcp::{DeployServer, ServiceExt, stdio};
//! use sitedeploy_mcp::{AgentConfig, WebsiteClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = WebsiteClient::from_config(AgentConfig::from_env()?)?;
//! let service = DeployServer::new(client).serve(stdio()).await?;
//! service.waiting().await?;
//! # Ok(())
//! # }
//! ```

mod server;

pub use server::{DeployServer, DeployWebsiteParams, WebsiteIdParams};

// Re-exports for embedding the server in another rmcp service
pub use rmcp::ErrorData as McpError;
pub use rmcp::ServiceExt;
pub use rmcp::transport::io::stdio;
