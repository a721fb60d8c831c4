//! Type definitions shared by the backend client, tools and CLI

pub mod envelope;
pub mod mcp;
pub mod website;

pub use envelope::{BackendErrorBody, CallEnvelope, ErrorEnvelope};
pub use mcp::{McpClientConfig, McpStdioServerConfig, SERVER_NAME};
pub use website::{DeployReceipt, UploadTicket, Website, WebsiteList, human_size};
