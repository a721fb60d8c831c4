//! Website deploy tools served over MCP

use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Content, ServerCapabilities, ServerInfo};
use rmcp::{ErrorData as McpError, ServerHandler, tool, tool_handler, tool_router};
use schemars::JsonSchema;
use serde::Deserialize;
use std::fmt::Display;
use std::sync::Arc;

use crate::client::{DeployRequest, WebsiteClient};
use crate::error::DeployError;

const INSTRUCTIONS: &str = "Deploys static websites. Pass deploy_website a local directory, \
a path to a .zip file, or an https URL of a .zip file. The first call opens a browser \
window to sign in.";

/// Parameters for `deploy_website`
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeployWebsiteParams {
    /// Local directory, path to a .zip file, or https URL of a .zip file
    pub zip_file: String,
    /// Website to update; omit to create a new website
    #[serde(default)]
    pub website_id: Option<String>,
    /// Display name for the website
    #[serde(default)]
    pub file_name: Option<String>,
}

/// Parameters for tools addressing one website
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WebsiteIdParams {
    /// Website identifier, as shown by list_websites
    pub website_id: String,
}

/// MCP server exposing the website tools
#[derive(Clone)]
pub struct DeployServer {
    client: Arc<WebsiteClient>,
    tool_router: ToolRouter<Self>,
}

impl DeployServer {
    /// Create a server backed by `client`
    #[must_use]
    pub fn new(client: WebsiteClient) -> Self {
        Self {
            client: Arc::new(client),
            tool_router: Self::tool_router(),
        }
    }

    /// Get the website client
    #[must_use]
    pub fn client(&self) -> &WebsiteClient {
        &self.client
    }
}

#[tool_router]
impl DeployServer {
    #[tool(
        description = "Deploy a static website from a local directory, a .zip file, or an https URL of a .zip file. Pass websiteId to update an existing website."
    )]
    async fn deploy_website(
        &self,
        Parameters(params): Parameters<DeployWebsiteParams>,
    ) -> Result<CallToolResult, McpError> {
        if params.zip_file.trim().is_empty() {
            return Ok(failure(DeployError::invalid_argument(
                "zipFile is required",
            )));
        }

        let request = DeployRequest {
            zip_file: params.zip_file,
            website_id: non_empty(params.website_id),
            name: non_empty(params.file_name),
        };
        tracing::info!(tool = "deploy_website", zip_file = %request.zip_file, "tool called");
        Ok(respond(self.client.deploy(&request).await))
    }

    #[tool(description = "List all websites deployed by the signed-in user")]
    async fn list_websites(&self) -> Result<CallToolResult, McpError> {
        tracing::info!(tool = "list_websites", "tool called");
        Ok(respond(self.client.list_websites().await))
    }

    #[tool(description = "Get details about one website")]
    async fn get_website(
        &self,
        Parameters(params): Parameters<WebsiteIdParams>,
    ) -> Result<CallToolResult, McpError> {
        tracing::info!(tool = "get_website", website_id = %params.website_id, "tool called");
        Ok(respond(self.client.get_website(&params.website_id).await))
    }

    #[tool(description = "Delete a website permanently")]
    async fn delete_website(
        &self,
        Parameters(params): Parameters<WebsiteIdParams>,
    ) -> Result<CallToolResult, McpError> {
        tracing::info!(tool = "delete_website", website_id = %params.website_id, "tool called");
        Ok(respond(self.client.delete_website(&params.website_id).await))
    }
}

#[tool_handler]
impl ServerHandler for DeployServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(INSTRUCTIONS.into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn respond<T: Display>(result: crate::Result<T>) -> CallToolResult {
    match result {
        Ok(value) => CallToolResult::success(vec![Content::text(value.to_string())]),
        Err(e) => failure(e),
    }
}

fn failure(error: DeployError) -> CallToolResult {
    tracing::warn!("tool call failed: {error}");
    CallToolResult::error(vec![Content::text(format!("Error: {error}"))])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentConfig;
    use tempfile::TempDir;

    fn server(dir: &TempDir) -> DeployServer {
        let config = AgentConfig::builder()
            .api_url("http://127.0.0.1:9/call".to_string())
            .credentials_path(dir.path().join("creds.json"))
            .auto_open_browser(false)
            .build();
        DeployServer::new(WebsiteClient::from_config(config).unwrap())
    }

    fn text_of(result: &CallToolResult) -> String {
        result
            .content
            .iter()
            .filter_map(|c| c.as_text().map(|t| t.text.clone()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_info_enables_tools() {
        let dir = TempDir::new().unwrap();
        let info = server(&dir).get_info();
        assert!(info.capabilities.tools.is_some());
        assert!(info.instructions.unwrap().contains("deploy_website"));
    }

    #[test]
    fn test_router_lists_four_tools() {
        let dir = TempDir::new().unwrap();
        let mut names: Vec<String> = server(&dir)
            .tool_router
            .list_all()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect();
        names.sort();
        assert_eq!(
            names,
            ["delete_website", "deploy_website", "get_website", "list_websites"]
        );
    }

    #[tokio::test]
    async fn test_empty_zip_file_fails_fast() {
        let dir = TempDir::new().unwrap();
        let result = server(&dir)
            .deploy_website(Parameters(DeployWebsiteParams {
                zip_file: "  ".to_string(),
                website_id: None,
                file_name: None,
            }))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
        assert!(text_of(&result).contains("zipFile"));
        // No login was attempted
        assert!(!dir.path().join("creds.json").exists());
    }

    #[tokio::test]
    async fn test_base64_input_is_rejected() {
        let dir = TempDir::new().unwrap();
        let result = server(&dir)
            .deploy_website(Parameters(DeployWebsiteParams {
                zip_file: "UEsDBBQAAAAIAGZ0d1c=".to_string(),
                website_id: None,
                file_name: Some("site".to_string()),
            }))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
        assert!(text_of(&result).contains("Unsupported deploy input"));
    }

    #[tokio::test]
    async fn test_empty_website_id_fails_fast() {
        let dir = TempDir::new().unwrap();
        let server = server(&dir);
        for result in [
            server
                .get_website(Parameters(WebsiteIdParams {
                    website_id: String::new(),
                }))
                .await
                .unwrap(),
            server
                .delete_website(Parameters(WebsiteIdParams {
                    website_id: " ".to_string(),
                }))
                .await
                .unwrap(),
        ] {
            assert_eq!(result.is_error, Some(true));
            assert!(text_of(&result).contains("websiteId must not be empty"));
        }
    }

    #[test]
    fn test_params_use_camel_case() {
        let params: DeployWebsiteParams = serde_json::from_value(serde_json::json!({
            "zipFile": "./public",
            "websiteId": "w1",
            "fileName": "Blog"
        }))
        .unwrap();
        assert_eq!(params.zip_file, "./public");
        assert_eq!(params.website_id.as_deref(), Some("w1"));
        assert_eq!(params.file_name.as_deref(), Some("Blog"));
    }
}
