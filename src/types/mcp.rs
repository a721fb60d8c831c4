//! MCP client configuration emitted by `sitedeploy config`
//!
//! Assistants that speak MCP launch servers from a JSON block of the form
//! `{"mcpServers": {"<name>": {"command": ..., "args": [...]}}}`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Name this server registers under in the client configuration
pub const SERVER_NAME: &str = "sitedeploy";

/// MCP stdio server configuration
///
/// Tells the client which command spawns the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpStdioServerConfig {
    /// Command to execute
    pub command: String,
    /// Command arguments
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// Environment variables
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,
}

/// Top-level client configuration block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpClientConfig {
    /// Servers keyed by name
    pub mcp_servers: BTreeMap<String, McpStdioServerConfig>,
}

impl McpClientConfig {
    /// Configuration launching `executable serve`, forwarding any endpoint overrides
    #[must_use]
    pub fn for_executable(executable: &Path, env: HashMap<String, String>) -> Self {
        let server = McpStdioServerConfig {
            command: executable.display().to_string(),
            args: vec!["serve".to_string()],
            env,
        };
        Self {
            mcp_servers: BTreeMap::from([(SERVER_NAME.to_string(), server)]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_shape() {
        let config =
            McpClientConfig::for_executable(Path::new("/usr/bin/sitedeploy"), HashMap::new());
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "mcpServers": {
                    "sitedeploy": {
                        "command": "/usr/bin/sitedeploy",
                        "args": ["serve"]
                    }
                }
            })
        );
    }

    #[test]
    fn test_client_config_includes_env() {
        let env = HashMap::from([(
            "SITEDEPLOY_API_URL".to_string(),
            "http://localhost:8080".to_string(),
        )]);
        let config = McpClientConfig::for_executable(Path::new("sitedeploy"), env);
        let server = &config.mcp_servers[SERVER_NAME];
        assert_eq!(server.env["SITEDEPLOY_API_URL"], "http://localhost:8080");
    }
}
