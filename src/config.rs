//! Agent configuration
//!
//! Defaults point at the production service. Endpoints and the credential
//! path can be overridden from the environment:
//!
//! - `SITEDEPLOY_API_URL` - backend call endpoint
//! - `SITEDEPLOY_AUTH_URL` - browser authorization page
//! - `SITEDEPLOY_CREDENTIALS` - credential file path
//!
//! The client identifier is fixed at build time through the
//! `SITEDEPLOY_CLIENT_ID` compile-time environment variable.

use std::path::PathBuf;
use std::time::Duration;
use typed_builder::TypedBuilder;
use url::Url;

use crate::auth::CredentialStore;
use crate::error::{DeployError, Result};

/// Backend endpoint accepting `{functionName, data}` envelopes
pub const DEFAULT_API_URL: &str = "https://api.sitedeploy.dev/v1/call";

/// Browser authorization page
pub const DEFAULT_AUTH_URL: &str = "https://sitedeploy.dev/oauth/authorize";

/// Client identifier baked in at build time
pub const CLIENT_ID: &str = match option_env!("SITEDEPLOY_CLIENT_ID") {
    Some(id) => id,
    None => "sitedeploy-cli",
};

/// Local port the login callback listens on
pub const DEFAULT_CALLBACK_PORT: u16 = 39897;

/// How long the login flow waits for the browser callback
pub const DEFAULT_LOGIN_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Largest archive accepted for upload (500 MB)
pub const DEFAULT_MAX_ARCHIVE_BYTES: u64 = 500 * 1024 * 1024;

/// Every scope this client requests
pub const REQUESTED_SCOPES: &[&str] = &[
    "website:deploy",
    "website:list",
    "website:delete",
    "website:update",
];

const ENV_API_URL: &str = "SITEDEPLOY_API_URL";
const ENV_AUTH_URL: &str = "SITEDEPLOY_AUTH_URL";
const ENV_CREDENTIALS: &str = "SITEDEPLOY_CREDENTIALS";

/// Configuration shared by the login flow, backend client and CLI
#[derive(Debug, Clone, TypedBuilder)]
pub struct AgentConfig {
    /// Backend call endpoint
    #[builder(default = DEFAULT_API_URL.to_string(), setter(into))]
    pub api_url: String,

    /// Browser authorization page
    #[builder(default = DEFAULT_AUTH_URL.to_string(), setter(into))]
    pub auth_url: String,

    /// OAuth client identifier
    #[builder(default = CLIENT_ID.to_string(), setter(into))]
    pub client_id: String,

    /// Local callback port
    #[builder(default = DEFAULT_CALLBACK_PORT)]
    pub callback_port: u16,

    /// Login window
    #[builder(default = DEFAULT_LOGIN_TIMEOUT)]
    pub login_timeout: Duration,

    /// Upload size limit in bytes
    #[builder(default = DEFAULT_MAX_ARCHIVE_BYTES)]
    pub max_archive_bytes: u64,

    /// Credential file location
    #[builder(default = CredentialStore::default_path(), setter(into))]
    pub credentials_path: PathBuf,

    /// Try to open the authorization URL in the default browser
    #[builder(default = true)]
    pub auto_open_browser: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl AgentConfig {
    /// Build configuration from defaults plus environment overrides
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if an overridden URL does not parse.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(url) = std::env::var(ENV_API_URL) {
            config.api_url = url;
        }
        if let Ok(url) = std::env::var(ENV_AUTH_URL) {
            config.auth_url = url;
        }
        if let Ok(path) = std::env::var(ENV_CREDENTIALS) {
            config.credentials_path = PathBuf::from(path);
        }
        config.validate()?;
        Ok(config)
    }

    /// Check that the configured URLs are usable
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` describing the first bad value.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("api_url", &self.api_url), ("auth_url", &self.auth_url)] {
            let url = Url::parse(value)
                .map_err(|e| DeployError::invalid_config(format!("{name} `{value}`: {e}")))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(DeployError::invalid_config(format!(
                    "{name} `{value}` must be an http(s) URL"
                )));
            }
        }
        if self.client_id.is_empty() {
            return Err(DeployError::invalid_config("client_id is empty"));
        }
        Ok(())
    }

    /// Credential store at the configured path
    #[must_use]
    pub fn credential_store(&self) -> CredentialStore {
        CredentialStore::with_path(self.credentials_path.clone())
    }

    /// Scopes requested during login
    #[must_use]
    pub fn scopes(&self) -> Vec<String> {
        REQUESTED_SCOPES.iter().map(|s| (*s).to_string()).collect()
    }
}

/// Redirect target for a login callback listening on `port`.
///
/// Always built from the port actually bound, which differs from
/// `callback_port` when that is 0.
#[must_use]
pub fn redirect_uri(port: u16) -> String {
    format!("http://localhost:{port}/callback")
}
