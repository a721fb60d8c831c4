//! Remote website operations
//!
//! [`WebsiteClient`] is the single entry point used by both the MCP tools and
//! the CLI. Every operation runs through the [`CallDispatcher`], so a rejected
//! token triggers one fresh login and one retry.
//!
//! # Example
//!
//! ```no_run
//! use sitedeploy_mcp::{AgentConfig, DeployRequest, WebsiteClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = WebsiteClient::from_config(AgentConfig::from_env()?)?;
//!
//! let request = DeployRequest::builder()
//!     .zip_file("./public")
//!     .name("My blog")
//!     .build();
//! let receipt = client.deploy(&request).await?;
//! println!("{receipt}");
//!
//! println!("{}", client.list_websites().await?);
//! # Ok(())
//! # }
//! ```

use serde_json::{Map, Value, json};
use typed_builder::TypedBuilder;

use crate::archive::{self, DeployInput};
use crate::auth::{AuthorizationFlow, Authorizer};
use crate::backend::BackendClient;
use crate::config::AgentConfig;
use crate::dispatch::CallDispatcher;
use crate::error::{DeployError, Result};
use crate::types::{DeployReceipt, UploadTicket, Website, WebsiteList};

/// Backend function names
pub mod functions {
    /// Request a signed upload URL
    pub const CREATE_UPLOAD_URL: &str = "createUploadUrl";
    /// Create or update a website from an uploaded archive
    pub const DEPLOY_WEBSITE: &str = "deployWebsite";
    /// List the operator's websites
    pub const LIST_WEBSITES: &str = "listWebsites";
    /// Describe one website
    pub const GET_WEBSITE: &str = "getWebsite";
    /// Delete a website
    pub const DELETE_WEBSITE: &str = "deleteWebsite";
}

/// Arguments for a deploy
#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder)]
pub struct DeployRequest {
    /// Directory, `.zip` path, or `https` URL of a `.zip`
    #[builder(setter(into))]
    pub zip_file: String,

    /// Existing website to update; a new website is created when absent
    #[builder(default, setter(strip_option, into))]
    pub website_id: Option<String>,

    /// Display name for the website
    #[builder(default, setter(strip_option, into))]
    pub name: Option<String>,
}

/// Client for deploying and managing hosted websites
#[derive(Debug, Clone)]
pub struct WebsiteClient<A = AuthorizationFlow> {
    dispatcher: CallDispatcher<A>,
    backend: BackendClient,
    max_archive_bytes: u64,
}

impl WebsiteClient<AuthorizationFlow> {
    /// Build a client with the interactive browser login
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the configuration does not validate.
    pub fn from_config(config: AgentConfig) -> Result<Self> {
        config.validate()?;
        let backend = BackendClient::new(&config.api_url)?;
        let max_archive_bytes = config.max_archive_bytes;
        let store = config.credential_store();
        let dispatcher = CallDispatcher::new(store, AuthorizationFlow::new(config));
        Ok(Self::new(dispatcher, backend, max_archive_bytes))
    }
}

impl<A: Authorizer> WebsiteClient<A> {
    /// Create a client from its parts
    #[must_use]
    pub fn new(
        dispatcher: CallDispatcher<A>,
        backend: BackendClient,
        max_archive_bytes: u64,
    ) -> Self {
        Self {
            dispatcher,
            backend,
            max_archive_bytes,
        }
    }

    /// Get the dispatcher
    #[must_use]
    pub fn dispatcher(&self) -> &CallDispatcher<A> {
        &self.dispatcher
    }

    /// Get the backend client
    #[must_use]
    pub fn backend(&self) -> &BackendClient {
        &self.backend
    }

    /// Deploy a site, creating a website or updating `website_id`.
    ///
    /// The input is resolved to a local ZIP and size checked before any
    /// backend call is made.
    ///
    /// # Errors
    ///
    /// `UnsupportedInput` or `FileTooLarge` before any network call to the
    /// backend, then any dispatch or backend error.
    pub async fn deploy(&self, request: &DeployRequest) -> Result<DeployReceipt> {
        if let Some(ref id) = request.website_id {
            require_non_empty("websiteId", id)?;
        }

        let input = DeployInput::classify(&request.zip_file)?;
        let archive = archive::resolve(input, self.backend.http(), self.max_archive_bytes).await?;
        tracing::info!(size = archive.size(), "deploying archive");

        let archive = &archive;
        let backend = &self.backend;
        let receipt: DeployReceipt = self
            .dispatcher
            .dispatch(|token| async move {
                let ticket: UploadTicket = backend
                    .call_as(
                        &token,
                        functions::CREATE_UPLOAD_URL,
                        json!({
                            "fileName": archive.file_name(),
                            "contentType": "application/zip",
                            "size": archive.size(),
                        }),
                    )
                    .await?;

                backend
                    .upload_archive(&ticket.upload_url, archive.path())
                    .await?;

                backend
                    .call_as(
                        &token,
                        functions::DEPLOY_WEBSITE,
                        deploy_payload(&ticket.file_ref, request),
                    )
                    .await
            })
            .await?;

        tracing::info!(website_id = %receipt.website_id, "deploy complete");
        Ok(receipt)
    }

    /// List the operator's websites
    ///
    /// # Errors
    ///
    /// Any dispatch or backend error.
    pub async fn list_websites(&self) -> Result<WebsiteList> {
        let backend = &self.backend;
        self.dispatcher
            .dispatch(|token| async move {
                backend
                    .call_as(&token, functions::LIST_WEBSITES, json!({}))
                    .await
            })
            .await
    }

    /// Describe one website
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty id, then any dispatch or backend error.
    pub async fn get_website(&self, website_id: &str) -> Result<Website> {
        let website_id = require_non_empty("websiteId", website_id)?;
        let backend = &self.backend;
        let value = self
            .dispatcher
            .dispatch(|token| async move {
                backend
                    .call(
                        &token,
                        functions::GET_WEBSITE,
                        json!({ "websiteId": website_id }),
                    )
                    .await
            })
            .await?;
        Ok(serde_json::from_value(unwrap_field(value, "website"))?)
    }

    /// Delete a website, returning the backend's confirmation message
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty id, then any dispatch or backend error.
    pub async fn delete_website(&self, website_id: &str) -> Result<String> {
        let website_id = require_non_empty("websiteId", website_id)?;
        let backend = &self.backend;
        let value = self
            .dispatcher
            .dispatch(|token| async move {
                backend
                    .call(
                        &token,
                        functions::DELETE_WEBSITE,
                        json!({ "websiteId": website_id }),
                    )
                    .await
            })
            .await?;

        tracing::info!(website_id, "website deleted");
        Ok(value
            .get("message")
            .and_then(Value::as_str)
            .map_or_else(
                || format!("Website {website_id} deleted successfully."),
                str::to_string,
            ))
    }
}

fn require_non_empty<'a>(name: &str, value: &'a str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DeployError::invalid_argument(format!(
            "{name} must not be empty"
        )));
    }
    Ok(value)
}

fn deploy_payload(file_ref: &str, request: &DeployRequest) -> Value {
    let mut data = Map::new();
    data.insert("fileRef".to_string(), Value::from(file_ref));
    if let Some(ref id) = request.website_id {
        data.insert("websiteId".to_string(), Value::from(id.trim()));
    }
    if let Some(ref name) = request.name {
        data.insert("name".to_string(), Value::from(name.as_str()));
    }
    Value::Object(data)
}

/// Accept both `{"website": {...}}` and a bare object
fn unwrap_field(mut value: Value, field: &str) -> Value {
    if value.get(field).is_some_and(Value::is_object) {
        return value[field].take();
    }
    value
}
