//! Browser login flow with a local redirect listener

use async_trait::async_trait;
use rand::Rng;
use rand::distr::Alphanumeric;
use tokio::net::TcpListener;
use tokio::time::Instant;
use url::Url;

use super::Authorizer;
use super::callback::{self, CallbackOutcome};
use super::token::{CredentialRecord, CredentialStore};
use crate::config::{self, AgentConfig};
use crate::error::{DeployError, Result};

/// Length of the anti-forgery state token
const STATE_LENGTH: usize = 32;

/// One in-flight login: the state token, its deadline and the bound listener.
///
/// Dropping the attempt closes the listener.
#[derive(Debug)]
pub struct AuthorizationAttempt {
    state: String,
    url: Url,
    deadline: Instant,
    listener: TcpListener,
    port: u16,
}

impl AuthorizationAttempt {
    /// Anti-forgery token sent in the authorization URL
    #[must_use]
    pub fn state(&self) -> &str {
        &self.state
    }

    /// URL the operator opens in a browser
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Port the callback listener is bound to
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }
}

/// Interactive browser login.
///
/// The redirect carries the access token directly in its query string
/// instead of an authorization code to exchange. Tokens therefore pass
/// through the browser's address bar and history; the anti-forgery state
/// check is the only protection against an injected callback.
#[derive(Debug, Clone)]
pub struct AuthorizationFlow {
    config: AgentConfig,
    store: CredentialStore,
}

impl AuthorizationFlow {
    /// Create a login flow persisting to the configured credential path
    #[must_use]
    pub fn new(config: AgentConfig) -> Self {
        let store = config.credential_store();
        Self { config, store }
    }

    /// Get the configuration
    #[must_use]
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Get the credential store
    #[must_use]
    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Build the authorization URL for `state` and the callback on `port`
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the configured authorization URL is malformed.
    pub fn authorization_url(&self, state: &str, port: u16) -> Result<Url> {
        let mut url = Url::parse(&self.config.auth_url).map_err(|e| {
            DeployError::invalid_config(format!("auth_url `{}`: {e}", self.config.auth_url))
        })?;
        let redirect_uri = config::redirect_uri(port);
        let scope = self.config.scopes().join(" ");

        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("state", state)
            .append_pair("scope", &scope);

        Ok(url)
    }

    /// Generate the state token, bind the listener and start the clock
    ///
    /// # Errors
    ///
    /// Returns `ListenerUnavailable` if the callback port is taken.
    pub async fn begin(&self) -> Result<AuthorizationAttempt> {
        let state = generate_state();
        let listener = callback::bind(self.config.callback_port).await?;
        let port = listener.local_addr()?.port();
        let url = self.authorization_url(&state, port)?;

        tracing::debug!(port, "listening for login callback");
        Ok(AuthorizationAttempt {
            state,
            url,
            deadline: Instant::now() + self.config.login_timeout,
            listener,
            port,
        })
    }

    /// Show the URL on stderr and try to open it in the default browser
    pub fn announce(&self, attempt: &AuthorizationAttempt) {
        eprintln!();
        eprintln!("Sign in to deploy websites");
        eprintln!("Open this URL in your browser to authorize the CLI:");
        eprintln!();
        eprintln!("  {}", attempt.url());
        eprintln!();

        if self.config.auto_open_browser {
            match open::that_detached(attempt.url().as_str()) {
                Ok(()) => eprintln!("(Opening browser...)"),
                Err(e) => {
                    tracing::debug!("could not open browser: {e}");
                    eprintln!("(Could not open browser automatically - please open the URL manually)");
                }
            }
        }

        let minutes = self.config.login_timeout.as_secs() / 60;
        eprintln!("Waiting up to {minutes} minutes for the login to complete...");
    }

    /// Wait for the callback and persist the resulting credential.
    ///
    /// Nothing is written unless the callback carried the expected state.
    ///
    /// # Errors
    ///
    /// Returns `Authorization`, `StateMismatch` or `Timeout` per the callback,
    /// or a storage error if the record cannot be saved.
    pub async fn finish(&self, attempt: AuthorizationAttempt) -> Result<CredentialRecord> {
        let AuthorizationAttempt {
            state,
            deadline,
            listener,
            ..
        } = attempt;

        let outcome =
            callback::wait_for_callback(listener, &state, deadline, self.config.login_timeout)
                .await?;

        match outcome {
            CallbackOutcome::Granted {
                access_token,
                refresh_token,
                user_id,
            } => {
                let record = CredentialRecord::issue(
                    access_token,
                    refresh_token,
                    user_id,
                    self.config.scopes(),
                    self.config.client_id.clone(),
                );
                self.store.save(&record)?;
                tracing::info!("login succeeded");
                Ok(record)
            }
            CallbackOutcome::Denied(reason) => Err(DeployError::authorization(reason)),
            CallbackOutcome::StateMismatch => {
                tracing::warn!("login callback rejected: state mismatch");
                Err(DeployError::StateMismatch)
            }
            CallbackOutcome::MissingParameters => Err(DeployError::authorization(
                "callback is missing required parameters",
            )),
        }
    }

    /// Run the whole login: bind, announce, wait, persist
    ///
    /// # Errors
    ///
    /// Returns any error from [`begin`](Self::begin) or [`finish`](Self::finish).
    pub async fn authorize(&self) -> Result<CredentialRecord> {
        let attempt = self.begin().await?;
        self.announce(&attempt);
        self.finish(attempt).await
    }
}

#[async_trait]
impl Authorizer for AuthorizationFlow {
    async fn authorize(&self) -> Result<CredentialRecord> {
        AuthorizationFlow::authorize(self).await
    }
}

/// Random alphanumeric anti-forgery token
fn generate_state() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(STATE_LENGTH)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_state_generation() {
        let a = generate_state();
        let b = generate_state();
        assert_eq!(a.len(), STATE_LENGTH);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_authorization_url() {
        let flow = AuthorizationFlow::new(AgentConfig::default());
        let url = flow.authorization_url("state123", 39897).unwrap();
        let query: HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert!(url.as_str().starts_with(crate::config::DEFAULT_AUTH_URL));
        assert_eq!(query["client_id"], crate::config::CLIENT_ID);
        assert_eq!(query["redirect_uri"], "http://localhost:39897/callback");
        assert_eq!(query["response_type"], "code");
        assert_eq!(query["state"], "state123");
        assert_eq!(
            query["scope"],
            "website:deploy website:list website:delete website:update"
        );
    }

    #[test]
    fn test_authorization_url_rejects_bad_base() {
        let config = AgentConfig::builder().auth_url("::nope").build();
        let flow = AuthorizationFlow::new(config);
        assert!(matches!(
            flow.authorization_url("s", 1),
            Err(DeployError::InvalidConfig(_))
        ));
    }
}
