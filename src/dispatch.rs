//! Authenticated call dispatch
//!
//! Every remote operation goes through [`CallDispatcher::dispatch`], which
//! supplies a valid access token and, when the backend rejects it, logs in
//! again once and retries. There is no backoff and no second retry.

use std::future::Future;

use crate::auth::{AuthorizationFlow, Authorizer, CredentialStore};
use crate::error::{DeployError, Result};

/// Supplies access tokens to remote operations and recovers from rejected ones
#[derive(Debug, Clone)]
pub struct CallDispatcher<A = AuthorizationFlow> {
    store: CredentialStore,
    authorizer: A,
}

impl<A: Authorizer> CallDispatcher<A> {
    /// Create a dispatcher reading credentials from `store`
    #[must_use]
    pub fn new(store: CredentialStore, authorizer: A) -> Self {
        Self { store, authorizer }
    }

    /// Get the credential store
    #[must_use]
    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Get the authorizer
    #[must_use]
    pub fn authorizer(&self) -> &A {
        &self.authorizer
    }

    /// Return a usable access token, logging in when none is cached.
    ///
    /// An unreadable or corrupt credential file is treated as absent.
    ///
    /// # Errors
    ///
    /// Only the login flow's errors.
    pub async fn ensure_authenticated(&self) -> Result<String> {
        match self.store.load() {
            Ok(Some(record)) if !record.is_expired() => {
                if record.needs_renewal_soon() {
                    tracing::warn!(
                        expires_at = ?record.expires_at_utc(),
                        "credentials expire within 3 days, renew soon with `sitedeploy login`"
                    );
                }
                return Ok(record.access_token);
            }
            Ok(Some(_)) => tracing::debug!("cached credentials expired"),
            Ok(None) => tracing::debug!("no cached credentials"),
            Err(e) => tracing::warn!("ignoring unreadable credentials: {e}"),
        }

        let record = self.authorizer.authorize().await?;
        Ok(record.access_token)
    }

    /// Run `operation` with a valid token, retrying once after a fresh login
    /// if the backend rejects the token.
    ///
    /// # Errors
    ///
    /// Non-auth failures and failures of the retry propagate unchanged. A
    /// login failure on the retry path is wrapped in `ReauthenticationFailed`.
    pub async fn dispatch<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let token = self.ensure_authenticated().await?;

        match operation(token).await {
            Err(e) if e.is_auth_failure() => {
                tracing::warn!("credentials rejected ({e}), signing in again");
                let record = self.authorizer.authorize().await.map_err(|source| {
                    DeployError::ReauthenticationFailed {
                        source: Box::new(source),
                    }
                })?;
                operation(record.access_token).await
            }
            result => result,
        }
    }
}
