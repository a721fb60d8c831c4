//! Browser login and credential storage
//!
//! # Overview
//!
//! The login is a single-hop redirect flow:
//!
//! 1. Generate a random anti-forgery `state` token
//! 2. Bind a listener on `localhost:39897`
//! 3. Open the browser at the authorization URL
//! 4. The browser is redirected to `/callback` carrying the access token
//! 5. Verify `state`, build a [`CredentialRecord`], save it
//!
//! The listener races a 5 minute timer; whichever finishes first wins and the
//! port is released on every path.
//!
//! # Example
//!
//! ```no_run
//! use sitedeploy_mcp::auth::AuthorizationFlow;
//! use sitedeploy_mcp::AgentConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let flow = AuthorizationFlow::new(AgentConfig::from_env()?);
//!     let record = flow.authorize().await?;
//!     eprintln!("Signed in, token expires at {:?}", record.expires_at_utc());
//!     Ok(())
//! }
//! ```
//!
//! # Token Storage
//!
//! Credentials live in the platform config directory by default
//! (e.g. `~/.config/sitedeploy/credentials.json` on Linux), written with
//! user-only permissions (600). See [`CredentialStore`].

pub mod callback;
mod oauth;
mod token;

use async_trait::async_trait;

use crate::error::Result;

pub use callback::{CallbackOutcome, CallbackParams};
pub use oauth::{AuthorizationAttempt, AuthorizationFlow};
pub use token::{
    CREDENTIAL_LIFETIME, CredentialRecord, CredentialStore, EXPIRY_SAFETY_MARGIN,
    RENEWAL_WARNING_WINDOW, now_millis,
};

/// Something that can produce a fresh credential, usually by asking the operator to log in
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Obtain and persist a new credential record
    ///
    /// # Errors
    /// Returns the login flow's failure (denied, state mismatch, timeout)
    async fn authorize(&self) -> Result<CredentialRecord>;
}
