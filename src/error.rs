//! Error types for the deploy agent

use std::time::Duration;
use thiserror::Error;

/// Backend error codes that mean the bearer token was rejected
const AUTH_ERROR_CODES: &[&str] = &[
    "UNAUTHENTICATED",
    "UNAUTHORIZED",
    "AUTH_EXPIRED",
    "TOKEN_EXPIRED",
    "INVALID_TOKEN",
];

/// Phrases that identify a rejected token when the backend sends a generic code
const AUTH_ERROR_PHRASES: &[&str] = &[
    "token expired",
    "expired token",
    "invalid token",
    "token is invalid",
    "unauthenticated",
];

/// Main error type for the deploy agent
#[derive(Error, Debug)]
pub enum DeployError {
    /// The operator denied or cancelled the browser login, or the callback was malformed
    #[error("Authorization failed: {0}")]
    Authorization(String),

    /// The callback `state` did not match the value sent in the authorization URL
    #[error("Authorization rejected: the login callback could not be verified")]
    StateMismatch,

    /// No callback arrived before the login window closed
    #[error("Login timed out after {timeout:?} waiting for the browser callback")]
    Timeout {
        /// Length of the login window
        timeout: Duration,
    },

    /// The local callback port could not be bound
    #[error("Could not listen for the login callback on port {port}: {source}")]
    ListenerUnavailable {
        /// Port that was requested
        port: u16,
        /// Underlying bind error
        #[source]
        source: std::io::Error,
    },

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The credential file exists but is not a valid credential record
    #[error("Credential file {path} is corrupt: {message}")]
    CorruptData {
        /// Path of the credential file
        path: String,
        /// Parse error
        message: String,
    },

    /// A required argument is missing or empty
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Deploy input that cannot be turned into a ZIP archive
    #[error("Unsupported deploy input: {0}")]
    UnsupportedInput(String),

    /// Archive exceeds the upload limit
    #[error("Archive is {size} bytes, which exceeds the {limit} byte upload limit")]
    FileTooLarge {
        /// Archive size in bytes
        size: u64,
        /// Upload limit in bytes
        limit: u64,
    },

    /// Error envelope returned by the backend
    #[error("{}", format_backend(.code, .message, .suggestion.as_deref()))]
    Backend {
        /// Machine-readable error code
        code: String,
        /// Human-readable message
        message: String,
        /// Operator-actionable hint
        suggestion: Option<String>,
    },

    /// The backend rejected the bearer token mid-call
    #[error("Authentication failed during call: {0}")]
    AuthFailureDuringCall(String),

    /// Re-login after an authentication failure did not succeed
    #[error("{source}\nSuggestion: run `sitedeploy login` to sign in manually, then retry")]
    ReauthenticationFailed {
        /// Error from the authorization flow
        #[source]
        source: Box<DeployError>,
    },

    /// Creating or reading the ZIP archive failed
    #[error("Archive error: {0}")]
    Archive(String),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for deploy agent operations
pub type Result<T> = std::result::Result<T, DeployError>;

fn format_backend(code: &str, message: &str, suggestion: Option<&str>) -> String {
    match suggestion {
        Some(hint) => format!("Backend error [{code}]: {message}\nSuggestion: {hint}"),
        None => format!("Backend error [{code}]: {message}"),
    }
}

impl DeployError {
    /// Create an authorization error
    pub fn authorization(msg: impl Into<String>) -> Self {
        Self::Authorization(msg.into())
    }

    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create an unsupported input error
    pub fn unsupported_input(msg: impl Into<String>) -> Self {
        Self::UnsupportedInput(msg.into())
    }

    /// Create a backend error from its envelope fields
    pub fn backend(
        code: impl Into<String>,
        message: impl Into<String>,
        suggestion: Option<String>,
    ) -> Self {
        Self::Backend {
            code: code.into(),
            message: message.into(),
            suggestion,
        }
    }

    /// Create an archive error
    pub fn archive(msg: impl Into<String>) -> Self {
        Self::Archive(msg.into())
    }

    /// Create an invalid configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a corrupt credential file error
    pub fn corrupt_data(path: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::CorruptData {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Whether this error means the backend rejected the credential.
    ///
    /// Structured signals win: a 401 response or one of the auth error codes.
    /// Backend errors with any other code are matched against a short list of
    /// token-specific phrases, never against bare words like "token".
    #[must_use]
    pub fn is_auth_failure(&self) -> bool {
        match self {
            Self::AuthFailureDuringCall(_) => true,
            Self::Backend { code, message, .. } => {
                if AUTH_ERROR_CODES
                    .iter()
                    .any(|known| code.eq_ignore_ascii_case(known))
                {
                    return true;
                }
                let message = message.to_lowercase();
                AUTH_ERROR_PHRASES
                    .iter()
                    .any(|phrase| message.contains(phrase))
            }
            Self::Http(err) => err.status() == Some(reqwest::StatusCode::UNAUTHORIZED),
            _ => false,
        }
    }
}
