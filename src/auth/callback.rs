//! Local HTTP listener that receives the browser redirect

use axum::Router;
use axum::extract::{RawQuery, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{DeployError, Result};

/// Upper bound on waiting for in-flight responses after the race settles
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

const SUCCESS_PAGE: &str = "<!doctype html><html><head><title>Login complete</title></head>\
<body><h1>Login complete</h1><p>You can close this window and return to your terminal.</p></body></html>";

const FAILURE_PAGE: &str = "<!doctype html><html><head><title>Login failed</title></head>\
<body><h1>Login failed</h1><p>Return to your terminal for details and run the login command again.</p></body></html>";

const MISSING_PARAMS_PAGE: &str = "<!doctype html><html><head><title>Bad request</title></head>\
<body><h1>Bad request</h1><p>The login callback is missing required parameters.</p></body></html>";

/// Query parameters the authorization server may send back
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CallbackParams {
    /// Issued access token
    pub access_token: Option<String>,
    /// Issued refresh token
    pub refresh_token: Option<String>,
    /// Subject identifier
    pub user_id: Option<String>,
    /// Anti-forgery token echoed back
    pub state: Option<String>,
    /// Failure reason
    pub error: Option<String>,
}

impl CallbackParams {
    /// Parse a raw query string; empty values count as absent
    #[must_use]
    pub fn from_query(query: &str) -> Self {
        let mut params = Self::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            if value.is_empty() {
                continue;
            }
            let slot = match &*key {
                "access_token" => &mut params.access_token,
                "refresh_token" => &mut params.refresh_token,
                "user_id" => &mut params.user_id,
                "state" => &mut params.state,
                "error" => &mut params.error,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }
        params
    }
}

/// What a single callback request amounts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Tokens arrived with the expected state
    Granted {
        /// Issued access token
        access_token: String,
        /// Issued refresh token, if distinct
        refresh_token: Option<String>,
        /// Subject identifier
        user_id: Option<String>,
    },
    /// The authorization server reported an error
    Denied(String),
    /// Tokens arrived with a foreign state
    StateMismatch,
    /// Neither an error nor tokens with state
    MissingParameters,
}

impl CallbackOutcome {
    /// Classify callback parameters against the state this attempt generated
    #[must_use]
    pub fn evaluate(params: CallbackParams, expected_state: &str) -> Self {
        if let Some(error) = params.error {
            return Self::Denied(error);
        }
        match (params.access_token, params.state) {
            (Some(access_token), Some(state)) => {
                if state == expected_state {
                    Self::Granted {
                        access_token,
                        refresh_token: params.refresh_token,
                        user_id: params.user_id,
                    }
                } else {
                    Self::StateMismatch
                }
            }
            _ => Self::MissingParameters,
        }
    }

    fn response(&self) -> Response {
        let (status, page) = match self {
            Self::Granted { .. } => (StatusCode::OK, SUCCESS_PAGE),
            Self::Denied(_) | Self::StateMismatch => (StatusCode::BAD_REQUEST, FAILURE_PAGE),
            Self::MissingParameters => (StatusCode::BAD_REQUEST, MISSING_PARAMS_PAGE),
        };
        (status, [(header::CONNECTION, "close")], Html(page)).into_response()
    }
}

#[derive(Clone)]
struct CallbackState {
    expected_state: Arc<str>,
    outcomes: mpsc::Sender<CallbackOutcome>,
}

async fn handle_callback(
    State(state): State<CallbackState>,
    RawQuery(query): RawQuery,
) -> Response {
    let params = CallbackParams::from_query(query.as_deref().unwrap_or_default());
    let outcome = CallbackOutcome::evaluate(params, &state.expected_state);
    let response = outcome.response();

    // Only the first callback settles the attempt
    if state.outcomes.try_send(outcome).is_err() {
        tracing::debug!("ignoring callback after the login attempt settled");
    }
    response
}

/// Bind the callback listener on the loopback interface
///
/// # Errors
///
/// Returns `ListenerUnavailable` if the port is taken.
pub async fn bind(port: u16) -> Result<TcpListener> {
    TcpListener::bind(("127.0.0.1", port))
        .await
        .map_err(|source| DeployError::ListenerUnavailable { port, source })
}

/// Serve `/callback` until the first callback arrives or `deadline` passes.
///
/// The listener is closed before this returns, whichever side wins.
///
/// # Errors
///
/// Returns `Timeout` when the deadline passes first.
pub async fn wait_for_callback(
    listener: TcpListener,
    expected_state: &str,
    deadline: Instant,
    login_timeout: Duration,
) -> Result<CallbackOutcome> {
    let (tx, mut rx) = mpsc::channel(1);
    let app = Router::new()
        .route("/callback", get(handle_callback))
        .with_state(CallbackState {
            expected_state: Arc::from(expected_state),
            outcomes: tx,
        });

    let shutdown = CancellationToken::new();
    let server =
        axum::serve(listener, app).with_graceful_shutdown(shutdown.clone().cancelled_owned());
    let mut server_task = tokio::spawn(async move { server.await });

    let result = tokio::select! {
        received = rx.recv() => received.ok_or_else(|| {
            DeployError::authorization("callback listener stopped before a callback arrived")
        }),
        () = tokio::time::sleep_until(deadline) => Err(DeployError::Timeout {
            timeout: login_timeout,
        }),
    };

    shutdown.cancel();
    match tokio::time::timeout(SHUTDOWN_GRACE, &mut server_task).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => tracing::warn!("callback listener exited with error: {e}"),
        Ok(Err(e)) => tracing::warn!("callback listener task failed: {e}"),
        Err(_) => {
            tracing::debug!("callback listener did not drain in time, aborting");
            server_task.abort();
            let _ = server_task.await;
        }
    }

    result
}
