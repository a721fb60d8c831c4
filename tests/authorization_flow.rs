//! Integration tests for the browser login: a real loopback listener driven
//! by HTTP requests standing in for the browser redirect.

use sitedeploy_mcp::auth::AuthorizationFlow;
use sitedeploy_mcp::{AgentConfig, DeployError};
use std::time::Duration;
use tempfile::TempDir;

fn config(dir: &TempDir) -> AgentConfig {
    AgentConfig::builder()
        .callback_port(0)
        .auto_open_browser(false)
        .credentials_path(dir.path().join("credentials.json"))
        .build()
}

fn callback_url(port: u16, query: &str) -> String {
    format!("http://127.0.0.1:{port}/callback?{query}")
}

#[tokio::test]
async fn test_successful_callback_persists_credentials() {
    let dir = TempDir::new().unwrap();
    let flow = AuthorizationFlow::new(config(&dir));
    let store = flow.store().clone();

    let attempt = flow.begin().await.unwrap();
    let url = callback_url(
        attempt.port(),
        &format!(
            "access_token=tok-1&refresh_token=ref-1&user_id=user-9&state={}",
            attempt.state()
        ),
    );
    let login = tokio::spawn(async move { flow.finish(attempt).await });

    let response = reqwest::get(&url).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let record = login.await.unwrap().unwrap();
    assert_eq!(record.access_token, "tok-1");
    assert_eq!(record.refresh_token, "ref-1");
    assert_eq!(record.user_id, "user-9");
    assert!(!record.is_expired());

    let saved = store.load().unwrap().unwrap();
    assert_eq!(saved, record);
}

#[tokio::test]
async fn test_state_mismatch_persists_nothing() {
    let dir = TempDir::new().unwrap();
    let flow = AuthorizationFlow::new(config(&dir));
    let store = flow.store().clone();

    let attempt = flow.begin().await.unwrap();
    let url = callback_url(attempt.port(), "access_token=forged&state=not-the-state");
    let login = tokio::spawn(async move { flow.finish(attempt).await });

    let response = reqwest::get(&url).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

    let result = login.await.unwrap();
    assert!(matches!(result, Err(DeployError::StateMismatch)));
    assert!(store.load().unwrap().is_none());
}

#[tokio::test]
async fn test_missing_parameters_fail_promptly() {
    let dir = TempDir::new().unwrap();
    let flow = AuthorizationFlow::new(config(&dir));

    let attempt = flow.begin().await.unwrap();
    let url = callback_url(attempt.port(), "user_id=user-9");
    let login = tokio::spawn(async move { flow.finish(attempt).await });

    let response = reqwest::get(&url).await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

    // Settles long before the 5 minute login window
    let result = tokio::time::timeout(Duration::from_secs(10), login)
        .await
        .expect("login did not settle")
        .unwrap();
    assert!(matches!(result, Err(DeployError::Authorization(_))));
}

#[tokio::test]
async fn test_denied_login_reports_reason() {
    let dir = TempDir::new().unwrap();
    let flow = AuthorizationFlow::new(config(&dir));
    let store = flow.store().clone();

    let attempt = flow.begin().await.unwrap();
    let url = callback_url(
        attempt.port(),
        &format!("error=access_denied&state={}", attempt.state()),
    );
    let login = tokio::spawn(async move { flow.finish(attempt).await });

    reqwest::get(&url).await.unwrap();

    match login.await.unwrap() {
        Err(DeployError::Authorization(reason)) => assert!(reason.contains("access_denied")),
        other => panic!("expected authorization error, got {other:?}"),
    }
    assert!(store.load().unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_timeout_releases_port() {
    let dir = TempDir::new().unwrap();
    let flow = AuthorizationFlow::new(config(&dir));

    let attempt = flow.begin().await.unwrap();
    let port = attempt.port();
    let started = tokio::time::Instant::now();

    let result = flow.finish(attempt).await;

    assert!(started.elapsed() >= Duration::from_millis(300_000));
    match result {
        Err(DeployError::Timeout { timeout }) => {
            assert_eq!(timeout, Duration::from_secs(300));
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    // The port is free again right away
    std::net::TcpListener::bind(("127.0.0.1", port)).unwrap();
}

#[tokio::test]
async fn test_authorization_url_targets_bound_port() {
    let dir = TempDir::new().unwrap();
    let flow = AuthorizationFlow::new(config(&dir));

    let attempt = flow.begin().await.unwrap();
    let query: Vec<(String, String)> = attempt
        .url()
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let redirect = format!("http://localhost:{}/callback", attempt.port());
    assert!(query.contains(&("redirect_uri".to_string(), redirect)));
    assert!(query.contains(&("state".to_string(), attempt.state().to_string())));
}
