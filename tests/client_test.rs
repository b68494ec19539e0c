use std::sync::Arc;

use fincheck::web_server::{router, AppState};
use fincheck::{AnswerSet, PlanError, PlanProvider, PlanProxy, ProxyClient, ProxyConfig, Script};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn answers() -> AnswerSet {
    [("name", "Asha"), ("age", "30")].into_iter().collect()
}

#[tokio::test]
async fn test_client_posts_answers_and_returns_plan() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/plan"))
        .and(body_json(json!({"answers": {"name": "Asha", "age": "30"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"plan": "# Plan\nInvest"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = ProxyClient::new(&format!("{}/", server.uri()));
    assert_eq!(client.request_plan(&answers()).await.unwrap(), "# Plan\nInvest");
}

#[tokio::test]
async fn test_client_relays_server_error_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/plan"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(json!({"error": "API key is not configured on the server."})),
        )
        .mount(&server)
        .await;

    let err = ProxyClient::new(&server.uri())
        .request_plan(&answers())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        PlanError::Remote("API key is not configured on the server.".to_string())
    );
}

#[tokio::test]
async fn test_client_falls_back_to_status_without_error_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .mount(&server)
        .await;

    let err = ProxyClient::new(&server.uri())
        .request_plan(&answers())
        .await
        .unwrap_err();
    assert_eq!(err, PlanError::Remote("API Error: 503".to_string()));
}

#[tokio::test]
async fn test_client_success_without_plan_names_the_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": "?"})))
        .mount(&server)
        .await;

    let err = ProxyClient::new(&server.uri())
        .request_plan(&answers())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        PlanError::Remote("Unexpected response format from the plan server.".to_string())
    );
    assert!(!err.to_string().contains("Gemini"));
}

#[tokio::test]
async fn test_client_blank_error_falls_back_to_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_json(json!({"error": "  "})))
        .mount(&server)
        .await;

    let err = ProxyClient::new(&server.uri())
        .request_plan(&answers())
        .await
        .unwrap_err();
    assert_eq!(err, PlanError::Remote("API Error: 502".to_string()));
}

#[tokio::test]
async fn test_client_unreachable_server() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let err = ProxyClient::new(&url).request_plan(&answers()).await.unwrap_err();
    assert!(matches!(err, PlanError::Transport(_)), "got {err:?}");
}

#[test_log::test(tokio::test)]
async fn test_client_against_running_server() {
    let gemini = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-test:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": "End to end plan"}]}}]
        })))
        .expect(1)
        .mount(&gemini)
        .await;

    let proxy = Arc::new(PlanProxy::new(ProxyConfig {
        api_key: Some("test-key".to_string()),
        base_url: gemini.uri(),
        model: "gemini-test".to_string(),
    }));
    let state = AppState::new(Script::financial_profile(), proxy).unwrap();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });

    let client = ProxyClient::new(&format!("http://{addr}"));
    assert_eq!(client.request_plan(&answers()).await.unwrap(), "End to end plan");
}
