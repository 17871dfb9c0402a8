// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.

use std::sync::Arc;

use serde_json::json;
use serde_json::Value as Json;
use shuttle_axum::axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt as _; // for `oneshot`

use news_batch_router::api::{create_router, AppState};
use news_batch_router::{AliasTable, NewsRouter, RouterConfig};

const BODY_LIMIT: usize = 1024 * 1024;

fn test_router_with(cfg: RouterConfig) -> Router {
    let table = AliasTable::from_entries(vec![("ACME", vec!["Acme Corp"])]);
    create_router(AppState::new(NewsRouter::new(cfg, Arc::new(table))))
}

/// Same Router the binary builds, pointed at the test fixture.
fn test_router() -> Router {
    test_router_with(RouterConfig {
        fixture_path: "tests/fixtures/decoy_news.json".into(),
        ..RouterConfig::default()
    })
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
    let resp = app.oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    (status, bytes)
}

fn post_json(uri: &str, payload: &Json) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build POST")
}

#[tokio::test]
async fn health_returns_ok() {
    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .expect("build GET /health");
    let (status, bytes) = send(test_router(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(String::from_utf8(bytes).unwrap().trim(), "OK");
}

#[tokio::test]
async fn commands_lists_default_set() {
    let req = Request::builder()
        .uri("/commands")
        .body(Body::empty())
        .unwrap();
    let (status, bytes) = send(test_router(), req).await;
    assert_eq!(status, StatusCode::OK);
    let v: Json = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(v[0], "analyze");
    assert!(v.as_array().unwrap().iter().any(|c| c == "summary"));
}

#[tokio::test]
async fn context_over_fixture_keeps_item_b() {
    let payload = json!({ "ticker": "ACME", "idea": "long into earnings" });
    let (status, bytes) = send(test_router(), post_json("/context", &payload)).await;
    assert_eq!(status, StatusCode::OK);

    let v: Json = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(v["context"]["request"]["command"], "analyze");
    let news = v["context"]["news"].as_array().unwrap();
    assert_eq!(news.len(), 1);
    assert_eq!(news[0]["source"], "B");
    assert!(v["prompt"]["user"]
        .as_str()
        .unwrap()
        .contains("Here are some recent news items:"));
}

#[tokio::test]
async fn context_with_inline_news_uses_aliases() {
    let payload = json!({
        "ticker": "acme",
        "idea": "short",
        "command": "Summary",
        "news": [
            {"source":"X","timestamp":"2025-10-01T09:00:00Z","headline":"Acme Corp recalls units","body":""},
            {"source":"Y","timestamp":"2025-10-01T08:00:00Z","headline":"Weather","body":"Rain"}
        ]
    });
    let (status, bytes) = send(test_router(), post_json("/context", &payload)).await;
    assert_eq!(status, StatusCode::OK);
    let v: Json = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(v["context"]["request"]["command"], "summary");
    assert_eq!(v["context"]["news"][0]["source"], "X");
    assert_eq!(v["context"]["news"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn context_rejects_bad_requests_with_400() {
    for payload in [
        json!({ "ticker": "", "idea": "x" }),
        json!({ "ticker": "ACME" }),
        json!({ "ticker": "ACME", "idea": "x", "command": "trade" }),
    ] {
        let (status, bytes) = send(test_router(), post_json("/context", &payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "payload {payload}");
        let v: Json = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["error"], "invalid_request");
    }
}

#[tokio::test]
async fn bad_news_gives_502() {
    let payload = json!({
        "ticker": "ACME",
        "idea": "x",
        "news": [{"source":"X","timestamp":"not a time","headline":"h","body":"b"}]
    });
    let (status, bytes) = send(test_router(), post_json("/context", &payload)).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let v: Json = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(v["error"], "ingest_failed");

    let app = test_router_with(RouterConfig {
        fixture_path: "tests/fixtures/__missing__.json".into(),
        ..RouterConfig::default()
    });
    let (status, _) = send(app, post_json("/context", &json!({"ticker":"A","idea":"b"}))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn command_line_endpoint() {
    let req = Request::builder()
        .method("POST")
        .uri("/command")
        .header("content-type", "text/plain")
        .body(Body::from("ticker=ACME idea=fade the gap command=risk-highlight"))
        .unwrap();
    let (status, bytes) = send(test_router(), req).await;
    assert_eq!(status, StatusCode::OK);
    let v: Json = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(v["context"]["request"]["idea"], "fade the gap");
    assert_eq!(v["context"]["news"][0]["source"], "B");

    let req = Request::builder()
        .method("POST")
        .uri("/command")
        .body(Body::from("hello there"))
        .unwrap();
    let (status, _) = send(test_router(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
