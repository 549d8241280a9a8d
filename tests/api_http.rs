// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - GET /api/market/history
// - GET /api/market/signals
// - GET /api/market/rl-performance
// - GET /api/mentor/tips

use serde_json::Value as Json;
use shuttle_axum::axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt as _; // for `oneshot`

use algomentor_dashboard::api::AppState;

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

/// Build the same Router the binary uses (AI disabled via config defaults).
fn test_router() -> Router {
    algomentor_dashboard::api::router(AppState::from_env())
}

async fn get_json(app: Router, uri: &str) -> Json {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build request");
    let resp = app.oneshot(req).await.expect("oneshot");
    assert!(
        resp.status().is_success(),
        "GET {uri} should be 2xx, got {}",
        resp.status()
    );
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    serde_json::from_slice(&bytes).expect("parse json")
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let app = test_router();

    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .expect("build GET /health");

    let resp = app.oneshot(req).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK, "health should be 200");

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    let body = String::from_utf8(bytes).expect("utf8");
    assert_eq!(body.trim(), "ok", "health body should be 'ok'");
}

#[tokio::test]
async fn api_market_history_has_closes_then_forecast_tail() {
    let v = get_json(test_router(), "/api/market/history").await;
    let arr = v.as_array().expect("history must be an array");
    assert_eq!(arr.len(), 70, "60 closes + 10 forecast points");

    let first = &arr[0];
    assert!(first.get("price").is_some(), "past points carry 'price'");
    assert!(first.get("forecast").is_none(), "no forecast on past points");

    let last = &arr[69];
    assert!(last.get("forecast").is_some(), "tail carries 'forecast'");
    assert!(last.get("price").is_none(), "no actual close in the future");

    for p in arr {
        assert!(p["date"].as_str().expect("date string").len() == 10);
    }
}

#[tokio::test]
async fn api_market_signals_match_the_dashboard_contract() {
    let v = get_json(test_router(), "/api/market/signals").await;
    let arr = v.as_array().expect("signals must be an array");
    assert_eq!(arr.len(), 3);

    for s in arr {
        let kind = s["type"].as_str().expect("signal type");
        assert!(kind == "buy" || kind == "sell", "unexpected type '{kind}'");
        assert!(s["price"].as_f64().expect("price") > 0.0);
        assert!(!s["reason"].as_str().expect("reason").is_empty());
    }
}

#[tokio::test]
async fn api_rl_performance_uses_camel_case_fields() {
    let v = get_json(test_router(), "/api/market/rl-performance").await;
    assert_eq!(v["profitOrLoss"], serde_json::json!(1245.67));
    assert_eq!(v["trades"], serde_json::json!(42));
    assert_eq!(v["winRate"], serde_json::json!(64.2));
}

#[tokio::test]
async fn api_mentor_tips_lists_all_four_in_order() {
    let v = get_json(test_router(), "/api/mentor/tips").await;
    let arr = v.as_array().expect("tips must be an array");
    assert_eq!(arr.len(), 4);

    let ids: Vec<u64> = arr.iter().map(|t| t["id"].as_u64().unwrap()).collect();
    assert_eq!(ids, vec![1, 2, 3, 4]);

    for t in arr {
        let agent = t["relatedAgent"].as_str().expect("relatedAgent");
        assert!(matches!(agent, "Report" | "News" | "Trading"));
    }
}
