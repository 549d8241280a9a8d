// tests/api_news.rs
//
// /api/news behavior with the AI client injected through AppState:
// a successful batch reconciles every headline back to its source, and a
// request-level failure degrades to the placeholder feed (same length,
// never an HTTP error).

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as Json;
use shuttle_axum::axum::{
    body::{self, Body},
    http::Request,
    Router,
};
use tower::ServiceExt as _;

use algomentor_dashboard::ai::{
    AiClient, AiError, AnalysisRecord, FragmentStream, Sentiment,
};
use algomentor_dashboard::api::AppState;
use algomentor_dashboard::market;
use algomentor_dashboard::news::PLACEHOLDER_SUMMARY;

const BODY_LIMIT: usize = 1024 * 1024;

/// Answers the batch with one record per mock headline, shuffled.
struct EchoAnalysis;

#[async_trait]
impl AiClient for EchoAnalysis {
    async fn generate_stream(&self, _prompt: &str) -> Result<FragmentStream, AiError> {
        Err(AiError::Disabled)
    }
    async fn analyze_batch(&self, _prompt: &str) -> Result<Vec<AnalysisRecord>, AiError> {
        let mut records: Vec<AnalysisRecord> = market::mock_raw_headlines()
            .into_iter()
            .map(|h| AnalysisRecord {
                original_headline: h.headline,
                summary: "One-sentence summary.".to_string(),
                sentiment: Sentiment::Positive,
            })
            .collect();
        records.reverse(); // response order is not the input order
        Ok(records)
    }
    fn provider_name(&self) -> &'static str {
        "echo"
    }
}

/// Fails every request, as a network outage would.
struct FailingClient;

#[async_trait]
impl AiClient for FailingClient {
    async fn generate_stream(&self, _prompt: &str) -> Result<FragmentStream, AiError> {
        Err(AiError::Stream("boom".into()))
    }
    async fn analyze_batch(&self, _prompt: &str) -> Result<Vec<AnalysisRecord>, AiError> {
        Err(AiError::Parse("bad json".into()))
    }
    fn provider_name(&self) -> &'static str {
        "failing"
    }
}

fn router_with(client: impl AiClient + 'static) -> Router {
    algomentor_dashboard::api::router(AppState::new(Arc::new(client)))
}

async fn get_news(app: Router) -> Vec<Json> {
    let req = Request::builder()
        .method("GET")
        .uri("/api/news")
        .body(Body::empty())
        .expect("build GET /api/news");
    let resp = app.oneshot(req).await.expect("oneshot /api/news");
    assert!(resp.status().is_success(), "news must never be an error");
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    let v: Json = serde_json::from_slice(&bytes).expect("parse news json");
    v.as_array().expect("news must be an array").clone()
}

#[tokio::test]
async fn news_reconciles_results_back_to_sources_in_input_order() {
    let feed = get_news(router_with(EchoAnalysis)).await;
    let raw = market::mock_raw_headlines();
    assert_eq!(feed.len(), raw.len());

    for (item, input) in feed.iter().zip(&raw) {
        assert_eq!(item["headline"].as_str().unwrap(), input.headline);
        assert_eq!(item["source"].as_str().unwrap(), input.source);
        assert_eq!(item["summary"].as_str().unwrap(), "One-sentence summary.");
        assert_eq!(item["sentiment"].as_str().unwrap(), "Positive");
    }
}

#[tokio::test]
async fn news_degrades_to_placeholder_feed_when_the_batch_call_fails() {
    let feed = get_news(router_with(FailingClient)).await;
    let raw = market::mock_raw_headlines();
    assert_eq!(feed.len(), raw.len());

    for (item, input) in feed.iter().zip(&raw) {
        assert_eq!(item["headline"].as_str().unwrap(), input.headline);
        assert_eq!(item["source"].as_str().unwrap(), input.source);
        assert_eq!(item["summary"].as_str().unwrap(), PLACEHOLDER_SUMMARY);
        assert_eq!(item["sentiment"].as_str().unwrap(), "Neutral");
    }
}
