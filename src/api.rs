use std::convert::Infallible;

use futures::{Stream, StreamExt};
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use shuttle_axum::axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tracing::warn;

use crate::ai::{AiError, DynAiClient, FragmentStream};
use crate::market::{self, PricePoint, RlPerformance, TradeSignal};
use crate::mentor::{self, MentorTip};
use crate::news::{self, AnalyzedHeadline};
use crate::report::{report_prompt, ReportSession, SessionStep, REPORT_FAILURE_MESSAGE};

/// Shared app state: the AI client is the only resource handlers share.
/// Everything else is generated per request.
#[derive(Clone)]
pub struct AppState {
    pub ai: DynAiClient,
}

impl AppState {
    pub fn new(ai: DynAiClient) -> Self {
        Self { ai }
    }

    /// Build state the way the binary does: `config/ai.json` when present,
    /// AI disabled otherwise. Used by integration tests.
    pub fn from_env() -> Self {
        let cfg = crate::config::ai::AiConfig::load_from_file("config/ai.json")
            .unwrap_or_default();
        Self::new(crate::ai::build_client_from_config(&cfg))
    }
}

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("report_sessions_total", "Report generation sessions started.");
        describe_counter!("report_fragments_total", "Fragments accumulated across sessions.");
        describe_counter!(
            "report_failures_total",
            "Generation sessions ended by a stream failure."
        );
        describe_counter!("news_batches_total", "Batched headline analysis requests.");
        describe_counter!(
            "news_fallback_total",
            "Batches served entirely from the placeholder fallback."
        );
        describe_counter!(
            "news_match_miss_total",
            "Inputs with no matching analysis result."
        );
    });
}

pub fn router(state: AppState) -> Router {
    ensure_metrics_described();

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/market/history", get(market_history))
        .route("/api/market/signals", get(market_signals))
        .route("/api/market/rl-performance", get(rl_performance))
        .route("/api/mentor/tips", get(mentor_tips))
        .route("/api/news", get(news_feed))
        .route("/api/report", get(generate_report))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn market_history() -> Json<Vec<PricePoint>> {
    Json(market::mock_price_history())
}

async fn market_signals() -> Json<Vec<TradeSignal>> {
    Json(market::mock_trade_signals())
}

async fn rl_performance() -> Json<RlPerformance> {
    Json(market::mock_rl_performance())
}

async fn mentor_tips() -> Json<Vec<MentorTip>> {
    Json(mentor::mock_mentor_tips())
}

/// Fetch the (mocked) raw feed and run it through the batch analysis.
/// Failure never reaches the client as an error; it becomes the
/// placeholder feed.
async fn news_feed(State(state): State<AppState>) -> Json<Vec<AnalyzedHeadline>> {
    let raw = market::mock_raw_headlines();
    Json(news::fetch_and_analyze(state.ai.as_ref(), &raw).await)
}

#[derive(serde::Deserialize)]
struct ReportQuery {
    #[serde(default = "default_symbol")]
    symbol: String,
}

fn default_symbol() -> String {
    "ORNG".to_string()
}

/// Stream the report as SSE. Each `report` event carries the full text
/// accumulated so far; the stream ends with `done`, or with `error` after
/// which no further fragments arrive (partial text stays on the client).
async fn generate_report(
    State(state): State<AppState>,
    Query(q): Query<ReportQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    counter!("report_sessions_total").increment(1);
    let prompt = report_prompt(&q.symbol);
    let start = state.ai.generate_stream(&prompt).await;
    if let Err(e) = &start {
        warn!(error = %e, symbol = %q.symbol, "report generation could not start");
    }
    Sse::new(report_events(start)).keep_alive(KeepAlive::default())
}

enum ReportEvents {
    Run(FragmentStream, ReportSession),
    Fail,
    Done,
}

fn report_events(
    start: Result<FragmentStream, AiError>,
) -> impl Stream<Item = Result<Event, Infallible>> + Send {
    let init = match start {
        Ok(fragments) => ReportEvents::Run(fragments, ReportSession::new()),
        Err(_) => ReportEvents::Fail,
    };
    futures::stream::unfold(init, |phase| async move {
        match phase {
            ReportEvents::Run(mut fragments, mut session) => {
                let step = session.advance(fragments.next().await);
                match step {
                    SessionStep::Progress => {
                        counter!("report_fragments_total").increment(1);
                        let ev = Event::default().event("report").data(session.text());
                        Some((Ok(ev), ReportEvents::Run(fragments, session)))
                    }
                    SessionStep::Completed => {
                        let ev = Event::default().event("done").data("");
                        Some((Ok(ev), ReportEvents::Done))
                    }
                    SessionStep::Failed => {
                        counter!("report_failures_total").increment(1);
                        let ev = Event::default().event("error").data(REPORT_FAILURE_MESSAGE);
                        Some((Ok(ev), ReportEvents::Done))
                    }
                }
            }
            ReportEvents::Fail => {
                counter!("report_failures_total").increment(1);
                let ev = Event::default().event("error").data(REPORT_FAILURE_MESSAGE);
                Some((Ok(ev), ReportEvents::Done))
            }
            ReportEvents::Done => None,
        }
    })
}
