//! AlgoMentor Dashboard — Binary Entrypoint
//! Boots the Axum HTTP server, wiring routes, shared state, and middleware.

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use algomentor_dashboard::ai_bootstrap::AiRuntime;
use algomentor_dashboard::api::{self, AppState};
use algomentor_dashboard::metrics::Metrics;

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - DASHBOARD_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("DASHBOARD_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dashboard=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    // This enables GEMINI_API_KEY / AI_TEST_MODE from .env.
    let _ = dotenvy::dotenv();

    // Initialize dev tracing early (no-op in production).
    enable_dev_tracing();

    // --- AI runtime: config + client, built once, passed down explicitly ---
    let runtime = match AiRuntime::from_path("config/ai.json") {
        Ok(rt) => rt,
        Err(e) => {
            tracing::warn!(error = ?e, "AI config unavailable; running with AI disabled");
            AiRuntime::disabled()
        }
    };
    runtime.quick_probe().await;

    let metrics = Metrics::init(u64::from(runtime.cfg.daily_limit));

    // Build AppState and pass it into the router
    let state = AppState::new(runtime.client.clone());
    let router = api::router(state).merge(metrics.router());

    Ok(router.into())
}
