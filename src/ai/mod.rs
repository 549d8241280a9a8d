//! AI client layer: provider abstraction + analysis file cache + daily limit.
//!
//! Two operations back the dashboard: a streaming report generation call and
//! a batched headline analysis call. Both degrade instead of crashing; the
//! caller decides what a failure looks like (placeholder feed, static error
//! message on the stream).

pub mod gemini;

use std::collections::VecDeque;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::config::ai::AiConfig;
use crate::ai::gemini::GeminiProvider;

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

/// One incremental piece of generated text, or the failure that ended the
/// sequence. The producer is finite and non-restartable.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, AiError>> + Send>>;

/// Sentiment label constrained to the three values the dashboard renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Sentiment {
    Positive,
    Negative,
    #[default]
    Neutral,
}

/// One record of the batched analysis response, keyed by the original
/// headline text. The response array is unordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub original_headline: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub sentiment: Sentiment,
}

#[derive(Debug, thiserror::Error)]
pub enum AiError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    Parse(String),
    #[error("stream interrupted: {0}")]
    Stream(String),
    #[error("AI is disabled")]
    Disabled,
    #[error("daily request limit reached")]
    LimitReached,
}

/// Trait object used elsewhere in the app (handlers/tests).
#[async_trait]
pub trait AiClient: Send + Sync {
    /// Start a generation session; fragments arrive until the producer
    /// completes or fails.
    async fn generate_stream(&self, prompt: &str) -> Result<FragmentStream, AiError>;

    /// One batched analysis request embedding all headlines.
    async fn analyze_batch(&self, prompt: &str) -> Result<Vec<AnalysisRecord>, AiError>;

    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

/// Convenient alias used by callers.
pub type DynAiClient = Arc<dyn AiClient>;

/// Factory: build a client according to config and environment variables.
///
/// * If `AI_TEST_MODE=mock`, returns a deterministic mock client.
/// * Else if `config.enabled==false`, returns a disabled client.
/// * Else builds the real provider (Gemini) wrapped with caching + daily limit.
pub fn build_client_from_config(config: &AiConfig) -> DynAiClient {
    if std::env::var("AI_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        let mock = MockProvider::default();
        let client = CachingClient::new(mock, default_cache_dir(), config.daily_limit);
        return Arc::new(client);
    }

    if !config.enabled {
        return Arc::new(DisabledClient);
    }

    match config.provider.as_str() {
        "gemini" => {
            let provider = GeminiProvider::new(config);
            let client = CachingClient::new(provider, default_cache_dir(), config.daily_limit);
            Arc::new(client)
        }
        _ => Arc::new(DisabledClient),
    }
}

// ------------------------------------------------------------
// Provider abstraction + stub providers
// ------------------------------------------------------------

/// Low-level provider: does a *real* remote call. Separated so the same
/// caching wrapper serves production and tests.
#[async_trait]
pub trait Provider: Send + Sync + 'static {
    async fn stream_generate(&self, prompt: &str) -> Result<FragmentStream, AiError>;
    async fn fetch_analysis(&self, prompt: &str) -> Result<Vec<AnalysisRecord>, AiError>;
    fn name(&self) -> &'static str;
}

/// Fails both operations; used when AI is disabled or misconfigured.
pub struct DisabledClient;

#[async_trait]
impl AiClient for DisabledClient {
    async fn generate_stream(&self, _prompt: &str) -> Result<FragmentStream, AiError> {
        Err(AiError::Disabled)
    }
    async fn analyze_batch(&self, _prompt: &str) -> Result<Vec<AnalysisRecord>, AiError> {
        Err(AiError::Disabled)
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Deterministic provider for tests/local runs: replays fixed fragments and
/// a fixed analysis array.
#[derive(Clone)]
pub struct MockProvider {
    pub fragments: Vec<String>,
    pub records: Vec<AnalysisRecord>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            fragments: vec!["### Mock Report\n".to_string(), "Generated locally.".to_string()],
            records: Vec::new(),
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn stream_generate(&self, _prompt: &str) -> Result<FragmentStream, AiError> {
        let items: VecDeque<Result<String, AiError>> =
            self.fragments.iter().cloned().map(Ok).collect();
        Ok(Box::pin(futures::stream::iter(items)))
    }
    async fn fetch_analysis(&self, _prompt: &str) -> Result<Vec<AnalysisRecord>, AiError> {
        Ok(self.records.clone())
    }
    fn name(&self) -> &'static str {
        "mock"
    }
}

// ------------------------------------------------------------
// Caching client wrapper (analysis file cache + daily limit)
// ------------------------------------------------------------

/// Counter state is guarded by a `Mutex` to keep it simple and safe.
/// Only analysis responses are cached; a generation stream is consumed once
/// and cannot be replayed, so streaming only counts against the limit.
pub struct CachingClient<P: Provider> {
    inner: P,
    cache_dir: PathBuf,
    daily_limit_max: u32,
    counter: Arc<Mutex<DailyCounter>>,
}

impl<P: Provider> CachingClient<P> {
    pub fn new(inner: P, cache_dir: PathBuf, daily_limit_max: u32) -> Self {
        let _ = fs::create_dir_all(&cache_dir); // best-effort
        let counter = Arc::new(Mutex::new(
            load_daily_counter(&cache_dir).unwrap_or_default(),
        ));
        Self {
            inner,
            cache_dir,
            daily_limit_max,
            counter,
        }
    }

    /// Real API calls increment the counter; cache hits do not.
    fn check_limit(&self) -> Result<(), AiError> {
        let mut g = self.counter.lock().expect("poisoned counter");
        if g.is_expired() {
            g.reset_to_today();
            let _ = save_daily_counter(&self.cache_dir, &g);
        }
        if g.count >= self.daily_limit_max {
            return Err(AiError::LimitReached);
        }
        Ok(())
    }

    fn record_call(&self) {
        let mut g = self.counter.lock().expect("poisoned counter");
        g.count = g.count.saturating_add(1);
        let _ = save_daily_counter(&self.cache_dir, &g);
    }
}

#[async_trait]
impl<P: Provider> AiClient for CachingClient<P> {
    async fn generate_stream(&self, prompt: &str) -> Result<FragmentStream, AiError> {
        self.check_limit()?;
        let stream = self.inner.stream_generate(prompt).await?;
        self.record_call();
        Ok(stream)
    }

    async fn analyze_batch(&self, prompt: &str) -> Result<Vec<AnalysisRecord>, AiError> {
        // Cache first: hits stay available even after the daily cap.
        let key = cache_key(prompt);
        if let Some(hit) = read_cache_file(&self.cache_dir, &key) {
            return Ok(hit);
        }

        self.check_limit()?;
        let fresh = self.inner.fetch_analysis(prompt).await?;
        let _ = write_cache_file(&self.cache_dir, &key, &fresh);
        self.record_call();
        Ok(fresh)
    }

    fn provider_name(&self) -> &'static str {
        self.inner.name()
    }
}

// ------------------------------------------------------------
// File cache helpers
// ------------------------------------------------------------

fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache/ai")
}

fn cache_key(input: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(32);
    for b in digest.iter().take(16) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{b:02x}");
    }
    out
}

fn cache_path(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{key}.json"))
}

fn read_cache_file(dir: &Path, key: &str) -> Option<Vec<AnalysisRecord>> {
    let buf = fs::read_to_string(cache_path(dir, key)).ok()?;
    serde_json::from_str(&buf).ok()
}

fn write_cache_file(dir: &Path, key: &str, value: &[AnalysisRecord]) -> io::Result<()> {
    let path = cache_path(dir, key);
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string(value).unwrap_or_else(|_| "[]".to_string());
    let mut f = fs::File::create(&tmp)?;
    f.write_all(json.as_bytes())?;
    fs::rename(tmp, path)?;
    Ok(())
}

// ------------------------------------------------------------
// Daily counter helpers
// ------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DailyCounter {
    date: String,
    count: u32,
}

impl Default for DailyCounter {
    fn default() -> Self {
        Self {
            date: today(),
            count: 0,
        }
    }
}

impl DailyCounter {
    fn is_expired(&self) -> bool {
        self.date != today()
    }
    fn reset_to_today(&mut self) {
        self.date = today();
        self.count = 0;
    }
}

fn today() -> String {
    chrono::Utc::now().date_naive().to_string()
}

fn counter_path(dir: &Path) -> PathBuf {
    dir.join("daily_count.json")
}

fn load_daily_counter(dir: &Path) -> io::Result<DailyCounter> {
    let s = fs::read_to_string(counter_path(dir))?;
    serde_json::from_str(&s).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn save_daily_counter(dir: &Path, dc: &DailyCounter) -> io::Result<()> {
    let p = counter_path(dir);
    let tmp = p.with_extension("json.tmp");
    let s = serde_json::to_string(dc).unwrap_or_else(|_| "{}".to_string());
    let mut f = fs::File::create(&tmp)?;
    f.write_all(s.as_bytes())?;
    fs::rename(tmp, p)?;
    Ok(())
}
