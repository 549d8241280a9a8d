// src/ai_bootstrap.rs
use std::sync::Arc;
use tracing::{info, warn};

use crate::ai::{build_client_from_config, DisabledClient, DynAiClient};
use crate::config::ai::AiConfig;
use crate::news::{self, RawHeadline};

/// Config + client pair built once at application startup and handed to
/// whichever component needs the client. No module-level singletons.
pub struct AiRuntime {
    pub cfg: AiConfig,
    pub client: DynAiClient,
}

impl AiRuntime {
    pub fn from_path(path: &str) -> anyhow::Result<Self> {
        let cfg = AiConfig::load_from_file(path)?;
        // Safe diagnostics: only provider + enabled + key length
        info!(
            "AI cfg loaded: provider={}, enabled={}, key_len={}",
            cfg.provider,
            cfg.enabled,
            cfg.api_key.len()
        );
        let client = build_client_from_config(&cfg);
        Ok(Self { cfg, client })
    }

    /// Fallback runtime when the config file is missing or unreadable.
    pub fn disabled() -> Self {
        Self {
            cfg: AiConfig::default(),
            client: Arc::new(DisabledClient),
        }
    }

    /// One-off smoke test of the analysis call at startup. It won't panic
    /// on failure; it just logs the result.
    pub async fn quick_probe(&self) {
        if !self.cfg.enabled {
            warn!("AI quick_probe skipped: AI is disabled in config");
            return;
        }
        let sample = vec![RawHeadline {
            headline: "Fed signals possible rate pause as inflation cools".to_string(),
            source: "Reuters".to_string(),
        }];
        let out = news::fetch_and_analyze(self.client.as_ref(), &sample).await;
        info!(records = out.len(), "AI quick probe finished");
    }
}
