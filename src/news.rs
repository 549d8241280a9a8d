//! # News Feed
//! Batched headline analysis and reconciliation. The feed sends every
//! headline in one analysis request, then re-associates the unordered
//! results with their original source labels by exact text match.
//!
//! Policy for partial misses (documented in DESIGN.md): reconciliation is
//! input-ordered. An input whose text has no matching result gets the same
//! per-item placeholder the total fallback uses; results matching no input
//! are dropped. The output therefore always has exactly one record per
//! input, in input order, with every source label preserved.

use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

use crate::ai::{AiClient, AnalysisRecord, Sentiment};

/// Fixed summary substituted when a headline could not be analyzed.
pub const PLACEHOLDER_SUMMARY: &str = "Could not analyze summary.";

const MAX_HEADLINE_CHARS: usize = 300;

/// One raw headline from the (mocked) feed. Text is unique within a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawHeadline {
    pub headline: String,
    pub source: String,
}

/// One analyzed feed entry as the dashboard renders it. Single-shot:
/// created per request, never mutated, replaced wholesale on refetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzedHeadline {
    pub headline: String,
    pub summary: String,
    pub sentiment: Sentiment,
    pub source: String,
}

/// Normalize headline text once on the way in: collapse whitespace, trim,
/// cap length. Prompt and reconciliation key both use the normalized text,
/// so exact matching stays self-consistent.
pub fn normalize_headline(s: &str) -> String {
    static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));
    let mut out = RE_WS.replace_all(s, " ").trim().to_string();
    if out.chars().count() > MAX_HEADLINE_CHARS {
        out = out.chars().take(MAX_HEADLINE_CHARS).collect();
    }
    out
}

/// Prompt embedding the whole batch. The response shape is pinned to a JSON
/// array of {originalHeadline, summary, sentiment} records.
pub fn analysis_prompt(headlines: &[RawHeadline]) -> String {
    let mut prompt = String::from(
        "Analyze the following list of financial news headlines. For each headline, provide:\n\
         1. A concise, one-sentence summary.\n\
         2. A sentiment analysis: 'Positive', 'Negative', or 'Neutral'.\n\
         \n\
         Respond with a JSON array of objects shaped like\n\
         {\"originalHeadline\": string, \"summary\": string, \"sentiment\": \"Positive\"|\"Negative\"|\"Neutral\"},\n\
         where originalHeadline repeats the headline exactly as given.\n\
         \n\
         Headlines:\n",
    );
    for h in headlines {
        prompt.push_str("- ");
        prompt.push_str(&h.headline);
        prompt.push('\n');
    }
    prompt
}

/// Re-associate unordered analysis results with their inputs by exact text
/// match. Duplicate result texts keep the first occurrence.
pub fn reconcile(inputs: &[RawHeadline], results: Vec<AnalysisRecord>) -> Vec<AnalyzedHeadline> {
    let mut by_text: HashMap<String, AnalysisRecord> = HashMap::with_capacity(results.len());
    for r in results {
        by_text.entry(r.original_headline.clone()).or_insert(r);
    }

    inputs
        .iter()
        .map(|input| match by_text.remove(&input.headline) {
            Some(r) => AnalyzedHeadline {
                headline: input.headline.clone(),
                summary: r.summary,
                sentiment: r.sentiment,
                source: input.source.clone(),
            },
            None => {
                counter!("news_match_miss_total").increment(1);
                placeholder(input)
            }
        })
        .collect()
}

/// Total fallback: one placeholder record per input, sources preserved.
pub fn fallback_feed(inputs: &[RawHeadline]) -> Vec<AnalyzedHeadline> {
    inputs.iter().map(placeholder).collect()
}

fn placeholder(input: &RawHeadline) -> AnalyzedHeadline {
    AnalyzedHeadline {
        headline: input.headline.clone(),
        summary: PLACEHOLDER_SUMMARY.to_string(),
        sentiment: Sentiment::Neutral,
        source: input.source.clone(),
    }
}

/// Analyze a batch of raw headlines. Request-level failure (network, status,
/// parse) degrades to the total fallback and is never surfaced as an error.
pub async fn fetch_and_analyze(ai: &dyn AiClient, raw: &[RawHeadline]) -> Vec<AnalyzedHeadline> {
    counter!("news_batches_total").increment(1);

    let inputs: Vec<RawHeadline> = raw
        .iter()
        .map(|h| RawHeadline {
            headline: normalize_headline(&h.headline),
            source: h.source.clone(),
        })
        .collect();

    let prompt = analysis_prompt(&inputs);
    match ai.analyze_batch(&prompt).await {
        Ok(results) => reconcile(&inputs, results),
        Err(e) => {
            warn!(error = %e, provider = ai.provider_name(), "news analysis failed; serving placeholder feed");
            counter!("news_fallback_total").increment(1);
            fallback_feed(&inputs)
        }
    }
}
