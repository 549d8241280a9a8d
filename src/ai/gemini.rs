//! Gemini provider (generative-language API). Requires an API key from
//! `config/ai.json` (usually via the `GEMINI_API_KEY` env indirection).
//!
//! Two endpoints are used:
//! * `:streamGenerateContent?alt=sse` for report generation, fragments
//!   arriving as SSE `data:` events;
//! * `:generateContent` with a JSON response mime type for batched headline
//!   analysis, the whole answer being one JSON array.

use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::ai::{AiError, AnalysisRecord, FragmentStream, Provider};
use crate::config::ai::AiConfig;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiProvider {
    pub fn new(config: &AiConfig) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("algomentor-dashboard/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(60))
            .build()
            .expect("reqwest client");
        Self {
            http,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    async fn post(
        &self,
        action: &str,
        query: &str,
        body: &GenerateRequest<'_>,
    ) -> Result<reqwest::Response, AiError> {
        let url = format!("{API_BASE}/models/{}:{action}{query}", self.model);
        let resp = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    async fn stream_generate(&self, prompt: &str) -> Result<FragmentStream, AiError> {
        let req = GenerateRequest::text(prompt);
        let resp = self.post("streamGenerateContent", "?alt=sse", &req).await?;
        let bytes: Pin<Box<dyn Stream<Item = Result<Vec<u8>, reqwest::Error>> + Send>> =
            Box::pin(resp.bytes_stream().map(|r| r.map(|b| b.to_vec())));
        Ok(Box::pin(fragment_stream(bytes)))
    }

    async fn fetch_analysis(&self, prompt: &str) -> Result<Vec<AnalysisRecord>, AiError> {
        let req = GenerateRequest::json(prompt);
        let resp = self.post("generateContent", "", &req).await?;
        let body: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| AiError::Parse(format!("response envelope: {e}")))?;
        let text = body
            .first_text()
            .ok_or_else(|| AiError::Parse("no candidate text in response".into()))?;
        serde_json::from_str(&text).map_err(|e| AiError::Parse(format!("analysis array: {e}")))
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

// ------------------------------------------------------------
// Wire types
// ------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

impl<'a> GenerateRequest<'a> {
    fn text(prompt: &'a str) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: None,
        }
    }

    /// Constrain the answer to machine-readable JSON.
    fn json(prompt: &'a str) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: Some(GenerationConfig {
                response_mime_type: "application/json",
            }),
        }
    }
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate, or `None` when the
    /// candidate carries no text parts (e.g. safety block).
    fn first_text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let joined: String = content.parts.iter().map(|p| p.text.as_str()).collect();
        if joined.is_empty() {
            None
        } else {
            Some(joined)
        }
    }
}

// ------------------------------------------------------------
// SSE fragment parsing
// ------------------------------------------------------------

struct SseState<S> {
    bytes: S,
    buf: Vec<u8>,
    pending: VecDeque<String>,
    done: bool,
}

/// Fold a raw byte stream into per-event text fragments.
///
/// CR bytes are dropped on arrival (JSON escapes any literal `\r` inside
/// payload strings), so event boundaries are always a bare `\n\n`.
fn fragment_stream<S>(bytes: S) -> impl Stream<Item = Result<String, AiError>> + Send
where
    S: Stream<Item = Result<Vec<u8>, reqwest::Error>> + Send + Unpin + 'static,
{
    let init = SseState {
        bytes,
        buf: Vec::new(),
        pending: VecDeque::new(),
        done: false,
    };
    futures::stream::unfold(init, |mut st| async move {
        loop {
            while let Some(payload) = st.pending.pop_front() {
                match fragment_from_payload(&payload) {
                    Ok(Some(frag)) => return Some((Ok(frag), st)),
                    Ok(None) => continue,
                    Err(e) => {
                        st.pending.clear();
                        st.done = true;
                        return Some((Err(e), st));
                    }
                }
            }
            if st.done {
                return None;
            }
            match st.bytes.next().await {
                Some(Ok(chunk)) => {
                    st.buf.extend(chunk.into_iter().filter(|b| *b != b'\r'));
                    for event in drain_events(&mut st.buf) {
                        if let Some(p) = data_payload(&event) {
                            st.pending.push_back(p);
                        }
                    }
                }
                Some(Err(e)) => {
                    st.done = true;
                    return Some((Err(AiError::Stream(e.to_string())), st));
                }
                None => {
                    // A trailing partial event without its blank line is
                    // not a valid SSE event; drop it.
                    st.done = true;
                }
            }
        }
    })
}

/// Split off complete SSE events (terminated by a blank line).
fn drain_events(buf: &mut Vec<u8>) -> Vec<Vec<u8>> {
    let mut out = Vec::new();
    while let Some(pos) = buf.windows(2).position(|w| w == b"\n\n") {
        let event: Vec<u8> = buf.drain(..pos + 2).collect();
        out.push(event);
    }
    out
}

/// Join the `data:` lines of one event.
fn data_payload(event: &[u8]) -> Option<String> {
    let text = std::str::from_utf8(event).ok()?;
    let mut data = String::new();
    for line in text.lines() {
        if let Some(rest) = line.strip_prefix("data:") {
            if !data.is_empty() {
                data.push('\n');
            }
            data.push_str(rest.trim_start());
        }
    }
    if data.is_empty() {
        None
    } else {
        Some(data)
    }
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

/// Extract the text fragment of one stream event. Events without text
/// (final usage metadata, `[DONE]` markers) yield nothing.
fn fragment_from_payload(payload: &str) -> Result<Option<String>, AiError> {
    if payload == "[DONE]" {
        return Ok(None);
    }
    let chunk: StreamChunk = serde_json::from_str(payload)
        .map_err(|e| AiError::Parse(format!("stream event: {e}")))?;
    let text: String = chunk
        .candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .map(|c| c.parts.iter().map(|p| p.text.as_str()).collect())
        .unwrap_or_default();
    if text.is_empty() {
        Ok(None)
    } else {
        Ok(Some(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_events_splits_on_blank_lines_only() {
        let mut buf = b"data: a\n\ndata: b\n\ndata: partial".to_vec();
        let events = drain_events(&mut buf);
        assert_eq!(events.len(), 2);
        assert_eq!(buf, b"data: partial");
    }

    #[test]
    fn data_payload_joins_multiline_data() {
        let event = b"event: message\ndata: {\"a\":\ndata: 1}\n\n";
        assert_eq!(data_payload(event).as_deref(), Some("{\"a\":\n1}"));
    }

    #[test]
    fn fragment_from_payload_reads_candidate_text() {
        let payload =
            r#"{"candidates":[{"content":{"parts":[{"text":"Hello "},{"text":"world"}]}}]}"#;
        assert_eq!(
            fragment_from_payload(payload).unwrap().as_deref(),
            Some("Hello world")
        );
    }

    #[test]
    fn fragment_from_payload_skips_textless_events() {
        assert!(fragment_from_payload("[DONE]").unwrap().is_none());
        let usage_only = r#"{"usageMetadata":{"totalTokenCount":12}}"#;
        assert!(fragment_from_payload(usage_only).unwrap().is_none());
    }

    #[test]
    fn fragment_from_payload_rejects_malformed_json() {
        assert!(fragment_from_payload("{not json").is_err());
    }

    #[tokio::test]
    async fn fragment_stream_yields_fragments_in_order() {
        let chunks: Vec<Result<Vec<u8>, reqwest::Error>> = vec![
            Ok(b"data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"one\"}]}}]}\n\nda"
                .to_vec()),
            Ok(b"ta: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"two\"}]}}]}\n\n"
                .to_vec()),
        ];
        let stream = fragment_stream(futures::stream::iter(chunks));
        let collected: Vec<_> = stream.collect().await;
        let texts: Vec<String> = collected.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(texts, vec!["one".to_string(), "two".to_string()]);
    }
}
