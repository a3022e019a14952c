//! Uniform request/response contract for AI backends.
//!
//! Every tier — primary multimodal models and the HTTP fallback routes —
//! accepts the same `TaskPayload` and yields the same `ProviderReply`, so
//! the executor can walk tiers without knowing who it is talking to. All
//! shape-guessing on replies happens later, in one normalizer per task.

use async_trait::async_trait;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// Wire-level role of one conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    User,
    Model,
}

/// One content part of a turn. Inline media is raw base64 — any
/// `data:*;base64,` prefix must be stripped before it lands here.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Text(String),
    InlineImage { mime: String, data: String },
    InlineAudio { mime: String, data: String },
}

impl Part {
    /// Inline image from raw bytes (file reads, camera captures).
    pub fn image_from_bytes(mime: &str, bytes: &[u8]) -> Self {
        Self::InlineImage {
            mime: mime.to_string(),
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }

    /// Inline audio from raw bytes.
    pub fn audio_from_bytes(mime: &str, bytes: &[u8]) -> Self {
        Self::InlineAudio {
            mime: mime.to_string(),
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }
}

/// A role-tagged group of parts.
#[derive(Debug, Clone)]
pub struct Turn {
    pub role: TurnRole,
    pub parts: Vec<Part>,
}

impl Turn {
    pub fn user_text(text: &str) -> Self {
        Self {
            role: TurnRole::User,
            parts: vec![Part::Text(text.to_string())],
        }
    }

    /// Concatenated text parts of this turn.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn has_media(&self) -> bool {
        self.parts
            .iter()
            .any(|p| !matches!(p, Part::Text(_)))
    }
}

/// Generation knobs forwarded to providers that understand them.
#[derive(Debug, Clone, Default)]
pub struct GenerationConfig {
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    /// When set, the provider is asked for structured JSON of this shape.
    pub response_schema: Option<serde_json::Value>,
}

/// One AI request, provider-agnostic. Transient — built per task
/// execution, dropped when the pipeline settles.
#[derive(Debug, Clone)]
pub struct TaskPayload {
    pub system: Option<String>,
    pub turns: Vec<Turn>,
    pub generation: GenerationConfig,
    /// Pre-flattened compact prompt for context-limited fallback backends.
    /// When unset, fallback tiers flatten `turns` themselves.
    pub fallback_prompt: Option<String>,
}

impl TaskPayload {
    /// Single-prompt payload with default generation settings.
    pub fn from_prompt(prompt: &str) -> Self {
        Self {
            system: None,
            turns: vec![Turn::user_text(prompt)],
            generation: GenerationConfig::default(),
            fallback_prompt: None,
        }
    }
}

/// What a tier produced. `audio` is base64, only set by speech-capable
/// models.
#[derive(Debug, Clone)]
pub struct ProviderReply {
    pub text: String,
    pub audio: Option<String>,
}

impl ProviderReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            audio: None,
        }
    }
}

/// Errors a single tier attempt can produce. The executor treats every
/// variant as "advance to the next tier"; the variants exist for logging
/// and for the quota/cold-start classification.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("API key missing")]
    MissingApiKey,

    #[error("Provider returned empty content")]
    EmptyContent,

    #[error("Response decoding error: {0}")]
    Decode(String),
}

/// One backend behind the uniform contract.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    async fn generate(&self, payload: &TaskPayload) -> Result<ProviderReply, ProviderError>;
}

/// Strip an optional `data:<mime>;base64,` prefix, leaving raw base64 for
/// providers that expect it bare.
pub fn strip_data_url_prefix(data: &str) -> &str {
    match data.split_once("base64,") {
        Some((head, tail)) if head.starts_with("data:") => tail,
        _ => data,
    }
}

// ─────────────────────────────────────────────────────────────
// Mock adapter — used by executor and task tests
// ─────────────────────────────────────────────────────────────

/// Scripted adapter for tests: yields a fixed reply or a fixed error and
/// counts how often it was asked.
pub struct MockProvider {
    outcome: Result<ProviderReply, fn() -> ProviderError>,
    calls: std::sync::atomic::AtomicUsize,
}

impl MockProvider {
    pub fn replying(text: &str) -> Self {
        Self {
            outcome: Ok(ProviderReply::text(text)),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn failing(make_error: fn() -> ProviderError) -> Self {
        Self {
            outcome: Err(make_error),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    async fn generate(&self, _payload: &TaskPayload) -> Result<ProviderReply, ProviderError> {
        self.calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        match &self.outcome {
            Ok(reply) => Ok(reply.clone()),
            Err(make_error) => Err(make_error()),
        }
    }
}
