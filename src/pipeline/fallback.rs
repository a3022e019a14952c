//! HTTP fallback backend adapter.
//!
//! The backup node is a small self-hosted inference service that sleeps
//! when idle, so the adapter owns two behaviors the primary tiers do not
//! need: a hard request ceiling sized for cold starts, and a bounded
//! retry-with-delay for 503/504 and network/timeout failures. Retries
//! never cross tier boundaries — once this adapter gives up, the executor
//! moves on.

use async_trait::async_trait;
use serde::Serialize;

use super::provider::{Part, ProviderAdapter, ProviderError, ProviderReply, TaskPayload, TurnRole};

/// Request ceiling. Sized for a sleeping node spinning up, not for a warm
/// round trip.
const REQUEST_TIMEOUT_SECS: u64 = 60;
/// Extra attempts after the first, for cold-start-shaped failures only.
const COLD_START_RETRIES: u32 = 2;
/// Fixed pause between attempts.
const RETRY_DELAY_SECS: u64 = 5;
/// Conversation turns kept when flattening a chat payload into one prompt.
const MAX_FLATTENED_TURNS: usize = 6;

/// Task-specific endpoint on the fallback node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackRoute {
    Generate,
    Analyze,
    Vision,
    Transcribe,
}

impl FallbackRoute {
    pub fn path(self) -> &'static str {
        match self {
            Self::Generate => "/generate",
            Self::Analyze => "/analyze",
            Self::Vision => "/vision",
            Self::Transcribe => "/transcribe",
        }
    }
}

#[derive(Serialize)]
struct FallbackBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    audio: Option<String>,
}

pub struct FallbackAdapter {
    client: reqwest::Client,
    base_url: String,
    route: FallbackRoute,
}

impl FallbackAdapter {
    pub fn new(base_url: &str, route: FallbackRoute) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            route,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, self.route.path())
    }

    async fn attempt(&self, body: &FallbackBody) -> Result<ProviderReply, ProviderError> {
        let response = self
            .client
            .post(self.endpoint())
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            // An HTML body usually means the node is still building or
            // serving its sleep page.
            let message = if text.trim_start().starts_with('<') {
                format!("Backend unavailable (status {status})")
            } else {
                text
            };
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;
        Ok(ProviderReply::text(extract_text(&value)))
    }
}

#[async_trait]
impl ProviderAdapter for FallbackAdapter {
    async fn generate(&self, payload: &TaskPayload) -> Result<ProviderReply, ProviderError> {
        let body = build_body(self.route, payload);
        retry_cold_start(self.route.path(), || self.attempt(&body)).await
    }
}

/// Run one tier attempt with up to `COLD_START_RETRIES` extra attempts on
/// cold-start-shaped failures, pausing `RETRY_DELAY_SECS` between them.
/// Any other failure returns immediately.
async fn retry_cold_start<F, Fut>(route: &str, mut attempt: F) -> Result<ProviderReply, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<ProviderReply, ProviderError>>,
{
    let mut retries_left = COLD_START_RETRIES;
    loop {
        match attempt().await {
            Ok(reply) => return Ok(reply),
            Err(e) if retries_left > 0 && is_cold_start(&e) => {
                retries_left -= 1;
                tracing::warn!(
                    route,
                    error = %e,
                    "backend waking up, retrying in {RETRY_DELAY_SECS}s"
                );
                tokio::time::sleep(std::time::Duration::from_secs(RETRY_DELAY_SECS)).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Fire-and-forget wake ping, issued once at application start so the
/// first real fallback request does not eat the whole cold-start delay.
/// Failures are ignored.
pub fn warm_up(base_url: &str) {
    let url = base_url.trim_end_matches('/').to_string();
    tokio::spawn(async move {
        let client = reqwest::Client::new();
        match client.get(&url).send().await {
            Ok(_) => tracing::debug!("fallback node pinged"),
            Err(e) => tracing::debug!(error = %e, "fallback wake ping failed"),
        }
    });
}

/// Cold-start-shaped failure: 503/504, or a transport timeout/connect error.
fn is_cold_start(error: &ProviderError) -> bool {
    match error {
        ProviderError::Api { status, .. } => *status == 503 || *status == 504,
        ProviderError::Http(e) => e.is_timeout() || e.is_connect(),
        _ => false,
    }
}

/// Map the structured payload onto the node's route-specific JSON body.
/// The node speaks single-prompt text, so conversations are flattened.
fn build_body(route: FallbackRoute, payload: &TaskPayload) -> FallbackBody {
    match route {
        FallbackRoute::Generate | FallbackRoute::Analyze => FallbackBody {
            prompt: Some(
                payload
                    .fallback_prompt
                    .clone()
                    .unwrap_or_else(|| flatten_payload(payload)),
            ),
            image: None,
            audio: None,
        },
        FallbackRoute::Vision => FallbackBody {
            prompt: Some(flatten_payload(payload)),
            image: first_media(payload, |p| match p {
                Part::InlineImage { data, .. } => Some(data.clone()),
                _ => None,
            }),
            audio: None,
        },
        FallbackRoute::Transcribe => FallbackBody {
            prompt: None,
            image: None,
            audio: first_media(payload, |p| match p {
                Part::InlineAudio { data, .. } => Some(data.clone()),
                _ => None,
            }),
        },
    }
}

fn first_media(payload: &TaskPayload, pick: impl Fn(&Part) -> Option<String>) -> Option<String> {
    payload
        .turns
        .iter()
        .flat_map(|t| t.parts.iter())
        .find_map(pick)
}

/// Flatten a payload into one prompt string: system instruction, then the
/// most recent turns as role-labelled lines, then a generation cue. Older
/// turns are dropped to keep within the node's context limits.
fn flatten_payload(payload: &TaskPayload) -> String {
    let mut out = String::new();
    if let Some(system) = &payload.system {
        out.push_str(system.trim());
        out.push_str("\n\n");
    }

    let start = payload.turns.len().saturating_sub(MAX_FLATTENED_TURNS);
    let turns = &payload.turns[start..];

    if turns.len() <= 1 {
        if let Some(turn) = turns.first() {
            out.push_str(&turn.text());
            if turn.has_media() {
                out.push_str("\n[Image Context Provided]");
            }
        }
        return out.trim_end().to_string();
    }

    out.push_str("[Recent Chat History]:\n");
    for turn in turns {
        let label = match turn.role {
            TurnRole::User => "User",
            TurnRole::Model => "Assistant",
        };
        out.push_str(&format!("{label}: {}\n", turn.text()));
    }
    if turns.iter().any(|t| t.has_media()) {
        out.push_str("[Image Context Provided]\n");
    }
    out.push_str("Assistant:");
    out
}

/// The node answers with `{text}`, `{response}`, `{generated_text}`, or a
/// bare JSON string; anything else is surfaced verbatim for the
/// normalizer to pick apart.
fn extract_text(value: &serde_json::Value) -> String {
    if let Some(s) = value.as_str() {
        return s.to_string();
    }
    for key in ["text", "response", "generated_text"] {
        if let Some(s) = value.get(key).and_then(|v| v.as_str()) {
            return s.to_string();
        }
    }
    value.to_string()
}
