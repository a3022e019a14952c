//! Generic tier-walking executor.
//!
//! One task execution moves through `PENDING → TRYING(tier 0) → … →
//! SUCCESS | EXHAUSTED`. Tiers run strictly in order, never raced. Every
//! failure advances — quota/overload classification only changes what gets
//! logged and announced, never the control flow. Exhaustion is returned as
//! an error here; whether that becomes a degraded default or a surfaced
//! failure is the task layer's call.

use std::fmt;
use std::sync::Arc;

use super::provider::{ProviderAdapter, ProviderReply, TaskPayload};
use super::PipelineError;

/// One (provider, model-or-endpoint) combination in priority order.
#[derive(Clone)]
pub struct Tier {
    /// Human-readable source label, recorded on results ("gemini-2.5-flash",
    /// "backup:/analyze", …).
    pub label: String,
    pub adapter: Arc<dyn ProviderAdapter>,
}

impl Tier {
    pub fn new(label: &str, adapter: Arc<dyn ProviderAdapter>) -> Self {
        Self {
            label: label.to_string(),
            adapter,
        }
    }
}

/// Advisory progress notifications. Purely observational: nothing may key
/// behavior off these, and a missing observer changes nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelinePhase {
    /// About to attempt a tier.
    Trying { source: String, first: bool },
    /// A tier failed in a quota/overload shape; the next one is up.
    SwitchingTier { to: String },
    /// Every tier failed.
    Exhausted,
}

impl fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trying { source, first: true } => write!(f, "Using {source}…"),
            Self::Trying { source, first: false } => write!(f, "Trying {source}…"),
            Self::SwitchingTier { to } => write!(f, "Switching to backup ({to})…"),
            Self::Exhausted => write!(f, "Unable to reach any model"),
        }
    }
}

/// Observer callback for phase events.
pub type StatusSink = Arc<dyn Fn(PipelinePhase) + Send + Sync>;

/// Successful outcome of a pipeline run: the raw reply plus which tier
/// produced it.
#[derive(Debug, Clone)]
pub struct TierReply {
    pub text: String,
    pub audio: Option<String>,
    pub source: String,
}

/// Walk the tier list in order until one answers.
pub async fn execute(
    tiers: &[Tier],
    payload: &TaskPayload,
    status: Option<&StatusSink>,
) -> Result<TierReply, PipelineError> {
    if tiers.is_empty() {
        return Err(PipelineError::NoTiers);
    }

    let mut last_source = String::new();
    let mut last_error = String::new();

    for (index, tier) in tiers.iter().enumerate() {
        emit(
            status,
            PipelinePhase::Trying {
                source: tier.label.clone(),
                first: index == 0,
            },
        );

        match tier.adapter.generate(payload).await {
            Ok(ProviderReply { text, audio }) => {
                tracing::debug!(source = %tier.label, "tier answered");
                return Ok(TierReply {
                    text,
                    audio,
                    source: tier.label.clone(),
                });
            }
            Err(e) => {
                let message = e.to_string();
                if is_quota_shaped(&message) {
                    tracing::warn!(source = %tier.label, error = %message, "quota/overload, advancing tier");
                } else {
                    tracing::warn!(source = %tier.label, error = %message, "tier failed, advancing");
                }
                if let Some(next) = tiers.get(index + 1) {
                    emit(
                        status,
                        PipelinePhase::SwitchingTier {
                            to: next.label.clone(),
                        },
                    );
                }
                last_source = tier.label.clone();
                last_error = message;
            }
        }
    }

    emit(status, PipelinePhase::Exhausted);
    Err(PipelineError::Exhausted {
        last_source,
        last_error,
    })
}

fn emit(status: Option<&StatusSink>, phase: PipelinePhase) {
    if let Some(sink) = status {
        sink(phase);
    }
}

/// Does an error's string form carry rate-limit/overload markers?
///
/// Providers encode this state in wildly different shapes, so the match is
/// deliberately on the rendered message rather than on typed variants.
pub fn is_quota_shaped(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("429")
        || lower.contains("quota")
        || lower.contains("resource_exhausted")
        || lower.contains("rate limit")
        || lower.contains("503")
        || lower.contains("overload")
}
