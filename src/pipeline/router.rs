//! Model router — ordered tier lists per task kind.
//!
//! Adding, removing, or reordering backends happens here and only here;
//! the executor walks whatever list it is handed. Primary tiers are
//! omitted entirely when no API key is configured, so the walk starts
//! straight at the fallback node instead of burning an attempt on a
//! guaranteed authentication failure.

use std::sync::Arc;

use super::executor::Tier;
use super::fallback::{self, FallbackAdapter, FallbackRoute};
use super::gemini::{GeminiAdapter, MODEL_FAST, MODEL_LITE, MODEL_TTS};
use crate::config;

/// The tasks the pipeline knows how to route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Chat,
    RiskAnalysis,
    Summary,
    QuickReplies,
    DocumentScan,
    Transcription,
    Speech,
}

/// Builds tier lists from the configured endpoints.
#[derive(Clone)]
pub struct ModelRouter {
    primary_base: String,
    api_key: String,
    fallback_base: String,
}

impl ModelRouter {
    pub fn new(primary_base: &str, api_key: &str, fallback_base: &str) -> Self {
        Self {
            primary_base: primary_base.to_string(),
            api_key: api_key.to_string(),
            fallback_base: fallback_base.to_string(),
        }
    }

    /// Router wired from the environment (`SOLACE_API_KEY`,
    /// `SOLACE_PRIMARY_URL`, `SOLACE_FALLBACK_URL`).
    pub fn from_env() -> Self {
        Self::new(
            &config::primary_base_url(),
            &config::primary_api_key(),
            &config::fallback_base_url(),
        )
    }

    pub fn has_primary(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// The ordered tier list for a task. Order is the whole contract:
    /// the executor tries index 0 first and never races.
    pub fn tiers(&self, task: TaskKind) -> Vec<Tier> {
        let mut tiers = Vec::new();

        match task {
            TaskKind::Chat | TaskKind::RiskAnalysis | TaskKind::Summary => {
                if self.has_primary() {
                    tiers.push(self.primary_tier(MODEL_FAST));
                    tiers.push(self.primary_tier(MODEL_LITE));
                }
                let route = if task == TaskKind::RiskAnalysis {
                    FallbackRoute::Analyze
                } else {
                    FallbackRoute::Generate
                };
                tiers.push(self.fallback_tier(route));
            }
            TaskKind::QuickReplies => {
                // Suggestions are decoration — not worth waking the
                // fallback node for.
                if self.has_primary() {
                    tiers.push(self.primary_tier(MODEL_FAST));
                    tiers.push(self.primary_tier(MODEL_LITE));
                }
            }
            TaskKind::DocumentScan => {
                if self.has_primary() {
                    tiers.push(self.primary_tier(MODEL_FAST));
                }
                tiers.push(self.fallback_tier(FallbackRoute::Vision));
            }
            TaskKind::Transcription => {
                if self.has_primary() {
                    tiers.push(self.primary_tier(MODEL_FAST));
                }
                tiers.push(self.fallback_tier(FallbackRoute::Transcribe));
            }
            TaskKind::Speech => {
                // No audio synthesis on the fallback node
                if self.has_primary() {
                    tiers.push(self.primary_tier(MODEL_TTS));
                }
            }
        }

        tiers
    }

    /// Fire the one-time wake ping for the fallback node.
    pub fn warm_up(&self) {
        tracing::info!("Waking up fallback node");
        fallback::warm_up(&self.fallback_base);
    }

    fn primary_tier(&self, model: &str) -> Tier {
        Tier::new(
            model,
            Arc::new(GeminiAdapter::new(&self.primary_base, &self.api_key, model)),
        )
    }

    fn fallback_tier(&self, route: FallbackRoute) -> Tier {
        Tier::new(
            &format!("backup:{}", route.path()),
            Arc::new(FallbackAdapter::new(&self.fallback_base, route)),
        )
    }
}
