//! Task-level API over the pipeline.
//!
//! Each method builds a payload, asks the router for its tier list, runs
//! the executor, and normalizes whatever came back. This is also where the
//! degraded defaults live: chat, analysis, suggestions, and summaries never
//! surface an error to the caller, while document scanning, transcription,
//! and speech deliberately do — fabricating vitals or audio would be worse
//! than admitting failure.

use crate::models::enums::{AssistantMode, CodeKind, MessageRole};
use crate::models::{ChatMessage, ClinicalVitals, IcdCode, PatientProfile, RiskAnalysisResult};
use crate::scoring;

use super::executor::{execute, StatusSink, Tier};
use super::normalize::{self, NormalizeError, ScannedVitals};
use super::prompts;
use super::provider::{
    strip_data_url_prefix, GenerationConfig, Part, TaskPayload, Turn, TurnRole,
};
use super::router::{ModelRouter, TaskKind};
use super::PipelineError;

/// Chat generation sampling settings.
const CHAT_TEMPERATURE: f32 = 0.5;
const CHAT_MAX_OUTPUT_TOKENS: u32 = 500;

/// Shown when a model answers with empty text.
const CHAT_EMPTY_REPLY: &str = "I'm having trouble retrieving that information.";
/// Shown when every chat tier is down.
const CHAT_OFFLINE_REPLY: &str = "I apologize, but I am unable to connect at the moment. \
     Please check your internet connection or try again later.";

/// Errors from the tasks that are allowed to fail outright.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
    #[error("Speech synthesis returned no audio")]
    NoAudio,
}

/// A chat answer plus the tier that produced it (`None` when degraded).
#[derive(Debug, Clone)]
pub struct ChatReply {
    pub text: String,
    pub source: Option<String>,
}

/// Where a task gets its ordered tier list from. `ModelRouter` in
/// production; tests substitute scripted tiers.
pub trait TierSource {
    fn tiers(&self, task: TaskKind) -> Vec<Tier>;
}

impl TierSource for ModelRouter {
    fn tiers(&self, task: TaskKind) -> Vec<Tier> {
        ModelRouter::tiers(self, task)
    }
}

/// The AI companion surface the application talks to.
pub struct Assistant<R: TierSource = ModelRouter> {
    router: R,
}

impl Assistant<ModelRouter> {
    /// Assistant wired from the environment.
    pub fn from_env() -> Self {
        Self::new(ModelRouter::from_env())
    }

    /// Issue the one-time fallback wake ping. Call once at startup from an
    /// async context; failures are silently ignored.
    pub fn warm_up(&self) {
        self.router.warm_up();
    }
}

impl<R: TierSource> Assistant<R> {
    pub fn new(router: R) -> Self {
        Self { router }
    }

    /// Run the risk-analysis task. The numeric score is computed locally
    /// before any network traffic and survives every failure mode.
    pub async fn analyze_risk(
        &self,
        profile: &PatientProfile,
        vitals: &ClinicalVitals,
        status: Option<&StatusSink>,
    ) -> RiskAnalysisResult {
        let score = scoring::score(profile, vitals);

        let mut payload = TaskPayload::from_prompt(&prompts::risk_analysis(profile, vitals, score));
        payload.generation.response_schema = Some(prompts::risk_analysis_schema());

        match execute(&self.router.tiers(TaskKind::RiskAnalysis), &payload, status).await {
            Ok(reply) => normalize::parse_risk_response(&reply.text, score, &reply.source),
            Err(e) => {
                tracing::error!(error = %e, "risk analysis degraded to offline result");
                unavailable_result(score)
            }
        }
    }

    /// Generate the assistant's next chat message.
    pub async fn chat_reply(
        &self,
        history: &[ChatMessage],
        message: &str,
        image: Option<&str>,
        profile: &PatientProfile,
        mode: AssistantMode,
        status: Option<&StatusSink>,
    ) -> ChatReply {
        let mut turns: Vec<Turn> = history.iter().map(turn_from_message).collect();
        turns.push(make_turn(TurnRole::User, message, image));

        let payload = TaskPayload {
            system: Some(prompts::chat_system(profile, mode)),
            turns,
            generation: GenerationConfig {
                temperature: Some(CHAT_TEMPERATURE),
                max_output_tokens: Some(CHAT_MAX_OUTPUT_TOKENS),
                response_schema: None,
            },
            fallback_prompt: None,
        };

        match execute(&self.router.tiers(TaskKind::Chat), &payload, status).await {
            Ok(reply) => {
                let text = normalize::clean_markdown(&reply.text);
                ChatReply {
                    text: if text.is_empty() {
                        CHAT_EMPTY_REPLY.to_string()
                    } else {
                        text
                    },
                    source: Some(reply.source),
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "chat degraded to offline reply");
                ChatReply {
                    text: CHAT_OFFLINE_REPLY.to_string(),
                    source: None,
                }
            }
        }
    }

    /// Suggest up to three quick replies to the last assistant message.
    /// Best-effort: any failure is an empty list.
    pub async fn quick_replies(&self, last_assistant_message: &str) -> Vec<String> {
        let mut payload = TaskPayload::from_prompt(&prompts::quick_replies(last_assistant_message));
        payload.generation.response_schema = Some(prompts::quick_replies_schema());

        match execute(&self.router.tiers(TaskKind::QuickReplies), &payload, None).await {
            Ok(reply) => normalize::parse_quick_replies(&reply.text),
            Err(e) => {
                tracing::debug!(error = %e, "quick replies unavailable");
                Vec::new()
            }
        }
    }

    /// Summarize a conversation as a clinical note.
    pub async fn summarize(&self, history: &[ChatMessage]) -> String {
        if history.is_empty() {
            return "No conversation to summarize.".to_string();
        }

        let mut payload = TaskPayload::from_prompt(&prompts::summarize(history));
        // The backup node has a small context window; hand it a trimmed
        // transcript instead of the full one.
        payload.fallback_prompt = Some(prompts::summarize_short(history));

        match execute(&self.router.tiers(TaskKind::Summary), &payload, None).await {
            Ok(reply) => {
                let text = normalize::clean_markdown(&reply.text);
                if text.is_empty() {
                    "Summary not available.".to_string()
                } else {
                    text
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "summarization failed on all tiers");
                "Could not generate summary.".to_string()
            }
        }
    }

    /// Extract vitals from a photographed clinical document.
    ///
    /// This task has no safe default — a fabricated blood-pressure value is
    /// worse than asking the patient to type it in — so exhaustion and
    /// unparseable extractions both surface as errors.
    pub async fn scan_document(
        &self,
        image_base64: &str,
        status: Option<&StatusSink>,
    ) -> Result<ScannedVitals, TaskError> {
        let mut payload = TaskPayload::from_prompt(&prompts::document_scan());
        payload.turns[0].parts.push(Part::InlineImage {
            mime: "image/jpeg".to_string(),
            data: strip_data_url_prefix(image_base64).to_string(),
        });
        payload.generation.response_schema = Some(prompts::document_scan_schema());

        let reply = execute(&self.router.tiers(TaskKind::DocumentScan), &payload, status).await?;
        Ok(normalize::parse_scanned_vitals(&reply.text)?)
    }

    /// Transcribe recorded audio to text.
    pub async fn transcribe(&self, audio_base64: &str, mime: &str) -> Result<String, TaskError> {
        let mut payload =
            TaskPayload::from_prompt("Transcribe this audio exactly. Return only the transcript.");
        payload.turns[0].parts.push(Part::InlineAudio {
            mime: mime.to_string(),
            data: strip_data_url_prefix(audio_base64).to_string(),
        });

        let reply = execute(&self.router.tiers(TaskKind::Transcription), &payload, None).await?;
        Ok(reply.text.trim().to_string())
    }

    /// Synthesize speech for an assistant message. Returns base64 audio.
    pub async fn speak(&self, text: &str) -> Result<String, TaskError> {
        let payload = TaskPayload::from_prompt(text);
        let reply = execute(&self.router.tiers(TaskKind::Speech), &payload, None).await?;
        reply.audio.ok_or(TaskError::NoAudio)
    }
}

fn turn_from_message(message: &ChatMessage) -> Turn {
    let role = match message.role {
        MessageRole::Patient => TurnRole::User,
        MessageRole::Solace => TurnRole::Model,
    };
    make_turn(role, &message.text, message.image.as_deref())
}

fn make_turn(role: TurnRole, text: &str, image: Option<&str>) -> Turn {
    let mut parts = vec![Part::Text(text.to_string())];
    if let Some(image) = image {
        parts.push(Part::InlineImage {
            mime: "image/jpeg".to_string(),
            data: strip_data_url_prefix(image).to_string(),
        });
    }
    Turn { role, parts }
}

/// Canned analysis result when every tier is down.
fn unavailable_result(score: u8) -> RiskAnalysisResult {
    RiskAnalysisResult {
        numeric_score: score,
        summary: "Clinical analysis currently unavailable.".to_string(),
        action_items: vec![
            "Monitor daily vitals".to_string(),
            "Consult healthcare provider".to_string(),
        ],
        coding_pipeline: vec![IcdCode {
            code: "R69".to_string(),
            description: "Unspecified illness".to_string(),
            kind: CodeKind::Primary,
        }],
        insurance_note: "Automated risk assessment pending professional review.".to_string(),
        source: "offline".to_string(),
        timestamp: chrono::Local::now().naive_local(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::provider::{MockProvider, ProviderError};
    use std::sync::Arc;

    /// Scripted tier source: same tiers for every task kind.
    struct StubRouter {
        tiers: Vec<Tier>,
    }

    impl StubRouter {
        fn with(tiers: Vec<Tier>) -> Self {
            Self { tiers }
        }
    }

    impl TierSource for StubRouter {
        fn tiers(&self, _task: TaskKind) -> Vec<Tier> {
            self.tiers.clone()
        }
    }

    fn quota_error() -> ProviderError {
        ProviderError::Api {
            status: 429,
            message: "quota exceeded".into(),
        }
    }

    fn analysis_json() -> &'static str {
        r#"{"summary": "Elevated risk.", "actionItems": ["Walk", "Hydrate", "Sleep"],
            "primaryConditionCode": {"code": "I10", "description": "Essential hypertension"},
            "historyCodes": [], "insuranceNote": "Necessary."}"#
    }

    fn assistant_with(tiers: Vec<Tier>) -> Assistant<StubRouter> {
        Assistant::new(StubRouter::with(tiers))
    }

    #[tokio::test]
    async fn analysis_records_surviving_tier_as_source() {
        let assistant = assistant_with(vec![
            Tier::new("tier-1", Arc::new(MockProvider::failing(quota_error))),
            Tier::new("tier-2", Arc::new(MockProvider::replying(analysis_json()))),
        ]);
        let result = assistant
            .analyze_risk(&PatientProfile::default(), &ClinicalVitals::default(), None)
            .await;

        assert_eq!(result.source, "tier-2");
        assert_eq!(result.summary, "Elevated risk.");
        assert_eq!(result.coding_pipeline[0].code, "I10");
    }

    #[tokio::test]
    async fn analysis_exhaustion_yields_offline_default() {
        let assistant = assistant_with(vec![Tier::new(
            "only",
            Arc::new(MockProvider::failing(quota_error)),
        )]);
        let profile = PatientProfile::default();
        let vitals = ClinicalVitals::default();
        let expected_score = scoring::score(&profile, &vitals);

        let result = assistant.analyze_risk(&profile, &vitals, None).await;
        assert_eq!(result.numeric_score, expected_score);
        assert_eq!(result.source, "offline");
        assert_eq!(result.coding_pipeline[0].code, "R69");
        assert!(!result.action_items.is_empty());
    }

    #[tokio::test]
    async fn chat_cleans_markdown_and_labels_source() {
        let assistant = assistant_with(vec![Tier::new(
            "tier-1",
            Arc::new(MockProvider::replying("**Drink** more water")),
        )]);
        let reply = assistant
            .chat_reply(
                &[],
                "What should I do?",
                None,
                &PatientProfile::default(),
                AssistantMode::General,
                None,
            )
            .await;
        assert_eq!(reply.text, "Drink more water");
        assert_eq!(reply.source.as_deref(), Some("tier-1"));
    }

    #[tokio::test]
    async fn chat_exhaustion_is_apologetic_not_fatal() {
        let assistant = assistant_with(vec![Tier::new(
            "only",
            Arc::new(MockProvider::failing(quota_error)),
        )]);
        let reply = assistant
            .chat_reply(
                &[],
                "hello",
                None,
                &PatientProfile::default(),
                AssistantMode::Therapy,
                None,
            )
            .await;
        assert!(reply.text.contains("unable to connect"));
        assert!(reply.source.is_none());
    }

    #[tokio::test]
    async fn quick_replies_swallow_failures() {
        let assistant = assistant_with(vec![Tier::new(
            "only",
            Arc::new(MockProvider::failing(quota_error)),
        )]);
        assert!(assistant.quick_replies("Take your meds.").await.is_empty());

        let assistant = assistant_with(vec![]);
        assert!(assistant.quick_replies("Take your meds.").await.is_empty());
    }

    #[tokio::test]
    async fn summarize_empty_history_short_circuits() {
        let assistant = assistant_with(vec![]);
        assert_eq!(
            assistant.summarize(&[]).await,
            "No conversation to summarize."
        );
    }

    #[tokio::test]
    async fn summarize_exhaustion_degrades() {
        let assistant = assistant_with(vec![Tier::new(
            "only",
            Arc::new(MockProvider::failing(quota_error)),
        )]);
        let history = vec![ChatMessage::from_patient("hi", None)];
        assert_eq!(
            assistant.summarize(&history).await,
            "Could not generate summary."
        );
    }

    #[tokio::test]
    async fn scan_surfaces_exhaustion_as_error() {
        let assistant = assistant_with(vec![Tier::new(
            "only",
            Arc::new(MockProvider::failing(quota_error)),
        )]);
        let result = assistant.scan_document("AAAA", None).await;
        assert!(matches!(
            result,
            Err(TaskError::Pipeline(PipelineError::Exhausted { .. }))
        ));
    }

    #[tokio::test]
    async fn scan_surfaces_unreadable_extraction_as_error() {
        let assistant = assistant_with(vec![Tier::new(
            "tier-1",
            Arc::new(MockProvider::replying("I cannot read this document.")),
        )]);
        let result = assistant.scan_document("AAAA", None).await;
        assert!(matches!(result, Err(TaskError::Normalize(_))));
    }

    #[tokio::test]
    async fn scan_parses_extracted_vitals() {
        let assistant = assistant_with(vec![Tier::new(
            "tier-1",
            Arc::new(MockProvider::replying(r#"{"systolicBp": 138, "glucose": 110}"#)),
        )]);
        let vitals = assistant
            .scan_document("data:image/jpeg;base64,AAAA", None)
            .await
            .unwrap();
        assert_eq!(vitals.systolic_bp, Some(138));
    }

    #[tokio::test]
    async fn speak_without_audio_is_an_error() {
        let assistant = assistant_with(vec![Tier::new(
            "tts",
            Arc::new(MockProvider::replying("text but no audio")),
        )]);
        assert!(matches!(
            assistant.speak("Hello").await,
            Err(TaskError::NoAudio)
        ));
    }
}
