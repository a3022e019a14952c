//! Primary provider adapter — Gemini-style `generateContent` REST API.
//!
//! One adapter instance per model tier; the router decides which tiers a
//! task gets. Quota and overload conditions surface as `ProviderError::Api`
//! whose message carries the provider's status markers (429, quota,
//! RESOURCE_EXHAUSTED), which is what the executor's classification keys on.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::provider::{
    Part, ProviderAdapter, ProviderError, ProviderReply, TaskPayload, TurnRole,
};

/// Capability/cost tiers of the primary provider.
pub const MODEL_FAST: &str = "gemini-2.5-flash";
pub const MODEL_LITE: &str = "gemini-2.5-flash-lite";
/// Speech synthesis model (returns inline base64 audio).
pub const MODEL_TTS: &str = "gemini-2.5-flash-preview-tts";

/// Request ceiling for primary calls.
const REQUEST_TIMEOUT_SECS: u64 = 90;

pub struct GeminiAdapter {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiAdapter {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

// ─────────────────────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<WireContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<WireContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<WireGenerationConfig>,
}

#[derive(Serialize)]
struct WireContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<WirePart>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
enum WirePart {
    Text(String),
    #[serde(rename_all = "camelCase")]
    InlineData { mime_type: String, data: String },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CandidatePart {
    text: Option<String>,
    inline_data: Option<CandidateInlineData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CandidateInlineData {
    mime_type: String,
    data: String,
}

fn to_wire_role(role: TurnRole) -> &'static str {
    match role {
        TurnRole::User => "user",
        TurnRole::Model => "model",
    }
}

fn to_wire_parts(parts: &[Part]) -> Vec<WirePart> {
    parts
        .iter()
        .map(|part| match part {
            Part::Text(text) => WirePart::Text(text.clone()),
            Part::InlineImage { mime, data } | Part::InlineAudio { mime, data } => {
                WirePart::InlineData {
                    mime_type: mime.clone(),
                    data: data.clone(),
                }
            }
        })
        .collect()
}

#[async_trait]
impl ProviderAdapter for GeminiAdapter {
    async fn generate(&self, payload: &TaskPayload) -> Result<ProviderReply, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::MissingApiKey);
        }

        let request = GenerateContentRequest {
            contents: payload
                .turns
                .iter()
                .map(|turn| WireContent {
                    role: Some(to_wire_role(turn.role)),
                    parts: to_wire_parts(&turn.parts),
                })
                .collect(),
            system_instruction: payload.system.as_ref().map(|text| WireContent {
                role: None,
                parts: vec![WirePart::Text(text.clone())],
            }),
            generation_config: build_generation_config(payload),
        };

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        reply_from_candidates(parsed)
    }
}

fn build_generation_config(payload: &TaskPayload) -> Option<WireGenerationConfig> {
    let gen = &payload.generation;
    if gen.temperature.is_none()
        && gen.max_output_tokens.is_none()
        && gen.response_schema.is_none()
    {
        return None;
    }
    Some(WireGenerationConfig {
        temperature: gen.temperature,
        max_output_tokens: gen.max_output_tokens,
        response_mime_type: gen.response_schema.as_ref().map(|_| "application/json"),
        response_schema: gen.response_schema.clone(),
    })
}

fn reply_from_candidates(
    parsed: GenerateContentResponse,
) -> Result<ProviderReply, ProviderError> {
    let parts = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts)
        .unwrap_or_default();

    let mut text_chunks: Vec<String> = Vec::new();
    let mut audio: Option<String> = None;

    for part in parts {
        if let Some(chunk) = part.text {
            text_chunks.push(chunk);
        }
        if let Some(inline) = part.inline_data {
            if inline.mime_type.starts_with("audio/") && audio.is_none() {
                audio = Some(inline.data);
            }
        }
    }

    if text_chunks.is_empty() && audio.is_none() {
        return Err(ProviderError::EmptyContent);
    }

    Ok(ProviderReply {
        text: text_chunks.join(""),
        audio,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_part_serializes_camel_case() {
        let part = WirePart::InlineData {
            mime_type: "image/jpeg".into(),
            data: "AAAA".into(),
        };
        let json = serde_json::to_string(&part).unwrap();
        assert_eq!(
            json,
            "{\"inlineData\":{\"mimeType\":\"image/jpeg\",\"data\":\"AAAA\"}}"
        );

        let text = WirePart::Text("hello".into());
        assert_eq!(serde_json::to_string(&text).unwrap(), "{\"text\":\"hello\"}");
    }

    #[test]
    fn response_parses_text_candidate() {
        let body = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "All "}, {"text": "good"}]}}
            ]
        }"#;
        let parsed: GenerateContentResponse = serde_json::from_str(body).unwrap();
        let reply = reply_from_candidates(parsed).unwrap();
        assert_eq!(reply.text, "All good");
        assert!(reply.audio.is_none());
    }

    #[test]
    fn response_extracts_inline_audio() {
        let body = r#"{
            "candidates": [
                {"content": {"parts": [
                    {"inlineData": {"mimeType": "audio/pcm", "data": "UklGRg=="}}
                ]}}
            ]
        }"#;
        let parsed: GenerateContentResponse = serde_json::from_str(body).unwrap();
        let reply = reply_from_candidates(parsed).unwrap();
        assert_eq!(reply.audio.as_deref(), Some("UklGRg=="));
    }

    #[test]
    fn empty_candidates_is_empty_content_error() {
        let parsed: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(matches!(
            reply_from_candidates(parsed),
            Err(ProviderError::EmptyContent)
        ));
    }

    #[tokio::test]
    async fn missing_key_short_circuits() {
        let adapter = GeminiAdapter::new("http://localhost:1", "", MODEL_FAST);
        let err = adapter
            .generate(&TaskPayload::from_prompt("hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::MissingApiKey));
    }

    #[test]
    fn endpoint_includes_model() {
        let adapter = GeminiAdapter::new("https://example.com/", "k", MODEL_LITE);
        assert_eq!(
            adapter.endpoint(),
            "https://example.com/v1beta/models/gemini-2.5-flash-lite:generateContent"
        );
    }
}
