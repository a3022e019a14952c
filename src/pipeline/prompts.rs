//! Task prompt builders.
//!
//! Every prompt the pipeline sends lives here, next to the response schema
//! it expects, so wording and shape drift together.

use crate::models::enums::AssistantMode;
use crate::models::{ChatMessage, ClinicalVitals, PatientProfile};

/// Turns of history a summarization fallback prompt may carry.
const SUMMARY_FALLBACK_TURNS: usize = 10;

/// Prompt for the risk-analysis task. The deterministic score is included
/// as context for the narrative; the model is never asked to produce one.
pub fn risk_analysis(profile: &PatientProfile, vitals: &ClinicalVitals, score: u8) -> String {
    format!(
        "Act as a Senior Clinical Risk Assessor and Certified Medical Coder.\n\
         Analyze the following patient data to generate a clinical report and an ICD-10 coding pipeline.\n\
         Patient Profile:\n\
         - Age: {age}\n\
         - Primary Condition: {condition}\n\
         - Patient History Text: \"{history}\"\n\
         - Allergies: {allergies}\n\
         - Smoking: {smoking}, Exercise: {exercise}, Diet: {diet}\n\
         \n\
         Current Vitals (Today):\n\
         - Systolic BP: {bp} mmHg\n\
         - Glucose: {glucose} mg/dL\n\
         - Heart Rate: {hr} bpm, SpO2: {spo2}%, Temperature: {temp}°F\n\
         - Sleep Quality: {sleep}/10\n\
         - Adherence: {missed} missed doses in 7 days.\n\
         \n\
         Algo-Calculated Risk Score: {score}/100.\n\
         Task:\n\
         1. Clinical Summary: 1-2 sentences explaining the risk level based on vitals.\n\
         2. Action Items: 3 specific lifestyle changes.\n\
         3. Coding Pipeline:\n\
         - Extract the ICD-10-CM code for the Primary Condition.\n\
         - Analyze the \"Patient History Text\" and extract ICD-10-CM codes for any mention of past diseases (e.g., \"history of heart attack\" -> Z86.74 or I25.2). If history is empty/none, ignore.\n\
         4. Insurance Justification: A professional one-sentence note justifying medical necessity for monitoring.\n\
         \n\
         Return strict JSON.",
        age = profile.age,
        condition = profile.condition,
        history = profile.history,
        allergies = profile.allergies,
        smoking = profile.smoking.as_str(),
        exercise = profile.exercise.as_str(),
        diet = profile.diet.as_str(),
        bp = vitals.systolic_bp,
        glucose = vitals.glucose,
        hr = vitals.heart_rate,
        spo2 = vitals.spo2,
        temp = vitals.temperature_f,
        sleep = vitals.sleep_quality,
        missed = vitals.missed_doses,
        score = score,
    )
}

/// Structured-output schema for the risk-analysis task, in the primary
/// provider's schema dialect.
pub fn risk_analysis_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "summary": {"type": "STRING"},
            "actionItems": {"type": "ARRAY", "items": {"type": "STRING"}},
            "primaryConditionCode": {
                "type": "OBJECT",
                "properties": {
                    "code": {"type": "STRING"},
                    "description": {"type": "STRING"}
                }
            },
            "historyCodes": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "code": {"type": "STRING"},
                        "description": {"type": "STRING"}
                    }
                }
            },
            "insuranceNote": {"type": "STRING"}
        },
        "required": ["summary", "actionItems", "primaryConditionCode", "historyCodes", "insuranceNote"]
    })
}

/// System instruction for chat, selected by assistant mode.
pub fn chat_system(profile: &PatientProfile, mode: AssistantMode) -> String {
    let context = format!(
        "Context:\nPatient: {} ({}y)\nCondition: {}\nHistory: {}\n\nFormatting: Plain text only. No markdown.",
        profile.name, profile.age, profile.condition, profile.history
    );

    match mode {
        AssistantMode::Therapy => format!(
            "You are Solace, a CBT Companion. {context} Use CBT techniques. Be empathetic."
        ),
        AssistantMode::General => format!(
            "You are Solace, a Medical Education Assistant. {context} Explain concepts clearly. If image provided, analyze it."
        ),
    }
}

/// Prompt asking for quick-reply options after an assistant message.
pub fn quick_replies(last_assistant_message: &str) -> String {
    format!(
        "Based on this AI response: \"{last_assistant_message}\", generate 3 short, relevant quick reply options. Return JSON array of strings."
    )
}

/// Schema for the quick-reply task: a plain string array.
pub fn quick_replies_schema() -> serde_json::Value {
    serde_json::json!({"type": "ARRAY", "items": {"type": "STRING"}})
}

/// Clinical-note summarization over a full conversation transcript.
pub fn summarize(history: &[ChatMessage]) -> String {
    format!(
        "Create a professional clinical note summarizing this conversation. Include: Chief Complaint, Topics Discussed, and Patient Sentiment. Format as a single paragraph plain text. No markdown.\n\n{}",
        transcript(history, history.len())
    )
}

/// Shorter summarization prompt for context-limited fallback backends.
pub fn summarize_short(history: &[ChatMessage]) -> String {
    format!(
        "Summarize conversation:\n{}",
        transcript(history, SUMMARY_FALLBACK_TURNS)
    )
}

/// Render the last `limit` messages as "Patient:/AI:" lines.
fn transcript(history: &[ChatMessage], limit: usize) -> String {
    let start = history.len().saturating_sub(limit);
    history[start..]
        .iter()
        .map(|msg| {
            let who = match msg.role {
                crate::models::enums::MessageRole::Patient => "Patient",
                crate::models::enums::MessageRole::Solace => "AI",
            };
            format!("{who}: {}", msg.text)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prompt for extracting vitals from a photographed clinical document.
pub fn document_scan() -> String {
    "Extract the patient vitals visible in this clinical document. Return strict JSON with any of these keys that are present: systolicBp (mmHg, integer), glucose (mg/dL, integer), heartRate (bpm, integer), spo2 (percent, integer), temperatureF (number), weightKg (number). Omit keys that are not in the document. Do not guess values."
        .to_string()
}

/// Schema for the document-scan task.
pub fn document_scan_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "systolicBp": {"type": "INTEGER"},
            "glucose": {"type": "INTEGER"},
            "heartRate": {"type": "INTEGER"},
            "spo2": {"type": "INTEGER"},
            "temperatureF": {"type": "NUMBER"},
            "weightKg": {"type": "NUMBER"}
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::MessageRole;

    #[test]
    fn risk_prompt_embeds_score_and_vitals() {
        let profile = PatientProfile::default();
        let mut vitals = ClinicalVitals::default();
        vitals.set_bp_morning(150);
        let prompt = risk_analysis(&profile, &vitals, 45);
        assert!(prompt.contains("45/100"));
        assert!(prompt.contains("Systolic BP: 150 mmHg"));
        assert!(prompt.contains("Return strict JSON"));
    }

    #[test]
    fn chat_system_switches_persona() {
        let profile = PatientProfile::default();
        let general = chat_system(&profile, AssistantMode::General);
        let therapy = chat_system(&profile, AssistantMode::Therapy);
        assert!(general.contains("Medical Education Assistant"));
        assert!(therapy.contains("CBT Companion"));
        assert!(general.contains(&profile.name));
    }

    #[test]
    fn transcript_keeps_only_recent_turns() {
        let history: Vec<ChatMessage> = (0..20)
            .map(|i| {
                let mut msg = ChatMessage::from_patient(&format!("m{i}"), None);
                if i % 2 == 1 {
                    msg.role = MessageRole::Solace;
                }
                msg
            })
            .collect();
        let short = summarize_short(&history);
        assert!(!short.contains("Patient: m8"));
        assert!(short.contains("Patient: m10"));
        assert!(short.contains("AI: m19"));
    }

    #[test]
    fn schemas_are_well_formed() {
        assert!(risk_analysis_schema().get("required").is_some());
        assert_eq!(quick_replies_schema()["type"], "ARRAY");
        assert!(document_scan_schema()["properties"]["spo2"].is_object());
    }
}
