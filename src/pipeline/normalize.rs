//! Per-task response normalizers.
//!
//! Tiers return text in whatever shape their backend favors: fenced JSON,
//! bare JSON, JSON buried in prose, or plain prose. Each task has exactly
//! one normalizer that turns that into the task's canonical type, and for
//! the user-facing tasks the normalizer never fails — a response we cannot
//! parse still becomes a usable, clearly degraded result.

use serde::Deserialize;

use crate::models::enums::CodeKind;
use crate::models::{IcdCode, RiskAnalysisResult};

/// Ceiling on how much raw model text is surfaced as a degraded summary.
const DEGRADED_SUMMARY_MAX_CHARS: usize = 500;

/// Quick replies offered after an assistant message.
const MAX_QUICK_REPLIES: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("Could not locate structured data in response: {0}")]
    Unparseable(String),
}

// ─────────────────────────────────────────────────────────────
// Markdown cleaning
// ─────────────────────────────────────────────────────────────

/// Strip the markdown the models sprinkle into plain-text answers:
/// `**` bold markers, `###` headers, `*` bullets become `-`.
pub fn clean_markdown(text: &str) -> String {
    text.replace("**", "")
        .replace("###", "")
        .replace('*', "-")
        .trim()
        .to_string()
}

/// Character-safe truncation.
fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        text.chars().take(max).collect()
    }
}

// ─────────────────────────────────────────────────────────────
// JSON candidate extraction
// ─────────────────────────────────────────────────────────────

/// Pull the most plausible JSON candidate out of a raw reply:
/// a fenced code block if present, else the first balanced `{…}` span,
/// else the whole text.
pub fn extract_json_candidate(raw: &str) -> String {
    if let Some(fenced) = extract_fenced_block(raw) {
        return fenced;
    }
    if let Some(span) = extract_brace_span(raw) {
        return span;
    }
    raw.trim().to_string()
}

fn extract_fenced_block(raw: &str) -> Option<String> {
    let open = raw.find("```")?;
    let after_fence = &raw[open + 3..];
    // Skip an optional language tag on the fence line
    let content_start = after_fence.find('\n')? + 1;
    let content = &after_fence[content_start..];
    let close = content.find("```")?;
    Some(content[..close].trim().to_string())
}

/// First balanced top-level `{…}` span. Falls back to first-`{`/last-`}`
/// when the braces never balance (truncated output).
fn extract_brace_span(raw: &str) -> Option<String> {
    let start = raw.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in raw[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(raw[start..start + offset + ch.len_utf8()].to_string());
                }
            }
            _ => {}
        }
    }

    let end = raw.rfind('}')?;
    (end > start).then(|| raw[start..=end].to_string())
}

// ─────────────────────────────────────────────────────────────
// Risk analysis
// ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAnalysis {
    summary: Option<String>,
    #[serde(default)]
    action_items: Vec<String>,
    primary_condition_code: Option<RawCode>,
    #[serde(default)]
    history_codes: Vec<RawCode>,
    insurance_note: Option<String>,
}

#[derive(Deserialize)]
struct RawCode {
    code: Option<String>,
    description: Option<String>,
}

/// Normalize a raw analysis reply into a `RiskAnalysisResult`.
///
/// `score` is the deterministic score computed before the request; it is
/// copied through untouched no matter what the payload claims. This
/// function never fails: unparseable text becomes a degraded result whose
/// summary is the cleaned, truncated input.
pub fn parse_risk_response(raw: &str, score: u8, source: &str) -> RiskAnalysisResult {
    let candidate = extract_json_candidate(raw);

    let parsed: RawAnalysis = match serde_json::from_str(&candidate) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(source, error = %e, "analysis reply unparseable, degrading");
            return RiskAnalysisResult {
                numeric_score: score,
                summary: truncate_chars(&clean_markdown(raw), DEGRADED_SUMMARY_MAX_CHARS),
                action_items: vec![
                    "Monitor daily vitals".to_string(),
                    "Consult healthcare provider".to_string(),
                ],
                coding_pipeline: Vec::new(),
                insurance_note: "Review required.".to_string(),
                source: source.to_string(),
                timestamp: chrono::Local::now().naive_local(),
            };
        }
    };

    // Primary first, then history codes in the order the model listed them
    let mut coding_pipeline = Vec::with_capacity(1 + parsed.history_codes.len());
    let primary = parsed.primary_condition_code.unwrap_or(RawCode {
        code: None,
        description: None,
    });
    coding_pipeline.push(IcdCode {
        code: primary.code.unwrap_or_else(|| "N/A".to_string()),
        description: primary.description.unwrap_or_else(|| "Unknown".to_string()),
        kind: CodeKind::Primary,
    });
    for entry in parsed.history_codes {
        coding_pipeline.push(IcdCode {
            code: entry.code.unwrap_or_else(|| "N/A".to_string()),
            description: entry.description.unwrap_or_else(|| "Unknown".to_string()),
            kind: CodeKind::History,
        });
    }

    RiskAnalysisResult {
        numeric_score: score,
        summary: clean_markdown(parsed.summary.as_deref().unwrap_or("Analysis completed.")),
        action_items: parsed
            .action_items
            .iter()
            .map(|item| clean_markdown(item))
            .collect(),
        coding_pipeline,
        insurance_note: clean_markdown(
            parsed.insurance_note.as_deref().unwrap_or("Review required."),
        ),
        source: source.to_string(),
        timestamp: chrono::Local::now().naive_local(),
    }
}

// ─────────────────────────────────────────────────────────────
// Quick replies
// ─────────────────────────────────────────────────────────────

/// Parse a quick-reply suggestion list. Anything other than a clean JSON
/// string array yields an empty list — suggestions are decoration, never
/// worth an error.
pub fn parse_quick_replies(raw: &str) -> Vec<String> {
    let candidate = extract_json_array_candidate(raw);
    match serde_json::from_str::<Vec<String>>(&candidate) {
        Ok(items) => items
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .take(MAX_QUICK_REPLIES)
            .collect(),
        Err(_) => Vec::new(),
    }
}

fn extract_json_array_candidate(raw: &str) -> String {
    if let Some(fenced) = extract_fenced_block(raw) {
        return fenced;
    }
    match (raw.find('['), raw.rfind(']')) {
        (Some(start), Some(end)) if end > start => raw[start..=end].to_string(),
        _ => raw.trim().to_string(),
    }
}

// ─────────────────────────────────────────────────────────────
// Scanned vitals
// ─────────────────────────────────────────────────────────────

/// Vitals extracted from a photographed clinical document. Everything is
/// optional — a lab report rarely carries the full set.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannedVitals {
    pub systolic_bp: Option<u32>,
    pub glucose: Option<u32>,
    pub heart_rate: Option<u32>,
    pub spo2: Option<u32>,
    pub temperature_f: Option<f32>,
    pub weight_kg: Option<f32>,
}

impl ScannedVitals {
    pub fn is_empty(&self) -> bool {
        self.systolic_bp.is_none()
            && self.glucose.is_none()
            && self.heart_rate.is_none()
            && self.spo2.is_none()
            && self.temperature_f.is_none()
            && self.weight_kg.is_none()
    }
}

/// Strict normalizer for the document-scan task. Unlike the others this
/// one is allowed to fail: fabricating vitals out of unreadable text would
/// be unsafe, so the caller must be able to detect total failure and ask
/// for manual entry.
pub fn parse_scanned_vitals(raw: &str) -> Result<ScannedVitals, NormalizeError> {
    let candidate = extract_json_candidate(raw);
    let vitals: ScannedVitals = serde_json::from_str(&candidate)
        .map_err(|e| NormalizeError::Unparseable(e.to_string()))?;
    if vitals.is_empty() {
        return Err(NormalizeError::Unparseable(
            "no vitals present in extraction".to_string(),
        ));
    }
    Ok(vitals)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_markdown_strips_decorations() {
        assert_eq!(clean_markdown("**bold**"), "bold");
        assert_eq!(clean_markdown("### Header"), "Header");
        assert_eq!(clean_markdown("* item"), "- item");
        assert_eq!(clean_markdown("  padded  "), "padded");
    }

    #[test]
    fn candidate_from_fenced_block() {
        let raw = "Here you go:\n```json\n{\"a\": 1}\n```\nthanks";
        assert_eq!(extract_json_candidate(raw), "{\"a\": 1}");
    }

    #[test]
    fn candidate_from_prose_with_braces() {
        let raw = "The result is {\"a\": {\"b\": 2}} as requested.";
        assert_eq!(extract_json_candidate(raw), "{\"a\": {\"b\": 2}}");
    }

    #[test]
    fn candidate_ignores_braces_inside_strings() {
        let raw = "{\"a\": \"}\", \"b\": 1} trailing";
        assert_eq!(extract_json_candidate(raw), "{\"a\": \"}\", \"b\": 1}");
    }

    #[test]
    fn candidate_whole_text_when_no_structure() {
        assert_eq!(extract_json_candidate("  no json here  "), "no json here");
    }

    #[test]
    fn risk_parse_happy_path() {
        let raw = r#"{
            "summary": "**Elevated** blood pressure with good adherence.",
            "actionItems": ["* Reduce sodium", "Walk daily", "Sleep 8 hours"],
            "primaryConditionCode": {"code": "I10", "description": "Essential hypertension"},
            "historyCodes": [{"code": "Z86.74", "description": "History of cardiac arrest"}],
            "insuranceNote": "Monitoring is medically necessary."
        }"#;

        let result = parse_risk_response(raw, 42, "gemini-2.5-flash");
        assert_eq!(result.numeric_score, 42);
        assert_eq!(result.summary, "Elevated blood pressure with good adherence.");
        assert_eq!(result.action_items[0], "- Reduce sodium");
        assert_eq!(result.coding_pipeline.len(), 2);
        assert_eq!(result.coding_pipeline[0].kind, CodeKind::Primary);
        assert_eq!(result.coding_pipeline[0].code, "I10");
        assert_eq!(result.coding_pipeline[1].kind, CodeKind::History);
        assert_eq!(result.source, "gemini-2.5-flash");
    }

    #[test]
    fn risk_parse_primary_only_has_one_entry() {
        let raw = r#"{
            "summary": "Stable.",
            "actionItems": [],
            "primaryConditionCode": {"code": "I10", "description": "Essential hypertension"},
            "historyCodes": [],
            "insuranceNote": "n/a"
        }"#;
        let result = parse_risk_response(raw, 10, "test");
        assert_eq!(result.coding_pipeline.len(), 1);
        assert_eq!(result.coding_pipeline[0].kind, CodeKind::Primary);
        assert_eq!(result.coding_pipeline[0].code, "I10");
    }

    #[test]
    fn risk_parse_score_never_taken_from_payload() {
        let raw = r#"{"summary": "s", "numericScore": 99, "actionItems": [],
                      "primaryConditionCode": {"code": "A", "description": "B"},
                      "historyCodes": [], "insuranceNote": "n"}"#;
        let result = parse_risk_response(raw, 15, "test");
        assert_eq!(result.numeric_score, 15);
    }

    #[test]
    fn risk_parse_degrades_on_prose() {
        let prose = "I'm sorry, I can only describe this **qualitatively**.";
        let result = parse_risk_response(prose, 33, "backup:/analyze");
        assert_eq!(result.numeric_score, 33);
        assert!(result.summary.contains("qualitatively"));
        assert!(!result.summary.contains("**"));
        assert!(result.coding_pipeline.is_empty());
        assert_eq!(result.action_items.len(), 2);
    }

    #[test]
    fn risk_parse_degraded_summary_is_bounded() {
        let prose = "x".repeat(2000);
        let result = parse_risk_response(&prose, 10, "test");
        assert_eq!(result.summary.chars().count(), DEGRADED_SUMMARY_MAX_CHARS);
    }

    #[test]
    fn risk_parse_fenced_reply() {
        let raw = "Sure!\n```json\n{\"summary\": \"ok\", \"actionItems\": [\"a\"], \"primaryConditionCode\": {\"code\": \"E11\", \"description\": \"T2D\"}, \"historyCodes\": [], \"insuranceNote\": \"n\"}\n```";
        let result = parse_risk_response(raw, 20, "test");
        assert_eq!(result.summary, "ok");
        assert_eq!(result.coding_pipeline[0].code, "E11");
    }

    #[test]
    fn quick_replies_cap_at_three() {
        let raw = r#"["a", "b", "c", "d"]"#;
        assert_eq!(parse_quick_replies(raw), vec!["a", "b", "c"]);
    }

    #[test]
    fn quick_replies_tolerate_fencing_and_garbage() {
        assert_eq!(
            parse_quick_replies("```json\n[\"yes\", \"no\"]\n```"),
            vec!["yes", "no"]
        );
        assert!(parse_quick_replies("not a list at all").is_empty());
        assert!(parse_quick_replies("[1, 2, 3]").is_empty());
    }

    #[test]
    fn scanned_vitals_strict_parse() {
        let raw = r#"{"systolicBp": 142, "glucose": 180, "spo2": 96}"#;
        let vitals = parse_scanned_vitals(raw).unwrap();
        assert_eq!(vitals.systolic_bp, Some(142));
        assert_eq!(vitals.glucose, Some(180));
        assert_eq!(vitals.heart_rate, None);
    }

    #[test]
    fn scanned_vitals_reject_prose() {
        assert!(parse_scanned_vitals("The document is illegible.").is_err());
    }

    #[test]
    fn scanned_vitals_reject_empty_extraction() {
        assert!(parse_scanned_vitals("{}").is_err());
    }
}
