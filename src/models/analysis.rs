use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::enums::CodeKind;

/// One entry in the coding pipeline: an ICD-10-CM code with its position
/// (primary condition first, history-derived codes after).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IcdCode {
    pub code: String,
    pub description: String,
    pub kind: CodeKind,
}

/// The outcome of one risk-analysis run.
///
/// `numeric_score` is the deterministic client-side score. The model only
/// contributes the qualitative fields; nothing in the pipeline may replace
/// the number. Results are immutable — a new run replaces the whole value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAnalysisResult {
    pub numeric_score: u8,
    pub summary: String,
    pub action_items: Vec<String>,
    pub coding_pipeline: Vec<IcdCode>,
    pub insurance_note: String,
    /// Tier label of whichever backend produced the interpretation.
    pub source: String,
    pub timestamp: NaiveDateTime,
}

impl RiskAnalysisResult {
    /// Primary code of the coding pipeline, if the analysis produced one.
    pub fn primary_code(&self) -> Option<&IcdCode> {
        self.coding_pipeline
            .iter()
            .find(|c| c.kind == CodeKind::Primary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_code_found_first() {
        let result = RiskAnalysisResult {
            numeric_score: 35,
            summary: "Elevated blood pressure.".into(),
            action_items: vec!["Reduce sodium".into()],
            coding_pipeline: vec![
                IcdCode {
                    code: "I10".into(),
                    description: "Essential hypertension".into(),
                    kind: CodeKind::Primary,
                },
                IcdCode {
                    code: "Z86.74".into(),
                    description: "History of cardiac arrest".into(),
                    kind: CodeKind::History,
                },
            ],
            insurance_note: "Monitoring justified.".into(),
            source: "gemini-2.5-flash".into(),
            timestamp: chrono::Local::now().naive_local(),
        };
        assert_eq!(result.primary_code().unwrap().code, "I10");
    }

    #[test]
    fn no_primary_in_empty_pipeline() {
        let result = RiskAnalysisResult {
            numeric_score: 10,
            summary: String::new(),
            action_items: vec![],
            coding_pipeline: vec![],
            insurance_note: String::new(),
            source: "offline".into(),
            timestamp: chrono::Local::now().naive_local(),
        };
        assert!(result.primary_code().is_none());
    }
}
