use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::enums::{DietQuality, ExerciseFrequency, SmokingStatus};

/// Demographic and lifestyle attributes for the active patient, plus the
/// medication-reward fields maintained by the adherence tracker.
///
/// `streak` counts consecutive calendar days on which every tracked
/// medication was marked taken. It is unsigned on purpose: no code path may
/// drive it below zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientProfile {
    pub name: String,
    pub age: u32,
    pub condition: String,
    pub history: String,
    pub allergies: String,
    pub smoking: SmokingStatus,
    pub exercise: ExerciseFrequency,
    pub diet: DietQuality,
    pub streak: u32,
    pub last_streak_update: NaiveDateTime,
    pub last_checkup: Option<NaiveDateTime>,
    pub badges: Vec<String>,
}

impl Default for PatientProfile {
    fn default() -> Self {
        Self {
            name: "Patient".to_string(),
            age: 45,
            condition: "Hypertension".to_string(),
            history: "None".to_string(),
            allergies: "None".to_string(),
            smoking: SmokingStatus::Never,
            exercise: ExerciseFrequency::Light,
            diet: DietQuality::Average,
            streak: 0,
            last_streak_update: chrono::Local::now().naive_local(),
            last_checkup: None,
            badges: Vec::new(),
        }
    }
}
