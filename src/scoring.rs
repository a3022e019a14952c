//! Deterministic risk score.
//!
//! Pure threshold arithmetic over the day's vitals and the patient's
//! lifestyle profile. The score is computed locally, attached to every
//! analysis result, and never replaced by model output — the AI layer only
//! supplies the qualitative interpretation around this number.

use crate::models::enums::{ExerciseFrequency, SmokingStatus};
use crate::models::{ClinicalVitals, PatientProfile};

/// Floor of the computed score.
pub const MIN_SCORE: u8 = 1;
/// Ceiling of the computed score.
pub const MAX_SCORE: u8 = 100;

/// Compute the risk score, an integer in `[1, 100]`.
///
/// Additive thresholds over a base of 10. Blood pressure uses the worse of
/// the morning/evening readings, not the displayed average. Missed doses
/// contribute linearly (5 points each) with no cap of their own — the final
/// clamp bounds the total.
pub fn score(profile: &PatientProfile, vitals: &ClinicalVitals) -> u8 {
    let mut score: i64 = 10;

    let bp = vitals.peak_systolic();
    if bp >= 180 {
        score += 50;
    } else if bp >= 140 {
        score += 25;
    } else if bp >= 130 {
        score += 10;
    }

    if vitals.glucose >= 250 {
        score += 40;
    } else if vitals.glucose >= 180 {
        score += 20;
    }

    // A zero reading means "not taken" — only a real measurement can land
    // in the low branches.
    if vitals.spo2 > 0 {
        if vitals.spo2 < 90 {
            score += 30;
        } else if vitals.spo2 < 95 {
            score += 15;
        }
    }

    if vitals.heart_rate > 0 && (vitals.heart_rate > 100 || vitals.heart_rate < 50) {
        score += 15;
    }

    if vitals.temperature_f > 99.5 {
        score += 20;
    }

    score += i64::from(vitals.missed_doses) * 5;

    if profile.smoking == SmokingStatus::Current {
        score += 15;
    }
    if profile.exercise == ExerciseFrequency::Sedentary {
        score += 10;
    }

    score.clamp(i64::from(MIN_SCORE), i64::from(MAX_SCORE)) as u8
}
