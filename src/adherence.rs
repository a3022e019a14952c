//! Medication adherence streak tracking.
//!
//! The streak advances at most once per calendar day: the first toggle that
//! leaves every tracked medication marked taken increments it, and an
//! un-check later the same day reverses the increment by stamping the
//! update timestamp back to yesterday. No undo log is needed — the two
//! timestamps carry the whole story.
//!
//! Transitions are pure `(state, event) -> state` functions so they can be
//! driven with fixed clocks in tests; `toggle_taken` is the convenience
//! wrapper the UI layer calls.

use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Medication, PatientProfile};

/// The streak-bearing slice of the profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdherenceState {
    pub streak: u32,
    pub last_streak_update: NaiveDateTime,
}

impl AdherenceState {
    pub fn of(profile: &PatientProfile) -> Self {
        Self {
            streak: profile.streak,
            last_streak_update: profile.last_streak_update,
        }
    }

    fn store(self, profile: &mut PatientProfile) {
        profile.streak = self.streak;
        profile.last_streak_update = self.last_streak_update;
    }
}

/// Apply one taken/untaken toggle event to the streak state.
///
/// `all_taken_now` is evaluated against the medication list *after* the
/// toggle. Four cases:
/// - complete + not yet credited today → streak +1, stamp now;
/// - incomplete + credited today → streak −1 (floor 0), stamp yesterday so
///   a re-completion today counts as new;
/// - the other two combinations are no-ops.
pub fn on_toggle(state: AdherenceState, all_taken_now: bool, now: NaiveDateTime) -> AdherenceState {
    let today = now.date();
    let is_today = state.last_streak_update.date() == today;

    if all_taken_now && !is_today {
        AdherenceState {
            streak: state.streak + 1,
            last_streak_update: now,
        }
    } else if !all_taken_now && is_today {
        let yesterday = today.pred_opt().unwrap_or(today);
        AdherenceState {
            streak: state.streak.saturating_sub(1),
            last_streak_update: yesterday.and_time(NaiveTime::MIN),
        }
    } else {
        state
    }
}

/// Application-load check: a gap of more than one calendar day since the
/// last streak-affecting event means at least one full day was skipped, so
/// the streak is broken. A gap of exactly 0 or 1 days keeps it alive.
pub fn on_load(state: AdherenceState, now: NaiveDateTime) -> AdherenceState {
    let gap_days = now
        .date()
        .signed_duration_since(state.last_streak_update.date())
        .num_days();

    if gap_days > 1 && state.streak > 0 {
        AdherenceState { streak: 0, ..state }
    } else {
        state
    }
}

/// Reward badge earned at a streak milestone, if any.
pub fn milestone_badge(streak: u32) -> Option<&'static str> {
    match streak {
        7 => Some("One-Week Streak"),
        30 => Some("One-Month Streak"),
        100 => Some("Century Streak"),
        _ => None,
    }
}

/// Flip one medication's taken flag and feed the result through the streak
/// reducer, writing any change back into the profile. Crossing a streak
/// milestone awards its badge; badges, once earned, are never taken away.
///
/// Returns `false` (and changes nothing) when the id is unknown.
pub fn toggle_taken(
    medications: &mut [Medication],
    profile: &mut PatientProfile,
    id: Uuid,
    now: NaiveDateTime,
) -> bool {
    let Some(med) = medications.iter_mut().find(|m| m.id == id) else {
        return false;
    };
    med.taken = !med.taken;

    let all_taken_now = !medications.is_empty() && medications.iter().all(|m| m.taken);

    let next = on_toggle(AdherenceState::of(profile), all_taken_now, now);
    if next != AdherenceState::of(profile) {
        tracing::debug!(streak = next.streak, "streak updated");
        next.store(profile);

        if let Some(badge) = milestone_badge(profile.streak) {
            if !profile.badges.iter().any(|b| b == badge) {
                tracing::info!(badge, "streak milestone reached");
                profile.badges.push(badge.to_string());
            }
        }
    }
    true
}
