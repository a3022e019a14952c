//! Single-writer application state.
//!
//! One value owns the profile, vitals, medication list, and chat sessions.
//! Every mutation is a whole-value replacement followed by a store write,
//! so the persisted form is always one of the states the UI actually saw.
//! Persistence failures are logged, never raised — losing a write must not
//! take the session down.

use chrono::NaiveDateTime;
use serde::Serialize;
use uuid::Uuid;

use crate::adherence::{self, AdherenceState};
use crate::models::{ChatMessage, ClinicalVitals, Medication, PatientProfile, RiskAnalysisResult};
use crate::sessions::SessionBook;
use crate::store::{JsonStore, MEDICATIONS_KEY, PROFILE_KEY, SESSIONS_KEY};

pub struct AppState {
    store: JsonStore,
    pub profile: PatientProfile,
    /// Today's readings. Deliberately not persisted — vitals are re-entered
    /// each day and stale numbers must not masquerade as fresh ones.
    pub vitals: ClinicalVitals,
    pub medications: Vec<Medication>,
    pub sessions: SessionBook,
    /// Most recent analysis; replaced wholesale by each run.
    pub last_analysis: Option<RiskAnalysisResult>,
}

impl AppState {
    /// Read everything once, falling back to defaults for missing or
    /// corrupt entries, then apply the streak load check.
    pub fn load(store: JsonStore) -> Self {
        Self::load_at(store, chrono::Local::now().naive_local())
    }

    fn load_at(store: JsonStore, now: NaiveDateTime) -> Self {
        let profile: PatientProfile = store.load(PROFILE_KEY).unwrap_or_default();
        let medications: Vec<Medication> = store.load(MEDICATIONS_KEY).unwrap_or_default();
        let sessions: SessionBook = store.load(SESSIONS_KEY).unwrap_or_default();

        let mut state = Self {
            store,
            profile,
            vitals: ClinicalVitals::default(),
            medications,
            sessions,
            last_analysis: None,
        };

        let checked = adherence::on_load(AdherenceState::of(&state.profile), now);
        if checked.streak != state.profile.streak {
            tracing::info!(
                old = state.profile.streak,
                "streak broken by a skipped day, resetting"
            );
            state.profile.streak = checked.streak;
            state.persist(PROFILE_KEY, &state.profile);
        }

        state
    }

    // ── Medications ─────────────────────────────────────────

    pub fn add_medication(&mut self, medication: Medication) {
        self.medications.push(medication);
        self.persist(MEDICATIONS_KEY, &self.medications);
    }

    pub fn remove_medication(&mut self, id: Uuid) -> bool {
        let before = self.medications.len();
        self.medications.retain(|m| m.id != id);
        let removed = self.medications.len() != before;
        if removed {
            self.persist(MEDICATIONS_KEY, &self.medications);
        }
        removed
    }

    /// Toggle a medication's taken flag, updating the streak.
    pub fn toggle_medication(&mut self, id: Uuid) -> bool {
        self.toggle_medication_at(id, chrono::Local::now().naive_local())
    }

    fn toggle_medication_at(&mut self, id: Uuid, now: NaiveDateTime) -> bool {
        let found = adherence::toggle_taken(&mut self.medications, &mut self.profile, id, now);
        if found {
            self.persist(MEDICATIONS_KEY, &self.medications);
            self.persist(PROFILE_KEY, &self.profile);
        }
        found
    }

    // ── Profile & vitals ────────────────────────────────────

    /// Replace the profile. Invalidates the last analysis — its narrative
    /// was written against the old profile.
    pub fn update_profile(&mut self, profile: PatientProfile) {
        self.profile = profile;
        self.last_analysis = None;
        self.persist(PROFILE_KEY, &self.profile);
    }

    pub fn update_vitals(&mut self, vitals: ClinicalVitals) {
        self.vitals = vitals;
    }

    pub fn record_analysis(&mut self, result: RiskAnalysisResult) {
        self.profile.last_checkup = Some(result.timestamp);
        self.last_analysis = Some(result);
        self.persist(PROFILE_KEY, &self.profile);
    }

    // ── Chat ────────────────────────────────────────────────

    pub fn push_message(&mut self, message: ChatMessage) {
        self.sessions.append(message);
        self.persist(SESSIONS_KEY, &self.sessions);
    }

    pub fn new_session(&mut self, title: &str) -> Uuid {
        let id = self.sessions.create(title);
        self.persist(SESSIONS_KEY, &self.sessions);
        id
    }

    pub fn switch_session(&mut self, id: Uuid) -> bool {
        let switched = self.sessions.switch(id);
        if switched {
            self.persist(SESSIONS_KEY, &self.sessions);
        }
        switched
    }

    /// Drop the current conversation. The session book immediately
    /// guarantees a fresh current session.
    pub fn clear_current_chat(&mut self) {
        let id = self.sessions.current_id();
        self.sessions.delete(id);
        self.persist(SESSIONS_KEY, &self.sessions);
    }

    // ── Reset ───────────────────────────────────────────────

    /// Full application reset: wipe the store and return to defaults.
    pub fn reset(&mut self) {
        if let Err(e) = self.store.clear() {
            tracing::warn!(error = %e, "store clear failed during reset");
        }
        self.profile = PatientProfile::default();
        self.vitals = ClinicalVitals::default();
        self.medications = Vec::new();
        self.sessions = SessionBook::new();
        self.last_analysis = None;
    }

    fn persist<T: Serialize>(&self, key: &str, value: &T) {
        if let Err(e) = self.store.save(key, value) {
            tracing::warn!(key, error = %e, "persist failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn temp_state() -> (tempfile::TempDir, AppState) {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::load(JsonStore::at(dir.path()));
        (dir, state)
    }

    #[test]
    fn fresh_store_loads_defaults() {
        let (_dir, state) = temp_state();
        assert_eq!(state.profile.streak, 0);
        assert!(state.medications.is_empty());
        assert_eq!(state.sessions.sessions().len(), 1);
        assert!(state.last_analysis.is_none());
    }

    #[test]
    fn mutations_survive_reload() {
        let dir = tempfile::tempdir().unwrap();

        {
            let mut state = AppState::load(JsonStore::at(dir.path()));
            state.add_medication(Medication::new("Lisinopril", "10mg", "08:00"));
            state.push_message(ChatMessage::from_patient("hello", None));
        }

        let state = AppState::load(JsonStore::at(dir.path()));
        assert_eq!(state.medications.len(), 1);
        assert_eq!(state.sessions.current().messages.len(), 1);
    }

    #[test]
    fn load_check_resets_stale_streak() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::at(dir.path());
        let profile = PatientProfile {
            streak: 5,
            last_streak_update: at(2026, 3, 7, 20),
            ..PatientProfile::default()
        };
        store.save(PROFILE_KEY, &profile).unwrap();

        let state = AppState::load_at(JsonStore::at(dir.path()), at(2026, 3, 10, 8));
        assert_eq!(state.profile.streak, 0);

        // And the reset was written back
        let persisted: PatientProfile = store.load(PROFILE_KEY).unwrap();
        assert_eq!(persisted.streak, 0);
    }

    #[test]
    fn load_check_keeps_fresh_streak() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::at(dir.path());
        let profile = PatientProfile {
            streak: 5,
            last_streak_update: at(2026, 3, 9, 20),
            ..PatientProfile::default()
        };
        store.save(PROFILE_KEY, &profile).unwrap();

        let state = AppState::load_at(JsonStore::at(dir.path()), at(2026, 3, 10, 8));
        assert_eq!(state.profile.streak, 5);
    }

    #[test]
    fn toggling_all_meds_updates_streak_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = AppState::load_at(JsonStore::at(dir.path()), at(2026, 3, 10, 8));
        state.profile.last_streak_update = at(2026, 3, 9, 8);
        state.add_medication(Medication::new("A", "1mg", "08:00"));
        let id = state.medications[0].id;

        assert!(state.toggle_medication_at(id, at(2026, 3, 10, 9)));
        assert_eq!(state.profile.streak, 1);

        let reloaded = AppState::load_at(JsonStore::at(dir.path()), at(2026, 3, 10, 10));
        assert_eq!(reloaded.profile.streak, 1);
        assert!(reloaded.medications[0].taken);
    }

    #[test]
    fn profile_update_invalidates_analysis() {
        let (_dir, mut state) = temp_state();
        state.record_analysis(RiskAnalysisResult {
            numeric_score: 20,
            summary: "ok".into(),
            action_items: vec![],
            coding_pipeline: vec![],
            insurance_note: String::new(),
            source: "test".into(),
            timestamp: chrono::Local::now().naive_local(),
        });
        assert!(state.last_analysis.is_some());

        state.update_profile(PatientProfile::default());
        assert!(state.last_analysis.is_none());
    }

    #[test]
    fn clear_current_chat_leaves_a_fresh_session() {
        let (_dir, mut state) = temp_state();
        state.push_message(ChatMessage::from_patient("hello", None));
        let old = state.sessions.current_id();

        state.clear_current_chat();
        assert_ne!(state.sessions.current_id(), old);
        assert!(state.sessions.current().messages.is_empty());
    }

    #[test]
    fn reset_returns_to_defaults_and_wipes_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = AppState::load(JsonStore::at(dir.path()));
        state.add_medication(Medication::new("A", "1mg", "08:00"));
        state.reset();
        assert!(state.medications.is_empty());

        let reloaded = AppState::load(JsonStore::at(dir.path()));
        assert!(reloaded.medications.is_empty());
    }
}
