use serde::{Deserialize, Serialize};

/// Self-reported physiological readings for the current day.
///
/// `systolic_bp` is derived, never entered directly: when both the morning
/// and evening readings are present it is their rounded average, when only
/// one is present it is that reading, and when neither is present it is 0.
/// A reading of 0 means "not taken".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicalVitals {
    pub bp_morning: u32,
    pub bp_evening: u32,
    pub systolic_bp: u32,
    pub glucose: u32,
    pub heart_rate: u32,
    pub spo2: u32,
    pub temperature_f: f32,
    pub weight_kg: f32,
    pub sleep_quality: u8,
    pub missed_doses: u32,
    pub note: String,
}

impl ClinicalVitals {
    /// Record a new morning blood-pressure reading and rederive `systolic_bp`.
    pub fn set_bp_morning(&mut self, value: u32) {
        self.bp_morning = value;
        self.systolic_bp = derive_systolic(self.bp_morning, self.bp_evening);
    }

    /// Record a new evening blood-pressure reading and rederive `systolic_bp`.
    pub fn set_bp_evening(&mut self, value: u32) {
        self.bp_evening = value;
        self.systolic_bp = derive_systolic(self.bp_morning, self.bp_evening);
    }

    /// The reading the risk score uses: the worse of the two BP measurements.
    pub fn peak_systolic(&self) -> u32 {
        self.bp_morning.max(self.bp_evening)
    }
}

impl Default for ClinicalVitals {
    fn default() -> Self {
        Self {
            bp_morning: 120,
            bp_evening: 0,
            systolic_bp: 120,
            glucose: 100,
            heart_rate: 72,
            spo2: 98,
            temperature_f: 98.6,
            weight_kg: 70.0,
            sleep_quality: 7,
            missed_doses: 0,
            note: String::new(),
        }
    }
}

/// Derive the displayed systolic value from morning/evening readings.
///
/// Both present: rounded average. One present: that reading (max of the
/// pair, since the absent one is 0). Neither: 0.
fn derive_systolic(morning: u32, evening: u32) -> u32 {
    if morning > 0 && evening > 0 {
        ((morning + evening) as f64 / 2.0).round() as u32
    } else {
        morning.max(evening)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_readings_average_rounded() {
        let mut vitals = ClinicalVitals::default();
        vitals.set_bp_morning(130);
        vitals.set_bp_evening(150);
        assert_eq!(vitals.systolic_bp, 140);

        // 131 + 150 = 281 / 2 = 140.5 → rounds up
        vitals.set_bp_morning(131);
        assert_eq!(vitals.systolic_bp, 141);
    }

    #[test]
    fn single_reading_wins() {
        let mut vitals = ClinicalVitals::default();
        vitals.set_bp_morning(0);
        vitals.set_bp_evening(150);
        assert_eq!(vitals.systolic_bp, 150);
    }

    #[test]
    fn no_readings_is_zero() {
        let mut vitals = ClinicalVitals::default();
        vitals.set_bp_morning(0);
        vitals.set_bp_evening(0);
        assert_eq!(vitals.systolic_bp, 0);
    }

    #[test]
    fn peak_systolic_is_max_of_pair() {
        let mut vitals = ClinicalVitals::default();
        vitals.set_bp_morning(120);
        vitals.set_bp_evening(185);
        assert_eq!(vitals.peak_systolic(), 185);
        // Derived average is unaffected by which reading is higher
        assert_eq!(vitals.systolic_bp, 153);
    }
}
