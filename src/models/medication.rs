use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A tracked medication with a daily taken flag.
///
/// `taken` is not time-boxed: nothing resets it at midnight. The adherence
/// tracker interprets it per calendar day via the streak timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medication {
    pub id: Uuid,
    pub name: String,
    pub dosage: String,
    /// Scheduled time of day, e.g. "08:00".
    pub time: String,
    pub taken: bool,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl Medication {
    pub fn new(name: &str, dosage: &str, time: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            dosage: dosage.to_string(),
            time: time.to_string(),
            taken: false,
            start_date: None,
            end_date: None,
        }
    }
}
