pub mod analysis;
pub mod conversation;
pub mod enums;
pub mod medication;
pub mod profile;
pub mod vitals;

pub use analysis::{IcdCode, RiskAnalysisResult};
pub use conversation::{ChatMessage, ChatSession};
pub use medication::Medication;
pub use profile::PatientProfile;
pub use vitals::ClinicalVitals;
