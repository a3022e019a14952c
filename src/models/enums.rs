use serde::{Deserialize, Serialize};

/// Error for parsing an enum from its string form.
#[derive(Debug, thiserror::Error)]
#[error("Invalid value '{value}' for {field}")]
pub struct InvalidEnum {
    pub field: String,
    pub value: String,
}

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = InvalidEnum;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(SmokingStatus {
    Never => "never",
    Former => "former",
    Current => "current",
});

str_enum!(ExerciseFrequency {
    Sedentary => "sedentary",
    Light => "light",
    Moderate => "moderate",
    Active => "active",
});

str_enum!(DietQuality {
    Poor => "poor",
    Average => "average",
    Healthy => "healthy",
});

str_enum!(MessageRole {
    Patient => "patient",
    Solace => "solace",
});

str_enum!(
    /// Persona the assistant adopts for chat generation.
    AssistantMode {
        General => "general",
        Therapy => "therapy",
    }
);

str_enum!(
    /// Position of a diagnosis code in the coding pipeline.
    CodeKind {
        Primary => "primary",
        History => "history",
        Symptom => "symptom",
    }
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn round_trip_smoking_status() {
        for s in ["never", "former", "current"] {
            let parsed = SmokingStatus::from_str(s).unwrap();
            assert_eq!(parsed.as_str(), s);
        }
    }

    #[test]
    fn invalid_value_is_rejected() {
        let err = ExerciseFrequency::from_str("couch").unwrap_err();
        assert!(err.to_string().contains("couch"));
        assert!(err.to_string().contains("ExerciseFrequency"));
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&CodeKind::Primary).unwrap();
        assert_eq!(json, "\"primary\"");
        let back: CodeKind = serde_json::from_str("\"history\"").unwrap();
        assert_eq!(back, CodeKind::History);
    }

    #[test]
    fn message_role_strings() {
        assert_eq!(MessageRole::Patient.as_str(), "patient");
        assert_eq!(MessageRole::Solace.as_str(), "solace");
    }
}
