use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

id_newtype!(PatientId);

/// Declares a closed set of risk-factor values along with their exact wire strings.
macro_rules! wire_enum {
    ($name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($wire => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

wire_enum!(SmokingHistory {
    Never => "never smoked",
    Former => "former smoker",
    Current => "current smoker",
});

wire_enum!(PollutionLevel {
    Low => "low",
    Medium => "medium",
    High => "high",
});

wire_enum!(GeneticRisk {
    Positive => "positive",
    Negative => "negative",
});

wire_enum!(RiskLevel {
    Low => "Low",
    Medium => "Medium",
    High => "High",
});

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormField {
    Age,
    SmokingHistory,
    PollutionLevel,
    GeneticRisk,
}

impl FormField {
    pub const ALL: [FormField; 4] = [
        FormField::Age,
        FormField::SmokingHistory,
        FormField::PollutionLevel,
        FormField::GeneticRisk,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FormField::Age => "age",
            FormField::SmokingHistory => "smoking_history",
            FormField::PollutionLevel => "pollution_level",
            FormField::GeneticRisk => "genetic_risk",
        }
    }
}

impl FromStr for FormField {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        FormField::ALL
            .into_iter()
            .find(|field| field.name() == value)
            .ok_or_else(|| UnknownVariant {
                kind: "FormField",
                value: value.to_string(),
            })
    }
}

/// Raw form values exactly as the user entered them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormInput {
    pub age: String,
    pub smoking_history: String,
    pub pollution_level: String,
    pub genetic_risk: String,
}

impl FormInput {
    pub fn get(&self, field: FormField) -> &str {
        match field {
            FormField::Age => &self.age,
            FormField::SmokingHistory => &self.smoking_history,
            FormField::PollutionLevel => &self.pollution_level,
            FormField::GeneticRisk => &self.genetic_risk,
        }
    }

    pub fn set(&mut self, field: FormField, value: impl Into<String>) {
        let slot = match field {
            FormField::Age => &mut self.age,
            FormField::SmokingHistory => &mut self.smoking_history,
            FormField::PollutionLevel => &mut self.pollution_level,
            FormField::GeneticRisk => &mut self.genetic_risk,
        };
        *slot = value.into();
    }

    pub fn is_empty(&self) -> bool {
        FormField::ALL.iter().all(|field| self.get(*field).is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: PatientId,
    pub age: i64,
    pub smoking_history: String,
    pub pollution_level: String,
    pub genetic_risk: String,
    pub risk_level: String,
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    pub risk_level: String,
    pub recommendation: String,
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
