//! Rule table that turns risk factors into a risk level and recommendation.

use serde_json::Number;
use shared::{
    domain::{GeneticRisk, PollutionLevel, Prediction, RiskLevel, SmokingHistory},
    protocol::RiskInput,
};

use crate::Rejection;

const URGENT_ADVICE: &str = "Schedule early diagnostic tests.";
const PERIODIC_ADVICE: &str = "Recommend periodic check-ups.";
const ROUTINE_ADVICE: &str = "Maintain healthy habits and regular checkups.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiskFactors {
    pub age: i64,
    pub smoking_history: SmokingHistory,
    pub pollution_level: PollutionLevel,
    pub genetic_risk: GeneticRisk,
}

impl RiskFactors {
    pub fn from_input(input: &RiskInput) -> Result<Self, Rejection> {
        Ok(Self {
            age: positive_whole_age(&input.age)?,
            smoking_history: parse_choice("smoking_history", &input.smoking_history)?,
            pollution_level: parse_choice("pollution_level", &input.pollution_level)?,
            genetic_risk: parse_choice("genetic_risk", &input.genetic_risk)?,
        })
    }
}

/// First matching rule wins.
pub fn assess_risk(factors: &RiskFactors) -> (RiskLevel, &'static str) {
    let current_smoker = factors.smoking_history == SmokingHistory::Current;

    if factors.genetic_risk == GeneticRisk::Positive && (factors.age > 50 || current_smoker) {
        (RiskLevel::High, URGENT_ADVICE)
    } else if factors.pollution_level == PollutionLevel::High
        && (current_smoker || factors.age > 60)
    {
        (RiskLevel::High, URGENT_ADVICE)
    } else if factors.smoking_history == SmokingHistory::Former
        && matches!(
            factors.pollution_level,
            PollutionLevel::Medium | PollutionLevel::High
        )
    {
        (RiskLevel::Medium, PERIODIC_ADVICE)
    } else if factors.age > 55 && factors.pollution_level == PollutionLevel::Medium {
        (RiskLevel::Medium, PERIODIC_ADVICE)
    } else {
        (RiskLevel::Low, ROUTINE_ADVICE)
    }
}

pub fn prediction_for(factors: &RiskFactors) -> Prediction {
    let (level, advice) = assess_risk(factors);
    Prediction {
        risk_level: level.to_string(),
        recommendation: advice.to_string(),
    }
}

fn positive_whole_age(age: &Number) -> Result<i64, Rejection> {
    let whole = age.as_i64().or_else(|| {
        age.as_f64()
            .filter(|value| value.fract() == 0.0 && (1.0..i64::MAX as f64).contains(value))
            .map(|value| value as i64)
    });
    match whole {
        Some(value) if value > 0 => Ok(value),
        _ => Err(Rejection::validation(format!(
            "age must be a positive whole number, got {age}"
        ))),
    }
}

fn parse_choice<T>(field: &str, value: &str) -> Result<T, Rejection>
where
    T: std::str::FromStr + std::fmt::Display + ChoiceSet,
{
    value.parse::<T>().map_err(|_| {
        let allowed = T::choices()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        Rejection::validation(format!(
            "{field} must be one of: {allowed} (got '{value}')"
        ))
    })
}

pub trait ChoiceSet: Sized + 'static {
    fn choices() -> &'static [Self];
}

impl ChoiceSet for SmokingHistory {
    fn choices() -> &'static [Self] {
        SmokingHistory::ALL
    }
}

impl ChoiceSet for PollutionLevel {
    fn choices() -> &'static [Self] {
        PollutionLevel::ALL
    }
}

impl ChoiceSet for GeneticRisk {
    fn choices() -> &'static [Self] {
        GeneticRisk::ALL
    }
}

#[cfg(test)]
#[path = "tests/risk_tests.rs"]
mod tests;
