//! Text projection of the controller state.

use std::fmt::Write as _;

use client_core::{SessionState, StatusKind};

pub fn render(state: &SessionState) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "API status: {}", state.api_status.text());
    let _ = writeln!(
        out,
        "Session: {}",
        if state.is_authenticated() {
            "logged in"
        } else {
            "not logged in"
        }
    );

    if !state.status.is_empty() {
        let tag = match state.status.kind {
            StatusKind::Success => "ok",
            StatusKind::Info => "info",
            StatusKind::Error => "error",
        };
        let _ = writeln!(out, "[{tag}] {}", state.status.text);
    }

    if let Some(prediction) = &state.prediction {
        let _ = writeln!(
            out,
            "Prediction: {} risk. {}",
            prediction.risk_level, prediction.recommendation
        );
    }

    if !state.patients.is_empty() {
        let _ = writeln!(
            out,
            "{:>4}  {:>3}  {:<15}  {:<9}  {:<8}  {:<6}  Recommendation",
            "ID", "Age", "Smoking", "Pollution", "Genetic", "Risk"
        );
        for patient in &state.patients {
            let _ = writeln!(
                out,
                "{:>4}  {:>3}  {:<15}  {:<9}  {:<8}  {:<6}  {}",
                patient.id,
                patient.age,
                patient.smoking_history,
                patient.pollution_level,
                patient.genetic_risk,
                patient.risk_level,
                patient.recommendation
            );
        }
    }

    out
}
