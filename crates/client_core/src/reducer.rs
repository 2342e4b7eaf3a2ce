//! Pure state transitions. `begin_*` functions decide whether an operation needs a backend
//! call and describe it as a [`Command`]; [`apply`] folds the finished [`Outcome`] back into
//! the state and may ask for one follow-up command.
//!
//! Outcomes carry no sequence number. Whichever outcome is applied last owns the status
//! slot and the patient list, regardless of the order the commands were issued in.

use serde_json::Number;
use shared::{
    domain::{FormField, FormInput, Patient, PatientId, Prediction},
    protocol::{RiskInput, TokenRequest, TokenResponse},
};

use crate::{
    error::{ApiFailure, ValidationError},
    types::{ApiStatus, SessionState, StatusMessage},
};

pub const COULD_NOT_CONNECT: &str = "Could not connect to the server";
pub const LOGIN_SUCCEEDED: &str = "Login successful";
pub const LOGIN_CONNECTION_FAILED: &str = "Connection error while logging in";
pub const PATIENT_LIST_UNAVAILABLE: &str = "Could not obtain the patient list";
pub const DELETE_FAILED: &str = "Could not delete the patient";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CheckHealth,
    CreatePatient(RiskInput),
    PredictRisk(RiskInput),
    RequestToken(TokenRequest),
    ListPatients {
        token: Option<String>,
    },
    DeletePatient {
        token: Option<String>,
        patient_id: PatientId,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Health(Result<(), ApiFailure>),
    PatientCreated(Result<PatientId, ApiFailure>),
    Predicted(Result<Prediction, ApiFailure>),
    TokenIssued(Result<TokenResponse, ApiFailure>),
    PatientsListed(Result<Vec<Patient>, ApiFailure>),
    PatientDeleted {
        patient_id: PatientId,
        result: Result<(), ApiFailure>,
    },
}

pub fn update_field(state: &mut SessionState, field: FormField, value: impl Into<String>) {
    state.form.set(field, value);
}

/// Completeness is checked before the age, so a form with a blank field never reports
/// an age problem.
pub fn validate_form(input: &FormInput) -> Result<(), ValidationError> {
    risk_input(input).map(|_| ())
}

/// Validates the form and builds the JSON body shared by create and predict.
pub fn risk_input(input: &FormInput) -> Result<RiskInput, ValidationError> {
    if FormField::ALL
        .iter()
        .any(|field| input.get(*field).is_empty())
    {
        return Err(ValidationError::MissingField);
    }

    Ok(RiskInput {
        age: parse_age(&input.age)?,
        smoking_history: input.smoking_history.clone(),
        pollution_level: input.pollution_level.clone(),
        genetic_risk: input.genetic_risk.clone(),
    })
}

fn parse_age(raw: &str) -> Result<Number, ValidationError> {
    let raw = raw.trim();
    if let Ok(whole) = raw.parse::<i64>() {
        return if whole > 0 {
            Ok(Number::from(whole))
        } else {
            Err(ValidationError::InvalidAge)
        };
    }
    raw.parse::<f64>()
        .ok()
        .filter(|age| age.is_finite() && *age > 0.0)
        .and_then(Number::from_f64)
        .ok_or(ValidationError::InvalidAge)
}

pub fn begin_submit(state: &mut SessionState) -> Option<Command> {
    match risk_input(&state.form) {
        Ok(input) => Some(Command::CreatePatient(input)),
        Err(err) => {
            state.status = StatusMessage::error(err.to_string());
            None
        }
    }
}

pub fn begin_predict(state: &mut SessionState) -> Option<Command> {
    match risk_input(&state.form) {
        Ok(input) => Some(Command::PredictRisk(input)),
        Err(err) => {
            state.status = StatusMessage::error(err.to_string());
            None
        }
    }
}

pub fn begin_login(username: &str, password: &str) -> Command {
    Command::RequestToken(TokenRequest {
        username: username.to_string(),
        password: password.to_string(),
    })
}

pub fn begin_refresh(state: &SessionState) -> Command {
    Command::ListPatients {
        token: state.token.clone(),
    }
}

pub fn begin_delete(state: &SessionState, patient_id: PatientId) -> Command {
    Command::DeletePatient {
        token: state.token.clone(),
        patient_id,
    }
}

pub fn apply(state: &mut SessionState, outcome: Outcome) -> Option<Command> {
    match outcome {
        Outcome::Health(result) => {
            state.api_status = match result {
                Ok(()) => ApiStatus::Connected,
                Err(ApiFailure::Server { .. }) => ApiStatus::RespondedWithError,
                Err(ApiFailure::Transport(_)) => ApiStatus::Unreachable,
            };
            None
        }
        Outcome::PatientCreated(Ok(patient_id)) => {
            state.status =
                StatusMessage::success(format!("Patient saved successfully with ID {patient_id}"));
            state.form = FormInput::default();
            state.prediction = None;
            // The patient list is only readable with a session token.
            state.is_authenticated().then(|| begin_refresh(state))
        }
        Outcome::PatientCreated(Err(failure)) => {
            state.status = StatusMessage::error(match failure {
                ApiFailure::Server { detail, .. } => format!("Server error: {detail}"),
                ApiFailure::Transport(_) => COULD_NOT_CONNECT.to_string(),
            });
            None
        }
        Outcome::Predicted(Ok(prediction)) => {
            state.prediction = Some(prediction);
            state.status = StatusMessage::default();
            None
        }
        Outcome::Predicted(Err(failure)) => {
            state.prediction = None;
            state.status = StatusMessage::error(match failure {
                ApiFailure::Server { detail, .. } => format!("Prediction failed: {detail}"),
                ApiFailure::Transport(_) => COULD_NOT_CONNECT.to_string(),
            });
            None
        }
        Outcome::TokenIssued(Ok(token)) => {
            state.token = Some(token.access_token);
            state.status = StatusMessage::success(LOGIN_SUCCEEDED);
            Some(begin_refresh(state))
        }
        Outcome::TokenIssued(Err(failure)) => {
            state.status = StatusMessage::error(match failure {
                ApiFailure::Server { detail, .. } => detail,
                ApiFailure::Transport(_) => LOGIN_CONNECTION_FAILED.to_string(),
            });
            None
        }
        Outcome::PatientsListed(Ok(patients)) => {
            state.patients = patients;
            None
        }
        Outcome::PatientsListed(Err(failure)) => {
            state.status = StatusMessage::error(match failure {
                ApiFailure::Server { detail, .. } => detail,
                ApiFailure::Transport(_) => PATIENT_LIST_UNAVAILABLE.to_string(),
            });
            None
        }
        Outcome::PatientDeleted {
            patient_id,
            result: Ok(()),
        } => {
            state.status = StatusMessage::success(format!("Patient {patient_id} deleted"));
            Some(begin_refresh(state))
        }
        Outcome::PatientDeleted {
            result: Err(failure),
            ..
        } => {
            state.status = StatusMessage::error(match failure {
                ApiFailure::Server { detail, .. } => detail,
                ApiFailure::Transport(_) => DELETE_FAILED.to_string(),
            });
            None
        }
    }
}

#[cfg(test)]
#[path = "tests/reducer_tests.rs"]
mod tests;
