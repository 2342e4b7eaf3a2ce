use std::sync::Arc;

use shared::domain::{FormField, PatientId};
use tracing::{info, warn};

use crate::{
    error::{ApiFailure, ValidationError},
    reducer::{self, Command, Outcome},
    transport::PatientApi,
    types::SessionState,
};

/// Owns the form, session and status state and drives every backend operation.
///
/// Each operation resolves completely inside its call: failures end up in
/// [`SessionState::status`] instead of being returned.
pub struct FormSessionController {
    api: Arc<dyn PatientApi>,
    state: SessionState,
}

impl FormSessionController {
    /// Builds a controller without probing the backend; `api_status` stays `Checking`.
    pub fn new(api: Arc<dyn PatientApi>) -> Self {
        Self {
            api,
            state: SessionState::default(),
        }
    }

    /// Builds a controller and runs the one-time health probe.
    pub async fn connect(api: Arc<dyn PatientApi>) -> Self {
        let mut controller = Self::new(api);
        controller.check_api_health().await;
        controller
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn update_field(&mut self, field: FormField, value: impl Into<String>) {
        reducer::update_field(&mut self.state, field, value);
    }

    pub fn validate_form(&self) -> Result<(), ValidationError> {
        reducer::validate_form(&self.state.form)
    }

    pub async fn check_api_health(&mut self) {
        self.drive(Some(Command::CheckHealth)).await;
    }

    pub async fn submit_patient(&mut self) {
        let command = reducer::begin_submit(&mut self.state);
        self.drive(command).await;
    }

    pub async fn predict_risk(&mut self) {
        let command = reducer::begin_predict(&mut self.state);
        self.drive(command).await;
    }

    pub async fn login(&mut self, username: &str, password: &str) {
        self.drive(Some(reducer::begin_login(username, password))).await;
    }

    pub async fn refresh_patients(&mut self) {
        let command = reducer::begin_refresh(&self.state);
        self.drive(Some(command)).await;
    }

    pub async fn delete_patient(&mut self, patient_id: PatientId) {
        let command = reducer::begin_delete(&self.state, patient_id);
        self.drive(Some(command)).await;
    }

    async fn drive(&mut self, mut next: Option<Command>) {
        while let Some(command) = next {
            let outcome = execute(self.api.as_ref(), command).await;
            next = reducer::apply(&mut self.state, outcome);
        }
    }
}

/// Performs exactly one backend round trip for `command`.
pub async fn execute(api: &dyn PatientApi, command: Command) -> Outcome {
    match command {
        Command::CheckHealth => {
            let result = api.health().await;
            log_result("health check", &result);
            Outcome::Health(result)
        }
        Command::CreatePatient(input) => {
            let result = api.create_patient(&input).await;
            if let Ok(patient_id) = &result {
                info!(%patient_id, "patient submitted");
            }
            log_result("create patient", &result);
            Outcome::PatientCreated(result)
        }
        Command::PredictRisk(input) => {
            let result = api.predict_risk(&input).await;
            if let Ok(prediction) = &result {
                info!(risk_level = %prediction.risk_level, "prediction received");
            }
            log_result("predict risk", &result);
            Outcome::Predicted(result)
        }
        Command::RequestToken(credentials) => {
            let result = api.request_token(&credentials).await;
            if result.is_ok() {
                info!(username = %credentials.username, "login succeeded");
            }
            log_result("login", &result);
            Outcome::TokenIssued(result)
        }
        Command::ListPatients { token } => {
            let result = api.list_patients(token.as_deref()).await;
            if let Ok(patients) = &result {
                info!(count = patients.len(), "patient list refreshed");
            }
            log_result("list patients", &result);
            Outcome::PatientsListed(result)
        }
        Command::DeletePatient { token, patient_id } => {
            let result = api.delete_patient(token.as_deref(), patient_id).await;
            if result.is_ok() {
                info!(%patient_id, "patient deleted");
            }
            log_result("delete patient", &result);
            Outcome::PatientDeleted { patient_id, result }
        }
    }
}

fn log_result<T>(operation: &str, result: &Result<T, ApiFailure>) {
    if let Err(failure) = result {
        warn!(operation, %failure, "backend operation failed");
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
