use shared::{
    domain::{PatientId, Prediction},
    error::ApiError,
    protocol::{MessageResponse, PatientCreated, RiskInput, TokenRequest, TokenResponse},
};
use storage::{NewPatient, Storage};
use thiserror::Error;
use tracing::info;

pub mod auth;
pub mod risk;

pub use auth::AuthConfig;
pub use risk::{assess_risk, RiskFactors};

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Unauthorized,
    NotFound,
    Validation,
    Internal,
}

/// A refused request: the category drives the HTTP status, the body is sent as-is.
#[derive(Debug, Clone, Error)]
#[error("{code:?}: {}", .body.detail_text())]
pub struct Rejection {
    pub code: ErrorCode,
    pub body: ApiError,
}

impl Rejection {
    pub fn new(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            body: ApiError::new(detail),
        }
    }

    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, detail)
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, detail)
    }

    pub fn validation(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::Validation, detail)
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, detail)
    }
}

/// Service banner for `GET /`; fails when the database cannot be reached.
pub async fn service_info(ctx: &ApiContext) -> Result<MessageResponse, Rejection> {
    ctx.storage.health_check().await.map_err(internal)?;
    Ok(MessageResponse {
        message: "Health Risk Predictor API".to_string(),
    })
}

pub fn predict(input: &RiskInput) -> Result<Prediction, Rejection> {
    let factors = RiskFactors::from_input(input)?;
    Ok(risk::prediction_for(&factors))
}

pub async fn create_patient(ctx: &ApiContext, input: &RiskInput) -> Result<PatientCreated, Rejection> {
    let factors = RiskFactors::from_input(input)?;
    let patient = ctx
        .storage
        .insert_patient(&NewPatient {
            age: factors.age,
            smoking_history: factors.smoking_history,
            pollution_level: factors.pollution_level,
            genetic_risk: factors.genetic_risk,
            assessment: risk::prediction_for(&factors),
        })
        .await
        .map_err(internal)?;
    info!(patient_id = %patient.id, risk_level = %patient.risk_level, "patient saved");
    Ok(PatientCreated {
        message: "Patient saved successfully".to_string(),
        patient,
    })
}

pub async fn list_patients(
    ctx: &ApiContext,
    authorization: Option<&str>,
) -> Result<Vec<shared::domain::Patient>, Rejection> {
    auth::authorize(&ctx.auth, authorization)?;
    ctx.storage.list_patients().await.map_err(internal)
}

pub async fn delete_patient(
    ctx: &ApiContext,
    authorization: Option<&str>,
    patient_id: PatientId,
) -> Result<MessageResponse, Rejection> {
    auth::authorize(&ctx.auth, authorization)?;
    let removed = ctx
        .storage
        .delete_patient(patient_id)
        .await
        .map_err(internal)?;
    if !removed {
        return Err(Rejection::not_found("Patient not found"));
    }
    info!(%patient_id, "patient deleted");
    Ok(MessageResponse {
        message: format!("Patient {patient_id} deleted"),
    })
}

pub fn issue_token(ctx: &ApiContext, request: &TokenRequest) -> Result<TokenResponse, Rejection> {
    auth::issue_token(&ctx.auth, request)
}

fn internal(err: anyhow::Error) -> Rejection {
    Rejection::internal(err.to_string())
}
