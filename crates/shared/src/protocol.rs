use serde::{Deserialize, Serialize};
use serde_json::Number;

use crate::domain::{Patient, PatientId};

/// JSON body shared by `POST /patients` and `POST /predict-risk`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskInput {
    pub age: Number,
    pub smoking_history: String,
    pub pollution_level: String,
    pub genetic_risk: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientCreated {
    pub message: String,
    #[serde(flatten)]
    pub patient: Patient,
}

/// Only the assigned id is needed by clients; the rest of the body is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CreatedId {
    pub id: PatientId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "bearer")]
    pub token_type: String,
}

fn bearer() -> String {
    "bearer".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}
