//! Backend seam: the controller only talks to [`PatientApi`]; [`HttpPatientApi`] is the
//! reqwest implementation of the REST contract.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::{Patient, PatientId, Prediction},
    error::ApiError,
    protocol::{CreatedId, RiskInput, TokenRequest, TokenResponse},
};
use tracing::debug;
use url::Url;

use crate::error::ApiFailure;

#[async_trait]
pub trait PatientApi: Send + Sync {
    async fn health(&self) -> Result<(), ApiFailure>;
    async fn create_patient(&self, input: &RiskInput) -> Result<PatientId, ApiFailure>;
    async fn predict_risk(&self, input: &RiskInput) -> Result<Prediction, ApiFailure>;
    async fn request_token(&self, credentials: &TokenRequest)
        -> Result<TokenResponse, ApiFailure>;
    async fn list_patients(&self, token: Option<&str>) -> Result<Vec<Patient>, ApiFailure>;
    async fn delete_patient(
        &self,
        token: Option<&str>,
        patient_id: PatientId,
    ) -> Result<(), ApiFailure>;
}

pub struct HttpPatientApi {
    http: Client,
    base_url: Url,
}

impl HttpPatientApi {
    /// No timeout is configured: an unresponsive server stalls the call until the
    /// transport itself gives up.
    pub fn new(base_url: &str) -> Result<Self, url::ParseError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            http: Client::new(),
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiFailure> {
        self.base_url
            .join(path)
            .map_err(|e| ApiFailure::Transport(format!("invalid endpoint {path}: {e}")))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiFailure> {
        let response = request.send().await?;
        if response.status().is_success() {
            return Ok(response);
        }
        Err(server_failure(response).await)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiFailure> {
        let response = self.send(request).await?;
        Ok(response.json::<T>().await?)
    }
}

fn with_bearer(request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}

/// Extracts `detail` from an error body, falling back to the status reason phrase.
async fn server_failure(response: Response) -> ApiFailure {
    let status = response.status();
    let body = match response.text().await {
        Ok(body) => body,
        Err(err) => return err.into(),
    };
    let detail = match serde_json::from_str::<ApiError>(&body) {
        Ok(error) => error.detail_text(),
        Err(_) => status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string(),
    };
    debug!(status = status.as_u16(), %detail, "backend rejected request");
    ApiFailure::Server {
        status: status.as_u16(),
        detail,
    }
}

#[async_trait]
impl PatientApi for HttpPatientApi {
    async fn health(&self) -> Result<(), ApiFailure> {
        self.send(self.http.get(self.base_url.clone())).await?;
        Ok(())
    }

    async fn create_patient(&self, input: &RiskInput) -> Result<PatientId, ApiFailure> {
        let created: CreatedId = self
            .send_json(self.http.post(self.endpoint("patients")?).json(input))
            .await?;
        Ok(created.id)
    }

    async fn predict_risk(&self, input: &RiskInput) -> Result<Prediction, ApiFailure> {
        self.send_json(self.http.post(self.endpoint("predict-risk")?).json(input))
            .await
    }

    async fn request_token(
        &self,
        credentials: &TokenRequest,
    ) -> Result<TokenResponse, ApiFailure> {
        self.send_json(self.http.post(self.endpoint("token")?).form(credentials))
            .await
    }

    async fn list_patients(&self, token: Option<&str>) -> Result<Vec<Patient>, ApiFailure> {
        let request = with_bearer(self.http.get(self.endpoint("patients")?), token);
        self.send_json(request).await
    }

    async fn delete_patient(
        &self,
        token: Option<&str>,
        patient_id: PatientId,
    ) -> Result<(), ApiFailure> {
        let url = self.endpoint(&format!("patients/{patient_id}"))?;
        self.send(with_bearer(self.http.delete(url), token)).await?;
        Ok(())
    }
}
