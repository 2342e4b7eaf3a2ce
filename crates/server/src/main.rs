use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{
        rejection::{FormRejection, JsonRejection, PathRejection},
        Path, State,
    },
    http::{header, HeaderMap, StatusCode},
    routing::{delete, get, post},
    Form, Json, Router,
};
use server_api::{ApiContext, ErrorCode, Rejection};
use shared::{
    domain::{Patient, PatientId, Prediction},
    error::ApiError,
    protocol::{MessageResponse, PatientCreated, RiskInput, TokenRequest, TokenResponse},
};
use storage::Storage;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info};

mod app_state;
mod config;

use app_state::AppState;
use config::{load_settings, prepare_database_url};

const MAX_BODY_BYTES: usize = 64 * 1024;

type HttpResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settings = load_settings();
    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;
    let api = ApiContext {
        storage,
        auth: settings.auth_config(),
    };

    let app = build_router(Arc::new(AppState { api }));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/predict-risk", post(http_predict_risk))
        .route("/patients", post(http_create_patient).get(http_list_patients))
        .route("/patients/:patient_id", delete(http_delete_patient))
        .route("/token", post(http_issue_token))
        .fallback(not_found)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

fn reject(rejection: Rejection) -> (StatusCode, Json<ApiError>) {
    let status = match rejection.code {
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!(detail = %rejection.body.detail_text(), "request failed");
    }
    (status, Json(rejection.body))
}

fn unprocessable(detail: String) -> (StatusCode, Json<ApiError>) {
    (StatusCode::UNPROCESSABLE_ENTITY, Json(ApiError::new(detail)))
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, (StatusCode, Json<ApiError>)> {
    body.map(|Json(value)| value)
        .map_err(|rejection| unprocessable(rejection.body_text()))
}

fn form_body<T>(body: Result<Form<T>, FormRejection>) -> Result<T, (StatusCode, Json<ApiError>)> {
    body.map(|Form(value)| value)
        .map_err(|rejection| unprocessable(rejection.body_text()))
}

fn path_param<T>(param: Result<Path<T>, PathRejection>) -> Result<T, (StatusCode, Json<ApiError>)> {
    param
        .map(|Path(value)| value)
        .map_err(|rejection| unprocessable(rejection.body_text()))
}

fn authorization(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
}

async fn root(State(state): State<Arc<AppState>>) -> HttpResult<MessageResponse> {
    let info = server_api::service_info(&state.api).await.map_err(reject)?;
    Ok(Json(info))
}

async fn not_found() -> (StatusCode, Json<ApiError>) {
    (StatusCode::NOT_FOUND, Json(ApiError::new("Not Found")))
}

async fn http_predict_risk(body: Result<Json<RiskInput>, JsonRejection>) -> HttpResult<Prediction> {
    let input = json_body(body)?;
    let prediction = server_api::predict(&input).map_err(reject)?;
    Ok(Json(prediction))
}

async fn http_create_patient(
    State(state): State<Arc<AppState>>,
    body: Result<Json<RiskInput>, JsonRejection>,
) -> HttpResult<PatientCreated> {
    let input = json_body(body)?;
    let created = server_api::create_patient(&state.api, &input)
        .await
        .map_err(reject)?;
    Ok(Json(created))
}

async fn http_list_patients(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> HttpResult<Vec<Patient>> {
    let patients = server_api::list_patients(&state.api, authorization(&headers))
        .await
        .map_err(reject)?;
    Ok(Json(patients))
}

async fn http_delete_patient(
    State(state): State<Arc<AppState>>,
    patient_id: Result<Path<i64>, PathRejection>,
    headers: HeaderMap,
) -> HttpResult<MessageResponse> {
    let patient_id = path_param(patient_id)?;
    let response =
        server_api::delete_patient(&state.api, authorization(&headers), PatientId(patient_id))
            .await
            .map_err(reject)?;
    Ok(Json(response))
}

async fn http_issue_token(
    State(state): State<Arc<AppState>>,
    body: Result<Form<TokenRequest>, FormRejection>,
) -> HttpResult<TokenResponse> {
    let request = form_body(body)?;
    let token = server_api::issue_token(&state.api, &request).map_err(reject)?;
    Ok(Json(token))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
