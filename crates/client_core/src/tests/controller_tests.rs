use super::*;
use crate::{
    reducer::{COULD_NOT_CONNECT, DELETE_FAILED, LOGIN_CONNECTION_FAILED, PATIENT_LIST_UNAVAILABLE},
    transport::HttpPatientApi,
    types::{ApiStatus, StatusKind},
};
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Form, Json, Router,
};
use serde_json::{json, Value};
use shared::{
    domain::{Patient, Prediction},
    protocol::TokenRequest,
};
use tokio::{net::TcpListener, sync::Mutex};

const TOKEN: &str = "abc";

#[derive(Clone, Default)]
struct MockBackend {
    calls: Arc<Mutex<Vec<String>>>,
    list_auth_headers: Arc<Mutex<Vec<Option<String>>>>,
    created_bodies: Arc<Mutex<Vec<Value>>>,
    patients: Arc<Mutex<Vec<Patient>>>,
    predict_failure: Arc<Mutex<Option<(StatusCode, Value)>>>,
}

impl MockBackend {
    async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }

    async fn count(&self, call: &str) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|recorded| recorded.as_str() == call)
            .count()
    }

    async fn record(&self, call: impl Into<String>) {
        self.calls.lock().await.push(call.into());
    }
}

fn sample_patient(id: i64) -> Patient {
    Patient {
        id: PatientId(id),
        age: 45,
        smoking_history: "current smoker".to_string(),
        pollution_level: "high".to_string(),
        genetic_risk: "positive".to_string(),
        risk_level: "High".to_string(),
        recommendation: "Schedule early diagnostic tests.".to_string(),
    }
}

fn is_authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        == Some("Bearer abc")
}

async fn mock_root(State(state): State<MockBackend>) -> Json<Value> {
    state.record("GET /").await;
    Json(json!({ "message": "Health Risk Predictor API" }))
}

async fn mock_create(State(state): State<MockBackend>, Json(body): Json<Value>) -> Json<Value> {
    state.record("POST /patients").await;
    state.created_bodies.lock().await.push(body);
    state.patients.lock().await.push(sample_patient(7));
    Json(json!({
        "message": "Patient saved successfully",
        "id": 7,
        "age": 45,
        "smoking_history": "current smoker",
        "pollution_level": "high",
        "genetic_risk": "positive",
        "risk_level": "High",
        "recommendation": "Schedule early diagnostic tests.",
    }))
}

async fn mock_predict(
    State(state): State<MockBackend>,
    Json(_body): Json<Value>,
) -> impl IntoResponse {
    state.record("POST /predict-risk").await;
    match state.predict_failure.lock().await.clone() {
        Some((status, detail)) => (status, Json(json!({ "detail": detail }))),
        None => (
            StatusCode::OK,
            Json(json!({ "risk_level": "High", "recommendation": "See a doctor" })),
        ),
    }
}

async fn mock_token(
    State(state): State<MockBackend>,
    Form(credentials): Form<TokenRequest>,
) -> impl IntoResponse {
    state.record("POST /token").await;
    if credentials.username == "admin" && credentials.password == "admin123" {
        (
            StatusCode::OK,
            Json(json!({ "access_token": TOKEN, "token_type": "bearer" })),
        )
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Incorrect username or password" })),
        )
    }
}

async fn mock_list(State(state): State<MockBackend>, headers: HeaderMap) -> impl IntoResponse {
    state.record("GET /patients").await;
    state.list_auth_headers.lock().await.push(
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
    );
    if !is_authorized(&headers) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Not authenticated" })),
        );
    }
    let patients = state.patients.lock().await.clone();
    (StatusCode::OK, Json(json!(patients)))
}

async fn mock_delete(
    State(state): State<MockBackend>,
    Path(patient_id): Path<i64>,
    headers: HeaderMap,
) -> impl IntoResponse {
    state.record(format!("DELETE /patients/{patient_id}")).await;
    if !is_authorized(&headers) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "detail": "Not authenticated" })),
        );
    }
    let mut patients = state.patients.lock().await;
    let before = patients.len();
    patients.retain(|patient| patient.id != PatientId(patient_id));
    if patients.len() == before {
        return (StatusCode::NOT_FOUND, Json(json!({ "detail": "not found" })));
    }
    (StatusCode::OK, Json(json!({})))
}

async fn serve(app: Router) -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

async fn spawn_backend() -> (String, MockBackend) {
    let state = MockBackend::default();
    let app = Router::new()
        .route("/", get(mock_root))
        .route("/patients", post(mock_create).get(mock_list))
        .route("/patients/:patient_id", delete(mock_delete))
        .route("/predict-risk", post(mock_predict))
        .route("/token", post(mock_token))
        .with_state(state.clone());
    (serve(app).await, state)
}

/// An address nothing listens on, so every request is refused.
async fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    format!("http://{addr}")
}

fn controller_for(server_url: &str) -> FormSessionController {
    let api = HttpPatientApi::new(server_url).expect("server url");
    FormSessionController::new(Arc::new(api))
}

fn fill_form(controller: &mut FormSessionController, age: &str) {
    controller.update_field(FormField::Age, age);
    controller.update_field(FormField::SmokingHistory, "current smoker");
    controller.update_field(FormField::PollutionLevel, "high");
    controller.update_field(FormField::GeneticRisk, "positive");
}

#[tokio::test]
async fn connect_reports_connected_backend() {
    let (server_url, backend) = spawn_backend().await;
    let api = HttpPatientApi::new(&server_url).expect("server url");
    let controller = FormSessionController::connect(Arc::new(api)).await;

    assert_eq!(controller.state().api_status, ApiStatus::Connected);
    assert_eq!(backend.calls().await, vec!["GET /".to_string()]);
    assert!(controller.state().status.is_empty());
}

#[tokio::test]
async fn connect_reports_backend_error() {
    let app = Router::new().route(
        "/",
        get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance") }),
    );
    let server_url = serve(app).await;
    let api = HttpPatientApi::new(&server_url).expect("server url");
    let controller = FormSessionController::connect(Arc::new(api)).await;

    assert_eq!(controller.state().api_status, ApiStatus::RespondedWithError);
    assert_eq!(
        controller.state().api_status.text(),
        "API responded with error"
    );
}

#[tokio::test]
async fn connect_reports_unreachable_backend() {
    let api = HttpPatientApi::new(&unreachable_url().await).expect("server url");
    let controller = FormSessionController::connect(Arc::new(api)).await;

    assert_eq!(controller.state().api_status, ApiStatus::Unreachable);
    assert_eq!(controller.state().api_status.text(), "Could not connect to API");
}

#[tokio::test]
async fn update_field_only_mutates_the_form() {
    let (server_url, backend) = spawn_backend().await;
    let mut controller = controller_for(&server_url);

    controller.update_field(FormField::PollutionLevel, "medium");

    assert_eq!(controller.state().form.pollution_level, "medium");
    assert_eq!(controller.state().api_status, ApiStatus::Checking);
    assert!(backend.calls().await.is_empty());
}

#[tokio::test]
async fn submit_saves_patient_resets_form_and_refreshes_list() {
    let (server_url, backend) = spawn_backend().await;
    let mut controller = controller_for(&server_url);
    controller.login("admin", "admin123").await;
    fill_form(&mut controller, "45");

    controller.submit_patient().await;

    let state = controller.state();
    assert!(state.status.text.contains('7'), "status: {}", state.status.text);
    assert_eq!(state.status.kind, StatusKind::Success);
    assert!(state.form.is_empty());
    assert_eq!(state.prediction, None);
    assert_eq!(state.patients, vec![sample_patient(7)]);

    let bodies = backend.created_bodies.lock().await.clone();
    assert_eq!(
        bodies,
        vec![json!({
            "age": 45,
            "smoking_history": "current smoker",
            "pollution_level": "high",
            "genetic_risk": "positive",
        })]
    );
    assert_eq!(backend.count("GET /patients").await, 2);
}

#[tokio::test]
async fn submit_while_logged_out_keeps_the_saved_id_and_skips_refresh() {
    let (server_url, backend) = spawn_backend().await;
    let mut controller = controller_for(&server_url);
    fill_form(&mut controller, "45");

    controller.submit_patient().await;

    let state = controller.state();
    assert!(state.status.text.contains('7'), "status: {}", state.status.text);
    assert_eq!(state.status.kind, StatusKind::Success);
    assert!(state.form.is_empty());
    assert_eq!(backend.count("POST /patients").await, 1);
    assert_eq!(backend.count("GET /patients").await, 0);
}

#[tokio::test]
async fn submit_clears_a_held_prediction() {
    let (server_url, _backend) = spawn_backend().await;
    let mut controller = controller_for(&server_url);
    controller.login("admin", "admin123").await;
    fill_form(&mut controller, "45");

    controller.predict_risk().await;
    assert!(controller.state().prediction.is_some());

    controller.submit_patient().await;
    assert_eq!(controller.state().prediction, None);
}

#[tokio::test]
async fn predict_stores_prediction_and_clears_status() {
    let (server_url, backend) = spawn_backend().await;
    let mut controller = controller_for(&server_url);
    controller.login("admin", "wrong").await;
    assert!(!controller.state().status.is_empty());
    fill_form(&mut controller, "45");

    controller.predict_risk().await;

    let state = controller.state();
    assert_eq!(
        state.prediction,
        Some(Prediction {
            risk_level: "High".to_string(),
            recommendation: "See a doctor".to_string(),
        })
    );
    assert_eq!(state.status.text, "");
    assert_eq!(state.form.age, "45");
    assert_eq!(backend.count("POST /predict-risk").await, 1);
}

#[tokio::test]
async fn predict_failure_stringifies_structured_detail() {
    let (server_url, backend) = spawn_backend().await;
    *backend.predict_failure.lock().await = Some((
        StatusCode::UNPROCESSABLE_ENTITY,
        json!([{ "loc": ["body", "age"], "msg": "bad age" }]),
    ));
    let mut controller = controller_for(&server_url);
    fill_form(&mut controller, "45");

    controller.predict_risk().await;

    let state = controller.state();
    assert_eq!(state.prediction, None);
    assert_eq!(
        state.status.text,
        r#"Prediction failed: [{"loc":["body","age"],"msg":"bad age"}]"#
    );
    assert_eq!(state.status.kind, StatusKind::Error);
}

#[tokio::test]
async fn invalid_age_never_reaches_the_network() {
    let (server_url, backend) = spawn_backend().await;
    let mut controller = controller_for(&server_url);
    fill_form(&mut controller, "-5");

    controller.submit_patient().await;
    assert_eq!(controller.state().status.text, "Age must be a positive number");
    assert_eq!(controller.validate_form(), Err(ValidationError::InvalidAge));

    controller.predict_risk().await;
    assert!(backend.calls().await.is_empty());
    assert_eq!(controller.state().form.age, "-5");
}

#[tokio::test]
async fn missing_field_never_reaches_the_network() {
    let (server_url, backend) = spawn_backend().await;
    let mut controller = controller_for(&server_url);
    controller.update_field(FormField::Age, "45");

    controller.predict_risk().await;
    controller.submit_patient().await;

    assert_eq!(controller.state().status.text, "Please fill in all fields");
    assert!(backend.calls().await.is_empty());
}

#[tokio::test]
async fn login_stores_token_and_refreshes_exactly_once() {
    let (server_url, backend) = spawn_backend().await;
    let mut controller = controller_for(&server_url);

    controller.login("admin", "admin123").await;

    assert_eq!(controller.state().token.as_deref(), Some(TOKEN));
    assert_eq!(controller.state().status.text, "Login successful");
    assert_eq!(backend.count("GET /patients").await, 1);
    assert_eq!(
        backend.list_auth_headers.lock().await.clone(),
        vec![Some("Bearer abc".to_string())]
    );
}

#[tokio::test]
async fn rejected_login_surfaces_detail_and_skips_refresh() {
    let (server_url, backend) = spawn_backend().await;
    let mut controller = controller_for(&server_url);

    controller.login("admin", "nope").await;

    assert_eq!(controller.state().token, None);
    assert_eq!(
        controller.state().status.text,
        "Incorrect username or password"
    );
    assert_eq!(backend.count("GET /patients").await, 0);
}

#[tokio::test]
async fn refreshing_twice_yields_the_same_list() {
    let (server_url, backend) = spawn_backend().await;
    backend
        .patients
        .lock()
        .await
        .extend([sample_patient(1), sample_patient(2)]);
    let mut controller = controller_for(&server_url);
    controller.login("admin", "admin123").await;

    controller.refresh_patients().await;
    let first = controller.state().patients.clone();
    controller.refresh_patients().await;

    assert_eq!(first, vec![sample_patient(1), sample_patient(2)]);
    assert_eq!(controller.state().patients, first);
}

#[tokio::test]
async fn refresh_without_token_keeps_list_and_reports_detail() {
    let (server_url, _backend) = spawn_backend().await;
    let mut controller = controller_for(&server_url);

    controller.refresh_patients().await;

    assert_eq!(controller.state().status.text, "Not authenticated");
    assert!(controller.state().patients.is_empty());
}

#[tokio::test]
async fn delete_confirms_and_resynchronizes_from_server() {
    let (server_url, backend) = spawn_backend().await;
    backend
        .patients
        .lock()
        .await
        .extend([sample_patient(3), sample_patient(4)]);
    let mut controller = controller_for(&server_url);
    controller.login("admin", "admin123").await;
    assert_eq!(controller.state().patients.len(), 2);

    controller.delete_patient(PatientId(3)).await;

    assert_eq!(controller.state().status.text, "Patient 3 deleted");
    assert_eq!(controller.state().patients, vec![sample_patient(4)]);
    assert_eq!(backend.count("GET /patients").await, 2);
}

#[tokio::test]
async fn failed_delete_keeps_list_and_skips_refresh() {
    let (server_url, backend) = spawn_backend().await;
    backend.patients.lock().await.push(sample_patient(4));
    let mut controller = controller_for(&server_url);
    controller.login("admin", "admin123").await;
    let before = controller.state().patients.clone();

    controller.delete_patient(PatientId(3)).await;

    assert!(controller.state().status.text.contains("not found"));
    assert_eq!(controller.state().patients, before);
    assert_eq!(backend.count("GET /patients").await, 1);
}

#[tokio::test]
async fn error_body_without_detail_uses_status_reason() {
    let app = Router::new().route(
        "/patients",
        post(|| async { (StatusCode::BAD_GATEWAY, "<html>upstream</html>") }),
    );
    let server_url = serve(app).await;
    let mut controller = controller_for(&server_url);
    fill_form(&mut controller, "45");

    controller.submit_patient().await;

    assert_eq!(controller.state().status.text, "Server error: Bad Gateway");
    assert_eq!(controller.state().form.age, "45");
}

#[tokio::test]
async fn transport_failures_use_fixed_messages() {
    let server_url = unreachable_url().await;
    let mut controller = controller_for(&server_url);
    fill_form(&mut controller, "45");

    controller.submit_patient().await;
    assert_eq!(controller.state().status.text, COULD_NOT_CONNECT);
    assert_eq!(controller.state().form.age, "45");

    controller.predict_risk().await;
    assert_eq!(controller.state().status.text, COULD_NOT_CONNECT);
    assert_eq!(controller.state().prediction, None);

    controller.login("admin", "admin123").await;
    assert_eq!(controller.state().status.text, LOGIN_CONNECTION_FAILED);
    assert_eq!(controller.state().token, None);

    controller.refresh_patients().await;
    assert_eq!(controller.state().status.text, PATIENT_LIST_UNAVAILABLE);

    controller.delete_patient(PatientId(3)).await;
    assert_eq!(controller.state().status.text, DELETE_FAILED);
    assert_eq!(controller.state().status.kind, StatusKind::Error);
}

#[tokio::test]
async fn undecodable_success_body_counts_as_connection_failure() {
    let app = Router::new().route("/predict-risk", post(|| async { "not json" }));
    let server_url = serve(app).await;
    let mut controller = controller_for(&server_url);
    fill_form(&mut controller, "45");

    controller.predict_risk().await;

    assert_eq!(controller.state().status.text, COULD_NOT_CONNECT);
}

#[test]
fn base_url_with_path_prefix_keeps_the_prefix() {
    let api = HttpPatientApi::new("http://127.0.0.1:8000/api").expect("server url");
    assert_eq!(api.base_url().as_str(), "http://127.0.0.1:8000/api/");
}
