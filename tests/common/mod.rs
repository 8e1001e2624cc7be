#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU16, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, Request, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use http_body_util::BodyExt;
use progres::router::init_router;
use progres::state::AppState;
use progres_auth::TokenBlacklist;
use progres_config::{
    CookieConfig, CorsConfig, GroqConfig, JwtConfig, RateLimitConfig, UpstreamConfig,
};
use progres_models::recommendations::AcademicStructure;
use progres::upstream::{GroqClient, ProgresClient};
use serde_json::{Value, json};
use tower::ServiceExt;

pub const USERNAME: &str = "202031234567";
pub const PASSWORD: &str = "secret";
pub const UUID: &str = "student-uuid";
pub const UPSTREAM_TOKEN: &str = "upstream-token";
pub const CARD_ID: &str = "4512";
pub const FOREIGN_CARD_ID: &str = "9999";
pub const TEST_MODEL: &str = "test-model";
pub const UNIVERSITY: &str = "Université des Sciences et de la Technologie Houari Boumediene";

/// In-process stand-in for the PROGRES API and the Groq chat API.
pub struct FakeUpstream {
    pub photo_missing: AtomicBool,
    pub no_registrations: AtomicBool,
    /// Status answered by the chat endpoint.
    pub groq_status: AtomicU16,
    pub groq_content: Mutex<String>,
    pub last_prompt: Mutex<Option<String>>,
    pub chat_calls: AtomicUsize,
}

impl FakeUpstream {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            photo_missing: AtomicBool::new(false),
            no_registrations: AtomicBool::new(false),
            groq_status: AtomicU16::new(200),
            groq_content: Mutex::new(default_model_answer().to_string()),
            last_prompt: Mutex::new(None),
            chat_calls: AtomicUsize::new(0),
        })
    }
}

fn default_model_answer() -> Value {
    json!({
        "recommendations": [
            { "code": "ia", "name": "Intelligence Artificielle", "type": "speciality", "matchScore": 72 },
            { "code": "isil", "name": "ISIL", "type": "speciality", "matchScore": 88,
              "keySubjects": ["Bases de données"], "careerOutcomes": ["Développeur"] },
            { "code": "gl", "name": "Génie Logiciel", "type": "speciality", "matchScore": "72" }
        ],
        "summary": "Strong profile in mathematics."
    })
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some(UPSTREAM_TOKEN)
}

fn rejected() -> Response {
    (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
}

async fn authenticate(Json(body): Json<Value>) -> Response {
    if body["username"] != USERNAME || body["password"] != PASSWORD {
        return (StatusCode::UNAUTHORIZED, "Bad credentials").into_response();
    }
    Json(json!({
        "uuid": UUID,
        "token": UPSTREAM_TOKEN,
        "userName": USERNAME,
        "expirationDate": "2099-01-01T00:00:00Z"
    }))
    .into_response()
}

async fn registrations(
    State(fake): State<Arc<FakeUpstream>>,
    Path(uuid): Path<String>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) || uuid != UUID {
        return rejected();
    }
    if fake.no_registrations.load(Ordering::SeqCst) {
        return (StatusCode::OK, "").into_response();
    }
    Json(json!([
        {
            "id": 4512,
            "uuid": UUID,
            "anneeAcademiqueCode": "2023/2024",
            "ouvertureOffreFormationId": 77,
            "niveauId": 3,
            "numeroInscription": USERNAME,
            "llEtablissementLatin": UNIVERSITY,
            "llFiliere": "Mathématiques et informatique",
            "ofLlFiliere": "Informatique",
            "refLibelleNiveau": "Licence 2",
            "lastMoyenne": 12.4
        }
    ]))
    .into_response()
}

async fn period_reports(Path((_uuid, id)): Path<(String, String)>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return rejected();
    }
    if id != CARD_ID {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }
    Json(json!([
        {
            "periodeLibelleFr": "Semestre 1",
            "niveauLibelleLongLt": "Licence 2",
            "bilanUes": [{
                "ueLibelleFr": "UEF1",
                "bilanMcs": [
                    { "mcLibelleFr": "Analyse 3", "coefficient": 4, "moyenneGenerale": 12.5 },
                    { "mcLibelleFr": "Algèbre 3", "coefficient": 0, "moyenneGenerale": "9" }
                ]
            }]
        },
        { "periodeLibelleFr": "Semestre 2", "niveauLibelleLongLt": "Licence 2", "bilanUes": [] }
    ]))
    .into_response()
}

async fn individual(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return rejected();
    }
    Json(json!({ "nomLatin": "Amrani", "prenomLatin": "Yacine", "dateNaissance": "2003-04-12" }))
        .into_response()
}

async fn cc_grades(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return rejected();
    }
    Json(json!([
        { "id": 1, "apLibelleFr": "Analyse 3", "note": 15 },
        { "id": 2, "apLibelleFr": "Anglais", "note": 16, "observation": "Bien" },
        { "id": 3, "apLibelleFr": "Sport", "note": 18 }
    ]))
    .into_response()
}

async fn exam_grades(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return rejected();
    }
    Json(json!([
        { "id": 10, "mcLibelleFr": "Analyse 3", "noteExamen": 14, "rattachementMcCoefficient": 4 },
        { "id": 11, "mcLibelleFr": "Algèbre 3", "noteExamen": 8, "rattachementMcCoefficient": 2 }
    ]))
    .into_response()
}

async fn photo(State(fake): State<Arc<FakeUpstream>>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return rejected();
    }
    if fake.photo_missing.load(Ordering::SeqCst) {
        return (StatusCode::NOT_FOUND, "").into_response();
    }
    (StatusCode::OK, "aGVsbG8=").into_response()
}

async fn subjects(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return rejected();
    }
    Json(json!([
        { "id": 1, "mcLibelleFr": "Anglais", "coefficientExamen": 1 },
        { "id": 2, "mcLibelleFr": "Analyse 3", "coefficientExamen": 4 }
    ]))
    .into_response()
}

async fn chat_completions(
    State(fake): State<Arc<FakeUpstream>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    fake.chat_calls.fetch_add(1, Ordering::SeqCst);
    assert_eq!(
        headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()),
        Some("Bearer test-key")
    );
    *fake.last_prompt.lock().unwrap() = body["messages"][1]["content"].as_str().map(str::to_string);

    let status = StatusCode::from_u16(fake.groq_status.load(Ordering::SeqCst)).unwrap();
    if !status.is_success() {
        return (status, "upstream error").into_response();
    }
    let content = fake.groq_content.lock().unwrap().clone();
    Json(json!({
        "id": "chatcmpl-1",
        "model": body["model"],
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
    }))
    .into_response()
}

/// Serves the fake upstreams on an ephemeral port and returns the address.
pub async fn spawn_upstream(fake: Arc<FakeUpstream>) -> String {
    let app = Router::new()
        .route("/api/authentication/v1/", post(authenticate))
        .route("/api/infos/bac/{uuid}/dias", get(registrations))
        .route("/api/infos/bac/{uuid}/dias/{id}/periode/bilans", get(period_reports))
        .route("/api/infos/bac/{uuid}/individu", get(individual))
        .route("/api/infos/controleContinue/dia/{card_id}/notesCC", get(cc_grades))
        .route(
            "/api/infos/planningSession/dia/{card_id}/noteExamens",
            get(exam_grades),
        )
        .route("/api/infos/image/{uuid}", get(photo))
        .route(
            "/api/infos/offreFormation/{offer}/niveau/{level}/Coefficients",
            get(subjects),
        )
        .route("/groq/chat/completions", post(chat_completions))
        .with_state(fake);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}")
}

pub fn test_jwt_config() -> JwtConfig {
    JwtConfig {
        secret: "test-secret".to_string(),
        access_token_expiry: 3600,
        refresh_token_expiry: 86_400,
    }
}

pub fn test_state(upstream: &str, rate_limit_config: RateLimitConfig) -> AppState {
    let upstream_config = UpstreamConfig::with_base_url(&format!("{upstream}/api"));
    let groq_config = GroqConfig {
        api_key: "test-key".to_string(),
        base_url: format!("{upstream}/groq"),
        model: TEST_MODEL.to_string(),
        timeout: Duration::from_secs(5),
    };
    let academic_structure =
        AcademicStructure::from_json(include_str!("../../data/academic-structure.json")).unwrap();

    AppState {
        jwt_config: test_jwt_config(),
        cookie_config: CookieConfig::default(),
        cors_config: CorsConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
            max_age: 600,
        },
        rate_limit_config,
        blacklist: TokenBlacklist::new(),
        progres: ProgresClient::new(&upstream_config).unwrap(),
        groq: GroqClient::new(&groq_config).unwrap(),
        upstream_config,
        academic_structure: Arc::new(academic_structure),
    }
}

/// Gateway wired to a fresh fake upstream, with rate limiting off.
pub async fn setup_test_app() -> (Router, Arc<FakeUpstream>, AppState) {
    let fake = FakeUpstream::new();
    let upstream = spawn_upstream(fake.clone()).await;
    let state = test_state(&upstream, RateLimitConfig::disabled());
    (init_router(state.clone()), fake, state)
}

pub async fn body_json(response: Response) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

/// Value of the `refresh_token` cookie set by `response`, if any.
pub fn refresh_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|v| v.strip_prefix("refresh_token="))
        .map(|rest| rest.split(';').next().unwrap_or_default().to_string())
}

pub fn login_request(username: &str, password: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "username": username, "password": password }).to_string(),
        ))
        .unwrap()
}

/// Logs in and returns the access token and the refresh cookie value.
pub async fn login(app: &Router) -> (String, String) {
    let response = app
        .clone()
        .oneshot(login_request(USERNAME, PASSWORD))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let refresh = refresh_cookie(&response).expect("refresh cookie");
    let body = body_json(response).await;
    (body["token"].as_str().unwrap().to_string(), refresh)
}

pub fn authed_get(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

pub fn authed_post(uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("authorization", format!("Bearer {token}"));
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}
