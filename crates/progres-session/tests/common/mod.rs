use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::{Value, json};

pub const PASSWORD: &str = "secret";
pub const UUID: &str = "student-uuid";

/// In-process stand-in for the gateway's `/api` surface.
#[derive(Default)]
pub struct FakeGateway {
    pub issued: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub refresh_fails: AtomicBool,
    /// Lifetime (seconds) of tokens issued by login.
    pub login_lifetime: AtomicI64,
    /// Lifetime (seconds) of tokens issued by refresh.
    pub refresh_lifetime: AtomicI64,
    pub refresh_delay_ms: AtomicI64,
    pub photo_missing: AtomicBool,
    /// The only access token currently accepted.
    pub valid_token: Mutex<Option<String>>,
}

impl FakeGateway {
    pub fn new() -> Arc<Self> {
        let gateway = Self::default();
        gateway.login_lifetime.store(3600, Ordering::SeqCst);
        gateway.refresh_lifetime.store(3600, Ordering::SeqCst);
        Arc::new(gateway)
    }

    pub fn refresh_count(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    /// Makes the gateway reject the current access token.
    pub fn revoke_current_token(&self) {
        *self.valid_token.lock().unwrap() = None;
    }

    fn mint(&self, lifetime: i64) -> String {
        let n = self.issued.fetch_add(1, Ordering::SeqCst);
        let token = token_expiring_in(lifetime, n);
        *self.valid_token.lock().unwrap() = Some(token.clone());
        token
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        let bearer = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        let valid = self.valid_token.lock().unwrap();
        matches!((bearer, valid.as_deref()), (Some(b), Some(v)) if b == v)
    }
}

pub fn token_expiring_in(lifetime: i64, n: usize) -> String {
    let exp = chrono::Utc::now().timestamp() + lifetime;
    format!(
        "{}.{}.signature",
        URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
        URL_SAFE_NO_PAD.encode(json!({ "sub": UUID, "exp": exp, "n": n }).to_string())
    )
}

fn has_refresh_cookie(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .any(|pair| pair.trim().starts_with("refresh_token=") && pair.trim().len() > "refresh_token=".len())
}

fn set_refresh_cookie(value: &str) -> (header::HeaderName, String) {
    (
        header::SET_COOKIE,
        format!("refresh_token={value}; Path=/api/auth; HttpOnly; Max-Age=2592000"),
    )
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": message, "message": message })),
    )
        .into_response()
}

async fn login(State(gw): State<Arc<FakeGateway>>, Json(body): Json<Value>) -> Response {
    if body["password"] != PASSWORD {
        return unauthorized("Invalid username or password");
    }
    let token = gw.mint(gw.login_lifetime.load(Ordering::SeqCst));
    let n = gw.issued.load(Ordering::SeqCst);
    (
        [set_refresh_cookie(&format!("r{n}"))],
        Json(json!({ "token": token, "uuid": UUID, "message": "Authentication successful" })),
    )
        .into_response()
}

async fn refresh(State(gw): State<Arc<FakeGateway>>, headers: HeaderMap) -> Response {
    gw.refresh_calls.fetch_add(1, Ordering::SeqCst);
    let delay = gw.refresh_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay as u64)).await;
    }
    if gw.refresh_fails.load(Ordering::SeqCst) || !has_refresh_cookie(&headers) {
        return unauthorized("Invalid or expired refresh token");
    }
    let token = gw.mint(gw.refresh_lifetime.load(Ordering::SeqCst));
    let n = gw.issued.load(Ordering::SeqCst);
    (
        [set_refresh_cookie(&format!("r{n}"))],
        Json(json!({ "token": token, "uuid": UUID, "message": "Token refreshed successfully" })),
    )
        .into_response()
}

async fn logout(State(gw): State<Arc<FakeGateway>>) -> Response {
    gw.logout_calls.fetch_add(1, Ordering::SeqCst);
    (
        [(
            header::SET_COOKIE,
            "refresh_token=; Path=/api/auth; Max-Age=0".to_string(),
        )],
        Json(json!({ "message": "Logged out successfully", "success": true })),
    )
        .into_response()
}

async fn student_data(State(gw): State<Arc<FakeGateway>>, headers: HeaderMap) -> Response {
    if !gw.authorized(&headers) {
        return unauthorized("Invalid or expired token");
    }
    Json(json!([
        { "id": 4512, "anneeAcademiqueCode": "2023/2024", "ouvertureOffreFormationId": 77, "niveauId": 3 }
    ]))
    .into_response()
}

async fn exams(State(gw): State<Arc<FakeGateway>>, headers: HeaderMap) -> Response {
    if !gw.authorized(&headers) {
        return unauthorized("Invalid or expired token");
    }
    (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response()
}

async fn cc_grades(State(gw): State<Arc<FakeGateway>>, headers: HeaderMap) -> Response {
    if !gw.authorized(&headers) {
        return unauthorized("Invalid or expired token");
    }
    (StatusCode::OK, "").into_response()
}

async fn exam_grades(State(gw): State<Arc<FakeGateway>>, headers: HeaderMap) -> Response {
    if !gw.authorized(&headers) {
        return unauthorized("Invalid or expired token");
    }
    let message = "Access denied: You can only access your own academic records";
    (
        StatusCode::FORBIDDEN,
        Json(json!({ "error": message, "message": message })),
    )
        .into_response()
}

async fn photo(State(gw): State<Arc<FakeGateway>>, headers: HeaderMap) -> Response {
    if !gw.authorized(&headers) {
        return unauthorized("Invalid or expired token");
    }
    if gw.photo_missing.load(Ordering::SeqCst) {
        return Json(Value::Null).into_response();
    }
    Json(json!("aGVsbG8=")).into_response()
}

/// Serves the fake gateway on an ephemeral port and returns its API root.
pub async fn spawn_gateway(gateway: Arc<FakeGateway>) -> String {
    let app = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/refresh", post(refresh))
        .route("/api/auth/logout", post(logout))
        .route("/api/student/data", get(student_data))
        .route("/api/student/exams/{id}", get(exams))
        .route("/api/student/cc-grades/{card_id}", get(cc_grades))
        .route("/api/student/exam-grades/{card_id}", get(exam_grades))
        .route("/api/student/photo", get(photo))
        .with_state(gateway);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}/api")
}
