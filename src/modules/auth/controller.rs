use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;
use progres_config::cookie::REFRESH_TOKEN_COOKIE;
use progres_core::{AppError, ErrorResponse};
use progres_models::{LoginRequest, LoginResponse, LogoutResponse};
use tracing::instrument;

use super::cookies::{clear_refresh_cookie, refresh_cookie};
use super::service::AuthService;
use crate::middleware::auth::bearer_token;
use crate::state::AppState;
use crate::validator::ValidatedJson;

fn refresh_token_from(jar: &CookieJar) -> Option<String> {
    jar.get(REFRESH_TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

/// Login with PROGRES credentials
///
/// Sets the `refresh_token` cookie. The refresh token is never returned in
/// the body.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Bad request - malformed body", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse),
        (status = 429, description = "Too many requests"),
        (status = 503, description = "PROGRES unreachable", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip(state, jar))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(dto): ValidatedJson<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), AppError> {
    let issued = AuthService::login(&state, dto).await?;
    let jar = jar.add(refresh_cookie(
        issued.refresh_token,
        &state.cookie_config,
        state.jwt_config.refresh_token_expiry,
    ));
    Ok((jar, Json(issued.response)))
}

/// Exchange the refresh cookie for a new access token
///
/// The refresh token is rotated: the old one is revoked and a new cookie is
/// set. On failure the cookie is cleared.
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    responses(
        (status = 200, description = "Token refreshed", body = LoginResponse),
        (status = 401, description = "Missing, invalid, expired or revoked refresh token", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip_all)]
pub async fn refresh(State(state): State<AppState>, jar: CookieJar) -> Response {
    let Some(token) = refresh_token_from(&jar) else {
        return AppError::unauthorized("No refresh token provided".to_string()).into_response();
    };

    match AuthService::refresh(&state, &token) {
        Ok(issued) => {
            let jar = jar.add(refresh_cookie(
                issued.refresh_token,
                &state.cookie_config,
                state.jwt_config.refresh_token_expiry,
            ));
            (jar, Json(issued.response)).into_response()
        }
        Err(e) => (jar.add(clear_refresh_cookie(&state.cookie_config)), e).into_response(),
    }
}

/// Logout and revoke the current tokens
///
/// Best effort: always succeeds and always clears the refresh cookie.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Logged out", body = LogoutResponse)
    ),
    security(
        (),
        ("bearer_auth" = [])
    ),
    tag = "Authentication"
)]
#[instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> (CookieJar, Json<LogoutResponse>) {
    let refresh_token = refresh_token_from(&jar);
    AuthService::logout(
        &state,
        bearer_token(&headers).ok(),
        refresh_token.as_deref(),
    );

    (
        jar.add(clear_refresh_cookie(&state.cookie_config)),
        Json(LogoutResponse {
            message: "Logged out successfully".to_string(),
            success: true,
        }),
    )
}
