use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use progres_auth::{Claims, verify_token};
use progres_core::AppError;

use crate::state::AppState;

/// Extractor that validates the bearer access token and yields its claims.
///
/// The token must verify, be an access token, and not be blacklisted.
#[derive(Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    /// Student uuid as returned by the upstream authentication.
    pub fn uuid(&self) -> &str {
        &self.0.sub
    }

    /// Upstream credential forwarded on every proxied call.
    pub fn external_token(&self) -> &str {
        &self.0.external_token
    }
}

// The upstream credential must never end up in logs.
impl std::fmt::Debug for AuthUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthUser")
            .field("uuid", &self.0.sub)
            .field("jti", &self.0.jti)
            .finish()
    }
}

/// Reads the token of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::unauthorized("Missing authorization header".to_string()))?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::unauthorized("Invalid authorization header format".to_string()))
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;

        let claims = verify_token(token, &state.jwt_config)?;

        if state.blacklist.is_blacklisted(token) {
            return Err(AppError::unauthorized("Token has been revoked".to_string()));
        }

        Ok(AuthUser(claims))
    }
}
