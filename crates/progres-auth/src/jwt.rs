//! JWT creation and verification for gateway tokens.
//!
//! The gateway never sees the student's password after login. Instead the
//! upstream credential returned by the PROGRES authentication endpoint is
//! sealed inside a signed token and unsealed on every proxied request.
//!
//! # Example
//!
//! ```ignore
//! use progres_auth::{create_access_token, verify_token};
//! use progres_config::JwtConfig;
//!
//! let config = JwtConfig::from_env();
//! let token = create_access_token("student-uuid", "upstream-token", &config)?;
//! let claims = verify_token(&token, &config)?;
//! assert_eq!(claims.external_token, "upstream-token");
//! ```

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use progres_config::JwtConfig;
use progres_core::AppError;

use crate::claims::{Claims, TokenType};

fn build_token(
    uuid: &str,
    external_token: &str,
    token_type: TokenType,
    lifetime: i64,
    jwt_config: &JwtConfig,
) -> Result<String, AppError> {
    let now = Utc::now().timestamp();
    let exp = (now + lifetime).max(0);

    let claims = Claims {
        sub: uuid.to_string(),
        external_token: external_token.to_string(),
        token_type,
        jti: Uuid::new_v4().to_string(),
        exp: exp as usize,
        iat: now as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_config.secret.as_bytes()),
    )
    .map_err(|e| AppError::internal_error(format!("Failed to create token: {}", e)))
}

fn decode_claims(token: &str, jwt_config: &JwtConfig, validate_exp: bool) -> Option<Claims> {
    let mut validation = Validation::default();
    validation.validate_exp = validate_exp;
    // Blacklist entries are dropped at `exp`, so no grace period past it.
    validation.leeway = 0;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_config.secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .ok()
}

/// Creates a short-lived access token carrying the upstream credential.
///
/// # Errors
///
/// Returns an internal error if encoding fails.
pub fn create_access_token(
    uuid: &str,
    external_token: &str,
    jwt_config: &JwtConfig,
) -> Result<String, AppError> {
    build_token(
        uuid,
        external_token,
        TokenType::Access,
        jwt_config.access_token_expiry,
        jwt_config,
    )
}

/// Creates a long-lived refresh token.
///
/// Refresh tokens travel only in the `refresh_token` cookie and are rotated
/// on every use.
///
/// # Errors
///
/// Returns an internal error if encoding fails.
pub fn create_refresh_token(
    uuid: &str,
    external_token: &str,
    jwt_config: &JwtConfig,
) -> Result<String, AppError> {
    build_token(
        uuid,
        external_token,
        TokenType::Refresh,
        jwt_config.refresh_token_expiry,
        jwt_config,
    )
}

/// Verifies an access token and returns its claims.
///
/// # Errors
///
/// Returns an unauthorized error if the signature is invalid, the token has
/// expired, the token is malformed, or it is a refresh token.
pub fn verify_token(token: &str, jwt_config: &JwtConfig) -> Result<Claims, AppError> {
    match decode_claims(token, jwt_config, true) {
        Some(claims) if claims.token_type == TokenType::Access => Ok(claims),
        _ => Err(AppError::unauthorized("Invalid or expired token".to_string())),
    }
}

/// Verifies a refresh token and returns its claims.
///
/// # Errors
///
/// Returns an unauthorized error if the token is invalid, expired, or an
/// access token.
pub fn verify_refresh_token(token: &str, jwt_config: &JwtConfig) -> Result<Claims, AppError> {
    match decode_claims(token, jwt_config, true) {
        Some(claims) if claims.token_type == TokenType::Refresh => Ok(claims),
        _ => Err(AppError::unauthorized(
            "Invalid or expired refresh token".to_string(),
        )),
    }
}

/// Reads the expiry (epoch milliseconds) of a correctly signed token,
/// expired or not. Used when revoking tokens at logout.
///
/// # Errors
///
/// Returns an unauthorized error if the signature does not verify.
pub fn token_expiry_ms(token: &str, jwt_config: &JwtConfig) -> Result<i64, AppError> {
    decode_claims(token, jwt_config, false)
        .map(|claims| claims.expires_at_ms())
        .ok_or_else(|| AppError::unauthorized("Invalid token".to_string()))
}
