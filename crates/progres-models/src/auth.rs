//! Authentication DTOs.
//!
//! [`LoginRequest`] is forwarded as-is to the upstream authentication
//! endpoint, which answers with an [`UpstreamAuthResponse`]. The gateway
//! then answers the client with a [`LoginResponse`]. The refresh token never
//! appears in a body; it is set as a cookie.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Student credentials as accepted by PROGRES.
#[derive(Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "username is required"))]
    #[schema(example = "202031234567")]
    pub username: String,
    #[validate(length(min = 1, message = "password is required"))]
    #[schema(example = "password123")]
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Body returned by the upstream `POST /authentication/v1/`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamAuthResponse {
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub expiration_date: Option<String>,
}

/// Successful login or refresh.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub uuid: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LogoutResponse {
    pub message: String,
    pub success: bool,
}
