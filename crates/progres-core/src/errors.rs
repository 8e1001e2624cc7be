//! Application error type with HTTP response conversion.
//!
//! [`AppError`] pairs an HTTP status with an [`anyhow::Error`]. Handlers and
//! services return `Result<T, AppError>` and use `?` freely: any error that
//! converts into `anyhow::Error` becomes a `500`.
//!
//! The response body carries the message twice, under `error` and under
//! `message`, because the portal frontend reads `message` while the rest
//! of the API documents `error`.

use anyhow::Error;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;

/// Error body returned by every failing endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub error: Error,
}

impl AppError {
    pub fn new<E>(status: StatusCode, err: E) -> Self
    where
        E: Into<Error>,
    {
        Self {
            status,
            error: err.into(),
        }
    }

    pub fn internal<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, err)
    }

    pub fn internal_error(message: String) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, anyhow::anyhow!(message))
    }

    pub fn not_found<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::NOT_FOUND, err)
    }

    pub fn unprocessable<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, err)
    }

    pub fn bad_request<E>(err: E) -> Self
    where
        E: Into<Error>,
    {
        Self::new(StatusCode::BAD_REQUEST, err)
    }

    pub fn unauthorized(message: String) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, anyhow::anyhow!(message))
    }

    pub fn forbidden(message: String) -> Self {
        Self::new(StatusCode::FORBIDDEN, anyhow::anyhow!(message))
    }

    pub fn service_unavailable(message: String) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, anyhow::anyhow!(message))
    }

    pub fn too_many_requests(message: String) -> Self {
        Self::new(StatusCode::TOO_MANY_REQUESTS, anyhow::anyhow!(message))
    }

    /// Builds an error from a raw upstream status code.
    ///
    /// Codes that are not valid HTTP statuses collapse to `502 Bad Gateway`.
    pub fn from_status_code(code: u16, message: String) -> Self {
        let status = StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_GATEWAY);
        Self::new(status, anyhow::anyhow!(message))
    }

    pub fn message(&self) -> String {
        self.error.to_string()
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status, self.error)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = self.error.to_string();

        if self.status.is_server_error() {
            tracing::error!(status = %self.status.as_u16(), error = %message, "Request failed");
        }

        let body = Json(json!({
            "error": message,
            "message": message,
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<Error>,
{
    fn from(err: E) -> Self {
        AppError::internal(err)
    }
}
