//! HTTP client for the remote PROGRES academic-records API.
//!
//! Every proxied call forwards the student's upstream credential verbatim in
//! the `Authorization` header (no `Bearer` prefix). Upstream failures are
//! mapped to [`AppError`]s carrying the upstream status and a
//! `Failed to fetch <what>: <reason>` message.

use std::time::Instant;

use progres_config::UpstreamConfig;
use progres_core::AppError;
use progres_models::{LoginRequest, UpstreamAuthResponse};
use reqwest::{Client, Response, StatusCode, header};
use serde_json::Value;
use tracing::{debug, error, instrument, warn};

use crate::metrics::{track_upstream_duration, track_upstream_error};

#[derive(Clone, Debug)]
pub struct ProgresClient {
    http: Client,
    base_url: String,
}

fn reason(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("Unknown")
}

impl ProgresClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, AppError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(AppError::internal)?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Exchanges student credentials for an upstream token.
    ///
    /// # Errors
    ///
    /// - `401` "Invalid username or password" when the upstream rejects them
    /// - `503` when the upstream cannot be reached
    /// - any other upstream status as is, with "Authentication failed: <reason>"
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn authenticate(
        &self,
        request: &LoginRequest,
    ) -> Result<UpstreamAuthResponse, AppError> {
        let response = self
            .http
            .post(self.url("/authentication/v1/"))
            .json(request)
            .send()
            .await
            .map_err(|e| {
                track_upstream_error("authentication");
                if e.is_connect() || e.is_timeout() {
                    error!(error = %e, "Cannot reach the PROGRES authentication service");
                    AppError::service_unavailable(
                        "Authentication service is currently unavailable. Please try again later."
                            .to_string(),
                    )
                } else {
                    error!(error = %e, "PROGRES authentication request failed");
                    AppError::internal_error(format!("Authentication failed: {}", e))
                }
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(AppError::unauthorized(
                "Invalid username or password".to_string(),
            ));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), body = %body, "PROGRES authentication failed");
            track_upstream_error("authentication");
            return Err(AppError::from_status_code(
                status.as_u16(),
                format!("Authentication failed: {}", reason(status)),
            ));
        }

        response.json::<UpstreamAuthResponse>().await.map_err(|e| {
            error!(error = %e, "Unreadable PROGRES authentication response");
            AppError::internal_error(format!("Authentication failed: {}", e))
        })
    }

    async fn send_get(
        &self,
        path: &str,
        external_token: &str,
        what: &str,
    ) -> Result<Response, AppError> {
        debug!(path = %path, "Calling PROGRES");
        let start = Instant::now();
        let result = self
            .http
            .get(self.url(path))
            .header(header::AUTHORIZATION, external_token)
            .send()
            .await;
        track_upstream_duration(what, start.elapsed().as_secs_f64());

        result.map_err(|e| {
            error!(error = %e, "Error fetching {}", what);
            track_upstream_error(what);
            AppError::internal_error(format!("Failed to fetch {}", what))
        })
    }

    async fn read_body(response: Response, what: &str) -> Result<String, AppError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %body, "Failed to fetch {}", what);
            track_upstream_error(what);
            return Err(AppError::from_status_code(
                status.as_u16(),
                format!("Failed to fetch {}: {}", what, reason(status)),
            ));
        }

        response.text().await.map_err(|e| {
            error!(error = %e, "Error reading {}", what);
            AppError::internal_error(format!("Failed to fetch {}", what))
        })
    }

    fn parse(body: &str, what: &str, empty: Value) -> Result<Value, AppError> {
        if body.trim().is_empty() {
            return Ok(empty);
        }
        serde_json::from_str(body).map_err(|e| {
            error!(error = %e, "Error decoding {}", what);
            AppError::internal_error(format!("Failed to fetch {}", what))
        })
    }

    /// GETs a JSON document. An empty body yields `null`.
    #[instrument(skip(self, external_token))]
    pub async fn get_json(
        &self,
        path: &str,
        external_token: &str,
        what: &str,
    ) -> Result<Value, AppError> {
        let response = self.send_get(path, external_token, what).await?;
        let body = Self::read_body(response, what).await?;
        Self::parse(&body, what, Value::Null)
    }

    /// GETs a JSON list. An empty body yields `[]`.
    #[instrument(skip(self, external_token))]
    pub async fn get_list(
        &self,
        path: &str,
        external_token: &str,
        what: &str,
    ) -> Result<Value, AppError> {
        let response = self.send_get(path, external_token, what).await?;
        let body = Self::read_body(response, what).await?;
        Self::parse(&body, what, Value::Array(Vec::new()))
    }

    /// GETs a text document. `404` and empty bodies yield `None`.
    #[instrument(skip(self, external_token))]
    pub async fn get_optional_text(
        &self,
        path: &str,
        external_token: &str,
        what: &str,
    ) -> Result<Option<String>, AppError> {
        let response = self.send_get(path, external_token, what).await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!("No {} upstream", what);
            return Ok(None);
        }
        let body = Self::read_body(response, what).await?;
        let body = body.trim();
        Ok((!body.is_empty()).then(|| body.to_string()))
    }
}
