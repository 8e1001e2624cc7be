use axum::{
    Json,
    extract::{Path, Query, State},
};
use progres_core::{AppError, ErrorResponse};
use progres_models::calculator::{CalculatorRequest, CalculatorResponse};
use serde::Deserialize;
use tracing::instrument;
use utoipa::IntoParams;
use validator::Validate;

use crate::middleware::auth::AuthUser;
use crate::modules::calculator::service::CalculatorService;
use crate::state::AppState;
use crate::validator::ValidatedJson;

#[derive(Debug, Default, Deserialize, IntoParams, Validate)]
#[serde(rename_all = "camelCase", default)]
#[into_params(parameter_in = Query)]
pub struct CalculatorQuery {
    /// Period index within the year (default 0)
    #[validate(range(max = 32, message = "Period index is out of range"))]
    pub period: usize,
    /// Start from the period averages instead of the exam marks
    pub fill_existing: bool,
}

/// Weighted average of a period, from published marks
#[utoipa::path(
    get,
    path = "/api/student/calculator/{card_id}",
    params(
        ("card_id" = String, Path, description = "Registration id, must belong to the caller"),
        CalculatorQuery
    ),
    responses(
        (status = 200, description = "Module table and result", body = CalculatorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Card belongs to another student", body = ErrorResponse),
        (status = 422, description = "Unknown period", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Calculator"
)]
#[instrument(skip(state))]
pub async fn get_calculator(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(card_id): Path<String>,
    Query(query): Query<CalculatorQuery>,
) -> Result<Json<CalculatorResponse>, AppError> {
    query
        .validate()
        .map_err(|e| AppError::unprocessable(anyhow::anyhow!("Validation failed: {}", e)))?;

    let request = CalculatorRequest {
        period: query.period,
        fill_existing: query.fill_existing,
        ..Default::default()
    };
    let response = CalculatorService::run(&state, &auth_user, &card_id, &request).await?;
    Ok(Json(response))
}

/// Weighted average of a period with student-entered marks and coefficients
///
/// `marks` and `coefficients` are keyed by module id, as returned by the GET
/// variant. Coefficients only apply to modules whose coefficient is unknown.
#[utoipa::path(
    post,
    path = "/api/student/calculator/{card_id}",
    params(
        ("card_id" = String, Path, description = "Registration id, must belong to the caller")
    ),
    request_body = CalculatorRequest,
    responses(
        (status = 200, description = "Module table and result", body = CalculatorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Card belongs to another student", body = ErrorResponse),
        (status = 422, description = "Validation error or unknown period", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Calculator"
)]
#[instrument(skip(state, request))]
pub async fn post_calculator(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(card_id): Path<String>,
    ValidatedJson(request): ValidatedJson<CalculatorRequest>,
) -> Result<Json<CalculatorResponse>, AppError> {
    let response = CalculatorService::run(&state, &auth_user, &card_id, &request).await?;
    Ok(Json(response))
}
