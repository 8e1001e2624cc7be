use axum::{Json, extract::State};
use progres_core::{AppError, ErrorResponse};
use progres_models::recommendations::{RecommendationRequest, RecommendationResponse};
use tracing::instrument;

use crate::middleware::auth::AuthUser;
use crate::modules::recommendations::service::RecommendationService;
use crate::state::AppState;
use crate::validator::OptionalValidatedJson;

/// AI recommendations for the next academic step
///
/// Analyzes the caller's latest registration and period reports against the
/// options of their university, optionally guided by preferences. The body
/// may be omitted.
#[utoipa::path(
    post,
    path = "/api/recommendations/suggest",
    request_body(content = Option<RecommendationRequest>, description = "Optional preferences"),
    responses(
        (status = 200, description = "Recommendations sorted by match score", body = RecommendationResponse),
        (status = 401, description = "Unauthorized or invalid Groq API key", body = ErrorResponse),
        (status = 404, description = "No registration found", body = ErrorResponse),
        (status = 429, description = "Groq rate limit exceeded", body = ErrorResponse),
        (status = 500, description = "AI service failed", body = ErrorResponse),
        (status = 503, description = "AI service not configured", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Recommendations"
)]
#[instrument(skip(state, request))]
pub async fn suggest(
    State(state): State<AppState>,
    auth_user: AuthUser,
    OptionalValidatedJson(request): OptionalValidatedJson<RecommendationRequest>,
) -> Result<Json<RecommendationResponse>, AppError> {
    let response = RecommendationService::get_recommendations(&state, &auth_user, request).await?;
    Ok(Json(response))
}
