use axum::{
    Json,
    extract::{Path, State},
};
use progres_core::{AppError, ErrorResponse};
use progres_models::academic::{PeriodSummary, StudentCard};
use serde_json::Value;
use tracing::instrument;

use crate::middleware::auth::AuthUser;
use crate::modules::students::service::StudentService;
use crate::state::AppState;

/// List the caller's registrations
#[utoipa::path(
    get,
    path = "/api/student/data",
    responses(
        (status = 200, description = "Registrations (dias) as returned by PROGRES", body = serde_json::Value),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Students"
)]
#[instrument(skip(state))]
pub async fn get_student_data(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<Value>, AppError> {
    let data = StudentService::get_student_data(&state, &auth_user).await?;
    Ok(Json(data))
}

/// Period reports of one registration
#[utoipa::path(
    get,
    path = "/api/student/exams/{id}",
    params(
        ("id" = String, Path, description = "Registration id")
    ),
    responses(
        (status = 200, description = "Period reports (bilans)", body = serde_json::Value),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Students"
)]
#[instrument(skip(state))]
pub async fn get_exam_data(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let data = StudentService::get_exam_data(&state, &auth_user, &id).await?;
    Ok(Json(data))
}

/// Per-period weighted averages of one registration
#[utoipa::path(
    get,
    path = "/api/student/exams/{id}/summary",
    params(
        ("id" = String, Path, description = "Registration id")
    ),
    responses(
        (status = 200, description = "One summary per period", body = Vec<PeriodSummary>),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Students"
)]
#[instrument(skip(state))]
pub async fn get_exam_summary(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<PeriodSummary>>, AppError> {
    let summary = StudentService::get_exam_summary(&state, &auth_user, &id).await?;
    Ok(Json(summary))
}

/// Personal information of the caller
#[utoipa::path(
    get,
    path = "/api/student/info",
    responses(
        (status = 200, description = "Personal information (individu)", body = serde_json::Value),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Students"
)]
#[instrument(skip(state))]
pub async fn get_student_info(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<Value>, AppError> {
    let info = StudentService::get_student_info(&state, &auth_user).await?;
    Ok(Json(info))
}

/// Continuous-assessment grades of one of the caller's registrations
#[utoipa::path(
    get,
    path = "/api/student/cc-grades/{card_id}",
    params(
        ("card_id" = String, Path, description = "Registration id, must belong to the caller")
    ),
    responses(
        (status = 200, description = "CC grades", body = serde_json::Value),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Card belongs to another student", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Students"
)]
#[instrument(skip(state))]
pub async fn get_cc_grades(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(card_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let grades = StudentService::get_cc_grades(&state, &auth_user, &card_id).await?;
    Ok(Json(grades))
}

/// Exam grades of one of the caller's registrations
#[utoipa::path(
    get,
    path = "/api/student/exam-grades/{card_id}",
    params(
        ("card_id" = String, Path, description = "Registration id, must belong to the caller")
    ),
    responses(
        (status = 200, description = "Exam grades", body = serde_json::Value),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Card belongs to another student", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Students"
)]
#[instrument(skip(state))]
pub async fn get_exam_grades(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(card_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let grades = StudentService::get_exam_grades(&state, &auth_user, &card_id).await?;
    Ok(Json(grades))
}

/// Photo of the caller
///
/// Base64 string, or `null` when PROGRES has no photo.
#[utoipa::path(
    get,
    path = "/api/student/photo",
    responses(
        (status = 200, description = "Base64 photo or null", body = Option<String>),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Students"
)]
#[instrument(skip(state))]
pub async fn get_photo(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<Option<String>>, AppError> {
    let photo = StudentService::get_photo(&state, &auth_user).await?;
    Ok(Json(photo))
}

/// Subject coefficients of a study offer and level
#[utoipa::path(
    get,
    path = "/api/student/subjects/{offer_id}/{level_id}",
    params(
        ("offer_id" = String, Path, description = "ouvertureOffreFormationId of the registration"),
        ("level_id" = String, Path, description = "niveauId of the registration")
    ),
    responses(
        (status = 200, description = "Subject coefficients", body = serde_json::Value),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Students"
)]
#[instrument(skip(state))]
pub async fn get_subjects(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path((offer_id, level_id)): Path<(String, String)>,
) -> Result<Json<Value>, AppError> {
    let subjects = StudentService::get_subjects(&state, &auth_user, &offer_id, &level_id).await?;
    Ok(Json(subjects))
}

/// Digital student card of one of the caller's registrations
#[utoipa::path(
    get,
    path = "/api/student/card/{card_id}",
    params(
        ("card_id" = String, Path, description = "Registration id, must belong to the caller")
    ),
    responses(
        (status = 200, description = "Student card", body = StudentCard),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Card belongs to another student", body = ErrorResponse)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Students"
)]
#[instrument(skip(state))]
pub async fn get_student_card(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(card_id): Path<String>,
) -> Result<Json<StudentCard>, AppError> {
    let card = StudentService::get_student_card(&state, &auth_user, &card_id).await?;
    Ok(Json(card))
}
