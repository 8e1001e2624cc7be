use progres_core::AppError;
use progres_models::academic::{PeriodReport, PeriodSummary, Registration, StudentCard};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::middleware::auth::AuthUser;
use crate::state::AppState;

pub const ACCESS_DENIED: &str = "Access denied: You can only access your own academic records";
pub const UNABLE_TO_VALIDATE: &str = "Unable to validate access permissions";

/// Rejects identifiers that would change the shape of an upstream path.
pub fn path_segment(value: &str) -> Result<&str, AppError> {
    let valid = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(value)
    } else {
        Err(AppError::bad_request(anyhow::anyhow!("Invalid identifier")))
    }
}

fn id_matches(id: Option<&Value>, card_id: &str) -> bool {
    match id {
        Some(Value::Number(n)) => n.to_string() == card_id,
        Some(Value::String(s)) => s == card_id,
        _ => false,
    }
}

/// Finds the registration whose `id` is `card_id` in a `/dias` payload.
pub fn find_owned_registration(
    registrations: &Value,
    card_id: &str,
) -> Result<Value, AppError> {
    let entries = registrations
        .as_array()
        .ok_or_else(|| AppError::forbidden(UNABLE_TO_VALIDATE.to_string()))?;

    entries
        .iter()
        .find(|entry| id_matches(entry.get("id"), card_id))
        .cloned()
        .ok_or_else(|| AppError::forbidden(ACCESS_DENIED.to_string()))
}

fn decode_list<T: DeserializeOwned>(value: Value, what: &str) -> Vec<T> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| {
                serde_json::from_value(item)
                    .inspect_err(|e| debug!(error = %e, "Skipping malformed {} entry", what))
                    .ok()
            })
            .collect(),
        _ => Vec::new(),
    }
}

pub struct StudentService;

impl StudentService {
    #[instrument(skip(state))]
    pub async fn get_student_data(state: &AppState, auth_user: &AuthUser) -> Result<Value, AppError> {
        state
            .progres
            .get_list(
                &format!("/infos/bac/{}/dias", path_segment(auth_user.uuid())?),
                auth_user.external_token(),
                "student data",
            )
            .await
    }

    pub async fn get_registrations(
        state: &AppState,
        auth_user: &AuthUser,
    ) -> Result<Vec<Registration>, AppError> {
        let data = Self::get_student_data(state, auth_user).await?;
        Ok(decode_list(data, "registration"))
    }

    #[instrument(skip(state))]
    pub async fn get_exam_data(
        state: &AppState,
        auth_user: &AuthUser,
        id: &str,
    ) -> Result<Value, AppError> {
        state
            .progres
            .get_list(
                &format!(
                    "/infos/bac/{}/dias/{}/periode/bilans",
                    path_segment(auth_user.uuid())?,
                    path_segment(id)?
                ),
                auth_user.external_token(),
                "exam data",
            )
            .await
    }

    pub async fn get_exam_reports(
        state: &AppState,
        auth_user: &AuthUser,
        id: &str,
    ) -> Result<Vec<PeriodReport>, AppError> {
        let data = Self::get_exam_data(state, auth_user, id).await?;
        Ok(decode_list(data, "period report"))
    }

    pub async fn get_exam_summary(
        state: &AppState,
        auth_user: &AuthUser,
        id: &str,
    ) -> Result<Vec<PeriodSummary>, AppError> {
        let reports = Self::get_exam_reports(state, auth_user, id).await?;
        Ok(reports.iter().map(PeriodReport::summary).collect())
    }

    #[instrument(skip(state))]
    pub async fn get_student_info(state: &AppState, auth_user: &AuthUser) -> Result<Value, AppError> {
        state
            .progres
            .get_json(
                &format!("/infos/bac/{}/individu", path_segment(auth_user.uuid())?),
                auth_user.external_token(),
                "student info",
            )
            .await
    }

    /// Returns the caller's registration for `card_id`.
    ///
    /// # Errors
    ///
    /// `403` when the card belongs to somebody else or the registrations
    /// cannot be read as a list.
    #[instrument(skip(state))]
    pub async fn validate_card_ownership(
        state: &AppState,
        auth_user: &AuthUser,
        card_id: &str,
    ) -> Result<Value, AppError> {
        let data = Self::get_student_data(state, auth_user).await?;
        find_owned_registration(&data, card_id).inspect_err(|e| {
            warn!(
                uuid = %auth_user.uuid(),
                card_id = %card_id,
                reason = %e.message(),
                "SECURITY: card access rejected"
            );
        })
    }

    /// CC grades of a card already known to belong to the caller.
    pub async fn fetch_cc_grades(
        state: &AppState,
        auth_user: &AuthUser,
        card_id: &str,
    ) -> Result<Value, AppError> {
        state
            .progres
            .get_list(
                &format!(
                    "/infos/controleContinue/dia/{}/notesCC",
                    path_segment(card_id)?
                ),
                auth_user.external_token(),
                "CC grades",
            )
            .await
    }

    /// Exam grades of a card already known to belong to the caller.
    pub async fn fetch_exam_grades(
        state: &AppState,
        auth_user: &AuthUser,
        card_id: &str,
    ) -> Result<Value, AppError> {
        state
            .progres
            .get_list(
                &format!(
                    "/infos/planningSession/dia/{}/noteExamens",
                    path_segment(card_id)?
                ),
                auth_user.external_token(),
                "Exam grades",
            )
            .await
    }

    #[instrument(skip(state))]
    pub async fn get_cc_grades(
        state: &AppState,
        auth_user: &AuthUser,
        card_id: &str,
    ) -> Result<Value, AppError> {
        path_segment(card_id)?;
        Self::validate_card_ownership(state, auth_user, card_id).await?;
        Self::fetch_cc_grades(state, auth_user, card_id).await
    }

    #[instrument(skip(state))]
    pub async fn get_exam_grades(
        state: &AppState,
        auth_user: &AuthUser,
        card_id: &str,
    ) -> Result<Value, AppError> {
        path_segment(card_id)?;
        Self::validate_card_ownership(state, auth_user, card_id).await?;
        Self::fetch_exam_grades(state, auth_user, card_id).await
    }

    #[instrument(skip(state))]
    pub async fn get_photo(
        state: &AppState,
        auth_user: &AuthUser,
    ) -> Result<Option<String>, AppError> {
        state
            .progres
            .get_optional_text(
                &format!("/infos/image/{}", path_segment(auth_user.uuid())?),
                auth_user.external_token(),
                "student photo",
            )
            .await
    }

    #[instrument(skip(state))]
    pub async fn get_subjects(
        state: &AppState,
        auth_user: &AuthUser,
        offer_id: &str,
        level_id: &str,
    ) -> Result<Value, AppError> {
        state
            .progres
            .get_list(
                &format!(
                    "/infos/offreFormation/{}/niveau/{}/Coefficients",
                    path_segment(offer_id)?,
                    path_segment(level_id)?
                ),
                auth_user.external_token(),
                "subjects",
            )
            .await
    }

    #[instrument(skip(state))]
    pub async fn get_student_card(
        state: &AppState,
        auth_user: &AuthUser,
        card_id: &str,
    ) -> Result<StudentCard, AppError> {
        path_segment(card_id)?;
        let registration = Self::validate_card_ownership(state, auth_user, card_id).await?;
        let registration: Registration = serde_json::from_value(registration).unwrap_or_default();
        Ok(StudentCard::from_registration(
            &registration,
            card_id,
            &state.upstream_config.check_url,
        ))
    }
}
