use progres_core::AppError;
use progres_models::academic::Registration;
use progres_models::recommendations::{
    CurrentStatus, NO_EXAM_DATA, RecommendationRequest, RecommendationResponse, SYSTEM_PROMPT,
    build_user_prompt, parse_model_answer,
};
use tracing::{debug, error, info, instrument};

use crate::metrics::track_recommendation_generated;
use crate::middleware::auth::AuthUser;
use crate::modules::students::service::StudentService;
use crate::state::AppState;

pub struct RecommendationService;

impl RecommendationService {
    #[instrument(skip(state, request))]
    pub async fn get_recommendations(
        state: &AppState,
        auth_user: &AuthUser,
        request: RecommendationRequest,
    ) -> Result<RecommendationResponse, AppError> {
        let registrations = StudentService::get_registrations(state, auth_user).await?;
        let latest = registrations.first().ok_or_else(|| {
            AppError::not_found(anyhow::anyhow!("No academic registration found for student"))
        })?;

        let mut status = CurrentStatus::from_registration(latest);

        let (key, university) = state
            .academic_structure
            .select_university(
                request.university_code.as_deref(),
                latest.ll_etablissement_latin.as_deref(),
            )
            .ok_or_else(|| AppError::internal_error("Academic structure is empty".to_string()))?;
        info!(university = %key, "Using academic structure");

        status.university = Some(if university.name.is_empty() {
            "Unknown University".to_string()
        } else {
            university.name.clone()
        });
        status.university_ar = Some(university.name_ar.clone());

        let options = university.available_options(status.field.as_deref());
        let exam_data = Self::exam_data(state, auth_user, latest).await;
        let prompt = build_user_prompt(&status, &options, &exam_data, &request);

        let answer = state.groq.chat(SYSTEM_PROMPT, &prompt).await?;
        let response = parse_model_answer(&answer, status, state.groq.model()).map_err(|e| {
            error!(error = %e, answer = %answer, "Error parsing AI response");
            AppError::internal_error("Failed to parse AI recommendation".to_string())
        })?;

        track_recommendation_generated(&response.model);
        Ok(response)
    }

    /// Period reports of the registration as JSON, or a placeholder when
    /// they cannot be fetched.
    async fn exam_data(state: &AppState, auth_user: &AuthUser, registration: &Registration) -> String {
        let Some(id) = registration.id.filter(|id| *id > 0) else {
            return NO_EXAM_DATA.to_string();
        };

        match StudentService::get_exam_data(state, auth_user, &id.to_string()).await {
            Ok(data) => serde_json::to_string(&data).unwrap_or_else(|_| NO_EXAM_DATA.to_string()),
            Err(e) => {
                debug!(error = %e.message(), "Could not fetch exam data");
                NO_EXAM_DATA.to_string()
            }
        }
    }
}
