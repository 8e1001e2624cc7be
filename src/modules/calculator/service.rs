use progres_core::AppError;
use progres_models::academic::{CcGrade, ExamGrade, Registration, SubjectCoefficient};
use progres_models::calculator::{
    CalculatorRequest, CalculatorResponse, Overrides, YearRecords, build_modules, compute_result,
    fill_with_existing_marks,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::middleware::auth::AuthUser;
use crate::modules::students::service::{StudentService, path_segment};
use crate::state::AppState;

fn list_or_empty<T: DeserializeOwned>(result: Result<Value, AppError>, what: &str) -> Vec<T> {
    match result {
        Ok(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        Ok(_) => Vec::new(),
        Err(e) => {
            debug!(error = %e.message(), "{} unavailable for the calculator", what);
            Vec::new()
        }
    }
}

pub struct CalculatorService;

impl CalculatorService {
    /// Everything the calculator needs for one of the caller's registrations.
    ///
    /// Only the ownership check can fail. Each grade source that cannot be
    /// fetched is left empty.
    #[instrument(skip(state))]
    pub async fn load_year_records(
        state: &AppState,
        auth_user: &AuthUser,
        card_id: &str,
    ) -> Result<YearRecords, AppError> {
        path_segment(card_id)?;
        let registration = StudentService::validate_card_ownership(state, auth_user, card_id).await?;
        let registration: Registration = serde_json::from_value(registration).unwrap_or_default();

        let subjects = async {
            match (registration.ouverture_offre_formation_id, registration.niveau_id) {
                (Some(offer), Some(level)) => list_or_empty::<SubjectCoefficient>(
                    StudentService::get_subjects(
                        state,
                        auth_user,
                        &offer.to_string(),
                        &level.to_string(),
                    )
                    .await,
                    "subjects",
                ),
                _ => Vec::new(),
            }
        };

        let (reports, exam_grades, cc_grades, subjects) = tokio::join!(
            StudentService::get_exam_data(state, auth_user, card_id),
            StudentService::fetch_exam_grades(state, auth_user, card_id),
            StudentService::fetch_cc_grades(state, auth_user, card_id),
            subjects,
        );

        Ok(YearRecords {
            year: registration.year_code(),
            reports: list_or_empty(reports, "period reports"),
            exam_grades: list_or_empty::<ExamGrade>(exam_grades, "exam grades"),
            cc_grades: list_or_empty::<CcGrade>(cc_grades, "CC grades"),
            subjects,
        })
    }

    /// Builds the module table of `request.period` and its weighted average.
    pub fn calculate(
        card_id: &str,
        records: &YearRecords,
        request: &CalculatorRequest,
    ) -> Result<CalculatorResponse, AppError> {
        let period_count = records.reports.len();
        if request.period >= period_count.max(1) {
            return Err(AppError::unprocessable(anyhow::anyhow!(
                "Period index is out of range"
            )));
        }

        let overrides = Overrides::from(request);
        let mut modules = build_modules(records, request.period, &overrides);
        if request.fill_existing {
            fill_with_existing_marks(&mut modules);
        }
        let result = compute_result(&modules);

        Ok(CalculatorResponse {
            card_id: card_id.to_string(),
            year: records.year.clone(),
            period: request.period,
            period_count,
            period_label: records
                .reports
                .get(request.period)
                .and_then(|report| report.periode_libelle_fr.clone()),
            modules,
            result,
        })
    }

    #[instrument(skip(state, request), fields(period = request.period))]
    pub async fn run(
        state: &AppState,
        auth_user: &AuthUser,
        card_id: &str,
        request: &CalculatorRequest,
    ) -> Result<CalculatorResponse, AppError> {
        let records = Self::load_year_records(state, auth_user, card_id).await?;
        Self::calculate(card_id, &records, request)
    }
}
