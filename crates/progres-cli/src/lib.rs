//! # PROGRES CLI
//!
//! Terminal frontend for the session manager.
//!
//! ## Usage
//!
//! ```ignore
//! use progres_cli::load_year_records;
//!
//! let records = load_year_records(&manager, "4512").await?;
//! let modules = build_modules(&records, 0, &Overrides::default());
//! ```

pub mod format;

use progres_models::academic::Registration;
use progres_models::calculator::YearRecords;
use progres_session::{SessionError, SessionManager};
use tracing::debug;

/// Finds the registration whose card id is `card_id`.
pub fn find_registration<'a>(
    registrations: &'a [Registration],
    card_id: &str,
) -> Option<&'a Registration> {
    registrations
        .iter()
        .find(|registration| registration.card_id().as_deref() == Some(card_id))
}

/// Fetches everything the calculator needs for one registration year.
///
/// Grade sources other than the period reports are optional: a failed fetch
/// leaves that source empty.
pub async fn load_year_records(
    manager: &SessionManager,
    card_id: &str,
) -> Result<YearRecords, SessionError> {
    let registrations = manager.registrations().await?;
    let registration = find_registration(&registrations, card_id).ok_or_else(|| {
        SessionError::InvalidResponse(format!("No registration with card id {card_id}"))
    })?;

    let reports = manager.exam_reports(card_id).await?;
    let exam_grades = manager.exam_grades(card_id).await.unwrap_or_else(|e| {
        debug!(error = %e, "Exam grades unavailable");
        Vec::new()
    });
    let cc_grades = manager.cc_grades(card_id).await.unwrap_or_else(|e| {
        debug!(error = %e, "CC grades unavailable");
        Vec::new()
    });
    let subjects = match (
        registration.ouverture_offre_formation_id,
        registration.niveau_id,
    ) {
        (Some(offer), Some(level)) => manager
            .subjects(&offer.to_string(), &level.to_string())
            .await
            .unwrap_or_default(),
        _ => Vec::new(),
    };

    Ok(YearRecords {
        year: registration.year_code(),
        reports,
        exam_grades,
        cc_grades,
        subjects,
    })
}
