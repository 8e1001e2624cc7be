//! Plain-text rendering for terminal output.

use progres_models::academic::{CcGrade, ExamGrade, Registration};
use progres_models::calculator::{CalculatorResult, ModuleEntry};
use progres_session::Session;

fn or_dash(value: Option<&str>) -> &str {
    value.filter(|v| !v.trim().is_empty()).unwrap_or("-")
}

fn mark(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.2}")).unwrap_or_else(|| "-".to_string())
}

pub fn session_status(session: &Session, now: i64) -> String {
    match (&session.access_token, session.expires_at) {
        (Some(_), Some(exp)) if exp > now => format!(
            "Logged in as {} (token expires in {}s)",
            or_dash(session.uuid.as_deref()),
            exp - now
        ),
        (Some(_), _) => format!(
            "Logged in as {} (token expired, will refresh on next request)",
            or_dash(session.uuid.as_deref())
        ),
        (None, _) => "Not logged in".to_string(),
    }
}

pub fn registration_line(registration: &Registration) -> String {
    format!(
        "{:>8}  {:<11}  {} / {} ({})",
        registration.card_id().unwrap_or_else(|| "-".to_string()),
        or_dash(registration.annee_academique_code.as_deref()),
        or_dash(
            registration
                .ll_filiere
                .as_deref()
                .or(registration.of_ll_filiere.as_deref())
        ),
        or_dash(registration.of_ll_specialite.as_deref()),
        or_dash(registration.ref_libelle_niveau.as_deref()),
    )
}

pub fn exam_grade_line(grade: &ExamGrade) -> String {
    let name = grade
        .mc_libelle_fr
        .as_deref()
        .or(grade.libelle_matiere.as_deref());
    format!(
        "{:<40} {:>6}  coef {}",
        or_dash(name),
        mark(grade.note_examen),
        mark(grade.rattachement_mc_coefficient)
    )
}

pub fn cc_grade_line(grade: &CcGrade) -> String {
    format!(
        "{:<40} {:>6}  {}",
        or_dash(grade.ap_libelle_fr.as_deref()),
        mark(grade.note),
        or_dash(grade.observation.as_deref())
    )
}

pub fn module_line(module: &ModuleEntry) -> String {
    let coefficient = if module.is_coefficient_editable() {
        match module.effective_coefficient() {
            c if c > 0.0 => format!("{c} (custom)"),
            _ => "?".to_string(),
        }
    } else {
        module.coefficient.to_string()
    };
    format!("{:<40} {:>6}  coef {}", module.name, module.mark, coefficient)
}

pub fn result_summary(result: &CalculatorResult) -> String {
    format!(
        "Average: {:.2}/20  validated {}/{}  {}",
        result.average,
        result.validated_modules,
        result.total_modules,
        if result.passed { "PASSED" } else { "NOT PASSED" }
    )
}
