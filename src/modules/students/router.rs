use crate::modules::students::controller::{
    get_cc_grades, get_exam_data, get_exam_grades, get_exam_summary, get_photo, get_student_card,
    get_student_data, get_student_info, get_subjects,
};
use crate::state::AppState;
use axum::{Router, routing::get};

pub fn init_students_router() -> Router<AppState> {
    Router::new()
        .route("/data", get(get_student_data))
        .route("/info", get(get_student_info))
        .route("/photo", get(get_photo))
        .route("/exams/{id}", get(get_exam_data))
        .route("/exams/{id}/summary", get(get_exam_summary))
        .route("/cc-grades/{card_id}", get(get_cc_grades))
        .route("/exam-grades/{card_id}", get(get_exam_grades))
        .route("/subjects/{offer_id}/{level_id}", get(get_subjects))
        .route("/card/{card_id}", get(get_student_card))
}
