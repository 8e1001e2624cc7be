use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::modules::health::controller::HealthResponse;
use progres_core::ErrorResponse;
use progres_models::calculator::{
    CalculatorRequest, CalculatorResponse, CalculatorResult, MarkSource, ModuleEntry,
};
use progres_models::recommendations::{
    CurrentStatus, Recommendation, RecommendationRequest, RecommendationResponse,
};
use progres_models::{LoginRequest, LoginResponse, LogoutResponse, PeriodSummary, StudentCard};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::auth::controller::login,
        crate::modules::auth::controller::refresh,
        crate::modules::auth::controller::logout,
        crate::modules::students::controller::get_student_data,
        crate::modules::students::controller::get_exam_data,
        crate::modules::students::controller::get_exam_summary,
        crate::modules::students::controller::get_student_info,
        crate::modules::students::controller::get_cc_grades,
        crate::modules::students::controller::get_exam_grades,
        crate::modules::students::controller::get_photo,
        crate::modules::students::controller::get_subjects,
        crate::modules::students::controller::get_student_card,
        crate::modules::calculator::controller::get_calculator,
        crate::modules::calculator::controller::post_calculator,
        crate::modules::recommendations::controller::suggest,
        crate::modules::health::controller::health_check,
    ),
    components(
        schemas(
            ErrorResponse,
            LoginRequest,
            LoginResponse,
            LogoutResponse,
            PeriodSummary,
            StudentCard,
            CalculatorRequest,
            CalculatorResponse,
            ModuleEntry,
            MarkSource,
            CalculatorResult,
            RecommendationRequest,
            RecommendationResponse,
            Recommendation,
            CurrentStatus,
            HealthResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Login, token refresh and logout"),
        (name = "Students", description = "Academic records proxied from PROGRES"),
        (name = "Calculator", description = "Weighted average of a period"),
        (name = "Recommendations", description = "AI study-path recommendations"),
        (name = "Health", description = "Liveness probe")
    ),
    info(
        title = "PROGRES Gateway API",
        version = "0.1.0",
        description = "Student portal gateway in front of the PROGRES academic-records API, with JWT sessions and a refresh cookie.",
        license(
            name = "MIT"
        )
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}
