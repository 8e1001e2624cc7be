use std::sync::Arc;
use std::time::Duration;

use crate::docs::ApiDoc;
use crate::logging::logging_middleware;
use crate::metrics::metrics_middleware;
use crate::middleware::security::security_header_layers;
use crate::modules::auth::router::init_auth_router;
use crate::modules::calculator::router::init_calculator_router;
use crate::modules::health::controller::health_check;
use crate::modules::recommendations::router::init_recommendations_router;
use crate::modules::students::router::init_students_router;
use crate::state::AppState;
use axum::http::{HeaderValue, Method};
use axum::routing::get;
use axum::{Router, middleware};
use progres_config::rate_limit::IpGovernorConfig;
use tower_governor::GovernorLayer;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable as _};
use utoipa_swagger_ui::SwaggerUi;

/// Wraps `router` in a per-IP governor when rate limiting is enabled.
fn rate_limited(router: Router<AppState>, config: Option<IpGovernorConfig>) -> Router<AppState> {
    match config {
        Some(config) => router.layer(GovernorLayer::new(Arc::new(config))),
        None => router,
    }
}

fn cors_layer(state: &AppState) -> CorsLayer {
    let allowed_origins: Vec<HeaderValue> = state
        .cors_config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
        ])
        .allow_credentials(true)
        .max_age(Duration::from_secs(state.cors_config.max_age))
}

pub fn init_router(state: AppState) -> Router {
    let rate_limit = &state.rate_limit_config;
    let (auth_governor, general_governor) = if rate_limit.enabled {
        (
            Some(rate_limit.auth_governor_config()),
            Some(rate_limit.general_governor_config()),
        )
    } else {
        (None, None)
    };

    let protected = rate_limited(
        Router::new()
            .nest(
                "/student",
                init_students_router().merge(init_calculator_router()),
            )
            .nest("/recommendations", init_recommendations_router()),
        general_governor,
    );

    let router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(Scalar::with_url("/scalar", ApiDoc::openapi()))
        .route("/health", get(health_check))
        .nest(
            "/api",
            Router::new()
                .nest("/auth", rate_limited(init_auth_router(), auth_governor))
                .merge(protected),
        )
        .with_state(state.clone());

    security_header_layers()
        .into_iter()
        .fold(router, |router, layer| router.layer(layer))
        .layer(cors_layer(&state))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(logging_middleware))
}
