use axum::{
    Router,
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
    routing::get,
};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

static OBSERVABILITY_ENABLED: OnceLock<bool> = OnceLock::new();

/// Check if observability is enabled via OBSERVABILITY_ENABLED env var
pub fn is_observability_enabled() -> bool {
    *OBSERVABILITY_ENABLED.get_or_init(|| {
        std::env::var("OBSERVABILITY_ENABLED")
            .map(|v| v.to_lowercase() != "false" && v != "0")
            .unwrap_or(true)
    })
}

/// Installs the Prometheus recorder and its upkeep task.
/// Returns `Ok(None)` if observability is disabled.
pub fn init_metrics() -> Result<Option<PrometheusHandle>, BuildError> {
    if !is_observability_enabled() {
        return Ok(None);
    }

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            &[
                0.001, 0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0, 7.5,
                10.0,
            ],
        )?
        .set_buckets_for_metric(
            Matcher::Full("upstream_request_duration_seconds".to_string()),
            &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 15.0, 30.0],
        )?
        .install_recorder()?;

    let upkeep_handle = handle.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(5)).await;
            upkeep_handle.run_upkeep();
        }
    });

    Ok(Some(handle))
}

/// Metrics middleware to track HTTP requests
pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    if !is_observability_enabled() {
        return next.run(req).await;
    }

    let start = Instant::now();
    let method = req.method().as_str().to_owned();
    let uri_path = req.uri().path().to_owned();

    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or(uri_path);

    gauge!("http_requests_active").increment(1.0);

    let response = next.run(req).await;

    let latency = start.elapsed().as_secs_f64();
    let status = response.status().as_u16();

    counter!("http_requests_total", "method" => method.clone(), "path" => path.clone(), "status" => status.to_string()).increment(1);

    histogram!("http_request_duration_seconds", "method" => method, "path" => path).record(latency);

    let status_category = match status {
        200..=299 => "2xx",
        400..=499 => "4xx",
        500..=599 => "5xx",
        _ => "other",
    };
    counter!("http_requests_by_status", "status_category" => status_category).increment(1);

    gauge!("http_requests_active").decrement(1.0);

    response
}

/// Router serving the Prometheus scrape endpoint
pub fn metrics_app(handle: PrometheusHandle) -> Router {
    Router::new().route("/metrics", get(move || async move { handle.render() }))
}

// Business metrics helpers

pub fn track_login_success() {
    if !is_observability_enabled() {
        return;
    }
    counter!("student_logins_total", "status" => "success").increment(1);
}

pub fn track_login_failure(reason: &str) {
    if !is_observability_enabled() {
        return;
    }
    counter!("student_logins_total", "status" => "failure", "reason" => reason.to_string())
        .increment(1);
}

pub fn track_token_refresh(success: bool) {
    if !is_observability_enabled() {
        return;
    }
    let status = if success { "success" } else { "failure" };
    counter!("token_refreshes_total", "status" => status).increment(1);
}

pub fn track_tokens_revoked(count: usize) {
    if !is_observability_enabled() || count == 0 {
        return;
    }
    counter!("tokens_revoked_total").increment(count as u64);
}

/// Counts failed calls to a remote API, labelled by what was fetched.
pub fn track_upstream_error(target: &str) {
    if !is_observability_enabled() {
        return;
    }
    counter!("upstream_errors_total", "target" => target.to_string()).increment(1);
}

pub fn track_upstream_duration(target: &str, duration_secs: f64) {
    if !is_observability_enabled() {
        return;
    }
    histogram!("upstream_request_duration_seconds", "target" => target.to_string())
        .record(duration_secs);
}

pub fn track_recommendation_generated(model: &str) {
    if !is_observability_enabled() {
        return;
    }
    counter!("recommendations_generated_total", "model" => model.to_string()).increment(1);
}
