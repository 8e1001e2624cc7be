use std::net::SocketAddr;
use std::time::Duration;

use dotenvy::dotenv;
use progres::logging::init_tracing;
use progres::metrics::{init_metrics, metrics_app};
use progres::router::init_router;
use progres::state::init_app_state;
use progres_config::ServerConfig;
use tracing::{info, warn};

const DEFAULT_BLACKLIST_CLEANUP_SECS: u64 = 300;

fn blacklist_cleanup_interval() -> Duration {
    let secs = std::env::var("BLACKLIST_CLEANUP_INTERVAL")
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|secs| *secs > 0)
        .unwrap_or(DEFAULT_BLACKLIST_CLEANUP_SECS);
    Duration::from_secs(secs)
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    init_tracing().expect("Failed to initialize tracing");

    let metrics_handle = match init_metrics() {
        Ok(handle) => handle,
        Err(e) => {
            warn!(error = %e, "Failed to install Prometheus recorder, metrics disabled");
            None
        }
    };

    let state = init_app_state().expect("Failed to initialize application state");
    state
        .blacklist
        .spawn_cleanup_task(blacklist_cleanup_interval());

    let mut app = init_router(state);
    if let Some(handle) = metrics_handle {
        app = app.merge(metrics_app(handle));
    }

    let server = ServerConfig::from_env();
    let address = server.address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind {}: {}", address, e));

    info!(address = %address, "PROGRES gateway listening");
    println!("🚀 Server running on http://localhost:{}", server.port);
    println!("📚 Swagger UI available at http://localhost:{}/swagger-ui", server.port);
    println!("📖 Scalar UI available at http://localhost:{}/scalar", server.port);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Server error");
}
