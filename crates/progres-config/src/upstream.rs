//! Remote PROGRES academic-records API.
//!
//! - `PROGRES_API_URL`: Base URL of the API (default: `https://progres.mesrs.dz/api`)
//! - `PROGRES_CHECK_URL`: Public registration check URL printed on the student card
//! - `PROGRES_TIMEOUT_MS`: Per-request timeout in milliseconds (default: 15000)

use std::env;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub check_url: String,
    pub timeout: Duration,
}

impl UpstreamConfig {
    pub fn from_env() -> Self {
        let base_url = env::var("PROGRES_API_URL")
            .unwrap_or_else(|_| "https://progres.mesrs.dz/api".to_string());

        Self {
            check_url: env::var("PROGRES_CHECK_URL")
                .unwrap_or_else(|_| format!("{}/infos/checkInscription", base_url)),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_millis(
                env::var("PROGRES_TIMEOUT_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(15_000),
            ),
        }
    }

    /// Config pointing at an arbitrary base URL, used by tests and tooling.
    pub fn with_base_url(base_url: &str) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            check_url: format!("{}/infos/checkInscription", base_url),
            base_url,
            timeout: Duration::from_secs(5),
        }
    }
}
