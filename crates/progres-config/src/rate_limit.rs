//! Rate limiting configuration for API endpoints.
//!
//! Rate limits are enforced with the Governor crate (token bucket) keyed on
//! the client IP. The IP is taken from `X-Forwarded-For` / `X-Real-IP` /
//! `Forwarded` when present, since the gateway normally runs behind the
//! frontend's reverse proxy, and falls back to the peer address.
//!
//! # Configuration
//!
//! - `RATE_LIMIT_ENABLED`: `false` disables rate limiting (default: `true`)
//! - `RATE_LIMIT_GENERAL_PER_SECOND`: Replenish interval for general endpoints (default: 2)
//! - `RATE_LIMIT_GENERAL_BURST_SIZE`: Burst size for general endpoints (default: 30)
//! - `RATE_LIMIT_AUTH_PER_SECOND`: Replenish interval for auth endpoints (default: 10)
//! - `RATE_LIMIT_AUTH_BURST_SIZE`: Burst size for auth endpoints (default: 5)
//!
//! # Example
//!
//! ```ignore
//! use progres_config::RateLimitConfig;
//!
//! let config = RateLimitConfig::from_env();
//! let governor = config.auth_governor_config();
//! ```

use tower_governor::governor::{GovernorConfig, GovernorConfigBuilder};
use tower_governor::key_extractor::SmartIpKeyExtractor;

pub type IpGovernorConfig =
    GovernorConfig<SmartIpKeyExtractor, ::governor::middleware::NoOpMiddleware>;

/// Rate limit configuration for the API.
///
/// Auth endpoints get their own, stricter bucket so that login attempts
/// cannot be brute-forced against the upstream API.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub general_per_second: u64,
    pub general_burst_size: u32,
    pub auth_per_second: u64,
    pub auth_burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            general_per_second: 2,
            general_burst_size: 30,
            auth_per_second: 10,
            auth_burst_size: 5,
        }
    }
}

impl RateLimitConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            enabled: std::env::var("RATE_LIMIT_ENABLED")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(true),
            general_per_second: std::env::var("RATE_LIMIT_GENERAL_PER_SECOND")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(2),
            general_burst_size: std::env::var("RATE_LIMIT_GENERAL_BURST_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            auth_per_second: std::env::var("RATE_LIMIT_AUTH_PER_SECOND")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            auth_burst_size: std::env::var("RATE_LIMIT_AUTH_BURST_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
        }
    }

    /// Configuration with rate limiting turned off.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Creates a `GovernorConfig` for general API endpoints.
    ///
    /// # Panics
    ///
    /// Panics if the governor configuration cannot be built (a zero rate
    /// or burst size).
    #[must_use]
    pub fn general_governor_config(&self) -> IpGovernorConfig {
        GovernorConfigBuilder::default()
            .per_second(self.general_per_second)
            .burst_size(self.general_burst_size)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .expect("Failed to build general rate limiter config")
    }

    /// Creates a `GovernorConfig` for authentication endpoints.
    ///
    /// # Panics
    ///
    /// Panics if the governor configuration cannot be built.
    #[must_use]
    pub fn auth_governor_config(&self) -> IpGovernorConfig {
        GovernorConfigBuilder::default()
            .per_second(self.auth_per_second)
            .burst_size(self.auth_burst_size)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .expect("Failed to build auth rate limiter config")
    }
}
