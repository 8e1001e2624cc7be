use std::env;

/// Default refresh lifetime matches the refresh cookie max-age (30 days).
pub const DEFAULT_REFRESH_EXPIRY: i64 = 30 * 24 * 60 * 60;

#[derive(Clone, Debug)]
pub struct JwtConfig {
    pub secret: String,
    /// Access token lifetime in seconds.
    pub access_token_expiry: i64,
    /// Refresh token lifetime in seconds.
    pub refresh_token_expiry: i64,
}

impl JwtConfig {
    pub fn from_env() -> Self {
        Self {
            secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| "your-secret-key-change-in-production".to_string()),
            access_token_expiry: env::var("JWT_ACCESS_EXPIRY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3600), // 1 hour
            refresh_token_expiry: env::var("JWT_REFRESH_EXPIRY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_REFRESH_EXPIRY),
        }
    }
}
