//! Attributes of the `refresh_token` cookie.
//!
//! The cookie is always `HttpOnly` and scoped to `/api/auth`. `Secure` and
//! `SameSite` are configurable because local development over plain HTTP
//! cannot use `Secure` + `SameSite=None`.
//!
//! - `COOKIE_SECURE`: `true`/`false` (default: `true`)
//! - `COOKIE_SAME_SITE`: `none`, `lax` or `strict` (default: `none`)

use std::env;

pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";
pub const REFRESH_TOKEN_PATH: &str = "/api/auth";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SameSitePolicy {
    None,
    Lax,
    Strict,
}

impl SameSitePolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" => Some(Self::None),
            "lax" => Some(Self::Lax),
            "strict" => Some(Self::Strict),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CookieConfig {
    pub secure: bool,
    pub same_site: SameSitePolicy,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            secure: true,
            same_site: SameSitePolicy::None,
        }
    }
}

impl CookieConfig {
    pub fn from_env() -> Self {
        Self {
            secure: env::var("COOKIE_SECURE")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(true),
            same_site: env::var("COOKIE_SAME_SITE")
                .ok()
                .and_then(|v| SameSitePolicy::parse(&v))
                .unwrap_or(SameSitePolicy::None),
        }
    }
}
