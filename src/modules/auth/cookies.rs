//! The `refresh_token` cookie.

use axum_extra::extract::cookie::{Cookie, SameSite};
use cookie::time::Duration;
use progres_config::cookie::{REFRESH_TOKEN_COOKIE, REFRESH_TOKEN_PATH};
use progres_config::{CookieConfig, SameSitePolicy};

fn same_site(policy: SameSitePolicy) -> SameSite {
    match policy {
        SameSitePolicy::None => SameSite::None,
        SameSitePolicy::Lax => SameSite::Lax,
        SameSitePolicy::Strict => SameSite::Strict,
    }
}

fn base_cookie(value: String, config: &CookieConfig, max_age_secs: i64) -> Cookie<'static> {
    Cookie::build((REFRESH_TOKEN_COOKIE, value))
        .http_only(true)
        .secure(config.secure)
        .same_site(same_site(config.same_site))
        .path(REFRESH_TOKEN_PATH)
        .max_age(Duration::seconds(max_age_secs))
        .build()
}

/// Cookie carrying a freshly issued refresh token.
pub fn refresh_cookie(token: String, config: &CookieConfig, max_age_secs: i64) -> Cookie<'static> {
    base_cookie(token, config, max_age_secs)
}

/// Empty cookie with `Max-Age=0`, which makes the browser drop it.
pub fn clear_refresh_cookie(config: &CookieConfig) -> Cookie<'static> {
    base_cookie(String::new(), config, 0)
}
