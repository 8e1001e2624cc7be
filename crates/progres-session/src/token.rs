//! Reading gateway access tokens on the client side.
//!
//! The client never holds the signing secret, so the payload is decoded
//! without verifying the signature. The result only drives refresh timing;
//! the gateway remains the authority on validity.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::Value;

/// Tokens this close to expiry are treated as expired.
pub const EXPIRY_SKEW_SECS: i64 = 30;

/// Renewal fires this long before expiry.
pub const RENEWAL_LEAD_SECS: i64 = 120;

/// Lower bound on the renewal delay.
pub const MIN_RENEWAL_DELAY_SECS: i64 = 10;

/// Returns the `exp` claim (Unix seconds) of a JWT, or `None` if the token
/// is not a three-part JWT with a readable numeric `exp`.
pub fn decode_expiry(token: &str) -> Option<i64> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return None;
    }

    let payload = parts[1].trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    let claims: Value = serde_json::from_slice(&bytes).ok()?;

    match claims.get("exp")? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        _ => None,
    }
}

/// A token without a readable expiry counts as expired.
pub fn is_expired(token: &str, now: i64) -> bool {
    match decode_expiry(token) {
        Some(exp) => now >= exp - EXPIRY_SKEW_SECS,
        None => true,
    }
}

/// Seconds until expiry. `0` when the expiry cannot be read.
pub fn expires_in(token: &str, now: i64) -> i64 {
    decode_expiry(token).map(|exp| exp - now).unwrap_or(0)
}

/// Delay before the background renewal of `token` should fire.
pub fn renewal_delay(token: &str, now: i64) -> Duration {
    renewal_delay_with(
        token,
        now,
        Duration::from_secs(RENEWAL_LEAD_SECS as u64),
        Duration::from_secs(MIN_RENEWAL_DELAY_SECS as u64),
    )
}

/// `max(expires_in - lead, min_delay)`.
pub fn renewal_delay_with(token: &str, now: i64, lead: Duration, min_delay: Duration) -> Duration {
    let remaining = Duration::from_secs(expires_in(token, now).max(0) as u64);
    remaining.saturating_sub(lead).max(min_delay)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE;

    fn token_with(payload: &str) -> String {
        format!(
            "{}.{}.signature",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256"}"#),
            URL_SAFE_NO_PAD.encode(payload)
        )
    }

    #[test]
    fn test_decode_expiry() {
        assert_eq!(decode_expiry(&token_with(r#"{"exp":1700000000}"#)), Some(1_700_000_000));
        assert_eq!(decode_expiry(&token_with(r#"{"sub":"x"}"#)), None);
        assert_eq!(decode_expiry(&token_with(r#"{"exp":"soon"}"#)), None);
        assert_eq!(decode_expiry("not-a-jwt"), None);
        assert_eq!(decode_expiry("a.b"), None);
        assert_eq!(decode_expiry("a.!!!.c"), None);
    }

    #[test]
    fn test_decode_expiry_accepts_padding() {
        let payload = URL_SAFE.encode(r#"{"exp":42}"#);
        assert!(payload.ends_with('='));
        let token = format!("h.{payload}.s");
        assert_eq!(decode_expiry(&token), Some(42));
    }

    #[test]
    fn test_is_expired_with_skew() {
        let token = token_with(r#"{"exp":1000}"#);
        assert!(!is_expired(&token, 969));
        assert!(is_expired(&token, 970));
        assert!(is_expired(&token, 2000));
        assert!(is_expired("garbage", 0));
    }

    #[test]
    fn test_expires_in() {
        let token = token_with(r#"{"exp":1000}"#);
        assert_eq!(expires_in(&token, 400), 600);
        assert_eq!(expires_in(&token, 1500), -500);
        assert_eq!(expires_in("garbage", 400), 0);
    }

    #[test]
    fn test_renewal_delay() {
        let token = token_with(r#"{"exp":3600}"#);
        assert_eq!(renewal_delay(&token, 0), Duration::from_secs(3480));
        // floor of ten seconds close to or past expiry
        assert_eq!(renewal_delay(&token, 3500), Duration::from_secs(10));
        assert_eq!(renewal_delay("garbage", 0), Duration::from_secs(10));
    }
}
