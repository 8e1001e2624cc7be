//! JWT claim structures for gateway tokens.
//!
//! Access and refresh tokens share one claim layout. They differ by
//! lifetime and by the [`TokenType`] tag, which stops a refresh token from
//! being replayed as a bearer token and vice versa.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Claims embedded in every token the gateway issues.
///
/// # Fields
///
/// - `sub`: Student uuid as returned by the upstream authentication
/// - `external_token`: Upstream credential forwarded on every proxied call
/// - `token_type`: Access or refresh
/// - `jti`: Unique token id, so two tokens minted in the same second differ
/// - `exp` / `iat`: Unix timestamps
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Claims {
    pub sub: String,
    #[serde(rename = "externalToken")]
    pub external_token: String,
    pub token_type: TokenType,
    pub jti: String,
    pub exp: usize,
    pub iat: usize,
}

impl Claims {
    /// Expiry in milliseconds since the epoch, the unit the blacklist keys on.
    pub fn expires_at_ms(&self) -> i64 {
        self.exp as i64 * 1000
    }
}
