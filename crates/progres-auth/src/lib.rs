//! # PROGRES Auth
//!
//! Gateway token handling:
//!
//! - [`claims`]: Claim layout shared by access and refresh tokens
//! - [`jwt`]: Token creation and verification
//! - [`blacklist`]: In-memory revocation list with periodic cleanup
//!
//! # Token Types
//!
//! - **Access Token**: Short-lived bearer token sent in `Authorization`
//! - **Refresh Token**: Long-lived token held only in the `refresh_token`
//!   cookie, rotated on every refresh
//!
//! Both carry the upstream PROGRES credential in the `externalToken` claim.

pub mod blacklist;
pub mod claims;
pub mod jwt;

// Re-export commonly used types at crate root
pub use blacklist::TokenBlacklist;
pub use claims::{Claims, TokenType};
pub use jwt::{
    create_access_token, create_refresh_token, token_expiry_ms, verify_refresh_token,
    verify_token,
};
