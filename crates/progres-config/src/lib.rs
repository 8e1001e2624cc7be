//! # PROGRES Config
//!
//! Configuration structures loaded from environment variables:
//!
//! - [`jwt`]: Token signing secret and lifetimes
//! - [`cookie`]: Refresh-token cookie attributes
//! - [`cors`]: CORS (Cross-Origin Resource Sharing) configuration
//! - [`rate_limit`]: API rate limiting configuration
//! - [`upstream`]: Remote PROGRES academic-records API
//! - [`groq`]: Groq chat-completion API used for recommendations
//! - [`server`]: Listen address
//!
//! # Example
//!
//! ```ignore
//! use progres_config::{JwtConfig, CorsConfig, UpstreamConfig};
//!
//! let jwt_config = JwtConfig::from_env();
//! let cors_config = CorsConfig::from_env();
//! let upstream = UpstreamConfig::from_env();
//! ```

pub mod cookie;
pub mod cors;
pub mod groq;
pub mod jwt;
pub mod rate_limit;
pub mod server;
pub mod upstream;

// Re-export commonly used types at crate root
pub use cookie::{CookieConfig, SameSitePolicy};
pub use cors::CorsConfig;
pub use groq::GroqConfig;
pub use jwt::JwtConfig;
pub use rate_limit::RateLimitConfig;
pub use server::ServerConfig;
pub use upstream::UpstreamConfig;
