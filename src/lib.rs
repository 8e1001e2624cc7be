//! # PROGRES Gateway
//!
//! A REST gateway built with Rust and Axum in front of the PROGRES
//! academic-records API. Students log in with their PROGRES credentials; the
//! gateway wraps the upstream credential in its own signed JWTs and
//! re-exposes their records behind bearer authentication.
//!
//! ## Overview
//!
//! - **Authentication**: access tokens in `Authorization`, rotated refresh
//!   tokens in an httpOnly cookie, in-memory revocation list
//! - **Student records**: registrations, period reports, exam and CC grades,
//!   subject coefficients, photo, personal info, digital card
//! - **Calculator**: weighted average of a period across reports, exam
//!   grades, and CC grades
//! - **Recommendations**: study-path suggestions from a Groq-hosted model
//!
//! ## Architecture
//!
//! ```text
//! src/
//! ├── middleware/       # Bearer extractor, security headers
//! ├── modules/          # Feature modules
//! │   ├── auth/        # Login, refresh, logout
//! │   ├── students/    # Proxied academic records
//! │   ├── calculator/  # Weighted-average calculator
//! │   ├── recommendations/
//! │   └── health/
//! └── upstream/         # PROGRES and Groq HTTP clients
//! ```
//!
//! Each feature module follows the same structure:
//!
//! - `mod.rs`: Module exports
//! - `controller.rs`: HTTP handlers (routes)
//! - `service.rs`: Business logic
//! - `router.rs`: Axum router configuration
//!
//! Data shapes live in the `progres-models` crate.
//!
//! ## Quick Start
//!
//! ```bash
//! JWT_SECRET=your-secure-secret-key
//! PROGRES_API_URL=https://progres.mesrs.dz/api
//! GROQ_API_KEY=gsk_...
//! ```
//!
//! When the server is running, API documentation is available at:
//!
//! - Swagger UI: `http://localhost:8080/swagger-ui`
//! - Scalar: `http://localhost:8080/scalar`
//!
//! ## Security Considerations
//!
//! - The upstream credential never leaves the signed token
//! - Refresh tokens are single use; a replayed token is rejected
//! - Card ids are checked against the caller's registrations
//! - Rate limiting is configurable, with a stricter bucket for `/api/auth`

pub mod docs;
pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod modules;
pub mod router;
pub mod state;
pub mod upstream;
pub mod validator;

// Re-export workspace crates for convenience
pub use progres_auth;
pub use progres_config;
pub use progres_core;
pub use progres_models;
