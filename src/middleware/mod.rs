//! Middleware and extractors for cross-cutting request concerns.
//!
//! # Modules
//!
//! - [`auth`]: Bearer-token extractor for protected routes
//! - [`security`]: Security response headers
//!
//! # Authentication Flow
//!
//! 1. Client sends request with `Authorization: Bearer <token>` header
//! 2. `AuthUser` verifies the JWT and rejects revoked tokens
//! 3. Handler executes with the student uuid and upstream credential
//!
//! # Example
//!
//! ```ignore
//! use crate::middleware::auth::AuthUser;
//!
//! async fn get_student_data(
//!     State(state): State<AppState>,
//!     auth_user: AuthUser,
//! ) -> Result<Json<Value>, AppError> {
//!     StudentService::get_student_data(&state, &auth_user).await.map(Json)
//! }
//! ```

pub mod auth;
pub mod security;
