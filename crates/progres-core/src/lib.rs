//! # PROGRES Core
//!
//! Foundational types shared by the PROGRES gateway crates:
//!
//! - [`errors`]: Application error type with HTTP response conversion
//! - [`serde`]: Lenient deserializers for upstream payloads
//!
//! # Example
//!
//! ```ignore
//! use progres_core::errors::AppError;
//!
//! let error = AppError::forbidden("Access denied".to_string());
//! ```

pub mod errors;
pub mod serde;

pub use errors::{AppError, ErrorResponse};
