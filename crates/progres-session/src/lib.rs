//! # PROGRES Session
//!
//! Client side of the gateway's token scheme:
//!
//! - [`manager`]: Session state machine with single-flight refresh and
//!   background renewal
//! - [`token`]: Expiry decoding and renewal timing
//! - [`store`]: Session persistence (memory or JSON file)
//! - [`api`]: Typed calls to the student endpoints
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use progres_session::{FileTokenStore, SessionManager};
//!
//! let manager = SessionManager::new(
//!     "http://localhost:8080/api",
//!     Arc::new(FileTokenStore::new("session.json")),
//! )?;
//! if !manager.init().await? {
//!     manager.login("202031234567", "secret").await?;
//! }
//! let years = manager.registrations().await?;
//! ```

pub mod api;
pub mod error;
pub mod manager;
pub mod store;
pub mod token;

pub use error::{Result, SessionError};
pub use manager::{Session, SessionConfig, SessionManager};
pub use store::{FileTokenStore, MemoryTokenStore, PersistedSession, TokenStore};
