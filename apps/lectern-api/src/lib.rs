//! # lectern-api
//!
//! HTTP surface of Lectern: the catalog, the reader registry and the Loan
//! Engine behind a librarian bearer-token gate.
//!
//! The binary in `main.rs` wires configuration, the database and the
//! listener; everything callable from tests lives here.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::{ApiConfig, ConfigError};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use routes::create_router;
pub use state::AppState;
