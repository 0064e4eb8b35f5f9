//! Local JSON API over the rentbook core services.
//!
//! # Responsibility
//! - Expose bill, month, settings and backup use-cases over HTTP.
//! - Map domain errors to status codes with a stable JSON envelope.
//!
//! # Invariants
//! - Handlers never touch SQL; every operation goes through a core service.
//! - Each request opens its own connection on a blocking worker thread.

mod error;
mod handlers;
mod routes;

pub use error::ApiError;
pub use routes::{router, serve, AppState, IMPORT_BODY_LIMIT_BYTES};
