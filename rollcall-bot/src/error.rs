//! Error types for rollcall-bot
//!
//! Defines module-specific error types using thiserror for clear error
//! propagation. Public engine operations do not surface these to callers;
//! they degrade to an `EnrollmentStatus::Failure` at the API boundary.

use thiserror::Error;

/// Main error type for the rollcall-bot module
#[derive(Error, Debug)]
pub enum Error {
    /// Errors from the shared library (database, config, gateway)
    #[error(transparent)]
    Common(#[from] rollcall_common::Error),

    /// Database connection or query errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Gateway call failed
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// Directory rows and gateway state disagree
    #[error("Data inconsistency: {0}")]
    Inconsistency(String),

    /// Required configuration is missing or unresolvable
    #[error("Configuration error: {0}")]
    Config(String),

    /// Catalogue fetch or parse failed
    #[error("Catalogue error: {0}")]
    Catalogue(String),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using rollcall-bot Error
pub type Result<T> = std::result::Result<T, Error>;
