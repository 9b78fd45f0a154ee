//! # AppError
//!
//! Centralized error handling for the Crowdstage crates.
//! Nothing in the rotation core is fatal; these surface at the edges
//! (session start, moderator input, store lookups).

use thiserror::Error;

/// The primary error type for all cs-core operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Resource not found (e.g., Event, Submission)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Validation failure (e.g., out-of-range settings, unknown submission type)
    #[error("validation error: {0}")]
    ValidationError(String),

    /// The stage cannot run for this event (malformed id, unknown or disabled event)
    #[error("invalid stage session: {0}")]
    InvalidSession(String),

    /// Infrastructure failure (e.g., store unavailable)
    #[error("internal service error: {0}")]
    Internal(String),

    /// Conflicting state (e.g., session already running)
    #[error("conflict: {0}")]
    Conflict(String),
}

/// A specialized Result type for Crowdstage logic.
pub type Result<T> = std::result::Result<T, AppError>;
