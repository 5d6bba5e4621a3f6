//! services/storyteller/src/error.rs
//!
//! Defines the primary error type for the storyteller service.

use crate::config::ConfigError;
use storyteller_core::error::{AuthError, GenerationFailure, PersistenceFailure};

/// The primary error type for the `storyteller` service.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A normalized auth failure, safe to show to the user.
    #[error("{0}")]
    Auth(#[from] AuthError),

    #[error("{0}")]
    Persistence(#[from] PersistenceFailure),

    #[error("{0}")]
    Generation(#[from] GenerationFailure),

    /// A story operation that needs a signed-in user was called without one.
    #[error("User must be logged in to {0}")]
    NotSignedIn(&'static str),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}
