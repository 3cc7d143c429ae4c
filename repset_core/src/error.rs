//! Error types for the repset_core library.

use crate::WorkoutId;
use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for repset_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The routine store has no workout with this id
    #[error("Workout not found: {0}")]
    WorkoutNotFound(WorkoutId),

    /// A stored routine violates the exercise invariants
    #[error("Invalid routine: {0}")]
    InvalidRoutine(String),

    /// Writing the completion record failed
    #[error("Recording error: {0}")]
    Recording(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
