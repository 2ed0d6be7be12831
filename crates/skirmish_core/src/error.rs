//! Error types for the unit simulation core.

use thiserror::Error;

use crate::components::UnitHandle;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all unit simulation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    /// A queue or navigation-mode operation was used out of order.
    ///
    /// These are programming invariant violations and are surfaced
    /// immediately instead of being ignored.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// An attack references a unit that is destroyed or dead.
    #[error("Invalid attack target: {0}")]
    InvalidTarget(UnitHandle),

    /// A unit definition is missing something it needs to be initialized.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No live unit is registered under this handle.
    #[error("Unit not found: {0}")]
    UnitNotFound(UnitHandle),

    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParse {
        /// Path to the file that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },
}
