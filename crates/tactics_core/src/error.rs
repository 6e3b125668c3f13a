//! Error types for the tactics core.

use thiserror::Error;

use crate::grid::Point;
use crate::unit::UnitId;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all stage errors.
///
/// Races between queued commands and unit death are *not* errors; those are
/// logged and ignored by the command that hits them.
#[derive(Debug, Error)]
pub enum GameError {
    /// No unit with this identifier is present on the stage.
    #[error("Unit not found: {0}")]
    UnitNotFound(UnitId),

    /// A point outside the grid was used where a block is required.
    #[error("Block out of bounds: ({}, {})", .0.x, .0.y)]
    BlockOutOfBounds(Point),

    /// Route text contained a symbol that is not a direction.
    #[error("Malformed route '{route}': unexpected symbol '{symbol}'")]
    MalformedRoute {
        /// The full route text.
        route: String,
        /// The offending symbol.
        symbol: char,
    },

    /// Stage or unit description failed validation.
    #[error("Invalid stage data: {0}")]
    InvalidData(String),

    /// Data file parsing error.
    #[error("Failed to parse data '{source_name}': {message}")]
    DataParseError {
        /// Name of the source that failed to parse.
        source_name: String,
        /// Error message.
        message: String,
    },

    /// A player decision was rejected.
    #[error("Rejected input for unit {unit}: {reason}")]
    RejectedInput {
        /// Unit the input was addressed to.
        unit: UnitId,
        /// Why it was rejected.
        reason: String,
    },

    /// Invalid stage state.
    #[error("Invalid stage state: {0}")]
    InvalidState(String),
}
