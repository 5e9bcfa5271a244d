//! Error types for load planning.

use thiserror::Error;

/// Result type alias for load planning operations.
pub type Result<T> = std::result::Result<T, LoadingError>;

/// Errors that abort a whole request.
///
/// Items that merely do not fit are not errors; they end up in
/// [`crate::optimizer::PackingResult::unplaced`] with an
/// [`crate::model::UnplacedReason`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoadingError {
    /// Non-positive, NaN or infinite length, width, height or weight.
    #[error("Invalid dimensions for item '{item}': {reason}")]
    InvalidDimensions { item: String, reason: String },

    /// Item attributes other than its size are malformed.
    #[error("Invalid item '{item}': {reason}")]
    InvalidItem { item: String, reason: String },

    /// Two items share the same identifier.
    #[error("Duplicate item identifier: {0}")]
    DuplicateItem(String),

    /// A container type in the catalog is malformed.
    #[error("Invalid container type '{container}': {reason}")]
    InvalidContainer { container: String, reason: String },

    /// A configuration value is outside its domain.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The progress consumer asked to stop the computation.
    #[error("Optimisation cancelled by the progress consumer")]
    Cancelled,
}

impl LoadingError {
    /// Stable machine readable code, used by the service layer.
    pub fn code(&self) -> &'static str {
        match self {
            LoadingError::InvalidDimensions { .. } => "invalid_dimensions",
            LoadingError::InvalidItem { .. } => "invalid_item",
            LoadingError::DuplicateItem(_) => "duplicate_item",
            LoadingError::InvalidContainer { .. } => "invalid_container",
            LoadingError::InvalidConfiguration(_) => "invalid_configuration",
            LoadingError::Cancelled => "cancelled",
        }
    }
}
