//! Error types for medprep.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the preprocessing routines.
///
/// Every variant is a precondition violation on the caller's input. None
/// of them are transient, so there is nothing to retry.
#[derive(Debug, Error)]
pub enum Error {
    /// Array has the wrong number of dimensions or an unusable extent.
    #[error("invalid dimensions: {0}")]
    InvalidDimensions(String),

    /// Two arrays that must share a spatial shape do not.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Pad amounts cannot be applied to or removed from the array.
    #[error("invalid padding: {0}")]
    InvalidPadding(String),

    /// Normalization parameters are out of range.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// No voxel is left to compute statistics over.
    #[error("empty selection: {0}")]
    EmptySelection(String),

    /// Channel has zero (or non-finite) standard deviation over the selected voxels.
    #[error("channel {channel} has degenerate standard deviation {std}")]
    ZeroVariance { channel: usize, std: f64 },
}
