//! Error types for the dream-decoder pipeline.

use thiserror::Error;

/// Pipeline-specific errors.
///
/// Clustering degeneracy is deliberately absent: a collapsed k-means
/// solution is recovered locally via the Gaussian-mixture fallback and
/// surfaces as [`crate::clustering::ClusterOutcome::Fallback`], never as
/// an error.
#[derive(Debug, Error)]
pub enum DecoderError {
    /// Malformed or empty epoch input (wrong shape, non-finite samples).
    #[error("Invalid epoch: {reason}")]
    InvalidEpoch { reason: String },

    /// Model or feature dimension mismatch.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    /// Not enough epochs to run the pipeline for a file pair.
    #[error("Insufficient data: needed at least {needed} epochs, got {actual}")]
    InsufficientData { needed: usize, actual: usize },

    /// Invalid configuration supplied by the caller.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error surfaced by an external epoch source.
    #[error("Epoch source error: {0}")]
    Source(String),

    /// IO error (config file loading).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for pipeline operations.
pub type DecoderResult<T> = Result<T, DecoderError>;
