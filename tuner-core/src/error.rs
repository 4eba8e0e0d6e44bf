//! Error types for the tuner core.

use thiserror::Error;

/// Errors raised while constructing or driving the tuning pipeline.
///
/// Degenerate signals (silence, a flat spectral peak) are not errors; they
/// surface as [`crate::pipeline::Detection::NoDetection`] instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TunerError {
    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The reference table is empty or contains unusable frequencies.
    #[error("invalid reference table: {0}")]
    InvalidReferenceTable(String),

    /// The capture side hung up and no more chunks will arrive.
    #[error("sample chunk queue disconnected")]
    ChunkQueueDisconnected,
}

pub type Result<T> = std::result::Result<T, TunerError>;
