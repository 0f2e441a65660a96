//! Error types for the motion engine.

use thiserror::Error;

/// Result type for motion detection and segmentation.
pub type Result<T> = std::result::Result<T, MotionError>;

/// Errors raised by the detectors, the segmenter and the pipelines.
///
/// None of these are transient. They describe caller mistakes (bad
/// configuration, mismatched frames, segmenter misuse) and are never retried.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MotionError {
    #[error("invalid configuration for `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("frame dimensions {actual:?} do not match expected {expected:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("frame buffer holds {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },

    #[error("frame index {received} does not follow previous index {previous}")]
    NonMonotonicFrame { previous: u64, received: u64 },

    #[error("segmenter has already been finalized")]
    SegmenterFinalized,

    #[error("stream worker unavailable: {0}")]
    WorkerUnavailable(String),
}

impl MotionError {
    /// Create a configuration error for the named field.
    pub fn invalid_config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}
