//! Error types for radar-cube operations.

use thiserror::Error;

/// Result type for radar-cube operations
pub type RadarResult<T> = Result<T, RadarError>;

/// Errors that can occur when configuring or operating on radar frames
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RadarError {
    #[error("invalid RF configuration: {0}")]
    InvalidRfConfig(&'static str),

    #[error("invalid frame configuration: {0}")]
    InvalidFrameConfig(&'static str),

    #[error("failed to allocate radar cube storage ({elements} elements)")]
    Allocation { elements: usize },

    #[error("operation requires a configured frame")]
    Unallocated,
}
