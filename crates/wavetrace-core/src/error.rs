//! Error types for simulation operations.

use thiserror::Error;

pub use wavetrace_radar::RadarError;

/// Result type for simulation operations
pub type SimResult<T> = Result<T, SimError>;

/// Errors that can occur when configuring or running the simulator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    #[error(transparent)]
    Radar(#[from] RadarError),

    #[error("a simulation is already running on this integrator")]
    AlreadyRunning,
}
