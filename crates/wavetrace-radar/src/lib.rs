//! # Radar Cube Abstractions
//!
//! This crate provides the radar-cube tensor and the FMCW frame configuration
//! types used by the wavetrace simulator.
//!
//! ## The radar cube
//!
//! An FMCW radar captures a dense three-dimensional complex tensor per frame
//! (the "radar cube"), indexed by chirp, intra-chirp sample and receive
//! channel. After a discrete Fourier transform, the three axes correspond to
//! velocity, distance and incident angle:
//!
//! ```text
//!              channel (angle)
//!             ┌──────────────┐
//!            ╱              ╱│
//!   chirp   ╱              ╱ │
//! (velocity)──────────────┐  │
//!           │              │ ╱
//!           │              │╱
//!           └──────────────┘
//!             sample (distance)
//! ```
//!
//! A simulator that integrates wave contributions one path at a time needs to
//! deposit each contribution at a *fractional* position in this tensor. The
//! [`Frame`] type therefore supports windowed splatting (reproducing the
//! spectral leakage of a rectangular-window DFT) and the matching sinc-kernel
//! interpolation, both at fractional [`CubePoint`]s, in addition to the usual
//! dense-tensor operations (clear, accumulate, scale, in-place 3-D FFT,
//! argmax, sub-bin peak localization).
//!
//! All concurrently-written accumulators are lock-free: complex bins are
//! stored as pairs of [`AtomicF32`] and updated with compare-exchange adds,
//! so any number of worker threads may splat into the same frame.
//!
//! ## Example
//!
//! ```rust
//! use num_complex::Complex32;
//! use wavetrace_radar::{CubePoint, Frame, FrameConfig, RFConfig};
//!
//! let rf = RFConfig {
//!     start_freq: 77.0e9,
//!     freq_slope: 60.0e12,
//!     adc_rate: 5.0e6,
//!     idle_time: 100.0e-6,
//!     ramp_time: 60.0e-6,
//!     antenna_delay: 0.0,
//! };
//!
//! let mut frame = Frame::new();
//! frame
//!     .configure(FrameConfig {
//!         chirp_count: 128,
//!         samples_per_chirp: 256,
//!         channel_count: 4,
//!     })
//!     .unwrap();
//!
//! // Deposit the echo of an object with 12 m round-trip time of flight.
//! let mut point = CubePoint::default();
//! point.set_distance(12.0, &rf, frame.config());
//! frame.splat(&point, Complex32::new(1.0, 0.0));
//! ```

pub mod atomic;
pub mod config;
pub mod cube;
pub mod error;
pub mod fft;
pub mod frame;
pub mod io;

pub use atomic::{AtomicF32, AtomicF64};
pub use config::{FrameConfig, RFConfig, SPEED_OF_LIGHT};
pub use cube::{CubeIndex, CubePoint};
pub use error::{RadarError, RadarResult};
pub use frame::{Frame, Space};
pub use io::write_frame;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{FrameConfig, RFConfig, SPEED_OF_LIGHT};
    pub use crate::cube::{CubeIndex, CubePoint};
    pub use crate::error::{RadarError, RadarResult};
    pub use crate::frame::{Frame, Space};
}
