//! # wavetrace Core Simulator
//!
//! Simulates the raw analog-to-digital output of an FMCW radar sensor
//! illuminating a static 3-D scene, by Monte Carlo integration of
//! geometrical-optics wave propagation.
//!
//! ## Overview
//!
//! Paths start at the transmit antenna, bounce specularly through the scene
//! and connect to the receive antenna at every vertex (next-event
//! estimation). Each connection deposits a complex phasor into the radar
//! cube at the fractional position corresponding to its time of flight,
//! reproducing the spectral leakage a real capture would show after its
//! range/Doppler DFT.
//!
//! ```text
//!              ┌───────────┐  guided primary
//!   ┌───►  TX ─┤ BspGuide  ├─────────┐
//!   │          └───────────┘         ▼
//!   │ train                    ┌───────────┐  specular bounces
//!   │                          │  scene    │◄───────────────┐
//!   │          ┌───────────┐   │ geometry  ├────────────────┘
//!   └──────────┤ integrate │◄──┴───────────┘
//!              └─────┬─────┘     NEE to RX
//!                    ▼
//!              ┌───────────┐
//!              │ radar cube│  (wavetrace-radar)
//!              └───────────┘
//! ```
//!
//! Sampling is driven by a [`runner::Runner`], which schedules batches of
//! sample indices across worker threads and retrains the adaptive guiding
//! distribution at checkpoint boundaries.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::atomic::AtomicBool;
//! use wavetrace_core::prelude::*;
//!
//! let rf = RFConfig {
//!     start_freq: 77.0e9,
//!     freq_slope: 60.0e12,
//!     adc_rate: 5.0e6,
//!     idle_time: 100.0e-6,
//!     ramp_time: 60.0e-6,
//!     antenna_delay: 0.43e-9,
//! };
//!
//! let mut mesh = TriangleMesh::new();
//! mesh.add_box(Vec3::new(-0.1, -0.1, -0.1), Vec3::new(0.1, 0.1, 0.1));
//!
//! let antenna = NearFieldAntenna::new(Vec3::new(2.0, 0.0, 0.0), Mat3::identity(), AwrPattern);
//! let scene = Scene {
//!     rf,
//!     tx: antenna.clone().into(),
//!     rx: antenna.into(),
//! };
//!
//! let mut integrator = PathIntegrator::new(PathSettings::default());
//! integrator
//!     .configure_frame(FrameConfig {
//!         chirp_count: 128,
//!         samples_per_chirp: 256,
//!         channel_count: 4,
//!     })
//!     .unwrap();
//!
//! let cancel = AtomicBool::new(false);
//! Runner::default()
//!     .run(&integrator, &mesh, &scene, 200_000, &cancel)
//!     .unwrap();
//! let frame = integrator.fetch_frame();
//! ```

pub mod emitter;
pub mod error;
pub mod geometry;
pub mod guiding;
pub mod image;
pub mod integrator;
pub mod intersection;
pub mod logging;
pub mod mesh;
pub mod raycaster;
pub mod runner;
pub mod sampler;
pub mod sampling;
pub mod scene;

// Re-export main types
pub use emitter::{Antenna, AwrPattern, FarFieldAntenna, NearFieldAntenna, SurfaceEmitter};
pub use error::{SimError, SimResult};
pub use geometry::{Mat3, Ray, Vec3, Vec3c, EPSILON};
pub use guiding::{Guide, GuideSettings};
pub use image::{DebugElement, DebugImage};
pub use integrator::{PathIntegrator, PathSettings};
pub use intersection::Intersection;
pub use logging::{init_logging, LogConfig, LogFormat, LogLevel};
pub use mesh::TriangleMesh;
pub use raycaster::{Hit, Raycaster};
pub use runner::Runner;
pub use sampler::{HaltonSampler, IndependentSampler, Sampler};
pub use scene::Scene;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::emitter::{Antenna, AwrPattern, FarFieldAntenna, NearFieldAntenna};
    pub use crate::geometry::{Mat3, Ray, Vec3, Vec3c};
    pub use crate::integrator::{PathIntegrator, PathSettings};
    pub use crate::logging::{init_logging, LogConfig};
    pub use crate::mesh::TriangleMesh;
    pub use crate::raycaster::{Hit, Raycaster};
    pub use crate::runner::Runner;
    pub use crate::scene::Scene;
    pub use wavetrace_radar::prelude::*;
}
