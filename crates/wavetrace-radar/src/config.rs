//! FMCW sweep and frame configuration.
//!
//! An FMCW radar transmits a sequence of linear frequency ramps ("chirps")
//! and mixes the received echo against the transmit signal:
//!
//! ```text
//! f │      ╱│      ╱│      ╱│
//!   │     ╱ │     ╱ │     ╱ │      slope = freq_slope [Hz/s]
//!   │    ╱  │    ╱  │    ╱  │
//!   │   ╱   │   ╱   │   ╱   │
//!   └──╱────┴──╱────┴──╱────┴── t
//!      ramp  idle
//! ```
//!
//! [`RFConfig`] describes one such ramp; [`FrameConfig`] describes the
//! dimensions of the captured radar cube. Setting `freq_slope` to zero
//! describes a continuous-wave (CW) system with no range separation.

use serde::{Deserialize, Serialize};

use crate::error::{RadarError, RadarResult};

/// The speed of light in free space (in [m/s]).
pub const SPEED_OF_LIGHT: f32 = 299_792_458.0;

/// Characteristics of a frequency sweep for FMCW/CW radar systems.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RFConfig {
    /// Frequency at the start of the sweep (in [Hz])
    pub start_freq: f32,
    /// Rate of change of the frequency (in [Hz/s]); zero for CW systems
    pub freq_slope: f32,
    /// Sample rate of the raw ADC data (in [Hz])
    pub adc_rate: f32,
    /// Idle duration between chirps (in [s])
    pub idle_time: f32,
    /// Active duration of the sweep (in [s])
    pub ramp_time: f32,
    /// Additional round-trip delay from feed lines, mixer etc. (in [s])
    pub antenna_delay: f32,
}

impl RFConfig {
    /// The bandwidth of one chirp (in [Hz]).
    pub fn bandwidth(&self) -> f32 {
        self.freq_slope * self.ramp_time
    }

    /// How many chirps happen per second (in [Hz]).
    pub fn chirp_frequency(&self) -> f32 {
        1.0 / (self.idle_time + self.ramp_time)
    }

    /// Checks the configuration for physically meaningless values.
    pub fn validate(&self) -> RadarResult<()> {
        if !self.start_freq.is_finite() || self.start_freq <= 0.0 {
            return Err(RadarError::InvalidRfConfig("start_freq must be positive"));
        }
        if !self.freq_slope.is_finite() || self.freq_slope < 0.0 {
            return Err(RadarError::InvalidRfConfig(
                "freq_slope must be zero (CW) or positive",
            ));
        }
        if !self.adc_rate.is_finite() || self.adc_rate <= 0.0 {
            return Err(RadarError::InvalidRfConfig("adc_rate must be positive"));
        }
        if !self.ramp_time.is_finite() || self.ramp_time <= 0.0 {
            return Err(RadarError::InvalidRfConfig("ramp_time must be positive"));
        }
        if !self.idle_time.is_finite() || self.idle_time < 0.0 {
            return Err(RadarError::InvalidRfConfig("idle_time must not be negative"));
        }
        if !self.antenna_delay.is_finite() || self.antenna_delay < 0.0 {
            return Err(RadarError::InvalidRfConfig(
                "antenna_delay must not be negative",
            ));
        }
        Ok(())
    }
}

/// Dimensions of a radar frame (also known as radar cube).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameConfig {
    /// How many chirps there are in a frame.
    pub chirp_count: u32,
    /// How many samples there are per chirp.
    pub samples_per_chirp: u32,
    /// How many RX channels there are in the frame.
    pub channel_count: u32,
}

impl FrameConfig {
    /// The axis lengths in canonical (chirp, sample, channel) order.
    pub fn dims(&self) -> [usize; 3] {
        [
            self.chirp_count as usize,
            self.samples_per_chirp as usize,
            self.channel_count as usize,
        ]
    }

    /// The total amount of points in the radar cube.
    pub fn sample_count(&self) -> usize {
        self.dims().iter().product()
    }

    /// Checks that every axis has at least one bin.
    pub fn validate(&self) -> RadarResult<()> {
        if self.chirp_count == 0 {
            return Err(RadarError::InvalidFrameConfig("chirp_count must be >= 1"));
        }
        if self.samples_per_chirp == 0 {
            return Err(RadarError::InvalidFrameConfig(
                "samples_per_chirp must be >= 1",
            ));
        }
        if self.channel_count == 0 {
            return Err(RadarError::InvalidFrameConfig("channel_count must be >= 1"));
        }
        Ok(())
    }
}
