//! Integer and fractional points in the radar cube.
//!
//! The interesting part of these types is the bit-accurate mapping between
//! physical quantities and tensor coordinates: a round-trip time of flight
//! maps to a (fractional) sample index, a radial velocity maps to a chirp
//! index, and both mappings wrap around their axis, so frequencies above the
//! Nyquist limit alias the way they do in real captures.

use serde::{Deserialize, Serialize};

use crate::config::{FrameConfig, RFConfig, SPEED_OF_LIGHT};

/// Modulo-one operation that always returns values in `[0, 1)`.
#[inline]
pub(crate) fn modulo_one(v: f32) -> f32 {
    v - v.floor()
}

/// Modulo operation that always returns non-negative values.
#[inline]
pub(crate) fn wrap(i: i32, n: usize) -> usize {
    let n = n as i32;
    let m = i % n;
    if m < 0 {
        (m + n) as usize
    } else {
        m as usize
    }
}

/// A grid-aligned point in the radar cube.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CubeIndex {
    /// The chirp index (corresponds to velocity in Fourier space)
    pub chirp: i32,
    /// The sample index (corresponds to distance in Fourier space)
    pub sample: i32,
    /// The channel index (corresponds to incident angle in Fourier space)
    pub channel: i32,
}

impl CubeIndex {
    /// The components in canonical (chirp, sample, channel) order.
    pub fn as_array(&self) -> [i32; 3] {
        [self.chirp, self.sample, self.channel]
    }

    pub fn from_array(raw: [i32; 3]) -> Self {
        Self {
            chirp: raw[0],
            sample: raw[1],
            channel: raw[2],
        }
    }
}

/// A fractional point in the radar cube.
///
/// Fractional coordinates describe signals whose frequency falls between two
/// DFT bins; [`crate::Frame::splat`] and [`crate::Frame::value_at`] model the
/// resulting spectral leakage of a rectangular window function.
///
/// The physical mappings (`set_time`, `set_velocity`, `distance`, `velocity`)
/// are only meaningful for frames in Fourier space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CubePoint {
    /// The chirp coordinate (corresponds to velocity in Fourier space)
    pub chirp: f32,
    /// The sample coordinate (corresponds to distance in Fourier space)
    pub sample: f32,
    /// The channel coordinate (corresponds to incident angle in Fourier space)
    pub channel: f32,
}

impl CubePoint {
    /// The components in canonical (chirp, sample, channel) order.
    pub fn as_array(&self) -> [f32; 3] {
        [self.chirp, self.sample, self.channel]
    }

    pub fn from_array(raw: [f32; 3]) -> Self {
        Self {
            chirp: raw[0],
            sample: raw[1],
            channel: raw[2],
        }
    }

    /// Sets the sample coordinate corresponding to a full round-trip time.
    ///
    /// For CW systems (`freq_slope == 0`) there is no range separation and
    /// all energy collapses into sample zero.
    pub fn set_time(&mut self, delta_t: f32, rf: &RFConfig, config: &FrameConfig) {
        if rf.freq_slope == 0.0 {
            self.sample = 0.0;
        } else {
            let delta_f = delta_t * rf.freq_slope; // in [Hz]
            self.sample = config.samples_per_chirp as f32 * modulo_one(delta_f / rf.adc_rate);
        }
    }

    /// Sets the chirp coordinate corresponding to a radial velocity.
    pub fn set_velocity(&mut self, delta_v: f32, rf: &RFConfig, config: &FrameConfig) {
        let delta_p = 2.0 * rf.start_freq * delta_v / SPEED_OF_LIGHT;
        self.chirp = config.chirp_count as f32 * modulo_one(delta_p / rf.chirp_frequency());
    }

    /// Sets the sample coordinate corresponding to a full round-trip distance
    /// (typically twice the distance of an object), assuming propagation
    /// through vacuum. Prefer [`CubePoint::set_time`] when the travel time is
    /// known.
    pub fn set_distance(&mut self, delta_s: f32, rf: &RFConfig, config: &FrameConfig) {
        self.set_time(delta_s / SPEED_OF_LIGHT, rf, config);
    }

    /// Computes the full round-trip distance corresponding to the sample
    /// coordinate, assuming propagation through vacuum and subtracting the
    /// antenna delay.
    pub fn distance(&self, rf: &RFConfig, config: &FrameConfig) -> f32 {
        let delta_f = rf.adc_rate * self.sample / config.samples_per_chirp as f32; // in [Hz]
        let delta_t = delta_f / rf.freq_slope - rf.antenna_delay; // in [s]
        SPEED_OF_LIGHT * delta_t
    }

    /// Computes the radial velocity corresponding to the chirp coordinate.
    pub fn velocity(&self, rf: &RFConfig, config: &FrameConfig) -> f32 {
        let delta_p = rf.chirp_frequency() * nyquist_backfold(self.chirp, config.chirp_count);
        delta_p * SPEED_OF_LIGHT / rf.start_freq / 2.0
    }

    /// Returns the closest grid point (nearest neighbor) in the radar cube.
    pub fn rounded(&self) -> CubeIndex {
        CubeIndex {
            chirp: self.chirp.round() as i32,
            sample: self.sample.round() as i32,
            channel: self.channel.round() as i32,
        }
    }
}

/// Shifts a frequency from the range `[0, count]` into `[-count/2, +count/2]`
/// by folding back frequencies above the Nyquist frequency `count/2`, so that
/// negative velocities are not misread as high positive velocities.
fn nyquist_backfold(i: f32, count: u32) -> f32 {
    let count = count as f32;
    let i = if i > count / 2.0 { i - count } else { i };
    i / count
}
