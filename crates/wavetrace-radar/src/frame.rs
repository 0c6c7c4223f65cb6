//! The radar cube tensor.
//!
//! A [`Frame`] holds the dense complex data of one radar frame together with
//! its [`FrameConfig`]. Complex bins are stored as interleaved re/im pairs of
//! [`AtomicF32`], so worker threads can splat contributions concurrently
//! without locks.
//!
//! ## Splatting and interpolation
//!
//! A signal whose frequency falls between two DFT bins does not produce a
//! single peak; under a rectangular window it leaks into the surrounding
//! bins with a `1/(s - k)` envelope. [`Frame::splat`] reproduces exactly this
//! pattern when depositing a contribution at a fractional [`CubePoint`], and
//! [`Frame::value_at`] inverts it, recovering the original complex amplitude
//! from the leaked neighborhood.

use std::f32::consts::PI;

use num_complex::Complex32;

use crate::atomic::AtomicF32;
use crate::config::FrameConfig;
use crate::cube::{wrap, CubeIndex, CubePoint};
use crate::error::{RadarError, RadarResult};
use crate::fft::fft3_inplace;

/// How far (in bins) spectral leakage is spread by default.
///
/// Larger windows are increasingly costly (also due to concurrent memory
/// traffic) for diminishing returns in accuracy.
pub const DEFAULT_SPLAT_WINDOW: i32 = 16;

/// Fractional offsets below this threshold are treated as exact bin hits.
const DELTA_THRESHOLD: f32 = 1e-4;

/// Denotes the space a radar cube is defined in.
///
/// `fft()` flips this tag. Note that the path integrator synthesizes frames
/// directly in [`Space::Fourier`]: its splats model post-DFT spectral
/// leakage, which is what captured hardware frames look like *after* the
/// range/Doppler transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Space {
    /// Raw sensor data: sample and chirp index in time, channel is the
    /// antenna index.
    Spatial,
    /// Frequency dimensions: sample corresponds to distance, chirp to
    /// velocity, channel to incident angle.
    Fourier,
}

impl Space {
    fn flipped(self) -> Self {
        match self {
            Space::Spatial => Space::Fourier,
            Space::Fourier => Space::Spatial,
        }
    }
}

/// A radar cube: the dense complex data of one radar frame.
#[derive(Debug)]
pub struct Frame {
    config: FrameConfig,
    space: Space,
    /// Interleaved re/im pairs, `2 * sample_count` cells.
    data: Vec<AtomicF32>,
}

impl Frame {
    /// Creates an unconfigured frame with no storage.
    pub fn new() -> Self {
        Self {
            config: FrameConfig {
                chirp_count: 0,
                samples_per_chirp: 0,
                channel_count: 0,
            },
            space: Space::Fourier,
            data: Vec::new(),
        }
    }

    /// Changes the dimensions of the radar cube described by this frame.
    ///
    /// All existing data is erased.
    pub fn configure(&mut self, config: FrameConfig) -> RadarResult<()> {
        config.validate()?;

        let cells = 2 * config.sample_count();
        let mut data = Vec::new();
        data.try_reserve_exact(cells)
            .map_err(|_| RadarError::Allocation {
                elements: config.sample_count(),
            })?;
        data.resize_with(cells, AtomicF32::default);

        self.config = config;
        self.data = data;
        self.space = Space::Fourier;
        Ok(())
    }

    /// Whether storage has been allocated via [`Frame::configure`].
    pub fn is_configured(&self) -> bool {
        !self.data.is_empty()
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    pub fn space(&self) -> Space {
        self.space
    }

    /// The total amount of points in this radar cube.
    pub fn sample_count(&self) -> usize {
        self.config.sample_count()
    }

    /// Sets all elements of this radar cube to zero.
    pub fn clear(&self) {
        for cell in &self.data {
            cell.store(0.0);
        }
    }

    /// Returns the grid value at a data index.
    #[inline]
    pub fn get(&self, index: usize) -> Complex32 {
        Complex32::new(self.data[2 * index].load(), self.data[2 * index + 1].load())
    }

    /// Overwrites the grid value at a data index.
    #[inline]
    pub fn set(&self, index: usize, value: Complex32) {
        self.data[2 * index].store(value.re);
        self.data[2 * index + 1].store(value.im);
    }

    /// Atomically adds a value to the grid cell at a data index.
    #[inline]
    fn add(&self, index: usize, value: Complex32) {
        self.data[2 * index].fetch_add(value.re);
        self.data[2 * index + 1].fetch_add(value.im);
    }

    /// Returns the data index of a grid-aligned point.
    ///
    /// The canonical layout is row-major (chirp, sample, channel):
    /// `((chirp * S) + sample) * K + channel`.
    pub fn linear_index(&self, index: &CubeIndex) -> usize {
        let dims = self.config.dims();
        let raw = index.as_array();
        let mut linear = 0;
        for i in 0..3 {
            debug_assert!(raw[i] >= 0 && (raw[i] as usize) < dims[i], "index out of bounds");
            linear = linear * dims[i] + raw[i] as usize;
        }
        linear
    }

    /// Computes the grid-aligned point at a data index; the inverse of
    /// [`Frame::linear_index`].
    pub fn index_at(&self, mut linear: usize) -> CubeIndex {
        let dims = self.config.dims();
        let mut raw = [0i32; 3];
        for i in (0..3).rev() {
            raw[i] = (linear % dims[i]) as i32;
            linear /= dims[i];
        }
        CubeIndex::from_array(raw)
    }

    /// Data index for possibly out-of-range components, wrapping each axis.
    fn linear_wrapped(&self, raw: [i32; 3]) -> usize {
        let dims = self.config.dims();
        let mut linear = 0;
        for i in 0..3 {
            linear = linear * dims[i] + wrap(raw[i], dims[i]);
        }
        linear
    }

    /// Returns the grid value at a grid-aligned point.
    pub fn at(&self, index: &CubeIndex) -> Complex32 {
        self.get(self.linear_index(index))
    }

    /// Increments the value of an interpolated grid cell by `value`, spreading
    /// spectral leakage up to [`DEFAULT_SPLAT_WINDOW`] bins per axis.
    pub fn splat(&self, point: &CubePoint, value: Complex32) {
        self.splat_windowed(point, value, DEFAULT_SPLAT_WINDOW);
    }

    /// Increments the value of an interpolated grid cell by `value`.
    ///
    /// For a grid-aligned point this adds `value` to the containing bin. For
    /// fractional points the deposit simulates the spectral leakage of a
    /// rectangular window: per fractional axis the value is rotated by
    /// `exp(i*pi*s)`, weighted by `sin(pi*s)/pi`, and distributed over
    /// `center + k (mod size)` for `k` in `[-window, +window]` with a
    /// `1/(s - k)` envelope. Leaf writes are atomic.
    pub fn splat_windowed(&self, point: &CubePoint, value: Complex32, window: i32) {
        let raw = point.as_array();
        let mut center = [0i32; 3];
        let mut shifts = [0.0f32; 3];
        let mut value = value;
        let mut weight = 1.0f32;

        for i in 0..3 {
            center[i] = raw[i].round() as i32;
            let shift = raw[i] - center[i] as f32;
            if shift.abs() < DELTA_THRESHOLD {
                // essentially a delta peak along this axis
                continue;
            }
            shifts[i] = shift;
            let shift_pi = PI * shift;
            value *= Complex32::new(0.0, shift_pi).exp();
            weight *= shift_pi.sin() / PI;
        }

        self.splat_axis(0, center, value, &shifts, weight, window);
    }

    fn splat_axis(
        &self,
        axis: usize,
        center: [i32; 3],
        value: Complex32,
        shifts: &[f32; 3],
        weight: f32,
        window: i32,
    ) {
        if axis == 3 {
            self.add(self.linear_wrapped(center), value * weight);
            return;
        }

        if shifts[axis] == 0.0 {
            // delta peak
            self.splat_axis(axis + 1, center, value, shifts, weight, window);
            return;
        }

        let mut next = center;
        for shift in -window..=window {
            next[axis] = center[axis] + shift;
            self.splat_axis(
                axis + 1,
                next,
                value,
                shifts,
                weight / (shifts[axis] - shift as f32),
                window,
            );
        }
    }

    /// Returns the interpolated grid value at a fractional point.
    ///
    /// This inverts [`Frame::splat`]: per fractional axis the value of the
    /// nearest bin is multiplied by `(i*2*pi*s) / (exp(i*2*pi*s) - 1)`, the
    /// reciprocal of the rectangular-window leakage kernel.
    pub fn value_at(&self, point: &CubePoint) -> Complex32 {
        let raw = point.as_array();
        let mut center = [0i32; 3];
        let mut factor = Complex32::new(1.0, 0.0);

        for i in 0..3 {
            center[i] = raw[i].round() as i32;
            let shift = raw[i] - center[i] as f32;
            if shift.abs() < DELTA_THRESHOLD {
                continue;
            }
            let arg = Complex32::new(0.0, 2.0 * PI * shift);
            factor *= arg / (arg.exp() - 1.0);
        }

        self.get(self.linear_wrapped(center)) * factor
    }

    /// Performs an in-place 3-D forward DFT with rectangular window, flipping
    /// the [`Space`] of this frame.
    pub fn fft(&mut self) -> RadarResult<()> {
        if !self.is_configured() {
            return Err(RadarError::Unallocated);
        }

        let n = self.sample_count();
        let mut scratch: Vec<Complex32> = (0..n).map(|i| self.get(i)).collect();
        fft3_inplace(&mut scratch, self.config.dims());
        for (i, value) in scratch.into_iter().enumerate() {
            self.set(i, value);
        }

        self.space = self.space.flipped();
        Ok(())
    }

    /// Returns the grid-aligned point with the highest magnitude.
    pub fn argmax(&self) -> CubeIndex {
        let mut best_index = 0;
        let mut best = self.get(0).norm_sqr();
        for i in 1..self.sample_count() {
            let mag = self.get(i).norm_sqr();
            if mag > best {
                best_index = i;
                best = mag;
            }
        }
        self.index_at(best_index)
    }

    /// Performs three-point frequency estimation around a grid-aligned point,
    /// locating a spectral peak with sub-bin precision.
    ///
    /// Along each axis, with `l`, `m`, `r` the magnitudes of the ring-wrapped
    /// left neighbor, the bin itself and the right neighbor, the peak is
    /// placed at `i - l/(l+m)` when `l >= r` and `i + r/(r+m)` otherwise.
    /// This is suboptimal in the presence of noise.
    pub fn frequency_estimation(&self, index: &CubeIndex) -> CubePoint {
        let linear = self.linear_index(index);
        let dims = self.config.dims();
        let raw = index.as_array();

        let mut result = [0.0f32; 3];
        let mut off = 1usize;
        for i in (0..3).rev() {
            result[i] = self.frequency_estimation_axis(linear, off, raw[i], dims[i]);
            off *= dims[i];
        }
        CubePoint::from_array(result)
    }

    fn frequency_estimation_axis(&self, linear: usize, off: usize, b: i32, max: usize) -> f32 {
        let left = if b > 0 {
            linear - off
        } else {
            linear + (max - 1) * off
        };
        let right = if (b as usize) < max - 1 {
            linear + off
        } else {
            linear - (max - 1) * off
        };

        let l = self.get(left).norm();
        let m = self.get(linear).norm();
        let r = self.get(right).norm();

        if l + m + r == 0.0 {
            return b as f32;
        }

        if l >= r {
            b as f32 - l / (l + m)
        } else {
            b as f32 + r / (r + m)
        }
    }

    /// Returns a copy of this frame scaled by `factor`, typically used to
    /// normalize a splatted frame by the total sample weight.
    pub fn scaled(&self, factor: f32) -> Frame {
        let mut frame = self.clone();
        frame.scale(factor);
        frame
    }

    /// Performs an in-place component-wise scalar multiplication.
    pub fn scale(&mut self, factor: f32) {
        for i in 0..self.sample_count() {
            self.set(i, self.get(i) * factor);
        }
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Frame {
    fn clone(&self) -> Self {
        Self {
            config: self.config,
            space: self.space,
            data: self.data.clone(),
        }
    }
}

/// Component-wise accumulation; both frames need equal configurations for
/// this to be meaningful.
impl std::ops::AddAssign<&Frame> for Frame {
    fn add_assign(&mut self, other: &Frame) {
        debug_assert_eq!(self.sample_count(), other.sample_count());
        for i in 0..self.sample_count() {
            self.set(i, self.get(i) + other.get(i));
        }
    }
}

impl std::ops::MulAssign<f32> for Frame {
    fn mul_assign(&mut self, factor: f32) {
        self.scale(factor);
    }
}
