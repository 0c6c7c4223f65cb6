//! Rays and complex-field vector algebra.
//!
//! A ray is an infinitesimal element of a wave front. Besides origin and
//! direction it carries the magnetic field H (a complex 3-vector encoding
//! phase, orientation and strength), its frequency (an FMCW radar emits a
//! whole spectrum of frequencies), the time it has been travelling (which
//! determines the phase at the receiver) and its bounce depth.
//!
//! The wave only travels through free space in this simulator, so the E
//! field is fully determined by direction and H field and is never stored.

use num_complex::Complex32;

use wavetrace_radar::SPEED_OF_LIGHT;

pub type Vec3 = nalgebra::Vector3<f32>;
pub type Mat3 = nalgebra::Matrix3<f32>;
pub type Vec3c = nalgebra::Vector3<Complex32>;

/// Minimum feature size of scene geometry (in [m]). Ray-tracing kernels
/// break somewhere below this scale.
pub const EPSILON: f32 = 5e-5;

/// Promotes a real vector to a complex one.
#[inline]
pub fn to_complex(v: &Vec3) -> Vec3c {
    Vec3c::new(
        Complex32::new(v.x, 0.0),
        Complex32::new(v.y, 0.0),
        Complex32::new(v.z, 0.0),
    )
}

/// Cross product of a real vector with a complex field vector.
#[inline]
pub fn cross_rc(a: &Vec3, b: &Vec3c) -> Vec3c {
    Vec3c::new(
        a.y * b.z - a.z * b.y,
        a.z * b.x - a.x * b.z,
        a.x * b.y - a.y * b.x,
    )
}

/// Dot product of a real vector with a complex field vector.
#[inline]
pub fn dot_rc(a: &Vec3, b: &Vec3c) -> Complex32 {
    a.x * b.x + a.y * b.y + a.z * b.z
}

/// Conjugating dot product of two complex field vectors (the first argument
/// is conjugated).
#[inline]
pub fn dotc(a: &Vec3c, b: &Vec3c) -> Complex32 {
    a.x.conj() * b.x + a.y.conj() * b.y + a.z.conj() * b.z
}

/// Applies a real rotation matrix to a complex field vector.
#[inline]
pub fn rotate_c(m: &Mat3, v: &Vec3c) -> Vec3c {
    Vec3c::new(
        m[(0, 0)] * v.x + m[(0, 1)] * v.y + m[(0, 2)] * v.z,
        m[(1, 0)] * v.x + m[(1, 1)] * v.y + m[(1, 2)] * v.z,
        m[(2, 0)] * v.x + m[(2, 1)] * v.y + m[(2, 2)] * v.z,
    )
}

/// Scales a complex field vector by a real factor.
#[inline]
pub fn scale_c(v: &Vec3c, s: f32) -> Vec3c {
    Vec3c::new(v.x * s, v.y * s, v.z * s)
}

/// Squared magnitude of a complex field vector.
#[inline]
pub fn norm_sqr_c(v: &Vec3c) -> f32 {
    v.x.norm_sqr() + v.y.norm_sqr() + v.z.norm_sqr()
}

/// Whether every field component is negligibly small.
///
/// Compares component-wise against the threshold instead of using the
/// squared norm, which would underflow f32 at these scales.
#[inline]
pub fn field_is_negligible(v: &Vec3c) -> bool {
    let limit = 1e-20f32;
    v.x.re.abs() <= limit
        && v.x.im.abs() <= limit
        && v.y.re.abs() <= limit
        && v.y.im.abs() <= limit
        && v.z.re.abs() <= limit
        && v.z.im.abs() <= limit
}

fn is_orthogonal(d: &Vec3, h: &Vec3c) -> bool {
    let h_norm = norm_sqr_c(h).sqrt();
    if h_norm == 0.0 {
        return true;
    }
    dot_rc(d, h).norm() <= 1e-3 * h_norm * d.norm()
}

/// Builds two vectors orthonormal to a direction.
pub fn build_frame(d: &Vec3) -> (Vec3, Vec3) {
    let t = if d.x.abs() > d.y.abs() {
        Vec3::new(-d.z, 0.0, d.x) / (d.x * d.x + d.z * d.z).sqrt()
    } else {
        Vec3::new(0.0, d.z, -d.y) / (d.y * d.y + d.z * d.z).sqrt()
    };
    let b = d.cross(&t);
    (t, b)
}

/// An infinitesimal element of a wave front.
#[derive(Debug, Clone)]
pub struct Ray {
    /// The origin of the ray.
    pub o: Vec3,
    /// The direction the ray is travelling in. Must be normalized.
    pub d: Vec3,
    /// The time the ray has been travelling so far (in [s]).
    pub time: f32,
    /// The frequency of the ray (in [Hz]).
    pub frequency: f32,
    /// How many times this ray has been reflected already.
    pub depth: u32,
    /// The H field associated with this ray.
    h: Vec3c,
}

impl Default for Ray {
    fn default() -> Self {
        Self {
            o: Vec3::zeros(),
            d: Vec3::zeros(),
            time: 0.0,
            frequency: 0.0,
            depth: 0,
            h: Vec3c::zeros(),
        }
    }
}

impl Ray {
    pub fn new(o: Vec3, d: Vec3) -> Self {
        debug_assert!(
            (d.norm() - 1.0).abs() < 1e-4,
            "ray direction must be normalized"
        );
        Self {
            o,
            d,
            ..Self::default()
        }
    }

    /// The point at parameter `t` along the ray.
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.o + t * self.d
    }

    /// The propagation speed of this ray, always the speed of light in
    /// vacuum (in [m/s]).
    #[inline]
    pub fn speed(&self) -> f32 {
        SPEED_OF_LIGHT
    }

    /// The angular wave number of this ray.
    #[inline]
    pub fn k0(&self) -> f32 {
        2.0 * std::f32::consts::PI * self.frequency / self.speed()
    }

    /// The wavelength of this ray.
    #[inline]
    pub fn wavelength(&self) -> f32 {
        self.speed() / self.frequency
    }

    /// Increments the time travelled by this ray by a distance (in [m]).
    #[inline]
    pub fn add_distance(&mut self, distance: f32) {
        self.time += distance / self.speed();
    }

    /// Sets the time travelled by this ray from a distance (in [m]).
    #[inline]
    pub fn set_distance(&mut self, distance: f32) {
        self.time = distance / self.speed();
    }

    /// Reads the H field of this ray.
    #[inline]
    pub fn h(&self) -> &Vec3c {
        &self.h
    }

    /// Sets the H field of this ray. The field must be orthogonal to the
    /// propagation direction.
    #[inline]
    pub fn set_h(&mut self, h: Vec3c) {
        debug_assert!(
            is_orthogonal(&self.d, &h),
            "H-field must be orthogonal to ray propagation direction"
        );
        self.h = h;
    }

    /// Sets the H field to zero, for rays that cannot reach the receiver.
    #[inline]
    pub fn set_weight_to_zero(&mut self) {
        self.h = Vec3c::zeros();
    }

    /// Multiplies the field strength by a scalar, used for importance
    /// sampling weights and scattering functions.
    #[inline]
    pub fn weight_by(&mut self, v: impl Into<Complex32>) {
        let v = v.into();
        self.h.x *= v;
        self.h.y *= v;
        self.h.z *= v;
    }

    /// Measures how strongly this ray would be received, e.g. by an antenna.
    #[inline]
    pub fn measure_h(&self, v: &Vec3c) -> Complex32 {
        dotc(&self.h, v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ray_at() {
        let ray = Ray::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0));
        let p = ray.at(2.0);
        assert_relative_eq!(p.y, 2.0);
        assert_relative_eq!(p.x, 1.0);
    }

    #[test]
    fn test_wavelength_and_wavenumber() {
        let mut ray = Ray::default();
        ray.frequency = 77.0e9;
        assert_relative_eq!(ray.wavelength(), SPEED_OF_LIGHT / 77.0e9, max_relative = 1e-6);
        assert_relative_eq!(
            ray.k0(),
            2.0 * std::f32::consts::PI / ray.wavelength(),
            max_relative = 1e-5
        );
    }

    #[test]
    fn test_add_distance_accumulates_time() {
        let mut ray = Ray::default();
        ray.add_distance(SPEED_OF_LIGHT);
        ray.add_distance(SPEED_OF_LIGHT / 2.0);
        assert_relative_eq!(ray.time, 1.5, max_relative = 1e-6);
    }

    #[test]
    fn test_measure_h_conjugates_first_argument() {
        let mut ray = Ray::new(Vec3::new(0.0, 0.0, 1.0), Vec3::new(1.0, 0.0, 0.0));
        ray.set_h(Vec3c::new(
            Complex32::new(0.0, 0.0),
            Complex32::new(0.0, 1.0),
            Complex32::new(0.0, 0.0),
        ));
        let probe = Vec3c::new(
            Complex32::new(0.0, 0.0),
            Complex32::new(0.0, 1.0),
            Complex32::new(0.0, 0.0),
        );
        // conj(i) * i = 1
        assert_eq!(ray.measure_h(&probe), Complex32::new(1.0, 0.0));
    }

    #[test]
    fn test_weight_by_scalar_and_complex() {
        let mut ray = Ray::new(Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0));
        ray.set_h(Vec3c::new(
            Complex32::new(0.0, 0.0),
            Complex32::new(1.0, 0.0),
            Complex32::new(0.0, 0.0),
        ));
        ray.weight_by(2.0f32);
        ray.weight_by(Complex32::new(0.0, 1.0));
        assert_eq!(ray.h().y, Complex32::new(0.0, 2.0));
    }

    #[test]
    fn test_build_frame_is_orthonormal() {
        let d = Vec3::new(0.3, -0.5, 0.8).normalize();
        let (t, b) = build_frame(&d);
        assert_relative_eq!(t.norm(), 1.0, epsilon = 1e-5);
        assert_relative_eq!(b.norm(), 1.0, epsilon = 1e-5);
        assert!(t.dot(&d).abs() < 1e-5);
        assert!(b.dot(&d).abs() < 1e-5);
        assert!(t.dot(&b).abs() < 1e-5);
    }

    #[test]
    fn test_cross_rc_matches_real_cross() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(-2.0, 0.5, 4.0);
        let complex = cross_rc(&a, &to_complex(&b));
        let real = a.cross(&b);
        assert_relative_eq!(complex.x.re, real.x);
        assert_relative_eq!(complex.y.re, real.y);
        assert_relative_eq!(complex.z.re, real.z);
        assert_eq!(complex.x.im, 0.0);
    }
}
