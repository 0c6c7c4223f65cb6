//! Radiation sources: antennas and re-radiating surface patches.
//!
//! Antennas come in two flavors, dispatched by a plain enum rather than
//! dynamic dispatch since the set is closed and these calls sit on the hot
//! path:
//!
//! - [`NearFieldAntenna`]: an infinitesimal-area point emitter, the
//!   equivalent of a point light in computer graphics. This models actual
//!   radar sensors.
//! - [`FarFieldAntenna`]: a plane-wave emitter over a disk, the equivalent
//!   of a directional light, used for RCS-style measurements.
//!
//! [`SurfaceEmitter`] models an infinitesimal PEC surface patch whose
//! induced currents re-radiate an incoming wave back into space.

use std::f32::consts::PI;

use num_complex::Complex32;

use crate::geometry::{
    build_frame, cross_rc, rotate_c, scale_c, to_complex, Mat3, Ray, Vec3, Vec3c,
};
use crate::intersection::Intersection;
use crate::sampling::{uniform_sample_sphere, uniform_sphere_pdf};

/// Closed-form approximation of the radiation pattern of a 77 GHz automotive
/// radar patch antenna.
///
/// Precise measurements for these devices are hard to come by; this is a
/// rough polynomial fit of the H-plane and E-plane gains.
#[derive(Debug, Clone, Copy, Default)]
pub struct AwrPattern;

impl AwrPattern {
    /// Evaluates the radiated H field for a local direction.
    pub fn evaluate(&self, d: &Vec3) -> Vec3c {
        let h0 = Vec3::new(0.0, 1.0, 0.0).cross(d);

        let cos_h = (1.0 - d.x * d.x).max(0.0).sqrt();
        let cos_e = (1.0 - d.y * d.y).max(0.0).sqrt();

        let gain = (2.622 / (cos_h - 1.8).powi(6)) * (0.625 / (cos_e - 1.5).powi(4));
        to_complex(&(h0 * gain))
    }

    /// Samples an emission direction, returning the H field pre-divided by
    /// the sample density.
    pub fn sample(&self, uv: [f32; 2], d: &mut Vec3) -> Vec3c {
        *d = uniform_sample_sphere(uv);
        scale_c(&self.evaluate(d), 1.0 / self.pdf(d))
    }

    /// The density of [`AwrPattern::sample`] per unit solid angle.
    pub fn pdf(&self, _d: &Vec3) -> f32 {
        uniform_sphere_pdf()
    }
}

/// An antenna with infinitesimal area, used to simulate radar sensors.
///
/// The equivalent of a point light source in computer graphics; the
/// radiation pattern is shaped by an [`AwrPattern`] in the antenna's local
/// frame.
#[derive(Debug, Clone)]
pub struct NearFieldAntenna {
    position: Vec3,
    rotation: Mat3,
    pattern: AwrPattern,
}

impl NearFieldAntenna {
    pub fn new(position: Vec3, rotation: Mat3, pattern: AwrPattern) -> Self {
        debug_assert!(
            (rotation.determinant().abs() - 1.0).abs() < 1e-2,
            "supplied rotation matrix is - in fact - not a rotation matrix"
        );
        Self {
            position,
            rotation,
            pattern,
        }
    }

    pub fn position(&self) -> &Vec3 {
        &self.position
    }

    pub fn rotation(&self) -> &Mat3 {
        &self.rotation
    }

    /// Samples a ray emitted by this antenna, setting origin, direction and
    /// H field (pre-divided by the directional sample density).
    pub fn sample(&self, uv: [f32; 2], ray: &mut Ray) {
        ray.o = self.position;

        let mut d = Vec3::zeros();
        let h = self.pattern.sample(uv, &mut d);
        ray.d = self.rotation * d;
        ray.set_h(rotate_c(&self.rotation, &h));
    }

    /// Evaluates the emitted H field for the ray's direction.
    pub fn evaluate(&self, ray: &mut Ray) {
        ray.o = self.position;
        let h = self.pattern.evaluate(&(self.rotation.transpose() * ray.d));
        ray.set_h(rotate_c(&self.rotation, &h));
    }

    /// Updates an NEE ray after its visibility has been established:
    /// advances the travel time and applies the spherical-wave falloff.
    pub fn connect(&self, nee: &mut Intersection) {
        let r = nee.t;
        nee.ray.add_distance(r);
        nee.ray.weight_by(1.0 / (4.0 * PI * r));
    }

    /// Builds the next-event connection toward this antenna.
    ///
    /// Points the intersection's ray at the antenna, sets `t_max` to the
    /// connection distance and returns the antenna's receive H field along
    /// that connection.
    pub fn connect_nee(&self, nee: &mut Intersection) -> Vec3c {
        let mut d = self.position - nee.ray.o;
        let r = d.norm();
        d /= r;
        nee.ray.d = d;
        nee.t_max = r;

        let h = self.pattern.evaluate(&(self.rotation.transpose() * -d));
        rotate_c(&self.rotation, &h)
    }
}

/// A far-field antenna emitting plane waves, used for RCS measurements.
///
/// Internally represented by a disk of radius `radius` at distance `radius`
/// from `center`, with normal `-dir`; its radiation pattern is specular in
/// direction `-dir`.
#[derive(Debug, Clone)]
pub struct FarFieldAntenna {
    /// The direction of propagation (the normal of the plane wave).
    dir: Vec3,
    /// Two vectors orthonormal to `dir`, used for disk sampling.
    frame: (Vec3, Vec3),
    /// The H field of this emitter, orthogonal to `dir`.
    polarization: Vec3c,
    /// Center of the disk.
    center: Vec3,
    /// Radius of the disk. Should match the bounding-sphere radius of the
    /// scene.
    radius: f32,
}

impl FarFieldAntenna {
    pub fn new(dir: Vec3, polarization: Vec3c, scene_center: Vec3, radius: f32) -> Self {
        debug_assert!(
            (dir.norm() - 1.0).abs() < 1e-4,
            "normal of plane wave must be normalized"
        );

        Self {
            dir,
            frame: build_frame(&-dir),
            polarization,
            center: scene_center + dir * radius,
            radius,
        }
    }

    /// Samples a ray on the emission disk travelling along `-dir`.
    pub fn sample(&self, uv: [f32; 2], ray: &mut Ray) {
        let disk = [2.0 * uv[0] - 1.0, 2.0 * uv[1] - 1.0];
        ray.o = (self.frame.0 * disk[0] + self.frame.1 * disk[1]) * self.radius + self.center;
        ray.d = -self.dir;

        let pdf = 1.0 / (4.0 * self.radius * self.radius);
        ray.set_h(scale_c(&self.polarization, 1.0 / pdf));
    }

    /// A plane wave's angular distribution is a dirac delta; it is
    /// impossible to hit this antenna by chance.
    pub fn evaluate(&self, ray: &mut Ray) {
        ray.set_weight_to_zero();
    }

    pub fn connect(&self, _nee: &mut Intersection) {
        // plane waves accrue no spherical falloff
    }

    /// Builds the next-event connection toward this antenna.
    pub fn connect_nee(&self, nee: &mut Intersection) -> Vec3c {
        let mut local = nee.ray.o - self.center;
        local -= local.dot(&self.dir) * self.dir;

        if local.norm() > self.radius {
            // outside of the disk
            return Vec3c::zeros();
        }

        nee.ray.d = self.dir;
        nee.t_max = (local + self.center - nee.ray.o).norm();

        scale_c(&self.polarization, 4.0 * PI * nee.t_max)
    }
}

/// A radar antenna, dispatched by variant.
#[derive(Debug, Clone)]
pub enum Antenna {
    NearField(NearFieldAntenna),
    FarField(FarFieldAntenna),
}

impl Antenna {
    pub fn sample(&self, uv: [f32; 2], ray: &mut Ray) {
        match self {
            Antenna::NearField(antenna) => antenna.sample(uv, ray),
            Antenna::FarField(antenna) => antenna.sample(uv, ray),
        }
    }

    pub fn evaluate(&self, ray: &mut Ray) {
        match self {
            Antenna::NearField(antenna) => antenna.evaluate(ray),
            Antenna::FarField(antenna) => antenna.evaluate(ray),
        }
    }

    pub fn connect(&self, nee: &mut Intersection) {
        match self {
            Antenna::NearField(antenna) => antenna.connect(nee),
            Antenna::FarField(antenna) => antenna.connect(nee),
        }
    }

    pub fn connect_nee(&self, nee: &mut Intersection) -> Vec3c {
        match self {
            Antenna::NearField(antenna) => antenna.connect_nee(nee),
            Antenna::FarField(antenna) => antenna.connect_nee(nee),
        }
    }
}

impl From<NearFieldAntenna> for Antenna {
    fn from(antenna: NearFieldAntenna) -> Self {
        Antenna::NearField(antenna)
    }
}

impl From<FarFieldAntenna> for Antenna {
    fn from(antenna: FarFieldAntenna) -> Self {
        Antenna::FarField(antenna)
    }
}

/// An infinitesimal PEC surface patch that re-radiates due to induced
/// surface currents.
#[derive(Debug, Clone, Default)]
pub struct SurfaceEmitter {
    /// The intersection that deposited energy on this patch.
    pub incoming: Intersection,
}

impl SurfaceEmitter {
    /// Evaluates the re-radiated H field for the ray's direction.
    ///
    /// The surface current of a perfect conductor is `J = 2 n x H`; the
    /// cross product with the outgoing direction incorporates the cosine
    /// term. Directions below the surface carry no energy.
    pub fn evaluate(&self, ray: &mut Ray) {
        let j = scale_c(&cross_rc(&self.incoming.n, self.incoming.ray.h()), 2.0);
        ray.set_h(cross_rc(&ray.d, &j));

        if ray.d.dot(&self.incoming.n) < 0.0 {
            ray.set_weight_to_zero();
        }
    }

    /// Updates an outgoing connection: advances the travel time and applies
    /// the regularized induction kernel `(1 - i/max(k0*r, 1e-3)) / (4*pi*r)`.
    pub fn connect(&self, outgoing: &mut Intersection) {
        let r = outgoing.t;
        outgoing.ray.add_distance(r);

        let k0r = (self.incoming.ray.k0() * r).max(1e-3);
        let kernel = Complex32::new(1.0, -1.0 / k0r) / (4.0 * PI * r);
        outgoing.ray.weight_by(kernel);
    }
}
