//! Ray-surface intersection records.

use crate::geometry::{Ray, Vec3};

/// The intersection of a ray with a surface.
///
/// The record owns the ray it was produced for; the integrator threads one
/// `Intersection` through the whole random walk and resets it per bounce.
#[derive(Debug, Clone)]
pub struct Intersection {
    /// The distance to the hit point.
    pub t: f32,
    /// The maximum distance to search for intersections.
    pub t_max: f32,
    /// The position of the hit point.
    pub p: Vec3,
    /// The normal of the surface at the intersection, facing the ray.
    pub n: Vec3,
    /// The ray used for intersection.
    pub ray: Ray,
}

impl Intersection {
    /// The incident direction, pointing away from the intersection point.
    #[inline]
    pub fn wi(&self) -> Vec3 {
        -self.ray.d
    }

    /// The direction of perfect specular reflection.
    #[inline]
    pub fn reflect(&self) -> Vec3 {
        let wi = self.wi();
        2.0 * self.n.dot(&wi) * self.n - wi
    }

    /// The cosine of the angle between surface normal and ray direction.
    #[inline]
    pub fn cos_theta(&self) -> f32 {
        self.n.dot(&self.wi()).abs()
    }

    /// Whether an intersection closer than `t_max` has been found.
    #[inline]
    pub fn valid(&self) -> bool {
        self.t < self.t_max
    }

    /// Resets the intersection for the next trace.
    pub fn reset(&mut self) {
        self.t = f32::INFINITY;
        self.t_max = f32::INFINITY;
    }
}

impl Default for Intersection {
    fn default() -> Self {
        Self {
            t: f32::INFINITY,
            t_max: f32::INFINITY,
            p: Vec3::zeros(),
            n: Vec3::zeros(),
            ray: Ray::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_is_invalid() {
        let isect = Intersection::default();
        assert!(!isect.valid());
    }

    #[test]
    fn test_reflect_mirrors_around_normal() {
        let mut isect = Intersection::default();
        isect.ray = Ray::new(Vec3::zeros(), Vec3::new(1.0, -1.0, 0.0).normalize());
        isect.n = Vec3::new(0.0, 1.0, 0.0);

        let r = isect.reflect();
        assert_relative_eq!(r.x, std::f32::consts::FRAC_1_SQRT_2, epsilon = 1e-6);
        assert_relative_eq!(r.y, std::f32::consts::FRAC_1_SQRT_2, epsilon = 1e-6);
        assert_relative_eq!(isect.cos_theta(), std::f32::consts::FRAC_1_SQRT_2, epsilon = 1e-6);
    }
}
