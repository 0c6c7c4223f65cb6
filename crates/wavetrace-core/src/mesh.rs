//! Triangle soup scene geometry.
//!
//! [`TriangleMesh`] is the interchange format for scene geometry, with
//! helpers for the axis-aligned quads and boxes the test scenes are built
//! from. It also implements [`Raycaster`] by brute force, which is plenty
//! for the handful-of-triangles scenes used in tests and demos; production
//! scenes go through an external acceleration structure instead.

use crate::geometry::{Ray, Vec3, EPSILON};
use crate::raycaster::{Hit, Raycaster};

/// A collection of triangles describing the scene geometry.
#[derive(Debug, Clone, Default)]
pub struct TriangleMesh {
    pub vertices: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
}

impl TriangleMesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parallelogram spanned by `b` and `c` with one corner at `a`.
    pub fn add_quad(&mut self, a: Vec3, b: Vec3, c: Vec3) {
        let i = self.vertices.len() as u32;

        self.vertices.push(a);
        self.vertices.push(a + b);
        self.vertices.push(a + b + c);
        self.vertices.push(a + c);

        self.triangles.push([i, i + 1, i + 2]);
        self.triangles.push([i, i + 2, i + 3]);
    }

    /// Adds the six faces of an axis-aligned box.
    pub fn add_box(&mut self, min: Vec3, max: Vec3) {
        let d = max - min;
        self.add_quad(min, Vec3::new(0.0, d.y, 0.0), Vec3::new(0.0, 0.0, d.z));
        self.add_quad(min, Vec3::new(0.0, 0.0, d.z), Vec3::new(d.x, 0.0, 0.0));
        self.add_quad(min, Vec3::new(d.x, 0.0, 0.0), Vec3::new(0.0, d.y, 0.0));

        let d = min - max;
        self.add_quad(max, Vec3::new(0.0, d.y, 0.0), Vec3::new(d.x, 0.0, 0.0));
        self.add_quad(max, Vec3::new(0.0, 0.0, d.z), Vec3::new(0.0, d.y, 0.0));
        self.add_quad(max, Vec3::new(d.x, 0.0, 0.0), Vec3::new(0.0, 0.0, d.z));
    }

    /// Möller-Trumbore intersection of a ray with one triangle.
    fn intersect_triangle(&self, ray: &Ray, triangle: &[u32; 3]) -> Option<f32> {
        let v0 = self.vertices[triangle[0] as usize];
        let e1 = self.vertices[triangle[1] as usize] - v0;
        let e2 = self.vertices[triangle[2] as usize] - v0;

        let pvec = ray.d.cross(&e2);
        let det = e1.dot(&pvec);
        if det.abs() < 1e-12 {
            return None;
        }

        let inv_det = 1.0 / det;
        let tvec = ray.o - v0;
        let u = tvec.dot(&pvec) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let qvec = tvec.cross(&e1);
        let v = ray.d.dot(&qvec) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        Some(e2.dot(&qvec) * inv_det)
    }

    fn normal(&self, triangle: &[u32; 3]) -> Vec3 {
        let v0 = self.vertices[triangle[0] as usize];
        let e1 = self.vertices[triangle[1] as usize] - v0;
        let e2 = self.vertices[triangle[2] as usize] - v0;
        e1.cross(&e2).normalize()
    }
}

impl Raycaster for TriangleMesh {
    fn intersect(&self, ray: &Ray, t_max: f32) -> Option<Hit> {
        let mut closest: Option<(f32, usize)> = None;

        for (index, triangle) in self.triangles.iter().enumerate() {
            if let Some(t) = self.intersect_triangle(ray, triangle) {
                if t > EPSILON && t < closest.map_or(t_max, |(best, _)| best) {
                    closest = Some((t, index));
                }
            }
        }

        closest.map(|(t, index)| {
            let mut n = self.normal(&self.triangles[index]);
            if n.dot(&ray.d) > 0.0 {
                // faceforward
                n = -n;
            }
            Hit { t, p: ray.at(t), n }
        })
    }

    fn occluded(&self, ray: &Ray, t_max: f32) -> bool {
        self.triangles.iter().any(|triangle| {
            self.intersect_triangle(ray, triangle)
                .is_some_and(|t| t > EPSILON && t < t_max)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_box() -> TriangleMesh {
        let mut mesh = TriangleMesh::new();
        mesh.add_box(Vec3::new(-0.5, -0.5, -0.5), Vec3::new(0.5, 0.5, 0.5));
        mesh
    }

    #[test]
    fn test_box_has_twelve_triangles() {
        assert_eq!(unit_box().triangles.len(), 12);
    }

    #[test]
    fn test_intersect_box_front_face() {
        let mesh = unit_box();
        let ray = Ray::new(Vec3::new(-2.0, 0.1, 0.1), Vec3::new(1.0, 0.0, 0.0));
        let hit = mesh.intersect(&ray, f32::INFINITY).expect("must hit");

        assert_relative_eq!(hit.t, 1.5, epsilon = 1e-5);
        assert_relative_eq!(hit.p.x, -0.5, epsilon = 1e-5);
        // normal faces the incoming ray
        assert_relative_eq!(hit.n.x, -1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_face_forward_from_other_side() {
        let mesh = unit_box();
        let ray = Ray::new(Vec3::new(2.0, 0.1, 0.1), Vec3::new(-1.0, 0.0, 0.0));
        let hit = mesh.intersect(&ray, f32::INFINITY).expect("must hit");
        assert_relative_eq!(hit.n.x, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_miss() {
        let mesh = unit_box();
        let ray = Ray::new(Vec3::new(-2.0, 2.0, 0.0), Vec3::new(1.0, 0.0, 0.0));
        assert!(mesh.intersect(&ray, f32::INFINITY).is_none());
    }

    #[test]
    fn test_t_max_clips() {
        let mesh = unit_box();
        let ray = Ray::new(Vec3::new(-2.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0));
        assert!(mesh.intersect(&ray, 1.0).is_none());
        assert!(!mesh.occluded(&ray, 1.0));
        assert!(mesh.occluded(&ray, 2.0));
    }

    #[test]
    fn test_empty_mesh_never_hits() {
        let mesh = TriangleMesh::new();
        let ray = Ray::new(Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0));
        assert!(mesh.intersect(&ray, f32::INFINITY).is_none());
        assert!(!mesh.occluded(&ray, f32::INFINITY));
    }
}
