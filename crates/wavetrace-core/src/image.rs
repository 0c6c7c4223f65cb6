//! Diagnostic accumulator over the primary hemisphere.
//!
//! Each primary sample direction maps to one bucket of a 2-D image; paths
//! record their contribution, path length and phase deviation there. The
//! result visualizes which directions carry energy and how well the guiding
//! distribution matches them.
//!
//! Buckets are structure-of-arrays of [`AtomicF32`] so that worker threads
//! can splat concurrently, mirroring the radar cube's write policy.

use num_complex::Complex32;

use wavetrace_radar::AtomicF32;

use crate::geometry::EPSILON;

/// Default debug image width.
pub const DEBUG_IMAGE_WIDTH: usize = 1536;
/// Default debug image height.
pub const DEBUG_IMAGE_HEIGHT: usize = 512;

/// One accumulated bucket of the debug image.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DebugElement {
    /// Path length (in [m]), weighted by sample weight over pdf.
    pub distance: f32,
    /// Complex path contribution.
    pub contribution: Complex32,
    /// Phase-filter deviation (in wavelengths).
    pub dphase: f32,
    /// Accumulated inverse pdfs, the normalization denominator.
    pub inv_pdfs: f32,
    /// Accumulated sample weight.
    pub weight: f32,
}

/// A 2-D accumulator over `[0,1)^2`, indexed by primary sample position.
#[derive(Debug)]
pub struct DebugImage {
    width: usize,
    height: usize,
    distance: Vec<AtomicF32>,
    contribution_re: Vec<AtomicF32>,
    contribution_im: Vec<AtomicF32>,
    dphase: Vec<AtomicF32>,
    inv_pdfs: Vec<AtomicF32>,
    weight: Vec<AtomicF32>,
}

impl DebugImage {
    pub fn new(width: usize, height: usize) -> Self {
        let cells = width * height;
        let make = || {
            let mut v = Vec::new();
            v.resize_with(cells, AtomicF32::default);
            v
        };
        Self {
            width,
            height,
            distance: make(),
            contribution_re: make(),
            contribution_im: make(),
            dphase: make(),
            inv_pdfs: make(),
            weight: make(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    fn bucket(&self, uv: [f32; 2]) -> usize {
        let x = (uv[0] * self.width as f32).floor() as usize % self.width;
        let y = (uv[1] * self.height as f32).floor() as usize % self.height;
        y * self.width + x
    }

    /// Accumulates an element into the bucket containing `uv`.
    pub fn splat(&self, uv: [f32; 2], element: &DebugElement) {
        let i = self.bucket(uv);
        self.distance[i].fetch_add(element.distance);
        self.contribution_re[i].fetch_add(element.contribution.re);
        self.contribution_im[i].fetch_add(element.contribution.im);
        self.dphase[i].fetch_add(element.dphase);
        self.inv_pdfs[i].fetch_add(element.inv_pdfs);
        self.weight[i].fetch_add(element.weight);
    }

    /// Reads one bucket.
    pub fn get(&self, x: usize, y: usize) -> DebugElement {
        let i = (y % self.height) * self.width + (x % self.width);
        DebugElement {
            distance: self.distance[i].load(),
            contribution: Complex32::new(
                self.contribution_re[i].load(),
                self.contribution_im[i].load(),
            ),
            dphase: self.dphase[i].load(),
            inv_pdfs: self.inv_pdfs[i].load(),
            weight: self.weight[i].load(),
        }
    }

    /// Zeroes all buckets.
    pub fn clear(&self) {
        for column in [
            &self.distance,
            &self.contribution_re,
            &self.contribution_im,
            &self.dphase,
            &self.inv_pdfs,
            &self.weight,
        ] {
            for cell in column {
                cell.store(0.0);
            }
        }
    }

    /// Returns the normalized image, row-major.
    ///
    /// Buckets with accumulated inverse pdfs are divided through by them so
    /// different sampling densities become comparable; the contribution is
    /// additionally scaled down to a displayable range.
    pub fn normalized(&self) -> Vec<DebugElement> {
        let mut result = Vec::with_capacity(self.width * self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                let mut element = self.get(x, y);
                element.contribution *= 1e-5;
                if element.inv_pdfs > EPSILON {
                    element.contribution /= element.inv_pdfs;
                    element.dphase /= element.inv_pdfs;
                    element.distance /= element.inv_pdfs;
                    element.inv_pdfs = 1.0;
                }
                result.push(element);
            }
        }
        result
    }
}

impl Default for DebugImage {
    fn default() -> Self {
        Self::new(DEBUG_IMAGE_WIDTH, DEBUG_IMAGE_HEIGHT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splat_accumulates() {
        let image = DebugImage::new(4, 4);
        let element = DebugElement {
            distance: 1.0,
            contribution: Complex32::new(0.5, -0.5),
            dphase: 2.0,
            inv_pdfs: 0.0,
            weight: 1.0,
        };
        image.splat([0.1, 0.1], &element);
        image.splat([0.1, 0.1], &element);

        let bucket = image.get(0, 0);
        assert_eq!(bucket.distance, 2.0);
        assert_eq!(bucket.contribution, Complex32::new(1.0, -1.0));
        assert_eq!(bucket.weight, 2.0);

        // other buckets untouched
        assert_eq!(image.get(1, 1), DebugElement::default());
    }

    #[test]
    fn test_clear() {
        let image = DebugImage::new(2, 2);
        image.splat(
            [0.9, 0.9],
            &DebugElement {
                weight: 3.0,
                ..Default::default()
            },
        );
        image.clear();
        assert_eq!(image.get(1, 1), DebugElement::default());
    }

    #[test]
    fn test_normalized_divides_by_inv_pdfs() {
        let image = DebugImage::new(2, 1);
        image.splat(
            [0.1, 0.0],
            &DebugElement {
                distance: 8.0,
                dphase: 4.0,
                inv_pdfs: 2.0,
                ..Default::default()
            },
        );

        let normalized = image.normalized();
        assert_eq!(normalized.len(), 2);
        assert_eq!(normalized[0].distance, 4.0);
        assert_eq!(normalized[0].dphase, 2.0);
        assert_eq!(normalized[0].inv_pdfs, 1.0);
    }
}
