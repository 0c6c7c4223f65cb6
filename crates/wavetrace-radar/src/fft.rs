//! 3-D forward DFT for radar cubes.
//!
//! rustfft computes one-dimensional transforms, so the 3-D transform is three
//! passes of strided 1-D FFTs, one per tensor axis. Plans are created per
//! axis length and reused for every line along that axis.

use num_complex::Complex32;
use rustfft::FftPlanner;

/// Performs an in-place forward DFT along all three axes of a row-major
/// tensor with the given dimensions.
///
/// # Panics
///
/// Panics when `data.len()` does not match the product of `dims`.
pub fn fft3_inplace(data: &mut [Complex32], dims: [usize; 3]) {
    assert_eq!(
        data.len(),
        dims.iter().product::<usize>(),
        "tensor length must match its dimensions"
    );

    let mut planner = FftPlanner::new();
    let strides = [dims[1] * dims[2], dims[2], 1];

    for axis in 0..3 {
        let len = dims[axis];
        if len <= 1 {
            continue;
        }

        let fft = planner.plan_fft_forward(len);
        let stride = strides[axis];
        let mut line = vec![Complex32::new(0.0, 0.0); len];

        // lines along `axis`: outer blocks of size len*stride, inner offsets
        // within one stride
        let outer = data.len() / (len * stride);
        for block in 0..outer {
            for offset in 0..stride {
                let start = block * len * stride + offset;
                for (k, value) in line.iter_mut().enumerate() {
                    *value = data[start + k * stride];
                }
                fft.process(&mut line);
                for (k, value) in line.iter().enumerate() {
                    data[start + k * stride] = *value;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_dc_input() {
        // A constant tensor transforms to a single delta at the origin.
        let dims = [2, 4, 3];
        let n = 24;
        let mut data = vec![Complex32::new(1.0, 0.0); n];
        fft3_inplace(&mut data, dims);

        assert_relative_eq!(data[0].re, n as f32, max_relative = 1e-5);
        for value in &data[1..] {
            assert!(value.norm() < 1e-4);
        }
    }

    #[test]
    fn test_single_tone() {
        // A complex exponential along the sample axis transforms to a delta
        // at the matching bin.
        let dims = [1, 8, 1];
        let bin = 3;
        let mut data: Vec<Complex32> = (0..8)
            .map(|i| {
                let phase = 2.0 * std::f32::consts::PI * bin as f32 * i as f32 / 8.0;
                Complex32::new(phase.cos(), phase.sin())
            })
            .collect();
        fft3_inplace(&mut data, dims);

        for (i, value) in data.iter().enumerate() {
            if i == bin {
                assert_relative_eq!(value.re, 8.0, epsilon = 1e-4);
            } else {
                assert!(value.norm() < 1e-4, "leakage at bin {}", i);
            }
        }
    }

    #[test]
    fn test_parseval() {
        // sum |x|^2 == (1/N) sum |X|^2 for an unnormalized forward DFT
        let dims = [3, 4, 5];
        let n: usize = dims.iter().product();
        let mut data: Vec<Complex32> = (0..n)
            .map(|i| {
                let t = i as f32 * 0.37;
                Complex32::new(t.sin(), (2.0 * t).cos())
            })
            .collect();
        let energy_in: f32 = data.iter().map(|v| v.norm_sqr()).sum();

        fft3_inplace(&mut data, dims);
        let energy_out: f32 = data.iter().map(|v| v.norm_sqr()).sum();

        assert_relative_eq!(energy_in, energy_out / n as f32, max_relative = 1e-4);
    }
}
