//! Binary serialization of radar frames.
//!
//! The durable format is deliberately minimal: two IEEE-754 f32 words
//! (real, then imaginary) in little-endian byte order per element, in the
//! canonical row-major (chirp, sample, channel) layout, with no framing
//! bytes. Downstream tools concatenate frames head-to-tail, so a capture of
//! N frames is exactly `N * sample_count * 8` bytes.

use std::io::{self, Write};

use crate::frame::Frame;

/// Appends the raw data of a frame to a writer.
pub fn write_frame<W: Write>(writer: &mut W, frame: &Frame) -> io::Result<()> {
    for i in 0..frame.sample_count() {
        let value = frame.get(i);
        writer.write_all(&value.re.to_le_bytes())?;
        writer.write_all(&value.im.to_le_bytes())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FrameConfig;
    use num_complex::Complex32;

    #[test]
    fn test_frame_layout() {
        let mut frame = Frame::new();
        frame
            .configure(FrameConfig {
                chirp_count: 1,
                samples_per_chirp: 2,
                channel_count: 1,
            })
            .unwrap();
        frame.set(0, Complex32::new(1.0, -2.0));
        frame.set(1, Complex32::new(0.5, 0.25));

        let mut bytes = Vec::new();
        write_frame(&mut bytes, &frame).unwrap();

        assert_eq!(bytes.len(), 2 * 8);
        assert_eq!(&bytes[0..4], &1.0f32.to_le_bytes());
        assert_eq!(&bytes[4..8], &(-2.0f32).to_le_bytes());
        assert_eq!(&bytes[8..12], &0.5f32.to_le_bytes());
        assert_eq!(&bytes[12..16], &0.25f32.to_le_bytes());
    }

    #[test]
    fn test_frames_concatenate_without_framing() {
        let mut frame = Frame::new();
        frame
            .configure(FrameConfig {
                chirp_count: 2,
                samples_per_chirp: 3,
                channel_count: 1,
            })
            .unwrap();

        let mut bytes = Vec::new();
        write_frame(&mut bytes, &frame).unwrap();
        write_frame(&mut bytes, &frame).unwrap();
        assert_eq!(bytes.len(), 2 * frame.sample_count() * 8);
    }
}
