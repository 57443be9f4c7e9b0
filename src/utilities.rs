//! Small helpers shared by the sampler and metadata code.

use std::time::Duration;

use ffmpeg_next::{Rational, frame::Video as VideoFrame};

/// Packed RGB24 bytes of a scaled frame, with FFmpeg's row padding removed.
pub(crate) fn frame_to_rgb_buffer(video_frame: &VideoFrame, width: u32, height: u32) -> Vec<u8> {
    let stride = video_frame.stride(0);
    let row_length = (width as usize) * 3;
    let data = video_frame.data(0);

    if stride == row_length {
        data[..row_length * (height as usize)].to_vec()
    } else {
        let mut buffer = Vec::with_capacity(row_length * (height as usize));
        for row in 0..(height as usize) {
            let row_start = row * stride;
            buffer.extend_from_slice(&data[row_start..row_start + row_length]);
        }
        buffer
    }
}

/// Convert a rational frame rate to frames per second.
///
/// Returns `None` for a zero denominator or a non-positive rate.
pub(crate) fn rational_to_fps(rate: Rational) -> Option<f64> {
    if rate.denominator() == 0 {
        return None;
    }
    let fps = rate.numerator() as f64 / rate.denominator() as f64;
    (fps > 0.0).then_some(fps)
}

/// Frames per sampled second: `round(fps)`, minimum 1.
///
/// Non-finite or non-positive rates fall back to 1 so that every decoded
/// frame is kept rather than none.
pub(crate) fn sample_interval(frames_per_second: f64) -> u64 {
    if !frames_per_second.is_finite() || frames_per_second <= 0.0 {
        return 1;
    }
    (frames_per_second.round() as u64).max(1)
}

/// Serialize a [`Duration`] as fractional seconds.
pub(crate) fn serialize_seconds<S: serde::Serializer>(
    duration: &Duration,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}
