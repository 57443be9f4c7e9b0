//! Video metadata.
//!
//! [`VideoMetadata`] is read once when a decode session is opened and handed
//! to progress observers and the CLI's `probe` command.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::time::Duration;

use serde::Serialize;

/// Metadata for the best video stream of a container.
///
/// Includes dimensions, nominal frame rate, estimated frame count, duration,
/// and codec name.
///
/// # Example
///
/// ```no_run
/// use secondsight::FrameSampler;
///
/// let metadata = FrameSampler::new().probe("input.mp4").unwrap();
/// println!("{:.2} fps over {:?}", metadata.frames_per_second, metadata.duration);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[must_use]
pub struct VideoMetadata {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Nominal frames per second. `0.0` when the stream reports no rate.
    pub frames_per_second: f64,
    /// Estimated total number of frames, computed from duration and frame rate.
    pub frame_count: u64,
    /// Container duration.
    #[serde(serialize_with = "crate::utilities::serialize_seconds", rename = "duration_seconds")]
    pub duration: Duration,
    /// Codec name (e.g. `"h264"`, `"mpeg4"`).
    pub codec: String,
}

impl VideoMetadata {
    /// Number of decoded frames between two retained samples.
    ///
    /// This is the nominal frame rate rounded to the nearest integer, never
    /// less than 1 (29.97 fps samples every 30th frame).
    pub fn sample_interval(&self) -> u64 {
        crate::utilities::sample_interval(self.frames_per_second)
    }

    /// How many frames the sampler is expected to retain.
    ///
    /// This is an estimate: containers may report a frame count that differs
    /// from what actually decodes.
    pub fn expected_samples(&self) -> u64 {
        self.frame_count.div_ceil(self.sample_interval())
    }
}

impl Display for VideoMetadata {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "{}x{} {} @ {:.2} fps, ~{} frames, {:.2}s",
            self.width,
            self.height,
            self.codec,
            self.frames_per_second,
            self.frame_count,
            self.duration.as_secs_f64(),
        )
    }
}
