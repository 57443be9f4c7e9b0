//! Frame sampling.
//!
//! [`FrameSampler`] opens a video, decodes it front to back, and keeps one
//! frame per second of timeline: every `round(fps)`-th decoded frame,
//! 0-indexed, tagged with its ordinal sample index as the second. Decoding is
//! strictly sequential; no seeking is involved, so the sample count depends
//! only on the number of frames that actually decode.
//!
//! The decode session lives in a [`VideoHandle`]. Sampling consumes the
//! handle, so the demuxer and decoder are closed when sampling returns,
//! whether it succeeds, fails, or is cancelled.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ffmpeg_next::{
    codec::{context::Context as CodecContext, decoder::Video as VideoDecoder},
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::{DynamicImage, RgbImage};

use crate::configuration::PipelineOptions;
use crate::error::SecondSightError;
use crate::metadata::VideoMetadata;
use crate::progress::{PipelineEvent, ProgressTracker, Stage};
use crate::utilities;

/// One retained frame.
#[derive(Debug, Clone)]
pub struct SampledFrame {
    /// Ordinal sample index, which is the frame's position in seconds.
    pub second: u64,
    /// Decoded RGB pixels.
    pub image: DynamicImage,
}

/// Everything a sampling pass produced.
#[derive(Debug, Clone)]
pub struct SampledVideo {
    /// Retained frames, ascending by second.
    pub frames: Vec<SampledFrame>,
    /// Metadata of the sampled stream.
    pub metadata: VideoMetadata,
}

impl SampledVideo {
    /// Nominal frame rate of the sampled stream.
    pub fn frames_per_second(&self) -> f64 {
        self.metadata.frames_per_second
    }
}

/// An open decode session over the best video stream of a container.
///
/// Dropping the handle closes the decoder and the demuxer.
pub struct VideoHandle {
    path: PathBuf,
    input: Input,
    stream_index: usize,
    decoder: VideoDecoder,
    metadata: VideoMetadata,
}

impl VideoHandle {
    /// Open a video file and prepare a decoder for its best video stream.
    ///
    /// # Errors
    ///
    /// - [`SecondSightError::FileOpen`] if the container cannot be opened or
    ///   the video codec cannot be initialised.
    /// - [`SecondSightError::NoVideoStream`] if the container has no video.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SecondSightError> {
        let path = path.as_ref().to_path_buf();

        log::debug!("Opening video: {}", path.display());

        ffmpeg_next::init().map_err(|error| SecondSightError::FileOpen {
            path: path.clone(),
            reason: format!("FFmpeg initialisation failed: {error}"),
        })?;

        let input = ffmpeg_next::format::input(&path).map_err(|error| {
            SecondSightError::FileOpen {
                path: path.clone(),
                reason: error.to_string(),
            }
        })?;

        let container_duration = if input.duration() > 0 {
            Duration::from_micros(input.duration() as u64)
        } else {
            Duration::ZERO
        };

        let (stream_index, decoder, metadata) = {
            let stream = input
                .streams()
                .best(Type::Video)
                .ok_or(SecondSightError::NoVideoStream)?;

            let decoder = CodecContext::from_parameters(stream.parameters())
                .and_then(|context| context.decoder().video())
                .map_err(|error| SecondSightError::FileOpen {
                    path: path.clone(),
                    reason: format!("Failed to create video decoder: {error}"),
                })?;

            let frames_per_second = utilities::rational_to_fps(stream.avg_frame_rate())
                .or_else(|| utilities::rational_to_fps(stream.rate()))
                .unwrap_or(0.0);

            let duration = if container_duration > Duration::ZERO {
                container_duration
            } else {
                let time_base = stream.time_base();
                let seconds = stream.duration().max(0) as f64 * time_base.numerator() as f64
                    / f64::from(time_base.denominator().max(1));
                Duration::from_secs_f64(seconds)
            };

            let frame_count = if stream.frames() > 0 {
                stream.frames() as u64
            } else {
                (duration.as_secs_f64() * frames_per_second) as u64
            };

            let codec = decoder
                .codec()
                .map(|codec| codec.name().to_string())
                .unwrap_or_else(|| "unknown".to_string());

            let metadata = VideoMetadata {
                width: decoder.width(),
                height: decoder.height(),
                frames_per_second,
                frame_count,
                duration,
                codec,
            };

            (stream.index(), decoder, metadata)
        };

        log::debug!(
            "Opened {}: stream {}, {}",
            path.display(),
            stream_index,
            metadata,
        );

        Ok(Self {
            path,
            input,
            stream_index,
            decoder,
            metadata,
        })
    }

    /// Metadata of the selected video stream.
    pub fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    /// Path the handle was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Decode the whole stream and keep one frame per second.
    ///
    /// Consumes the handle; the session is released on return. A stream
    /// that decodes no frames yields an empty list.
    ///
    /// # Errors
    ///
    /// - [`SecondSightError::Cancelled`] if the options' token fires.
    /// - [`SecondSightError::VideoDecodeError`] or
    ///   [`SecondSightError::FfmpegError`] on decoder failure.
    pub fn sample(self, options: &PipelineOptions) -> Result<Vec<SampledFrame>, SecondSightError> {
        let mut frames = Vec::with_capacity(capacity_hint(&self.metadata));
        self.sample_each(options, |frame| {
            frames.push(frame);
            Ok(())
        })?;
        Ok(frames)
    }

    /// Decode the whole stream and hand each retained frame to `sink` as
    /// soon as it is converted, in second order.
    ///
    /// Nothing is buffered between frames, so callers that encode or upload
    /// inside `sink` hold at most one decoded image at a time. Returns the
    /// number of frames retained. An error from `sink` stops decoding and is
    /// returned unchanged.
    ///
    /// # Errors
    ///
    /// Same as [`sample`](VideoHandle::sample), plus whatever `sink` returns.
    pub fn sample_each<F>(self, options: &PipelineOptions, sink: F) -> Result<u64, SecondSightError>
    where
        F: FnMut(SampledFrame) -> Result<(), SecondSightError>,
    {
        let VideoHandle {
            path,
            mut input,
            stream_index,
            mut decoder,
            metadata,
        } = self;

        let interval = metadata.sample_interval();
        let total = (metadata.frame_count > 0).then_some(metadata.frame_count);
        let tracker = ProgressTracker::new(
            options.progress.clone(),
            Stage::Sampling,
            total,
            options.batch_size,
        );
        tracker.event(PipelineEvent::SamplingStarted {
            metadata: metadata.clone(),
        });

        log::info!(
            "Sampling {} ({:.2} fps, keeping every {} frame(s))",
            path.display(),
            metadata.frames_per_second,
            interval,
        );

        let mut selector = FrameSelector {
            scaler: None,
            rgb_frame: VideoFrame::empty(),
            interval,
            decoded: 0,
            retained: 0,
            sink,
            tracker,
            options,
        };

        let mut decoded_frame = VideoFrame::empty();

        for (stream, packet) in input.packets() {
            if stream.index() != stream_index {
                continue;
            }

            decoder.send_packet(&packet).map_err(|error| {
                SecondSightError::VideoDecodeError(format!(
                    "Failed to send packet at frame {}: {error}",
                    selector.decoded
                ))
            })?;

            while decoder.receive_frame(&mut decoded_frame).is_ok() {
                selector.accept(&decoded_frame)?;
            }
        }

        decoder.send_eof()?;
        while decoder.receive_frame(&mut decoded_frame).is_ok() {
            selector.accept(&decoded_frame)?;
        }

        let FrameSelector {
            retained,
            mut tracker,
            decoded,
            ..
        } = selector;

        tracker.finish();
        tracker.event(PipelineEvent::SamplingFinished {
            frames: retained as usize,
        });

        log::info!(
            "Sampled {retained} frame(s) from {decoded} decoded in {}",
            path.display(),
        );

        Ok(retained)
    }
}

/// Upper bound on the frames pre-allocated from container metadata.
///
/// Frame counts come from the header and may be garbage.
const MAX_PREALLOCATED_SAMPLES: u64 = 1024;

fn capacity_hint(metadata: &VideoMetadata) -> usize {
    metadata.expected_samples().min(MAX_PREALLOCATED_SAMPLES) as usize
}

/// Scaler source geometry: pixel format, width, height.
type SourceShape = (Pixel, u32, u32);

/// Keeps every `interval`-th decoded frame and passes it on.
struct FrameSelector<'a, F> {
    /// Built from the first retained frame and rebuilt if the source shape
    /// changes mid-stream.
    scaler: Option<(SourceShape, ScalingContext)>,
    rgb_frame: VideoFrame,
    interval: u64,
    decoded: u64,
    retained: u64,
    sink: F,
    tracker: ProgressTracker,
    options: &'a PipelineOptions,
}

impl<F> FrameSelector<'_, F>
where
    F: FnMut(SampledFrame) -> Result<(), SecondSightError>,
{
    fn accept(&mut self, decoded_frame: &VideoFrame) -> Result<(), SecondSightError> {
        if self.options.is_cancelled() {
            return Err(SecondSightError::Cancelled);
        }

        if self.decoded % self.interval == 0 {
            let second = self.retained;
            let image = self.convert(decoded_frame)?;
            (self.sink)(SampledFrame { second, image })?;
            self.retained += 1;
        }

        self.decoded += 1;
        let latest = self.retained.checked_sub(1);
        self.tracker.advance(latest);
        Ok(())
    }

    fn convert(&mut self, decoded_frame: &VideoFrame) -> Result<DynamicImage, SecondSightError> {
        let shape = (
            decoded_frame.format(),
            decoded_frame.width(),
            decoded_frame.height(),
        );
        let (_, width, height) = shape;
        if width == 0 || height == 0 {
            return Err(SecondSightError::VideoDecodeError(format!(
                "Decoded frame {} has invalid dimensions {width}x{height}",
                self.decoded
            )));
        }

        let scaler = match &mut self.scaler {
            Some((current, scaler)) if *current == shape => scaler,
            slot => {
                if slot.is_some() {
                    log::debug!("Source changed to {width}x{height} at frame {}", self.decoded);
                    self.rgb_frame = VideoFrame::empty();
                }
                let scaler = ScalingContext::get(
                    shape.0,
                    width,
                    height,
                    Pixel::RGB24,
                    width,
                    height,
                    ScalingFlags::BILINEAR,
                )?;
                &mut slot.insert((shape, scaler)).1
            }
        };

        scaler.run(decoded_frame, &mut self.rgb_frame)?;
        convert_frame_to_image(&self.rgb_frame, width, height)
    }
}

/// Convert a scaled RGB24 video frame to an [`image::DynamicImage`].
fn convert_frame_to_image(
    rgb_frame: &VideoFrame,
    width: u32,
    height: u32,
) -> Result<DynamicImage, SecondSightError> {
    let buffer = utilities::frame_to_rgb_buffer(rgb_frame, width, height);
    let rgb_image = RgbImage::from_raw(width, height, buffer).ok_or_else(|| {
        SecondSightError::VideoDecodeError(
            "Failed to construct RGB image from decoded frame data".to_string(),
        )
    })?;
    Ok(DynamicImage::ImageRgb8(rgb_image))
}

/// Samples one frame per second from video files.
///
/// # Example
///
/// ```no_run
/// use secondsight::FrameSampler;
///
/// let sampled = FrameSampler::new().sample("input.mp4")?;
/// for frame in &sampled.frames {
///     println!("second {}: {}x{}", frame.second, frame.image.width(), frame.image.height());
/// }
/// # Ok::<(), secondsight::SecondSightError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct FrameSampler {
    options: PipelineOptions,
}

impl FrameSampler {
    /// Create a sampler with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a sampler that reports to the options' observer and honours
    /// their cancellation token.
    pub fn with_options(options: PipelineOptions) -> Self {
        Self { options }
    }

    /// Read a video's metadata without decoding any frames.
    pub fn probe<P: AsRef<Path>>(&self, path: P) -> Result<VideoMetadata, SecondSightError> {
        let handle = VideoHandle::open(path)?;
        Ok(handle.metadata().clone())
    }

    /// Decode `path` and keep one frame per second.
    ///
    /// A video with no decodable frames yields an empty frame list.
    pub fn sample<P: AsRef<Path>>(&self, path: P) -> Result<SampledVideo, SecondSightError> {
        let handle = VideoHandle::open(path)?;
        let metadata = handle.metadata().clone();
        let frames = handle.sample(&self.options)?;
        Ok(SampledVideo { frames, metadata })
    }
}
