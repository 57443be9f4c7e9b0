//! JPEG encoding of sampled frames.
//!
//! Frames are encoded lossily at a fixed quality so that identical input
//! always produces identical bytes. [`EncodedFrame`] also exposes the
//! base64 data URL the inference adapter uploads.

use std::borrow::Cow;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType, RgbImage};

use crate::configuration::PipelineOptions;
use crate::error::SecondSightError;
use crate::progress::{ProgressTracker, Stage};
use crate::sampler::SampledFrame;

/// Default JPEG quality.
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// A JPEG-encoded frame ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame {
    /// Sampled second of the source frame.
    pub second: u64,
    /// JPEG bytes.
    pub bytes: Vec<u8>,
    /// Source width in pixels.
    pub width: u32,
    /// Source height in pixels.
    pub height: u32,
}

impl EncodedFrame {
    /// The JPEG bytes as standard base64.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    /// A `data:image/jpeg;base64,...` URL.
    pub fn to_data_url(&self) -> String {
        format!("data:image/jpeg;base64,{}", self.to_base64())
    }

    /// Size of the uploaded base64 payload in KiB.
    pub fn size_estimate_kb(&self) -> f64 {
        self.bytes.len().div_ceil(3) as f64 * 4.0 / 1024.0
    }
}

/// Encodes frames to JPEG at a fixed quality.
#[derive(Debug, Clone, Copy)]
pub struct FrameEncoder {
    quality: u8,
}

impl Default for FrameEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameEncoder {
    /// Create an encoder at [`DEFAULT_JPEG_QUALITY`].
    pub fn new() -> Self {
        Self {
            quality: DEFAULT_JPEG_QUALITY,
        }
    }

    /// Use a different quality, clamped to 1–100.
    #[must_use]
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality.clamp(1, 100);
        self
    }

    /// The configured quality.
    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Encode one frame.
    ///
    /// # Errors
    ///
    /// [`SecondSightError::ImageError`] if the JPEG encoder rejects the
    /// pixels, which does not happen for frames produced by the sampler.
    pub fn encode(&self, frame: &SampledFrame) -> Result<EncodedFrame, SecondSightError> {
        let rgb: Cow<'_, RgbImage> = match &frame.image {
            DynamicImage::ImageRgb8(rgb) => Cow::Borrowed(rgb),
            other => Cow::Owned(other.to_rgb8()),
        };

        let mut bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut bytes, self.quality).encode(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            ExtendedColorType::Rgb8,
        )?;

        Ok(EncodedFrame {
            second: frame.second,
            bytes,
            width: rgb.width(),
            height: rgb.height(),
        })
    }

    /// Encode a batch, preserving second order.
    ///
    /// With the `rayon` feature the batch is spread across the rayon pool.
    pub fn encode_all(
        &self,
        frames: &[SampledFrame],
        options: &PipelineOptions,
    ) -> Result<Vec<EncodedFrame>, SecondSightError> {
        let mut tracker = ProgressTracker::new(
            options.progress.clone(),
            Stage::Encoding,
            Some(frames.len() as u64),
            options.batch_size,
        );

        #[cfg(feature = "rayon")]
        let encoded = {
            let encoded = crate::rayon::parallel_encode(self, frames)?;
            for frame in &encoded {
                tracker.advance(Some(frame.second));
            }
            encoded
        };

        #[cfg(not(feature = "rayon"))]
        let encoded = {
            let mut encoded = Vec::with_capacity(frames.len());
            for frame in frames {
                encoded.push(self.encode(frame)?);
                tracker.advance(Some(frame.second));
            }
            encoded
        };

        tracker.finish();

        let total_kb: f64 = encoded.iter().map(EncodedFrame::size_estimate_kb).sum();
        log::debug!(
            "Encoded {} frame(s) at quality {} ({total_kb:.1} KiB of base64)",
            encoded.len(),
            self.quality,
        );

        Ok(encoded)
    }
}
