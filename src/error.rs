//! Error types for the `secondsight` crate.
//!
//! [`SecondSightError`] covers failures that end a run (the video cannot be
//! opened, configuration is missing, the output cannot be written).
//! [`InferenceError`] covers failures of a single inference call; those are
//! captured into the frame's [`FrameResult`](crate::FrameResult) and never
//! abort the batch.

use std::{io::Error as IoError, path::PathBuf, time::Duration};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use serde_json::Error as JsonError;
use thiserror::Error;

/// The unified error type for whole-run failures.
///
/// Every public method that can fail returns `Result<T, SecondSightError>`.
/// Variants carry enough context to diagnose the problem without needing
/// additional logging at the call site.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SecondSightError {
    /// The video could not be opened or its container could not be read.
    #[error("Failed to open video at {path}: {reason}")]
    FileOpen {
        /// Path that was passed to the sampler.
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The container has no decodable video stream.
    #[error("No video stream found in file")]
    NoVideoStream,

    /// A video frame could not be decoded or converted.
    #[error("Failed to decode video frame: {0}")]
    VideoDecodeError(String),

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// A required environment variable is missing or empty.
    #[error("Missing configuration: environment variable {variable} is not set")]
    MissingConfiguration {
        /// Name of the variable that was looked up.
        variable: &'static str,
    },

    /// A configuration value was present but unusable.
    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidConfiguration {
        /// Name of the offending setting.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// The concurrency limit must admit at least one in-flight call.
    #[error("Concurrency limit must be at least 1 (got {0})")]
    InvalidConcurrency(usize),

    /// The file extension is not one of the supported containers.
    #[error("Unsupported video format: {0}")]
    UnsupportedFormat(String),

    /// Writing the per-second records failed.
    #[error("Failed to persist results to {path}: {reason}")]
    Persistence {
        /// Destination that could not be written.
        path: PathBuf,
        /// Underlying reason.
        reason: String,
    },

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate during frame conversion or encoding.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),

    /// Serializing records to JSON failed.
    #[error("JSON error: {0}")]
    JsonError(#[from] JsonError),

    /// A blocking worker panicked or was aborted.
    #[error("Background task failed: {0}")]
    TaskFailed(String),

    /// The operation was cancelled via a [`CancellationToken`](crate::CancellationToken).
    #[error("Operation cancelled")]
    Cancelled,
}

impl From<FfmpegError> for SecondSightError {
    fn from(error: FfmpegError) -> Self {
        SecondSightError::FfmpegError(error.to_string())
    }
}

/// Failure of a single inference call.
///
/// Produced by [`InferenceClient`](crate::InferenceClient) implementations.
/// The dispatcher converts it to the failed frame's error text; it is never
/// retried.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum InferenceError {
    /// The request could not be sent or the response could not be read.
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("Inference endpoint returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, as far as it could be read.
        body: String,
    },

    /// The request exceeded the configured timeout.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The response body was not the expected shape.
    #[error("Malformed response body: {0}")]
    InvalidBody(String),

    /// The response carried no message content.
    #[error("Response contained no message content")]
    MissingContent,
}

impl InferenceError {
    /// Classify a transport error, lifting timeouts into their own variant.
    pub(crate) fn from_transport(error: reqwest::Error, timeout: Duration) -> Self {
        if error.is_timeout() {
            InferenceError::Timeout(timeout)
        } else {
            InferenceError::Transport(error)
        }
    }
}
