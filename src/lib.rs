//! # secondsight
//!
//! Per-second activity classification for videos.
//!
//! `secondsight` decodes a video, keeps one frame per second of timeline,
//! sends each frame to a vision-capable language model with a
//! classification prompt, and reconciles the replies into an ordered list of
//! [`ActivityRecord`]s: one per second, validated against a fixed schema,
//! with partial failures reported rather than hidden.
//!
//! ## Quick Start
//!
//! ```no_run
//! use secondsight::{DEFAULT_PROMPT, InferenceConfig, PipelineOptions, VideoAnalyzer};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), secondsight::SecondSightError> {
//! let analyzer = VideoAnalyzer::from_config(
//!     InferenceConfig::from_env()?,
//!     PipelineOptions::new().with_concurrency_limit(5),
//! )?;
//!
//! let outcome = analyzer.analyze("input.mp4", DEFAULT_PROMPT).await?;
//! for result in &outcome.batch {
//!     match result.record() {
//!         Some(record) => println!("{}s: {}", record.second, record.overall_action),
//!         None => println!("{}s: failed ({})", result.second, result.error().unwrap_or("")),
//!     }
//! }
//! println!("{}", outcome.summary);
//! # Ok(())
//! # }
//! ```
//!
//! ## Stages
//!
//! - **Sampling**: [`FrameSampler`] decodes sequentially with FFmpeg and
//!   keeps every `round(fps)`-th frame.
//! - **Encoding**: [`FrameEncoder`] turns frames into fixed-quality JPEG.
//! - **Inference**: an [`InferenceClient`] (by default [`OpenAiClient`])
//!   answers one image and prompt with raw text.
//! - **Parsing**: [`parse_activity`] recovers JSON from prose or code
//!   fences and coerces it into an [`ActivityRecord`].
//! - **Dispatch**: [`Dispatcher`] runs inference for all frames with a
//!   bounded number of calls in flight and isolates failures per frame.
//! - **Reporting**: [`RunSummary`] and [`persist`] summarize and save.
//!
//! ### Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `rayon` | JPEG-encode sampled frames across rayon threads |
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on the build machine.

pub mod configuration;
pub mod dispatch;
pub mod encoder;
pub mod error;
pub mod ffmpeg;
pub mod format;
pub mod inference;
pub mod metadata;
pub mod parse;
pub mod pipeline;
pub mod progress;
pub mod prompt;
#[cfg(feature = "rayon")]
mod rayon;
pub mod record;
pub mod report;
pub mod sampler;
mod utilities;

pub use configuration::{
    DEFAULT_BASE_URL, DEFAULT_CONCURRENCY_LIMIT, DEFAULT_MODEL, DEFAULT_OUTPUT_DIR,
    InferenceConfig, PipelineOptions,
};
pub use dispatch::{CANCELLED_BEFORE_DISPATCH, Dispatcher, analyze_frame};
pub use encoder::{DEFAULT_JPEG_QUALITY, EncodedFrame, FrameEncoder};
pub use error::{InferenceError, SecondSightError};
pub use ffmpeg::{FfmpegLogLevel, set_ffmpeg_log_level};
pub use format::{SUPPORTED_FORMATS, ensure_supported, is_supported_video_format};
pub use inference::{InferenceClient, InferenceReply, OpenAiClient};
pub use metadata::VideoMetadata;
pub use parse::{
    PARSE_FAILURE, extract_json_candidate, parse_activity, parse_json_from_response,
    validate_record,
};
pub use pipeline::{AnalysisOutcome, VideoAnalyzer};
pub use progress::{CancellationToken, PipelineEvent, ProgressCallback, ProgressInfo, Stage};
pub use prompt::{DEFAULT_PROMPT, SECOND_PLACEHOLDER, build_prompt};
pub use record::{
    ActivityRecord, AggregateStatus, BatchResult, FrameAggregate, FrameOutcome, FrameResult,
    OverallAction,
};
pub use report::{RunSummary, estimate_cost, output_path_for, persist};
pub use sampler::{FrameSampler, SampledFrame, SampledVideo, VideoHandle};
