//! End-to-end video analysis.
//!
//! [`VideoAnalyzer`] wires the stages together: sample and encode frame by
//! frame on a blocking thread, fan the frames out to the inference client,
//! summarize, and persist. All configuration is explicit; the analyzer owns its client
//! and options and reads no process-wide state.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::configuration::{InferenceConfig, PipelineOptions};
use crate::dispatch::Dispatcher;
use crate::encoder::{EncodedFrame, FrameEncoder};
use crate::error::SecondSightError;
use crate::format::{SUPPORTED_FORMATS, is_supported_video_format};
use crate::inference::{InferenceClient, OpenAiClient};
use crate::metadata::VideoMetadata;
use crate::progress::PipelineEvent;
use crate::record::BatchResult;
use crate::report::{self, RunSummary};
use crate::sampler::VideoHandle;

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    /// Metadata of the analyzed stream.
    pub metadata: VideoMetadata,
    /// One result per sampled second.
    pub batch: BatchResult,
    /// Counts, timing and cost.
    pub summary: RunSummary,
    /// Where records were written, if persistence is enabled and succeeded.
    pub saved_to: Option<PathBuf>,
    /// Why persistence failed, if it did. The run itself still succeeded.
    pub persistence_error: Option<String>,
}

/// Analyzes videos one frame per second.
///
/// # Example
///
/// ```no_run
/// use secondsight::{DEFAULT_PROMPT, InferenceConfig, PipelineOptions, VideoAnalyzer};
///
/// # async fn run() -> Result<(), secondsight::SecondSightError> {
/// let analyzer = VideoAnalyzer::from_config(
///     InferenceConfig::from_env()?,
///     PipelineOptions::new().with_concurrency_limit(5),
/// )?;
/// let outcome = analyzer.analyze("input.mp4", DEFAULT_PROMPT).await?;
/// println!("{}", outcome.summary);
/// # Ok(())
/// # }
/// ```
pub struct VideoAnalyzer {
    client: Arc<dyn InferenceClient>,
    options: PipelineOptions,
    encoder: FrameEncoder,
}

impl VideoAnalyzer {
    /// Create an analyzer around any inference client.
    ///
    /// # Errors
    ///
    /// [`SecondSightError::InvalidConcurrency`] if the options' limit is 0.
    pub fn new(
        client: Arc<dyn InferenceClient>,
        options: PipelineOptions,
    ) -> Result<Self, SecondSightError> {
        options.validate()?;
        Ok(Self {
            client,
            options,
            encoder: FrameEncoder::new(),
        })
    }

    /// Create an analyzer backed by [`OpenAiClient`].
    pub fn from_config(
        config: InferenceConfig,
        options: PipelineOptions,
    ) -> Result<Self, SecondSightError> {
        Self::new(Arc::new(OpenAiClient::new(config)?), options)
    }

    /// Use a differently configured JPEG encoder.
    #[must_use]
    pub fn with_encoder(mut self, encoder: FrameEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Run the whole pipeline on `video_path` with `template` as the prompt.
    ///
    /// Per-frame failures never fail the run; they show up in the batch and
    /// the summary. A persistence failure is logged and reported in
    /// [`AnalysisOutcome::persistence_error`].
    ///
    /// # Errors
    ///
    /// - [`SecondSightError::FileOpen`] or [`SecondSightError::NoVideoStream`]
    ///   if the video cannot be opened.
    /// - [`SecondSightError::Cancelled`] if cancelled while sampling.
    /// - [`SecondSightError::TaskFailed`] if the sampling thread panics.
    pub async fn analyze<P: AsRef<Path>>(
        &self,
        video_path: P,
        template: &str,
    ) -> Result<AnalysisOutcome, SecondSightError> {
        let started = Instant::now();
        let video_path = video_path.as_ref().to_path_buf();

        if !video_path.is_file() {
            return Err(SecondSightError::FileOpen {
                path: video_path,
                reason: "file not found".to_string(),
            });
        }

        if !is_supported_video_format(&video_path) {
            log::warn!(
                "{} is not one of the commonly supported formats ({}); attempting anyway",
                video_path.display(),
                SUPPORTED_FORMATS.join(", "),
            );
        }

        let (metadata, encoded) = self.sample_and_encode(video_path.clone()).await?;

        let dispatcher = Dispatcher::new(Arc::clone(&self.client), self.options.clone())?;
        let batch = dispatcher.dispatch(encoded, template).await;

        let (saved_to, persistence_error) = match self.options.output_dir() {
            Some(output_dir) => match report::persist(&batch, &video_path, output_dir) {
                Ok(path) => {
                    self.options.progress.on_event(&PipelineEvent::ResultsSaved {
                        path: path.clone(),
                    });
                    (Some(path), None)
                }
                Err(error) => {
                    log::warn!("{error}");
                    (None, Some(error.to_string()))
                }
            },
            None => (None, None),
        };

        let summary = RunSummary::from_batch(&batch, started.elapsed());
        log::info!(
            "Finished {}: {}/{} frame(s) analyzed in {:.2}s",
            video_path.display(),
            summary.successful,
            summary.total_frames,
            summary.total_elapsed.as_secs_f64(),
        );

        Ok(AnalysisOutcome {
            metadata,
            batch,
            summary,
            saved_to,
            persistence_error,
        })
    }

    /// Decode and JPEG-encode on the blocking pool.
    ///
    /// Each retained frame is encoded as soon as it is decoded and its pixels
    /// dropped, so memory grows with the JPEG sizes rather than the raw
    /// frames. The decode session is released before any inference starts.
    async fn sample_and_encode(
        &self,
        video_path: PathBuf,
    ) -> Result<(VideoMetadata, Vec<EncodedFrame>), SecondSightError> {
        let options = self.options.clone();
        let encoder = self.encoder;

        tokio::task::spawn_blocking(move || {
            let handle = VideoHandle::open(&video_path)?;
            let metadata = handle.metadata().clone();

            let mut encoded = Vec::new();
            handle.sample_each(&options, |frame| {
                encoded.push(encoder.encode(&frame)?);
                Ok(())
            })?;

            let total_kb: f64 = encoded.iter().map(EncodedFrame::size_estimate_kb).sum();
            log::debug!(
                "Encoded {} frame(s) at quality {} ({total_kb:.1} KiB of base64)",
                encoded.len(),
                encoder.quality(),
            );
            Ok((metadata, encoded))
        })
        .await
        .map_err(|error| SecondSightError::TaskFailed(error.to_string()))?
    }
}
