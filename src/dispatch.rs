//! Bounded-parallel frame analysis.
//!
//! [`Dispatcher`] runs inference and parsing for every encoded frame with at
//! most `concurrency_limit` calls in flight. Each frame's failure (transport
//! error, unparseable reply, panicking task) is captured in that frame's
//! [`FrameResult`]; siblings keep running. Results come back in completion
//! order and are sorted by second before the batch is returned, so the batch
//! always has exactly one result per frame.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::configuration::PipelineOptions;
use crate::encoder::EncodedFrame;
use crate::error::SecondSightError;
use crate::inference::{InferenceClient, InferenceReply};
use crate::parse::{PARSE_FAILURE, parse_activity};
use crate::progress::{PipelineEvent, ProgressTracker, Stage};
use crate::prompt::build_prompt;
use crate::record::{BatchResult, FrameResult};

/// Failure text for frames skipped after cancellation.
pub const CANCELLED_BEFORE_DISPATCH: &str = "Analysis cancelled before dispatch";

/// Analyze one frame: build its prompt, call the model once, parse the reply.
///
/// Never fails; every problem becomes a failed [`FrameResult`].
pub async fn analyze_frame(
    client: &dyn InferenceClient,
    frame: &EncodedFrame,
    template: &str,
) -> FrameResult {
    let prompt = build_prompt(template, frame.second);
    let started = Instant::now();
    let reply = client.analyze(frame, &prompt).await;
    let elapsed = started.elapsed();

    match reply {
        Ok(InferenceReply { text, tokens_used }) => match parse_activity(&text, frame.second) {
            Some(record) => FrameResult::analyzed(record, text, elapsed, tokens_used),
            None => {
                log::warn!("Second {}: {PARSE_FAILURE}", frame.second);
                FrameResult::failed(frame.second, PARSE_FAILURE, text, elapsed, tokens_used)
            }
        },
        Err(error) => {
            log::warn!("Second {}: inference failed: {error}", frame.second);
            FrameResult::failed(
                frame.second,
                error.to_string(),
                format!("Error analyzing frame: {error}"),
                elapsed,
                None,
            )
        }
    }
}

/// Fans frames out to an [`InferenceClient`] under a concurrency bound.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
///
/// use secondsight::{DEFAULT_PROMPT, Dispatcher, InferenceConfig, OpenAiClient, PipelineOptions};
///
/// # async fn run(frames: Vec<secondsight::EncodedFrame>) -> Result<(), secondsight::SecondSightError> {
/// let client = Arc::new(OpenAiClient::new(InferenceConfig::from_env()?)?);
/// let dispatcher = Dispatcher::new(client, PipelineOptions::new().with_concurrency_limit(3))?;
/// let batch = dispatcher.dispatch(frames, DEFAULT_PROMPT).await;
/// println!("{}/{} frames analyzed", batch.successful(), batch.len());
/// # Ok(())
/// # }
/// ```
pub struct Dispatcher {
    client: Arc<dyn InferenceClient>,
    options: PipelineOptions,
}

impl Dispatcher {
    /// Create a dispatcher.
    ///
    /// # Errors
    ///
    /// [`SecondSightError::InvalidConcurrency`] if the limit is below 1.
    pub fn new(
        client: Arc<dyn InferenceClient>,
        options: PipelineOptions,
    ) -> Result<Self, SecondSightError> {
        options.validate()?;
        Ok(Self { client, options })
    }

    /// Analyze every frame and return one result per frame, sorted by second.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn dispatch(&self, frames: Vec<EncodedFrame>, template: &str) -> BatchResult {
        let total = frames.len();
        if total == 0 {
            return BatchResult::default();
        }

        let limit = self.options.concurrency_limit;
        log::info!("Analyzing {total} frame(s) with up to {limit} concurrent call(s)");

        let semaphore = Arc::new(Semaphore::new(limit));
        let template: Arc<str> = Arc::from(template);
        let mut tasks = JoinSet::new();
        let mut seconds = HashMap::with_capacity(total);

        for frame in frames {
            let second = frame.second;
            let client = Arc::clone(&self.client);
            let semaphore = Arc::clone(&semaphore);
            let template = Arc::clone(&template);
            let cancellation = self.options.cancellation.clone();

            let handle = tasks.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return FrameResult::failed(
                            second,
                            "Dispatcher semaphore closed",
                            String::new(),
                            Duration::ZERO,
                            None,
                        );
                    }
                };

                if cancellation.as_ref().is_some_and(|token| token.is_cancelled()) {
                    return FrameResult::failed(
                        second,
                        CANCELLED_BEFORE_DISPATCH,
                        String::new(),
                        Duration::ZERO,
                        None,
                    );
                }

                analyze_frame(client.as_ref(), &frame, &template).await
            });
            seconds.insert(handle.id(), second);
        }

        let mut tracker = ProgressTracker::new(
            self.options.progress.clone(),
            Stage::Analysis,
            Some(total as u64),
            self.options.batch_size,
        );
        let mut results = Vec::with_capacity(total);

        while let Some(joined) = tasks.join_next_with_id().await {
            let result = match joined {
                Ok((id, result)) => {
                    seconds.remove(&id);
                    result
                }
                Err(error) => {
                    let second = seconds.remove(&error.id()).unwrap_or_default();
                    let reason = if error.is_panic() {
                        "Analysis task panicked"
                    } else {
                        "Analysis task was aborted"
                    };
                    log::error!("Second {second}: {reason}");
                    FrameResult::failed(
                        second,
                        reason,
                        format!("Error analyzing frame: {error}"),
                        Duration::ZERO,
                        None,
                    )
                }
            };

            tracker.advance(Some(result.second));
            tracker.event(PipelineEvent::FrameAnalyzed {
                second: result.second,
                success: result.is_success(),
                elapsed: result.elapsed,
            });
            results.push(result);
        }
        tracker.finish();

        let batch = BatchResult::from_results(results);
        tracker.event(PipelineEvent::AnalysisFinished {
            successful: batch.successful(),
            failed: batch.failed(),
        });

        log::info!(
            "Analysis finished: {} succeeded, {} failed",
            batch.successful(),
            batch.failed(),
        );

        batch
    }
}
