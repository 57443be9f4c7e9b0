//! Run observation and cooperative cancellation.
//!
//! The pipeline never prints. Hosts observe a run through a
//! [`ProgressCallback`], which receives throttled [`ProgressInfo`] snapshots
//! for each [`Stage`] and discrete [`PipelineEvent`] checkpoints. A
//! [`CancellationToken`] stops sampling early and keeps unstarted frames from
//! being sent for inference.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use secondsight::{PipelineEvent, PipelineOptions, ProgressCallback, ProgressInfo};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         if let Some(done) = info.percentage {
//!             println!("{:?}: {done:.0}%", info.stage);
//!         }
//!     }
//!
//!     fn on_event(&self, event: &PipelineEvent) {
//!         println!("{event:?}");
//!     }
//! }
//!
//! let options = PipelineOptions::new().with_progress(Arc::new(PrintProgress));
//! ```

use std::path::PathBuf;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::{Duration, Instant};

use crate::metadata::VideoMetadata;

/// The pipeline stage a progress snapshot belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Stage {
    /// Decoding the video and retaining one frame per second.
    Sampling,
    /// JPEG-encoding the retained frames.
    Encoding,
    /// Running inference and parsing for each frame.
    Analysis,
}

/// A snapshot of stage progress.
///
/// Delivered to [`ProgressCallback::on_progress`] at a cadence controlled
/// by [`PipelineOptions::with_batch_size`](crate::PipelineOptions::with_batch_size).
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Which stage is reporting.
    pub stage: Stage,
    /// Units completed so far (decoded frames while sampling, frames otherwise).
    pub current: u64,
    /// Total units expected, if known ahead of time.
    pub total: Option<u64>,
    /// Completion percentage (0.0 – 100.0), if `total` is known.
    pub percentage: Option<f32>,
    /// Wall-clock time elapsed since the stage started.
    pub elapsed: Duration,
    /// Estimated time remaining, based on current throughput.
    pub estimated_remaining: Option<Duration>,
    /// The sampled second most recently handled, when applicable.
    pub current_second: Option<u64>,
}

/// Discrete checkpoints of a run.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum PipelineEvent {
    /// The decode session is open.
    SamplingStarted {
        /// Metadata of the stream being sampled.
        metadata: VideoMetadata,
    },
    /// The decode session was consumed and released.
    SamplingFinished {
        /// Number of frames retained.
        frames: usize,
    },
    /// One frame's inference and parsing finished, in completion order.
    FrameAnalyzed {
        /// Sampled second of the frame.
        second: u64,
        /// Whether a record was produced.
        success: bool,
        /// Time spent in the inference call.
        elapsed: Duration,
    },
    /// Every frame has a result.
    AnalysisFinished {
        /// Frames that produced a record.
        successful: usize,
        /// Frames that failed.
        failed: usize,
    },
    /// Successful records were written to disk.
    ResultsSaved {
        /// Destination file.
        path: PathBuf,
    },
}

/// Trait for observing a run.
///
/// Implementations must be [`Send`] and [`Sync`] because callbacks are
/// invoked from blocking worker threads and from the async dispatch loop.
///
/// Callbacks are **infallible**: they observe but cannot halt the run. Use
/// [`CancellationToken`] for cooperative cancellation.
pub trait ProgressCallback: Send + Sync {
    /// Called at regular intervals while a stage runs.
    fn on_progress(&self, info: &ProgressInfo);

    /// Called at each pipeline checkpoint. Ignored by default.
    fn on_event(&self, _event: &PipelineEvent) {}
}

/// Discards all notifications. The default observer.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Shared stop flag for a run.
///
/// Clone this token and share it between threads; call
/// [`cancel`](CancellationToken::cancel) from any thread to stop the run.
/// The sampler checks it between decoded frames and the dispatcher checks it
/// before starting each inference call.
///
/// # Example
///
/// ```
/// use secondsight::CancellationToken;
///
/// let token = CancellationToken::new();
/// let shared = token.clone();
///
/// token.cancel();
/// assert!(shared.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// A token that has not been cancelled.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation.
    ///
    /// Every clone sees the request.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// `true` once any clone has called [`cancel`](CancellationToken::cancel).
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracks stage timing and emits throttled snapshots.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    stage: Stage,
    total: Option<u64>,
    current: u64,
    batch_size: u64,
    start_time: Instant,
    since_last_report: u64,
}

impl ProgressTracker {
    pub(crate) fn new(
        callback: Arc<dyn ProgressCallback>,
        stage: Stage,
        total: Option<u64>,
        batch_size: u64,
    ) -> Self {
        Self {
            callback,
            stage,
            total,
            current: 0,
            batch_size: batch_size.max(1),
            start_time: Instant::now(),
            since_last_report: 0,
        }
    }

    /// Record one completed unit and report if the batch threshold is reached.
    pub(crate) fn advance(&mut self, second: Option<u64>) {
        self.current += 1;
        self.since_last_report += 1;

        if self.since_last_report >= self.batch_size {
            self.report(second);
            self.since_last_report = 0;
        }
    }

    /// Unconditionally emit a final snapshot.
    pub(crate) fn finish(&mut self) {
        // Estimated totals are replaced by the real count once a stage ends.
        self.total = Some(self.current);
        self.report(None);
    }

    pub(crate) fn event(&self, event: PipelineEvent) {
        self.callback.on_event(&event);
    }

    fn report(&self, second: Option<u64>) {
        let elapsed = self.start_time.elapsed();

        let percentage = self
            .total
            .filter(|&total| total > 0)
            .map(|total| ((self.current as f32 / total as f32) * 100.0).min(100.0));

        let estimated_remaining = if self.current > 0 {
            self.total.map(|total| {
                let remaining = total.saturating_sub(self.current);
                elapsed.div_f64(self.current as f64).mul_f64(remaining as f64)
            })
        } else {
            None
        };

        let info = ProgressInfo {
            stage: self.stage,
            current: self.current,
            total: self.total,
            percentage,
            elapsed,
            estimated_remaining,
            current_second: second,
        };

        self.callback.on_progress(&info);
    }
}
