//! Run summaries and result persistence.
//!
//! [`RunSummary`] condenses a [`BatchResult`] into counts, timing, token
//! usage and an estimated cost. [`persist`] writes the successful records to
//! `<output_dir>/<video stem>.json`.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;

use crate::error::SecondSightError;
use crate::record::{ActivityRecord, BatchResult};

/// Assumed price per 1000 tokens, in US dollars.
pub const COST_PER_THOUSAND_TOKENS: f64 = 0.01;

/// Aggregate statistics for one run.
///
/// Timing and token figures cover successful frames only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    /// Frames sampled (and therefore results in the batch).
    pub total_frames: usize,
    /// Frames that produced a record.
    pub successful: usize,
    /// Frames that did not.
    pub failed: usize,
    /// Sum of inference time over successful frames.
    #[serde(serialize_with = "crate::utilities::serialize_seconds")]
    pub total_api_time: Duration,
    /// Mean inference time over successful frames.
    pub average_api_seconds: Option<f64>,
    /// Tokens reported for successful frames.
    pub total_tokens: u64,
    /// `total_tokens × 0.01 / 1000` US dollars.
    pub estimated_cost_usd: f64,
    /// Wall-clock time of the whole run.
    #[serde(serialize_with = "crate::utilities::serialize_seconds")]
    pub total_elapsed: Duration,
}

impl RunSummary {
    /// Summarize `batch`; `total_elapsed` is the run's wall-clock time.
    pub fn from_batch(batch: &BatchResult, total_elapsed: Duration) -> Self {
        let successes = || batch.results().iter().filter(|r| r.is_success());

        let successful = successes().count();
        let total_api_time: Duration = successes().map(|r| r.elapsed).sum();
        let total_tokens: u64 = successes().filter_map(|r| r.tokens_used).sum();

        let average_api_seconds =
            (successful > 0).then(|| total_api_time.as_secs_f64() / successful as f64);

        Self {
            total_frames: batch.len(),
            successful,
            failed: batch.len() - successful,
            total_api_time,
            average_api_seconds,
            total_tokens,
            estimated_cost_usd: estimate_cost(total_tokens),
            total_elapsed,
        }
    }

    /// `true` when every frame produced a record.
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }
}

/// Estimated cost in US dollars for `tokens`.
pub fn estimate_cost(tokens: u64) -> f64 {
    tokens as f64 * COST_PER_THOUSAND_TOKENS / 1000.0
}

impl Display for RunSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        writeln!(f, "Total time: {:.2}s", self.total_elapsed.as_secs_f64())?;
        writeln!(
            f,
            "Successful calls: {}/{}",
            self.successful, self.total_frames
        )?;
        write!(f, "Failed calls: {}/{}", self.failed, self.total_frames)?;
        if let Some(average) = self.average_api_seconds {
            writeln!(f)?;
            writeln!(f, "Average call time: {average:.2}s")?;
            writeln!(f, "Tokens used: {}", self.total_tokens)?;
            write!(
                f,
                "Estimated cost: ${:.4} (at ${COST_PER_THOUSAND_TOKENS} per 1K tokens)",
                self.estimated_cost_usd
            )?;
        }
        Ok(())
    }
}

/// Destination file for `video_path`'s records.
///
/// The file is named after the video's stem: `clips/run.mp4` → `<dir>/run.json`.
pub fn output_path_for<P: AsRef<Path>, D: AsRef<Path>>(video_path: P, output_dir: D) -> PathBuf {
    let stem = video_path
        .as_ref()
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "video".to_string());
    output_dir.as_ref().join(format!("{stem}.json"))
}

/// Write the batch's successful records as a pretty JSON array.
///
/// Creates `output_dir` when missing and overwrites an existing file.
///
/// # Errors
///
/// [`SecondSightError::Persistence`] naming the destination.
pub fn persist<P: AsRef<Path>, D: AsRef<Path>>(
    batch: &BatchResult,
    video_path: P,
    output_dir: D,
) -> Result<PathBuf, SecondSightError> {
    let output_dir = output_dir.as_ref();
    let path = output_path_for(video_path, output_dir);
    let persistence_error = |reason: String| SecondSightError::Persistence {
        path: path.clone(),
        reason,
    };

    fs::create_dir_all(output_dir).map_err(|error| persistence_error(error.to_string()))?;

    let records: Vec<&ActivityRecord> = batch.records().collect();
    let json = serde_json::to_string_pretty(&records)
        .map_err(|error| persistence_error(error.to_string()))?;
    fs::write(&path, json).map_err(|error| persistence_error(error.to_string()))?;

    log::info!("Saved {} record(s) to {}", records.len(), path.display());
    Ok(path)
}
