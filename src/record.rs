//! Per-second records and batch results.
//!
//! [`ActivityRecord`] is the canonical unit of output: one classified second
//! of video. [`FrameResult`] wraps the outcome of analyzing one frame, and
//! [`BatchResult`] holds one result per sampled frame, always ascending by
//! second.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level activity category.
///
/// Anything the model answers outside the five known categories is stored
/// as [`OverallAction::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallAction {
    Sport,
    Sleep,
    Food,
    Work,
    Leisure,
    Unknown,
}

impl OverallAction {
    /// The five categories a model may answer with.
    pub const CATEGORIES: [OverallAction; 5] = [
        OverallAction::Sport,
        OverallAction::Sleep,
        OverallAction::Food,
        OverallAction::Work,
        OverallAction::Leisure,
    ];

    /// Map a model answer to a category. Matching is exact and
    /// case-sensitive; anything else is `Unknown`.
    pub fn from_label(label: &str) -> Self {
        match label {
            "sport" => OverallAction::Sport,
            "sleep" => OverallAction::Sleep,
            "food" => OverallAction::Food,
            "work" => OverallAction::Work,
            "leisure" => OverallAction::Leisure,
            _ => OverallAction::Unknown,
        }
    }

    /// Lowercase label as serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            OverallAction::Sport => "sport",
            OverallAction::Sleep => "sleep",
            OverallAction::Food => "food",
            OverallAction::Work => "work",
            OverallAction::Leisure => "leisure",
            OverallAction::Unknown => "unknown",
        }
    }
}

impl Display for OverallAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// One classified second of video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRecord {
    /// The frame's sampled second.
    pub second: u64,
    /// Activity category.
    pub overall_action: OverallAction,
    /// Category-specific refinement; may be empty.
    pub sub_action: String,
    /// Free-text description; may be empty.
    #[serde(alias = "short_description")]
    pub description: String,
}

/// What analyzing one frame produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameOutcome {
    /// A validated record.
    Analyzed(ActivityRecord),
    /// Why the frame has no record.
    Failed(String),
}

/// Result of analyzing one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameResult {
    /// The frame's sampled second.
    pub second: u64,
    /// Record or failure reason.
    pub outcome: FrameOutcome,
    /// Raw model text, or `"Error analyzing frame: <cause>"` when the call failed.
    pub raw_text: String,
    /// Time spent in the inference call.
    #[serde(serialize_with = "crate::utilities::serialize_seconds", rename = "elapsed_seconds")]
    pub elapsed: Duration,
    /// Total tokens the endpoint reported for the call.
    pub tokens_used: Option<u64>,
}

impl FrameResult {
    /// A successful result.
    pub fn analyzed(
        record: ActivityRecord,
        raw_text: String,
        elapsed: Duration,
        tokens_used: Option<u64>,
    ) -> Self {
        Self {
            second: record.second,
            outcome: FrameOutcome::Analyzed(record),
            raw_text,
            elapsed,
            tokens_used,
        }
    }

    /// A failed result.
    pub fn failed(
        second: u64,
        error: impl Into<String>,
        raw_text: String,
        elapsed: Duration,
        tokens_used: Option<u64>,
    ) -> Self {
        Self {
            second,
            outcome: FrameOutcome::Failed(error.into()),
            raw_text,
            elapsed,
            tokens_used,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, FrameOutcome::Analyzed(_))
    }

    pub fn record(&self) -> Option<&ActivityRecord> {
        match &self.outcome {
            FrameOutcome::Analyzed(record) => Some(record),
            FrameOutcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            FrameOutcome::Analyzed(_) => None,
            FrameOutcome::Failed(error) => Some(error),
        }
    }
}

/// One result per sampled frame, ascending by second.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct BatchResult {
    results: Vec<FrameResult>,
}

impl BatchResult {
    /// Build a batch, sorting by second.
    pub fn from_results(mut results: Vec<FrameResult>) -> Self {
        results.sort_by_key(|result| result.second);
        Self { results }
    }

    pub fn results(&self) -> &[FrameResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn successful(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.len() - self.successful()
    }

    /// Records of the successful frames, ascending by second.
    pub fn records(&self) -> impl Iterator<Item = &ActivityRecord> {
        self.results.iter().filter_map(FrameResult::record)
    }

    /// The object relayed to a downstream summarizer.
    pub fn aggregate(&self) -> FrameAggregate {
        let total_frames = self.len();
        let data: Vec<ActivityRecord> = self.records().cloned().collect();
        let successful = data.len();

        let (status, message) = if successful == total_frames {
            (
                AggregateStatus::Success,
                "All frames analyzed successfully".to_string(),
            )
        } else {
            (
                AggregateStatus::PartialSuccess,
                format!("Processed {successful}/{total_frames} frames successfully"),
            )
        };

        FrameAggregate {
            status,
            message,
            total_frames,
            data,
        }
    }

    pub fn into_results(self) -> Vec<FrameResult> {
        self.results
    }
}

impl IntoIterator for BatchResult {
    type Item = FrameResult;
    type IntoIter = std::vec::IntoIter<FrameResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

impl<'a> IntoIterator for &'a BatchResult {
    type Item = &'a FrameResult;
    type IntoIter = std::slice::Iter<'a, FrameResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}

/// Whether every frame produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateStatus {
    Success,
    PartialSuccess,
}

/// Summary object for downstream consumers.
///
/// Partial success is explicit: `status` is `partial_success` and `message`
/// reads `"Processed X/Y frames successfully"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameAggregate {
    pub status: AggregateStatus,
    pub message: String,
    pub total_frames: usize,
    pub data: Vec<ActivityRecord>,
}
