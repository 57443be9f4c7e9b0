//! Run configuration.
//!
//! [`PipelineOptions`] is a builder that threads the progress observer,
//! cancellation token, concurrency limit and output location through a run
//! without polluting every function signature. [`InferenceConfig`] holds the
//! credentials and endpoint settings of the vision model; it is built once by
//! the host and injected, never read from process-wide state by the library.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use secondsight::{CancellationToken, InferenceConfig, PipelineOptions};
//!
//! let token = CancellationToken::new();
//! let options = PipelineOptions::new()
//!     .with_concurrency_limit(3)
//!     .with_cancellation(token.clone())
//!     .with_output_dir("results");
//!
//! let inference = InferenceConfig::from_env()?;
//! # Ok::<(), secondsight::SecondSightError>(())
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::error::SecondSightError;
use crate::progress::{CancellationToken, NoOpProgress, ProgressCallback};

/// Default number of concurrent inference calls.
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 5;

/// Default directory for persisted records.
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Options for a pipeline run.
///
/// All fields have working defaults: no observer, no cancellation, five
/// concurrent calls, progress on every unit, records saved under `output/`.
#[derive(Clone)]
pub struct PipelineOptions {
    pub(crate) progress: Arc<dyn ProgressCallback>,
    pub(crate) cancellation: Option<CancellationToken>,
    pub(crate) concurrency_limit: usize,
    pub(crate) batch_size: u64,
    pub(crate) output_dir: Option<PathBuf>,
}

impl Debug for PipelineOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("PipelineOptions")
            .field("has_progress", &true)
            .field("has_cancellation", &self.cancellation.is_some())
            .field("concurrency_limit", &self.concurrency_limit)
            .field("batch_size", &self.batch_size)
            .field("output_dir", &self.output_dir)
            .finish()
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self {
            progress: Arc::new(NoOpProgress),
            cancellation: None,
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
            batch_size: 1,
            output_dir: Some(PathBuf::from(DEFAULT_OUTPUT_DIR)),
        }
    }

    /// Attach a progress observer.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Attach a cancellation token.
    ///
    /// Cancelling during sampling returns
    /// [`SecondSightError::Cancelled`]; cancelling during analysis records
    /// every not-yet-started frame as failed.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Set the maximum number of inference calls in flight.
    ///
    /// The value is validated when the run starts; `0` is rejected with
    /// [`SecondSightError::InvalidConcurrency`].
    #[must_use]
    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = limit;
        self
    }

    /// Set how often progress snapshots fire (every N units).
    ///
    /// Clamped to a minimum of 1.
    #[must_use]
    pub fn with_batch_size(mut self, size: u64) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Persist successful records under this directory.
    #[must_use]
    pub fn with_output_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.output_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Do not write records to disk.
    #[must_use]
    pub fn without_persistence(mut self) -> Self {
        self.output_dir = None;
        self
    }

    /// The configured concurrency limit.
    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    /// The configured output directory, if persistence is enabled.
    pub fn output_dir(&self) -> Option<&Path> {
        self.output_dir.as_deref()
    }

    /// Reject settings that cannot run.
    pub fn validate(&self) -> Result<(), SecondSightError> {
        if self.concurrency_limit < 1 {
            return Err(SecondSightError::InvalidConcurrency(self.concurrency_limit));
        }
        Ok(())
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
    }
}

/// Default OpenAI-compatible endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default vision model.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Settings for the vision-inference endpoint.
///
/// Loaded from the environment with [`InferenceConfig::from_env`]:
///
/// | Variable | Required | Default |
/// |----------|----------|---------|
/// | `OPENAI_API_KEY` | yes | |
/// | `OPENAI_BASE_URL` | no | `https://api.openai.com/v1` |
/// | `OPENAI_MODEL` | no | `gpt-4o` |
/// | `OPENAI_MAX_TOKENS` | no | `1000` |
/// | `OPENAI_TIMEOUT_SECS` | no | `180` |
#[derive(Clone)]
pub struct InferenceConfig {
    /// Bearer token sent with every request.
    pub api_key: String,
    /// Base URL; `/chat/completions` is appended.
    pub base_url: String,
    /// Model name.
    pub model: String,
    /// Completion token cap per request.
    pub max_tokens: u32,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Debug for InferenceConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("InferenceConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl InferenceConfig {
    /// Create a configuration with the given key and default settings.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 1000,
            timeout: Duration::from_secs(180),
        }
    }

    /// Point the client at a different OpenAI-compatible endpoint.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Use a different model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the completion token cap.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Load from the process environment.
    ///
    /// # Errors
    ///
    /// [`SecondSightError::MissingConfiguration`] names `OPENAI_API_KEY` when
    /// it is unset or blank; [`SecondSightError::InvalidConfiguration`] when a
    /// numeric override does not parse.
    pub fn from_env() -> Result<Self, SecondSightError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable source.
    ///
    /// Same rules as [`from_env`](InferenceConfig::from_env); useful for
    /// hosts that keep settings elsewhere.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SecondSightError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let present = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let api_key = present("OPENAI_API_KEY").ok_or(SecondSightError::MissingConfiguration {
            variable: "OPENAI_API_KEY",
        })?;
        let mut config = Self::new(api_key.trim());

        if let Some(base_url) = present("OPENAI_BASE_URL") {
            config.base_url = base_url.trim().trim_end_matches('/').to_string();
        }
        if let Some(model) = present("OPENAI_MODEL") {
            config.model = model.trim().to_string();
        }
        if let Some(raw) = present("OPENAI_MAX_TOKENS") {
            config.max_tokens = raw.trim().parse().map_err(|error| {
                SecondSightError::InvalidConfiguration {
                    field: "OPENAI_MAX_TOKENS",
                    reason: format!("{raw:?}: {error}"),
                }
            })?;
        }
        if let Some(raw) = present("OPENAI_TIMEOUT_SECS") {
            let seconds: u64 = raw.trim().parse().map_err(|error| {
                SecondSightError::InvalidConfiguration {
                    field: "OPENAI_TIMEOUT_SECS",
                    reason: format!("{raw:?}: {error}"),
                }
            })?;
            config.timeout = Duration::from_secs(seconds);
        }

        Ok(config)
    }
}
