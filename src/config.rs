//! Tail configuration, fixed once `setup` has validated it.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{TailError, TailResult};

pub const DEFAULT_BUFFER_CAPACITY: usize = 100;
pub const DEFAULT_MAX_LINES_PER_DRAIN: usize = 100;
pub const DEFAULT_REOPEN_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_IDLE_BACKOFF: Duration = Duration::from_millis(100);

/// What to do when a reopened file is shorter than the read cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ShrinkPolicy {
    /// Resume at the new end of file
    #[default]
    Clamp,
    /// Start over from the beginning of the new file
    Rewind,
    /// Stop the reader with a `Truncated` error
    Fail,
}

/// How the reader reacts to open, seek and read failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    #[default]
    Abort,
    /// Reopen at the cursor after `backoff`, giving up after `attempts`
    /// consecutive failures.
    Retry { attempts: u32, backoff: Duration },
}

#[derive(Debug, Clone)]
pub struct TailConfig {
    pub path: PathBuf,
    pub buffer_capacity: usize,
    pub max_lines_per_drain: usize,
    /// Pause between hitting end of file and reopening it
    pub reopen_delay: Duration,
    /// Pause taken by a drain that found nothing to deliver
    pub idle_backoff: Duration,
    pub on_shrink: ShrinkPolicy,
    pub on_failure: FailurePolicy,
    /// Skip existing content and only deliver lines appended after activation
    pub from_end: bool,
}

impl TailConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            max_lines_per_drain: DEFAULT_MAX_LINES_PER_DRAIN,
            reopen_delay: DEFAULT_REOPEN_DELAY,
            idle_backoff: DEFAULT_IDLE_BACKOFF,
            on_shrink: ShrinkPolicy::default(),
            on_failure: FailurePolicy::default(),
            from_end: false,
        }
    }

    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    pub fn with_max_lines_per_drain(mut self, max: usize) -> Self {
        self.max_lines_per_drain = max;
        self
    }

    pub fn with_reopen_delay(mut self, delay: Duration) -> Self {
        self.reopen_delay = delay;
        self
    }

    pub fn with_idle_backoff(mut self, backoff: Duration) -> Self {
        self.idle_backoff = backoff;
        self
    }

    pub fn with_shrink_policy(mut self, policy: ShrinkPolicy) -> Self {
        self.on_shrink = policy;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.on_failure = policy;
        self
    }

    pub fn from_end(mut self, from_end: bool) -> Self {
        self.from_end = from_end;
        self
    }

    pub fn validate(&self) -> TailResult<()> {
        if self.path.as_os_str().is_empty() {
            return Err(TailError::Config("target path must not be empty".into()));
        }
        if self.buffer_capacity == 0 {
            return Err(TailError::Config("buffer capacity must be at least 1".into()));
        }
        if self.max_lines_per_drain == 0 {
            return Err(TailError::Config(
                "max lines per drain must be at least 1".into(),
            ));
        }
        if let FailurePolicy::Retry { attempts: 0, .. } = self.on_failure {
            return Err(TailError::Config(
                "retry policy needs at least one attempt".into(),
            ));
        }
        Ok(())
    }
}
