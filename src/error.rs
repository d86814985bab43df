//! Error types for the tail component.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::state::LifecycleState;

/// Result type for tail operations
pub type TailResult<T> = Result<T, TailError>;

#[derive(Error, Debug)]
pub enum TailError {
    /// Configuration rejected at setup
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to seek {} to offset {offset}: {source}", path.display())]
    Seek {
        path: PathBuf,
        offset: u64,
        #[source]
        source: io::Error,
    },

    #[error("failed to read {} at offset {offset}: {source}", path.display())]
    Read {
        path: PathBuf,
        offset: u64,
        #[source]
        source: io::Error,
    },

    /// The reopened file is shorter than the read cursor
    #[error("{} shrank to {len} bytes, below read offset {offset}", path.display())]
    Truncated { path: PathBuf, offset: u64, len: u64 },

    /// A lifecycle hook was called out of order
    #[error("cannot {op} while {state}")]
    Lifecycle {
        op: &'static str,
        state: LifecycleState,
    },

    /// The downstream line handler failed
    #[error("line handler failed: {0}")]
    Handler(#[source] anyhow::Error),

    #[error("tail reader did not exit cleanly: {0}")]
    ReaderPanicked(String),

    #[error("failed to release filesystem: {0}")]
    Teardown(#[source] io::Error),
}

impl TailError {
    pub(crate) fn lifecycle(op: &'static str, state: LifecycleState) -> Self {
        Self::Lifecycle { op, state }
    }

    /// Whether this error came from the filesystem rather than from the caller.
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            Self::Open { .. } | Self::Seek { .. } | Self::Read { .. } | Self::Truncated { .. }
        )
    }
}
