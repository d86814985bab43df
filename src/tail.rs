//! `LineTail`: the lifecycle boundary a host drives.
//!
//! The host calls `setup`, `activate`, then `drain` as often as it likes, then
//! `deactivate` and `teardown`, each exactly once. The reader runs as its own
//! tokio task between `activate` and `deactivate`; `drain` only ever touches
//! the line buffer.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::buffer::{LineReceiver, LineSender, Pop, line_buffer};
use crate::config::TailConfig;
use crate::error::{TailError, TailResult};
use crate::fs::{LocalFs, TailFs};
use crate::reader::TailReader;
use crate::state::LifecycleState;

/// Downstream consumer of drained lines.
pub trait LineHandler {
    fn on_line(&mut self, line: String) -> anyhow::Result<()>;
}

impl<T> LineHandler for T
where
    T: FnMut(String) -> anyhow::Result<()>,
{
    fn on_line(&mut self, line: String) -> anyhow::Result<()> {
        self(line)
    }
}

pub struct LineTail<H, F: TailFs = LocalFs> {
    config: TailConfig,
    fs: Option<Arc<F>>,
    handler: H,
    state: LifecycleState,
    // Producer half waits here between setup and activate
    sender: Option<LineSender>,
    lines: Option<LineReceiver>,
    cancel: CancellationToken,
    reader: Option<JoinHandle<TailResult<()>>>,
}

impl<H: LineHandler> LineTail<H> {
    /// Tail a file on the local disk.
    pub fn local(config: TailConfig, handler: H) -> Self {
        Self::new(config, LocalFs, handler)
    }
}

impl<H: LineHandler, F: TailFs> LineTail<H, F> {
    pub fn new(config: TailConfig, fs: F, handler: H) -> Self {
        Self {
            config,
            fs: Some(Arc::new(fs)),
            handler,
            state: LifecycleState::Idle,
            sender: None,
            lines: None,
            cancel: CancellationToken::new(),
            reader: None,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn config(&self) -> &TailConfig {
        &self.config
    }

    /// Lines read but not yet drained.
    pub fn buffered(&self) -> usize {
        self.lines.as_ref().map_or(0, LineReceiver::len)
    }

    pub fn setup(&mut self) -> TailResult<()> {
        if self.state != LifecycleState::Idle || self.lines.is_some() || self.fs.is_none() {
            return Err(TailError::lifecycle("set up", self.state));
        }
        self.config.validate()?;
        let (tx, rx) = line_buffer(self.config.buffer_capacity);
        self.sender = Some(tx);
        self.lines = Some(rx);
        debug!(
            path = %self.config.path.display(),
            capacity = self.config.buffer_capacity,
            max_lines_per_drain = self.config.max_lines_per_drain,
            "tail set up"
        );
        Ok(())
    }

    /// Open the target and start the reader task.
    ///
    /// On failure the component stays idle and the sender is kept, so the host
    /// may call `activate` again.
    pub async fn activate(&mut self) -> TailResult<()> {
        if self.state != LifecycleState::Idle {
            return Err(TailError::lifecycle("activate", self.state));
        }
        let (Some(fs), Some(sender)) = (self.fs.clone(), self.sender.take()) else {
            return Err(TailError::lifecycle("activate", self.state));
        };

        let mut reader = TailReader::new(fs, self.config.clone(), sender, self.cancel.clone());
        if let Err(err) = reader.open().await {
            self.sender = Some(reader.into_sender());
            return Err(err);
        }
        self.reader = Some(tokio::spawn(reader.run()));
        self.state = LifecycleState::Active;
        info!(path = %self.config.path.display(), "tail activated");
        Ok(())
    }

    /// Deliver up to `max_lines_per_drain` buffered lines to the handler.
    ///
    /// Returns how many lines were handed over. A handler failure is returned
    /// right away; the failed line counts as delivered and the rest stay
    /// buffered. If the reader has died, its failure is returned once.
    pub async fn drain(&mut self) -> TailResult<usize> {
        if !self.state.is_active() {
            return Err(TailError::lifecycle("drain", self.state));
        }
        let Some(lines) = self.lines.as_mut() else {
            return Err(TailError::lifecycle("drain", self.state));
        };

        let mut delivered = 0;
        let mut reader_gone = false;
        while delivered < self.config.max_lines_per_drain {
            match lines.pop_if_available() {
                Pop::Line(line) => {
                    delivered += 1;
                    self.handler.on_line(line).map_err(TailError::Handler)?;
                }
                Pop::Empty => break,
                Pop::Closed => {
                    reader_gone = true;
                    break;
                }
            }
        }

        // A dead reader is reported on a call that delivered nothing
        if reader_gone && delivered == 0 {
            self.join_reader().await?;
        }
        if delivered == 0 {
            sleep(self.config.idle_backoff).await;
        }
        Ok(delivered)
    }

    /// Stop the reader and wait for it to exit, releasing its file handle.
    pub async fn deactivate(&mut self) -> TailResult<()> {
        if !self.state.is_active() {
            return Err(TailError::lifecycle("deactivate", self.state));
        }
        self.state = LifecycleState::Stopping;
        self.cancel.cancel();

        let outcome = self.join_reader().await;
        self.lines = None;
        self.state = LifecycleState::Stopped;
        info!(path = %self.config.path.display(), "tail deactivated");
        outcome
    }

    /// Wait for the reader task to finish and return its outcome. The handle
    /// is only cleared once the join completed, so a caller that drops this
    /// future part way leaves the outcome for the next join.
    async fn join_reader(&mut self) -> TailResult<()> {
        let Some(handle) = self.reader.as_mut() else {
            return Ok(());
        };
        let joined = handle.await;
        self.reader = None;
        match joined {
            Ok(outcome) => outcome,
            Err(err) => Err(TailError::ReaderPanicked(err.to_string())),
        }
    }

    /// Release the filesystem. Allowed once, after `deactivate` or straight
    /// after `setup` if the tail never activated.
    pub async fn teardown(&mut self) -> TailResult<()> {
        if !matches!(self.state, LifecycleState::Idle | LifecycleState::Stopped) {
            return Err(TailError::lifecycle("tear down", self.state));
        }
        let Some(fs) = self.fs.take() else {
            return Err(TailError::lifecycle("tear down", self.state));
        };
        self.sender = None;
        self.lines = None;
        fs.close().await.map_err(TailError::Teardown)?;
        debug!(path = %self.config.path.display(), "tail torn down");
        Ok(())
    }
}

impl<H, F: TailFs> Drop for LineTail<H, F> {
    fn drop(&mut self) {
        if self.reader.is_some() {
            warn!(path = %self.config.path.display(), "tail dropped while active; cancelling reader");
        }
        self.cancel.cancel();
    }
}
