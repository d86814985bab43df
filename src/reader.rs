//! Tail reader: follows one file and pushes each complete line into the line buffer.
//!
//! Reaching end of file closes the handle, waits, and reopens the same path at
//! the read cursor. That one path covers both a slowly growing file and a file
//! that was rotated away underneath us.

use std::io::SeekFrom;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncSeekExt, BufReader};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::buffer::LineSender;
use crate::config::{FailurePolicy, ShrinkPolicy, TailConfig};
use crate::error::{TailError, TailResult};
use crate::fs::TailFs;

const LINE_SCAN_CHUNK: usize = 4096;

pub struct TailReader<F: TailFs> {
    fs: Arc<F>,
    config: TailConfig,
    lines: LineSender,
    cancel: CancellationToken,
    stream: Option<BufReader<F::Stream>>,
    // Bytes consumed as complete lines
    cursor: u64,
    buf: Vec<u8>,
}

impl<F: TailFs> TailReader<F> {
    pub fn new(
        fs: Arc<F>,
        config: TailConfig,
        lines: LineSender,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            fs,
            config,
            lines,
            cancel,
            stream: None,
            cursor: 0,
            buf: Vec::new(),
        }
    }

    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Give back the buffer's producer half, closing any open stream.
    pub fn into_sender(self) -> LineSender {
        self.lines
    }

    /// First open of the target, positioned at its start, or when `from_end`
    /// is set, at the start of its last unfinished line.
    pub async fn open(&mut self) -> TailResult<()> {
        if !self.config.from_end {
            self.cursor = 0;
            return self.open_at_cursor().await;
        }
        let mut stream = self.open_stream().await?;
        let len = stream
            .seek(SeekFrom::End(0))
            .await
            .map_err(|source| TailError::Seek {
                path: self.config.path.clone(),
                offset: 0,
                source,
            })?;
        let start = self.line_start(&mut stream, len).await?;
        stream
            .seek(SeekFrom::Start(start))
            .await
            .map_err(|source| TailError::Seek {
                path: self.config.path.clone(),
                offset: start,
                source,
            })?;
        self.cursor = start;
        self.stream = Some(BufReader::new(stream));
        Ok(())
    }

    /// Read lines until cancelled or a failure the failure policy won't absorb.
    pub async fn run(mut self) -> TailResult<()> {
        info!(path = %self.config.path.display(), offset = self.cursor, "tail reader started");
        let mut failures = 0u32;
        let outcome = loop {
            if self.cancel.is_cancelled() {
                break Ok(());
            }
            match self.step().await {
                Ok(true) => failures = 0,
                Ok(false) => break Ok(()),
                Err(err) => {
                    self.stream = None;
                    match self.config.on_failure {
                        FailurePolicy::Retry { attempts, backoff } if failures < attempts => {
                            failures += 1;
                            warn!(
                                path = %self.config.path.display(),
                                error = %err,
                                attempt = failures,
                                attempts,
                                "tail reader failed; reopening after backoff"
                            );
                            if !self.pause(backoff).await {
                                break Ok(());
                            }
                        }
                        _ => {
                            error!(path = %self.config.path.display(), error = %err, "tail reader failed");
                            break Err(err);
                        }
                    }
                }
            }
        };
        self.stream = None;
        info!(path = %self.config.path.display(), offset = self.cursor, "tail reader stopped");
        outcome
    }

    /// One loop iteration. `Ok(false)` means stop.
    async fn step(&mut self) -> TailResult<bool> {
        if self.stream.is_none() {
            self.open_at_cursor().await?;
        }
        match self.next_line().await? {
            Some(line) => {
                trace!(offset = self.cursor, line = %line, "line read");
                Ok(self.lines.push(line, &self.cancel).await)
            }
            None => self.reopen().await,
        }
    }

    /// Next complete line, or `None` at end of file. A trailing fragment with
    /// no newline yet is left unconsumed.
    async fn next_line(&mut self) -> TailResult<Option<String>> {
        let Some(stream) = self.stream.as_mut() else {
            return Ok(None);
        };
        self.buf.clear();
        let read = stream
            .read_until(b'\n', &mut self.buf)
            .await
            .map_err(|source| TailError::Read {
                path: self.config.path.clone(),
                offset: self.cursor,
                source,
            })?;
        if read == 0 || self.buf.last() != Some(&b'\n') {
            return Ok(None);
        }
        self.cursor += read as u64;
        self.buf.pop();
        if self.buf.last() == Some(&b'\r') {
            self.buf.pop();
        }
        Ok(Some(String::from_utf8_lossy(&self.buf).into_owned()))
    }

    async fn reopen(&mut self) -> TailResult<bool> {
        self.stream = None;
        debug!(
            path = %self.config.path.display(),
            offset = self.cursor,
            "end of file; reopening after delay"
        );
        if !self.pause(self.config.reopen_delay).await {
            return Ok(false);
        }
        self.open_at_cursor().await?;
        Ok(true)
    }

    async fn open_at_cursor(&mut self) -> TailResult<()> {
        let mut stream = self.open_stream().await?;
        let len = stream
            .seek(SeekFrom::End(0))
            .await
            .map_err(|source| TailError::Seek {
                path: self.config.path.clone(),
                offset: self.cursor,
                source,
            })?;

        let offset = if self.cursor <= len {
            self.cursor
        } else {
            let offset = match self.config.on_shrink {
                ShrinkPolicy::Clamp => self.line_start(&mut stream, len).await?,
                ShrinkPolicy::Rewind => 0,
                ShrinkPolicy::Fail => {
                    return Err(TailError::Truncated {
                        path: self.config.path.clone(),
                        offset: self.cursor,
                        len,
                    });
                }
            };
            warn!(
                path = %self.config.path.display(),
                previous_offset = self.cursor,
                len,
                offset,
                "file shrank below read offset"
            );
            offset
        };

        stream
            .seek(SeekFrom::Start(offset))
            .await
            .map_err(|source| TailError::Seek {
                path: self.config.path.clone(),
                offset,
                source,
            })?;
        self.cursor = offset;
        self.stream = Some(BufReader::new(stream));
        Ok(())
    }

    /// Offset just past the last newline before `end`, or 0 if there is none.
    /// Resuming there never starts in the middle of a line.
    async fn line_start(&self, stream: &mut F::Stream, end: u64) -> TailResult<u64> {
        let mut chunk = vec![0u8; LINE_SCAN_CHUNK];
        let mut pos = end;
        while pos > 0 {
            let from = pos.saturating_sub(LINE_SCAN_CHUNK as u64);
            let window = &mut chunk[..(pos - from) as usize];
            stream
                .seek(SeekFrom::Start(from))
                .await
                .map_err(|source| TailError::Seek {
                    path: self.config.path.clone(),
                    offset: from,
                    source,
                })?;
            stream
                .read_exact(window)
                .await
                .map_err(|source| TailError::Read {
                    path: self.config.path.clone(),
                    offset: from,
                    source,
                })?;
            if let Some(i) = window.iter().rposition(|&b| b == b'\n') {
                return Ok(from + i as u64 + 1);
            }
            pos = from;
        }
        Ok(0)
    }

    async fn open_stream(&self) -> TailResult<F::Stream> {
        self.fs
            .open(&self.config.path)
            .await
            .map_err(|source| TailError::Open {
                path: self.config.path.clone(),
                source,
            })
    }

    /// Sleep unless cancelled first. Returns `false` on cancellation.
    async fn pause(&self, delay: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            _ = sleep(delay) => true,
        }
    }
}
