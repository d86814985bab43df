//! Bounded line hand-off between the reader task and the drain step.

use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio_util::sync::CancellationToken;

/// Build a line buffer holding at most `capacity` lines.
pub fn line_buffer(capacity: usize) -> (LineSender, LineReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (LineSender { tx }, LineReceiver { rx })
}

/// Producer half, owned by the reader task.
#[derive(Debug)]
pub struct LineSender {
    tx: mpsc::Sender<String>,
}

impl LineSender {
    /// Push a line, waiting while the buffer is full.
    ///
    /// Returns `false` without pushing if `cancel` fires first or the
    /// receiver is gone.
    pub async fn push(&self, line: String, cancel: &CancellationToken) -> bool {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            sent = self.tx.send(line) => sent.is_ok(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }
}

/// Outcome of a non-blocking pop.
#[derive(Debug, PartialEq, Eq)]
pub enum Pop {
    Line(String),
    Empty,
    /// The sender is gone and every buffered line has been taken
    Closed,
}

/// Consumer half, owned by the drain step.
#[derive(Debug)]
pub struct LineReceiver {
    rx: mpsc::Receiver<String>,
}

impl LineReceiver {
    pub fn pop_if_available(&mut self) -> Pop {
        match self.rx.try_recv() {
            Ok(line) => Pop::Line(line),
            Err(TryRecvError::Empty) => Pop::Empty,
            Err(TryRecvError::Disconnected) => Pop::Closed,
        }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.rx.max_capacity()
    }
}
