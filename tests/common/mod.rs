//! Common test utilities and helpers
#![allow(dead_code)]

use std::io::{self, Write};
use std::ops::Range;
use std::path::Path;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use anyhow::{Result, bail};
use linetail::{LineHandler, LineTail, TailConfig, TailFs};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncSeek, ReadBuf};
use tokio::time::{Instant, sleep};

pub const DEADLINE: Duration = Duration::from_secs(5);

/// Config with short delays so tests don't wait on production timings.
pub fn fast_config(path: &Path) -> TailConfig {
    TailConfig::new(path)
        .with_reopen_delay(Duration::from_millis(20))
        .with_idle_backoff(Duration::from_millis(10))
}

pub type Seen = Arc<Mutex<Vec<String>>>;

/// A handler that records every line it is given.
pub fn recorder() -> (Seen, impl FnMut(String) -> Result<()>) {
    let seen = Seen::default();
    let sink = Arc::clone(&seen);
    let handler = move |line: String| -> Result<()> {
        sink.lock().unwrap().push(line);
        Ok(())
    };
    (seen, handler)
}

pub fn snapshot(seen: &Seen) -> Vec<String> {
    seen.lock().unwrap().clone()
}

pub fn append(path: &Path, text: &str) -> io::Result<()> {
    let mut file = std::fs::OpenOptions::new().append(true).open(path)?;
    file.write_all(text.as_bytes())?;
    file.flush()
}

/// Drain until the handler has seen at least `count` lines.
pub async fn drain_until<H: LineHandler, F: TailFs>(
    tail: &mut LineTail<H, F>,
    seen: &Seen,
    count: usize,
) -> Result<()> {
    let deadline = Instant::now() + DEADLINE;
    loop {
        let have = seen.lock().unwrap().len();
        if have >= count {
            return Ok(());
        }
        if Instant::now() > deadline {
            bail!("saw {:?}, wanted {count} lines", snapshot(seen));
        }
        tail.drain().await?;
    }
}

/// Wait, without draining, until the buffer holds at least `count` lines.
pub async fn wait_buffered<H: LineHandler, F: TailFs>(
    tail: &LineTail<H, F>,
    count: usize,
) -> Result<()> {
    let deadline = Instant::now() + DEADLINE;
    while tail.buffered() < count {
        if Instant::now() > deadline {
            bail!("buffer stuck at {} lines, wanted {count}", tail.buffered());
        }
        sleep(Duration::from_millis(10)).await;
    }
    Ok(())
}

/// Drain until a call fails, returning that failure.
pub async fn drain_until_err<H: LineHandler, F: TailFs>(
    tail: &mut LineTail<H, F>,
) -> Result<linetail::TailError> {
    let deadline = Instant::now() + DEADLINE;
    loop {
        match tail.drain().await {
            Ok(_) if Instant::now() > deadline => bail!("drain never failed"),
            Ok(_) => {}
            Err(err) => return Ok(err),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Counters {
    pub opens: Arc<AtomicUsize>,
    pub closes: Arc<AtomicUsize>,
    pub fs_closes: Arc<AtomicUsize>,
}

impl Counters {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn fs_closes(&self) -> usize {
        self.fs_closes.load(Ordering::SeqCst)
    }
}

/// Local filesystem that counts opens and closes and can fail chosen opens,
/// or the reads of chosen opens. Open attempts are numbered from 1.
pub struct CountingFs {
    counters: Counters,
    failing_opens: Range<usize>,
    failing_reads: Range<usize>,
    // Bytes a stream with failing reads hands out before erroring
    read_limit: u64,
}

impl CountingFs {
    pub fn new(counters: Counters) -> Self {
        Self::failing(counters, 0..0)
    }

    pub fn failing(counters: Counters, failing_opens: Range<usize>) -> Self {
        Self {
            counters,
            failing_opens,
            failing_reads: 0..0,
            read_limit: 0,
        }
    }

    /// Streams from the opens in `opens` fail every read after `limit` bytes.
    pub fn failing_reads(counters: Counters, opens: Range<usize>, limit: u64) -> Self {
        Self {
            failing_reads: opens,
            read_limit: limit,
            ..Self::failing(counters, 0..0)
        }
    }
}

#[async_trait::async_trait]
impl TailFs for CountingFs {
    type Stream = CountedFile;

    async fn open(&self, path: &Path) -> io::Result<CountedFile> {
        let attempt = self.counters.opens.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failing_opens.contains(&attempt) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "injected open failure"));
        }
        let inner = File::open(path).await?;
        Ok(CountedFile {
            inner,
            closes: Arc::clone(&self.counters.closes),
            read_limit: self.failing_reads.contains(&attempt).then_some(self.read_limit),
            read: 0,
        })
    }

    async fn close(&self) -> io::Result<()> {
        self.counters.fs_closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct CountedFile {
    inner: File,
    closes: Arc<AtomicUsize>,
    read_limit: Option<u64>,
    read: u64,
}

impl Drop for CountedFile {
    fn drop(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

impl AsyncRead for CountedFile {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let Some(limit) = this.read_limit else {
            return Pin::new(&mut this.inner).poll_read(cx, buf);
        };
        if this.read >= limit {
            return Poll::Ready(Err(io::Error::other("injected read failure")));
        }
        let want = buf.remaining().min((limit - this.read) as usize);
        let mut scratch = vec![0u8; want];
        let mut limited = ReadBuf::new(&mut scratch);
        ready!(Pin::new(&mut this.inner).poll_read(cx, &mut limited))?;
        let filled = limited.filled();
        this.read += filled.len() as u64;
        buf.put_slice(filled);
        Poll::Ready(Ok(()))
    }
}

impl AsyncSeek for CountedFile {
    fn start_seek(self: Pin<&mut Self>, position: io::SeekFrom) -> io::Result<()> {
        Pin::new(&mut self.get_mut().inner).start_seek(position)
    }

    fn poll_complete(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<u64>> {
        Pin::new(&mut self.get_mut().inner).poll_complete(cx)
    }
}
