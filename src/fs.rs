//! Filesystem seam: the reader depends on this trait rather than on `tokio::fs`
//! directly, so other backends (or test doubles) can stand in for the local disk.

use std::io;
use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncSeek};

/// A filesystem the tail reader can open files on.
///
/// Streams are closed by dropping them. `close` releases whatever the
/// filesystem itself holds and is called once, at teardown.
#[async_trait::async_trait]
pub trait TailFs: Send + Sync + 'static {
    type Stream: AsyncRead + AsyncSeek + Unpin + Send + Sync + 'static;

    async fn open(&self, path: &Path) -> io::Result<Self::Stream>;

    async fn close(&self) -> io::Result<()> {
        Ok(())
    }
}

/// The local disk, through `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

#[async_trait::async_trait]
impl TailFs for LocalFs {
    type Stream = File;

    async fn open(&self, path: &Path) -> io::Result<File> {
        File::open(path).await
    }
}
