use std::io;
use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll};

use pin_project::pin_project;
use tokio::io::{ReadBuf, AsyncRead};

use crate::{RangeBody, AsyncSeekStart};

/// Implements [`RangeBody`] for any [`AsyncRead`] and [`AsyncSeekStart`], constructed with a fixed byte size.
#[pin_project]
pub struct KnownSize<B: AsyncRead + AsyncSeekStart> {
    byte_size: u64,
    #[pin]
    body: B,
}

impl<B: AsyncRead + AsyncSeekStart> std::fmt::Debug for KnownSize<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnownSize")
            .field("byte_size", &self.byte_size)
            .finish()
    }
}

impl KnownSize<tokio::fs::File> {
    /// Opens `path` and calls [`tokio::fs::File::metadata`] to determine its size.
    ///
    /// Both calls run on tokio's blocking pool.
    pub async fn file(path: impl AsRef<Path>) -> io::Result<KnownSize<tokio::fs::File>> {
        let file = tokio::fs::File::open(path).await?;
        let byte_size = file.metadata().await?.len();
        Ok(KnownSize { byte_size, body: file })
    }
}

impl<B: AsyncRead + AsyncSeekStart> KnownSize<B> {
    /// Construct a [`KnownSize`] instance with a byte size supplied manually.
    pub fn sized(body: B, byte_size: u64) -> Self {
        KnownSize { byte_size, body }
    }
}

impl<B: AsyncRead + AsyncSeekStart> AsyncRead for KnownSize<B> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.project();
        this.body.poll_read(cx, buf)
    }
}

impl<B: AsyncRead + AsyncSeekStart> AsyncSeekStart for KnownSize<B> {
    fn start_seek(
        self: Pin<&mut Self>,
        position: u64,
    ) -> io::Result<()> {
        let this = self.project();
        this.body.start_seek(position)
    }

    fn poll_complete(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.project();
        this.body.poll_complete(cx)
    }
}

impl<B: AsyncRead + AsyncSeekStart> RangeBody for KnownSize<B> {
    fn byte_size(&self) -> u64 {
        self.byte_size
    }
}

/// Adapts a plain [`AsyncRead`], such as an object store response body, to
/// [`AsyncSeekStart`].
///
/// The reader is already positioned where the caller wants to start, so the
/// only seek accepted is to position 0. Any other seek fails with
/// [`io::ErrorKind::Unsupported`].
#[pin_project]
pub struct ForwardOnly<R> {
    #[pin]
    inner: R,
}

impl<R: AsyncRead> ForwardOnly<R> {
    pub fn new(inner: R) -> Self {
        ForwardOnly { inner }
    }
}

impl<R: AsyncRead> AsyncRead for ForwardOnly<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        self.project().inner.poll_read(cx, buf)
    }
}

impl<R: AsyncRead> AsyncSeekStart for ForwardOnly<R> {
    fn start_seek(self: Pin<&mut Self>, position: u64) -> io::Result<()> {
        if position == 0 {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("cannot seek forward-only body to {position}"),
            ))
        }
    }

    fn poll_complete(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
