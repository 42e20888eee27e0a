use std::{io, mem};
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::response::{Response, IntoResponse};
use bytes::{Bytes, BytesMut};
use http_body::{Body, SizeHint, Frame};
use futures::Stream;
use tokio::io::ReadBuf;

use crate::RangeBody;

/// Largest chunk handed to the transport in one frame.
pub const BLOCK_SIZE: usize = 8192;

/// Response body stream. Implements [`Stream`], [`Body`], and [`IntoResponse`].
///
/// Seeks the body to `start` once, then yields chunks of at most
/// [`BLOCK_SIZE`] bytes in offset order until `length` bytes have been
/// produced or the body reports end of file. With no `length` the stream
/// runs to end of file.
///
/// The body is dropped, closing any underlying handle, as soon as the
/// stream finishes or fails. Dropping the stream early (a client hanging
/// up mid-transfer) drops the body with it.
pub struct RangedStream<B> {
    state: StreamState,
    length: Option<u64>,
    body: Option<B>,
}

impl<B: RangeBody + Unpin + Send + 'static> RangedStream<B> {
    /// Stream `length` bytes of `body` starting at `start`, or everything
    /// from `start` to end of file when `length` is `None`.
    pub fn new(body: B, start: u64, length: Option<u64>) -> Self {
        RangedStream {
            state: StreamState::Seek { start },
            length,
            body: Some(body),
        }
    }
}

impl<B> std::fmt::Debug for RangedStream<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RangedStream")
            .field("state", &self.state)
            .field("length", &self.length)
            .field("open", &self.body.is_some())
            .finish()
    }
}

#[derive(Debug)]
enum StreamState {
    Seek { start: u64 },
    Seeking { remaining: Option<u64> },
    Reading { buffer: BytesMut, remaining: Option<u64> },
    Done,
}

impl<B> RangedStream<B> {
    fn finish(&mut self) {
        self.state = StreamState::Done;
        self.body = None;
    }

    fn fail(&mut self, err: io::Error) -> Poll<Option<io::Result<Bytes>>> {
        tracing::debug!(error = %err, "ranged stream failed, closing body");
        self.finish();
        Poll::Ready(Some(Err(err)))
    }
}

impl<B: RangeBody + Unpin + Send + 'static> IntoResponse for RangedStream<B> {
    fn into_response(self) -> Response {
        Response::new(axum::body::Body::new(self))
    }
}

impl<B: RangeBody + Unpin> Body for RangedStream<B> {
    type Data = Bytes;
    type Error = io::Error;

    fn size_hint(&self) -> SizeHint {
        match (&self.state, self.length) {
            (StreamState::Done, _) => SizeHint::with_exact(0),
            (_, Some(length)) => SizeHint::with_exact(length),
            (_, None) => SizeHint::default(),
        }
    }

    fn is_end_stream(&self) -> bool {
        matches!(self.state, StreamState::Done)
    }

    fn poll_frame(self: Pin<&mut Self>, cx: &mut Context<'_>)
        -> Poll<Option<io::Result<Frame<Bytes>>>>
    {
        self.poll_next(cx).map(|item| item.map(|result| result.map(Frame::data)))
    }
}

impl<B: RangeBody + Unpin> Stream for RangedStream<B> {
    type Item = io::Result<Bytes>;

    fn poll_next(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>
    ) -> Poll<Option<io::Result<Bytes>>> {
        let this = self.get_mut();

        let Some(body) = this.body.as_mut() else {
            return Poll::Ready(None);
        };

        if let StreamState::Seek { start } = this.state {
            if let Err(e) = Pin::new(&mut *body).start_seek(start) {
                return this.fail(e);
            }
            this.state = StreamState::Seeking { remaining: this.length };
        }

        if let StreamState::Seeking { remaining } = this.state {
            match Pin::new(&mut *body).poll_complete(cx) {
                Poll::Pending => { return Poll::Pending; }
                Poll::Ready(Err(e)) => { return this.fail(e); }
                Poll::Ready(Ok(())) => {
                    let buffer = allocate_buffer();
                    this.state = StreamState::Reading { buffer, remaining };
                }
            }
        }

        let StreamState::Reading { buffer, remaining } = &mut this.state else {
            return Poll::Ready(None);
        };

        // the smaller of the block size and the number of bytes remaining
        let nbytes = match *remaining {
            Some(0) => {
                this.finish();
                return Poll::Ready(None);
            }
            Some(remaining) => std::cmp::min(
                BLOCK_SIZE,
                usize::try_from(remaining).unwrap_or(usize::MAX),
            ),
            None => BLOCK_SIZE,
        };

        let uninit = buffer.spare_capacity_mut();
        let mut read_buf = ReadBuf::uninit(&mut uninit[0..nbytes]);

        match Pin::new(&mut *body).poll_read(cx, &mut read_buf) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Err(e)) => this.fail(e),
            Poll::Ready(Ok(())) => {
                let n = read_buf.filled().len();
                if n == 0 {
                    // end of file before the span was exhausted
                    this.finish();
                    return Poll::Ready(None);
                }

                // SAFETY: poll_read has initialised `n` additional bytes at
                // the start of the spare capacity, and buffer.len() is 0
                unsafe { buffer.set_len(buffer.len() + n); }

                let chunk = mem::replace(buffer, allocate_buffer());

                // n <= remaining because of the min above
                if let Some(remaining) = remaining {
                    *remaining -= n as u64;
                }

                Poll::Ready(Some(Ok(chunk.freeze())))
            }
        }
    }
}

fn allocate_buffer() -> BytesMut {
    BytesMut::with_capacity(BLOCK_SIZE)
}
