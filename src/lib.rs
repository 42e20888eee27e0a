//! # media-range
//!
//! A ranged media endpoint for [`axum`][1], serving images and video from
//! local disk or an S3 compatible object store.
//!
//! A request names its resource with a `filepath` query parameter:
//!
//! * `http://` and `https://` locations are answered with a redirect,
//! * `s3://bucket/key` locations are fetched from the configured
//!   [`ObjectStore`],
//! * anything else is a path on the local filesystem.
//!
//! Bodies are never buffered whole. Any type implementing both
//! [`AsyncRead`] and [`AsyncSeekStart`] can be served through the
//! [`KnownSize`] adapter, and object store bodies, which cannot seek, go
//! through [`ForwardOnly`]. Either way the bytes leave as a
//! [`RangedStream`] of bounded chunks.
//!
//! [`AsyncSeekStart`] is a trait defined by this crate which only allows
//! seeking from the start of a file. It is automatically implemented for any
//! type implementing [`AsyncSeek`].
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use media_range::{router, MediaState, S3Config, S3Store};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = S3Store::connect(&S3Config::default()).await;
//!     let app = router("/media", MediaState::new(Arc::new(store)));
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:5151").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//! ```
//!
//! [1]: https://docs.rs/axum

mod file;
mod stream;

pub mod config;
pub mod endpoint;
pub mod error;
pub mod local;
pub mod location;
pub mod logging;
pub mod media_type;
pub mod object;
pub mod range;
pub mod s3;

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use mime_guess::mime::Mime;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum_extra::headers::{AcceptRanges, ContentLength, ContentType, HeaderMapExt};
use tokio::io::{AsyncRead, AsyncSeek};

pub use endpoint::{router, MediaState};
pub use error::{MediaError, ObjectStoreError};
pub use file::{ForwardOnly, KnownSize};
pub use location::ResourceLocation;
pub use object::{GetObjectOutput, ObjectBody, ObjectMeta, ObjectStore};
pub use range::{RangeError, RangeSpec};
pub use s3::{S3Config, S3Store};
pub use stream::{RangedStream, BLOCK_SIZE};

/// [`AsyncSeek`] narrowed to only allow seeking from start.
pub trait AsyncSeekStart {
    /// Same semantics as [`AsyncSeek::start_seek`], always passing position as the `SeekFrom::Start` variant.
    fn start_seek(self: Pin<&mut Self>, position: u64) -> io::Result<()>;

    /// Same semantics as [`AsyncSeek::poll_complete`], returning `()` instead of the new stream position.
    fn poll_complete(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>>;
}

impl<T: AsyncSeek> AsyncSeekStart for T {
    fn start_seek(self: Pin<&mut Self>, position: u64) -> io::Result<()> {
        AsyncSeek::start_seek(self, io::SeekFrom::Start(position))
    }

    fn poll_complete(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        AsyncSeek::poll_complete(self, cx).map_ok(|_| ())
    }
}

/// An [`AsyncRead`] and [`AsyncSeekStart`] with a fixed known byte size.
pub trait RangeBody: AsyncRead + AsyncSeekStart {
    /// The total size of the underlying file.
    ///
    /// This should not change for the lifetime of the object once queried.
    /// Behaviour is not guaranteed if it does change.
    fn byte_size(&self) -> u64;
}

/// The main responder type. Implements [`IntoResponse`].
///
/// Pairs a body with the raw `Range` header of the request, if any.
#[derive(Debug)]
pub struct Ranged<B: RangeBody + Unpin + Send + 'static> {
    range: Option<String>,
    body: B,
    content_type: Mime,
}

impl<B: RangeBody + Unpin + Send + 'static> Ranged<B> {
    /// Construct a ranged response over any type implementing [`RangeBody`]
    /// and the optional raw value of a `Range` header.
    pub fn new(range: Option<&str>, body: B, content_type: Mime) -> Self {
        Ranged { range: range.map(str::to_owned), body, content_type }
    }

    /// Responds to the request, returning headers and body as
    /// [`RangedResponse`].
    ///
    /// A `Range` header that cannot be parsed is ignored and the whole body
    /// is returned. A parseable range that selects no byte of the body is
    /// a [`MediaError::RangeNotSatisfiable`].
    pub fn try_respond(self) -> Result<RangedResponse<B>, MediaError> {
        let total_bytes = self.body.byte_size();
        let content_type = self.content_type;

        let range = match self.range.as_deref().map(|header| RangeSpec::parse(header, total_bytes)) {
            None => None,
            Some(Ok(range)) => Some(range),
            Some(Err(RangeError::Malformed(header))) => {
                tracing::debug!(%header, "ignoring malformed range header");
                None
            }
            Some(Err(RangeError::Unsatisfiable { size })) => {
                return Err(MediaError::RangeNotSatisfiable { size: Some(size) });
            }
        };

        match range {
            None => {
                let content_length = ContentLength(total_bytes);
                let stream = RangedStream::new(self.body, 0, Some(total_bytes));
                Ok(RangedResponse::Full { content_length, stream, content_type })
            }
            Some(range) => {
                tracing::debug!(start = range.start, end = range.end, total_bytes, "serving partial content");
                let stream = RangedStream::new(self.body, range.start, Some(range.content_length()));
                Ok(RangedResponse::Partial { range, stream, content_type })
            }
        }
    }
}

impl<B: RangeBody + Unpin + Send + 'static> IntoResponse for Ranged<B> {
    fn into_response(self) -> Response {
        self.try_respond().into_response()
    }
}

/// Data type containing computed headers and body for a range response. Implements [`IntoResponse`].
#[derive(Debug)]
pub enum RangedResponse<B> {
    /// Full content response, no usable range requested.
    Full {
        content_length: ContentLength,
        stream: RangedStream<B>,
        content_type: Mime,
    },
    /// A single satisfiable range.
    Partial {
        range: RangeSpec,
        stream: RangedStream<B>,
        content_type: Mime,
    },
}

impl<B: RangeBody + Unpin + Send + 'static> IntoResponse for RangedResponse<B> {
    fn into_response(self) -> Response {
        use RangedResponse::*;
        match self {
            Full { content_length, stream, content_type } => {
                let headers = media_headers(content_length.0, content_type);
                (StatusCode::OK, headers, stream).into_response()
            }
            Partial { range, stream, content_type } => {
                let mut headers = media_headers(range.content_length(), content_type);
                headers.typed_insert(range.content_range());
                (StatusCode::PARTIAL_CONTENT, headers, stream).into_response()
            }
        }
    }
}

/// `Accept-Ranges`, `Content-Length` and `Content-Type`, in that order.
pub(crate) fn media_headers(content_length: u64, content_type: Mime) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.typed_insert(AcceptRanges::bytes());
    headers.typed_insert(ContentLength(content_length));
    headers.typed_insert(ContentType::from(content_type));
    headers
}
