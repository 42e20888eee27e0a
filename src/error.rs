use std::io;
use std::path::Path;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum_extra::headers::{AcceptRanges, ContentRange};
use axum_extra::TypedHeader;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failures of the media endpoint, each mapped to one HTTP status.
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    /// 404, the local path or object key does not exist.
    #[error("{location} not found")]
    NotFound { location: String },

    /// 416, with `Content-Range: bytes */{size}` when the size is known.
    #[error("requested range not satisfiable")]
    RangeNotSatisfiable { size: Option<u64> },

    /// 500, filesystem failure other than a missing file.
    #[error("i/o failure on {location}")]
    Io {
        location: String,
        #[source]
        source: io::Error,
    },

    /// 500, object store failure other than a missing key.
    #[error("object store failure")]
    Store(#[source] BoxError),
}

impl MediaError {
    /// Classifies a filesystem error, keeping a missing file apart from
    /// every other failure.
    pub fn from_io(source: io::Error, path: &Path) -> Self {
        let location = path.display().to_string();
        match source.kind() {
            io::ErrorKind::NotFound => MediaError::NotFound { location },
            _ => MediaError::Io { location, source },
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            MediaError::NotFound { .. } => StatusCode::NOT_FOUND,
            MediaError::RangeNotSatisfiable { .. } => StatusCode::RANGE_NOT_SATISFIABLE,
            MediaError::Io { .. } | MediaError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ObjectStoreError> for MediaError {
    fn from(err: ObjectStoreError) -> Self {
        match err {
            ObjectStoreError::NotFound { bucket, key } => MediaError::NotFound {
                location: format!("s3://{bucket}/{key}"),
            },
            ObjectStoreError::RangeNotSatisfiable => MediaError::RangeNotSatisfiable { size: None },
            ObjectStoreError::Other(source) => MediaError::Store(source),
        }
    }
}

impl IntoResponse for MediaError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            MediaError::NotFound { location } => {
                tracing::debug!(%location, "not found");
                (status, "Not found").into_response()
            }
            MediaError::RangeNotSatisfiable { size } => {
                let content_range = size.map(|size| TypedHeader(ContentRange::unsatisfied_bytes(size)));
                (status, TypedHeader(AcceptRanges::bytes()), content_range, ()).into_response()
            }
            err => {
                tracing::error!(error = ?err, "request failed");
                (status, "Internal server error").into_response()
            }
        }
    }
}

/// Errors an [`ObjectStore`](crate::ObjectStore) implementation reports.
#[derive(Debug, thiserror::Error)]
pub enum ObjectStoreError {
    #[error("no such key s3://{bucket}/{key}")]
    NotFound { bucket: String, key: String },

    #[error("requested range not satisfiable")]
    RangeNotSatisfiable,

    #[error(transparent)]
    Other(BoxError),
}
