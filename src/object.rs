use std::pin::Pin;

use async_trait::async_trait;
use axum::http::{HeaderValue, StatusCode};
use axum::http::header::CONTENT_RANGE;
use axum::response::{IntoResponse, Response};
use tokio::io::AsyncRead;

use crate::{media_headers, ForwardOnly, KnownSize, MediaError, ObjectStoreError, RangedStream};
use crate::media_type::media_type_for;

/// Response body of an object store GET, positioned at the first byte
/// the store returned.
pub type ObjectBody = Pin<Box<dyn AsyncRead + Send>>;

pub struct GetObjectOutput {
    pub body: ObjectBody,
    /// Bytes in `body`, the requested span for ranged GETs.
    pub content_length: u64,
    /// `Content-Range` as the store reported it.
    pub content_range: Option<String>,
}

impl std::fmt::Debug for GetObjectOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GetObjectOutput")
            .field("content_length", &self.content_length)
            .field("content_range", &self.content_range)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectMeta {
    pub content_length: u64,
}

/// An S3 compatible object store.
///
/// Implementations must not block the calling task; a client built on
/// blocking I/O has to hand its calls to [`tokio::task::spawn_blocking`].
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// GET an object, passing `range` through verbatim as the `Range`
    /// header when present.
    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        range: Option<&str>,
    ) -> Result<GetObjectOutput, ObjectStoreError>;

    /// HEAD an object.
    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectMeta, ObjectStoreError>;
}

/// Serves an object, streaming its body in [`BLOCK_SIZE`](crate::BLOCK_SIZE) chunks.
///
/// The status is 206 when a range was requested and the store honoured it
/// with a `Content-Range`, otherwise 200.
pub async fn get(
    store: &dyn ObjectStore,
    bucket: &str,
    key: &str,
    range: Option<&str>,
) -> Result<Response, MediaError> {
    let object = store.get_object(bucket, key, range).await?;

    let content_range = object.content_range
        .as_deref()
        .map(HeaderValue::from_str)
        .transpose()
        .map_err(|err| MediaError::Store(err.into()))?;

    let status = match (&range, &content_range) {
        (Some(_), Some(_)) => StatusCode::PARTIAL_CONTENT,
        (Some(requested), None) => {
            tracing::debug!(%requested, bucket, key, "store ignored range, serving full object");
            StatusCode::OK
        }
        (None, _) => StatusCode::OK,
    };

    let mut headers = media_headers(object.content_length, media_type_for(key));
    if let Some(content_range) = content_range {
        headers.insert(CONTENT_RANGE, content_range);
    }

    let body = KnownSize::sized(ForwardOnly::new(object.body), object.content_length);
    let stream = RangedStream::new(body, 0, Some(object.content_length));

    Ok((status, headers, stream).into_response())
}

/// Headers for an object without fetching its body. Always the full size.
pub async fn head(store: &dyn ObjectStore, bucket: &str, key: &str) -> Result<Response, MediaError> {
    let meta = store.head_object(bucket, key).await?;
    let headers = media_headers(meta.content_length, media_type_for(key));
    Ok((StatusCode::OK, headers).into_response())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Cursor;

    use async_trait::async_trait;
    use axum::http::{HeaderValue, StatusCode};
    use futures::StreamExt;

    use crate::{GetObjectOutput, MediaError, ObjectMeta, ObjectStore, ObjectStoreError, RangeSpec};

    /// Answers like S3 does, honouring ranges unless told to ignore them.
    #[derive(Default)]
    struct MemoryStore {
        objects: HashMap<(String, String), Vec<u8>>,
        ignore_ranges: bool,
    }

    impl MemoryStore {
        fn with(bucket: &str, key: &str, data: &[u8]) -> Self {
            let mut store = MemoryStore::default();
            store.objects.insert((bucket.into(), key.into()), data.to_vec());
            store
        }

        fn lookup(&self, bucket: &str, key: &str) -> Result<&Vec<u8>, ObjectStoreError> {
            self.objects.get(&(bucket.to_string(), key.to_string()))
                .ok_or_else(|| ObjectStoreError::NotFound { bucket: bucket.into(), key: key.into() })
        }
    }

    #[async_trait]
    impl ObjectStore for MemoryStore {
        async fn get_object(&self, bucket: &str, key: &str, range: Option<&str>) -> Result<GetObjectOutput, ObjectStoreError> {
            let data = self.lookup(bucket, key)?;
            let size = data.len() as u64;
            match range.filter(|_| !self.ignore_ranges) {
                Some(header) => {
                    let range = RangeSpec::parse(header, size)
                        .map_err(|_| ObjectStoreError::RangeNotSatisfiable)?;
                    let slice = data[range.start as usize..=range.end as usize].to_vec();
                    Ok(GetObjectOutput {
                        content_length: slice.len() as u64,
                        body: Box::pin(Cursor::new(slice)),
                        content_range: Some(format!("bytes {}-{}/{}", range.start, range.end, size)),
                    })
                }
                None => Ok(GetObjectOutput {
                    content_length: size,
                    body: Box::pin(Cursor::new(data.clone())),
                    content_range: None,
                }),
            }
        }

        async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectMeta, ObjectStoreError> {
            let data = self.lookup(bucket, key)?;
            Ok(ObjectMeta { content_length: data.len() as u64 })
        }
    }

    async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
        response.into_body()
            .into_data_stream()
            .map(|chunk| chunk.unwrap().to_vec())
            .collect::<Vec<_>>()
            .await
            .concat()
    }

    fn png() -> Vec<u8> {
        (0..20_000u32).map(|i| (i % 256) as u8).collect()
    }

    #[tokio::test]
    async fn test_full_object() {
        let store = MemoryStore::with("bucket", "key.png", &png());
        let response = super::get(&store, "bucket", "key.png", None).await.unwrap();

        assert_eq!(StatusCode::OK, response.status());
        let head = response.headers();
        assert_eq!(Some(&HeaderValue::from_static("image/png")), head.get("Content-Type"));
        assert_eq!(Some(&HeaderValue::from_static("20000")), head.get("Content-Length"));
        assert_eq!(Some(&HeaderValue::from_static("bytes")), head.get("Accept-Ranges"));
        assert!(head.get("Content-Range").is_none());

        assert_eq!(png(), body_bytes(response).await);
    }

    #[tokio::test]
    async fn test_ranged_object() {
        let store = MemoryStore::with("bucket", "clip.mp4", &png());
        let response = super::get(&store, "bucket", "clip.mp4", Some("bytes=100-8291")).await.unwrap();

        assert_eq!(StatusCode::PARTIAL_CONTENT, response.status());
        let head = response.headers();
        assert_eq!(Some(&HeaderValue::from_static("video/mp4")), head.get("Content-Type"));
        assert_eq!(Some(&HeaderValue::from_static("8192")), head.get("Content-Length"));
        assert_eq!(Some(&HeaderValue::from_static("bytes 100-8291/20000")), head.get("Content-Range"));

        assert_eq!(&png()[100..8292], &body_bytes(response).await[..]);
    }

    #[tokio::test]
    async fn test_ignored_range_is_full() {
        let mut store = MemoryStore::with("bucket", "key.gif", b"GIF89a");
        store.ignore_ranges = true;
        let response = super::get(&store, "bucket", "key.gif", Some("bytes=0-1")).await.unwrap();

        assert_eq!(StatusCode::OK, response.status());
        assert_eq!(Some(&HeaderValue::from_static("image/gif")), response.headers().get("Content-Type"));
        assert_eq!(b"GIF89a".to_vec(), body_bytes(response).await);
    }

    #[tokio::test]
    async fn test_missing_key() {
        let store = MemoryStore::default();
        let err = super::get(&store, "bucket", "nope.jpg", None).await.unwrap_err();
        assert_eq!(StatusCode::NOT_FOUND, err.status());

        let err = super::head(&store, "bucket", "nope.jpg").await.unwrap_err();
        assert!(matches!(err, MediaError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_head_object() {
        let store = MemoryStore::with("bucket", "a.jpeg", &png());
        let response = super::head(&store, "bucket", "a.jpeg").await.unwrap();

        assert_eq!(StatusCode::OK, response.status());
        assert_eq!(Some(&HeaderValue::from_static("image/jpeg")), response.headers().get("Content-Type"));
        assert_eq!(Some(&HeaderValue::from_static("20000")), response.headers().get("Content-Length"));
        assert!(body_bytes(response).await.is_empty());
    }
}
