use std::path::Path;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::{media_headers, KnownSize, MediaError, Ranged};
use crate::media_type::media_type_for;

/// Serves a local file, whole or by range.
///
/// The path is stat'ed before anything is opened, so a missing file is a
/// 404 without a handle ever existing. A `Range` header that does not parse
/// gets the whole file.
pub async fn get(path: &Path, range: Option<&str>) -> Result<Response, MediaError> {
    stat(path).await?;

    let body = KnownSize::file(path).await
        .map_err(|err| MediaError::from_io(err, path))?;

    Ranged::new(range, body, media_type_for(path))
        .try_respond()
        .map(IntoResponse::into_response)
}

/// Headers only, sized to the whole file whatever range was asked for.
pub async fn head(path: &Path) -> Result<Response, MediaError> {
    let size = stat(path).await?;
    let headers = media_headers(size, media_type_for(path));
    Ok((StatusCode::OK, headers).into_response())
}

/// Size of the regular file at `path`. Anything that is not a regular
/// file, a directory for instance, is reported as not found.
async fn stat(path: &Path) -> Result<u64, MediaError> {
    let metadata = tokio::fs::metadata(path).await
        .map_err(|err| MediaError::from_io(err, path))?;

    if !metadata.is_file() {
        return Err(MediaError::NotFound { location: path.display().to_string() });
    }

    Ok(metadata.len())
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::Path;

    use assert_matches::assert_matches;
    use axum::http::{HeaderValue, StatusCode};
    use axum::response::Response;
    use futures::StreamExt;

    use crate::MediaError;

    async fn body_bytes(response: Response) -> Vec<u8> {
        response.into_body()
            .into_data_stream()
            .map(|chunk| chunk.unwrap().to_vec())
            .collect::<Vec<_>>()
            .await
            .concat()
    }

    fn thousand_bytes() -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".bin").tempfile().unwrap();
        let data: Vec<u8> = (0..1000u32).map(|i| (i % 256) as u8).collect();
        file.write_all(&data).unwrap();
        file
    }

    #[tokio::test]
    async fn test_full_file() {
        let file = thousand_bytes();
        let response = super::get(file.path(), None).await.unwrap();

        assert_eq!(StatusCode::OK, response.status());
        assert_eq!(Some(&HeaderValue::from_static("1000")), response.headers().get("Content-Length"));
        assert_eq!(Some(&HeaderValue::from_static("bytes")), response.headers().get("Accept-Ranges"));

        let expected = std::fs::read(file.path()).unwrap();
        assert_eq!(expected, body_bytes(response).await);
    }

    #[tokio::test]
    async fn test_first_hundred_bytes() {
        let file = thousand_bytes();
        let response = super::get(file.path(), Some("bytes=0-99")).await.unwrap();

        assert_eq!(StatusCode::PARTIAL_CONTENT, response.status());
        assert_eq!(Some(&HeaderValue::from_static("bytes 0-99/1000")), response.headers().get("Content-Range"));
        assert_eq!(Some(&HeaderValue::from_static("100")), response.headers().get("Content-Length"));
        assert_eq!(100, body_bytes(response).await.len());
    }

    #[tokio::test]
    async fn test_open_ended_range() {
        let file = thousand_bytes();
        let response = super::get(file.path(), Some("bytes=500-")).await.unwrap();

        assert_eq!(StatusCode::PARTIAL_CONTENT, response.status());
        assert_eq!(Some(&HeaderValue::from_static("bytes 500-999/1000")), response.headers().get("Content-Range"));
        assert_eq!(Some(&HeaderValue::from_static("500")), response.headers().get("Content-Length"));

        let expected = std::fs::read(file.path()).unwrap();
        assert_eq!(&expected[500..], &body_bytes(response).await[..]);
    }

    #[tokio::test]
    async fn test_malformed_range_falls_back() {
        let file = thousand_bytes();
        let response = super::get(file.path(), Some("bytes=abc-def")).await.unwrap();

        assert_eq!(StatusCode::OK, response.status());
        assert!(response.headers().get("Content-Range").is_none());
        assert_eq!(1000, body_bytes(response).await.len());
    }

    #[tokio::test]
    async fn test_missing_file() {
        let err = super::get(Path::new("test/does-not-exist.mp4"), Some("bytes=0-1")).await.unwrap_err();
        assert_matches!(err, MediaError::NotFound { .. });

        let err = super::head(Path::new("test/does-not-exist.mp4")).await.unwrap_err();
        assert_matches!(err, MediaError::NotFound { .. });
    }

    #[tokio::test]
    async fn test_directory_is_not_found() {
        let err = super::get(Path::new("test"), None).await.unwrap_err();
        assert_matches!(err, MediaError::NotFound { .. });
    }

    #[tokio::test]
    async fn test_head_reports_full_size() {
        let response = super::head(Path::new("test/fixture.txt")).await.unwrap();

        assert_eq!(StatusCode::OK, response.status());
        assert_eq!(Some(&HeaderValue::from_static("54")), response.headers().get("Content-Length"));
        assert_eq!(Some(&HeaderValue::from_static("text/plain")), response.headers().get("Content-Type"));
        assert!(body_bytes(response).await.is_empty());
    }
}
