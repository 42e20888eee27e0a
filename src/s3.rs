//! [`ObjectStore`] over aws-sdk-s3, for AWS itself or any S3 compatible
//! service (MinIO, localstack, ...).

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::Client;

use crate::{GetObjectOutput, ObjectMeta, ObjectStore, ObjectStoreError};

/// S3 client configuration options
#[derive(Debug, Clone, Default)]
pub struct S3Config {
    /// Custom endpoint URL (e.g. for MinIO or localstack)
    pub endpoint: Option<String>,
    /// AWS region (optional, will use default if not specified)
    pub region: Option<String>,
    /// Force path-style access (required for some S3-compatible services)
    pub force_path_style: bool,
}

#[derive(Debug, Clone)]
pub struct S3Store {
    client: Client,
}

impl S3Store {
    /// Builds a client from the default AWS credential and region chain,
    /// overridden by `config`.
    pub async fn connect(config: &S3Config) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());

        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }

        let sdk_config = loader.load().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);

        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        if config.force_path_style {
            builder = builder.force_path_style(true);
        }

        tracing::info!(endpoint = ?config.endpoint, region = ?config.region, "s3 client configured");
        S3Store::from_client(Client::from_conf(builder.build()))
    }

    pub fn from_client(client: Client) -> Self {
        S3Store { client }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        range: Option<&str>,
    ) -> Result<GetObjectOutput, ObjectStoreError> {
        let output = self.client
            .get_object()
            .bucket(bucket)
            .key(key)
            .set_range(range.map(str::to_owned))
            .send()
            .await
            .map_err(|err| {
                let missing = err.as_service_error().is_some_and(|e| e.is_no_such_key());
                store_error(err, missing, bucket, key)
            })?;

        let content_length = output.content_length()
            .and_then(|len| u64::try_from(len).ok())
            .unwrap_or_default();
        let content_range = output.content_range().map(str::to_owned);

        Ok(GetObjectOutput {
            body: Box::pin(output.body.into_async_read()),
            content_length,
            content_range,
        })
    }

    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectMeta, ObjectStoreError> {
        let output = self.client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| {
                let missing = err.as_service_error().is_some_and(|e| e.is_not_found());
                store_error(err, missing, bucket, key)
            })?;

        let content_length = output.content_length()
            .and_then(|len| u64::try_from(len).ok())
            .unwrap_or_default();

        Ok(ObjectMeta { content_length })
    }
}

fn store_error<E>(err: SdkError<E, HttpResponse>, missing: bool, bucket: &str, key: &str) -> ObjectStoreError
where
    E: std::error::Error + Send + Sync + 'static,
{
    let status = err.raw_response().map(|response| response.status().as_u16());

    match status {
        _ if missing => ObjectStoreError::NotFound { bucket: bucket.into(), key: key.into() },
        Some(404) => ObjectStoreError::NotFound { bucket: bucket.into(), key: key.into() },
        Some(416) => ObjectStoreError::RangeNotSatisfiable,
        _ => {
            tracing::warn!(bucket, key, ?status, error = %err, "object store request failed");
            ObjectStoreError::Other(Box::new(err))
        }
    }
}
