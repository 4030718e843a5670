// airtabletool/src/storage/s3.rs
use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::config::{BehaviorVersion, Credentials, Region};
use s3::error::DisplayErrorContext;
use s3::presigning::PresigningConfig;
use s3::primitives::ByteStream;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::{directory_url, object_url, AttachmentSink};
use crate::config::SpacesConfig;
use crate::errors::StorageError;

const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Sink that uploads attachments to an S3-compatible object storage service
/// (AWS S3, DigitalOcean Spaces, MinIO, ...).
#[derive(Debug, Clone)]
pub struct S3Sink {
    client: s3::Client,
    bucket: String,
    url_expiry: Duration,
    public_url_base: Option<Url>,
}

impl S3Sink {
    /// Builds a client from the storage configuration.
    ///
    /// Static credentials are used when both keys are configured; otherwise the
    /// AWS default provider chain (environment, profile, instance role) applies.
    pub async fn connect(spaces_config: &SpacesConfig) -> Result<Self, StorageError> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(spaces_config.region.clone()));
        if let Some(endpoint) = &spaces_config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        if let (Some(key_id), Some(secret)) = (
            &spaces_config.access_key_id,
            &spaces_config.secret_access_key,
        ) {
            loader = loader.credentials_provider(Credentials::new(
                key_id, secret, None, // session_token
                None, // expiry
                "Static",
            ));
        }
        let sdk_config = loader.load().await;

        let s3_config = s3::config::Builder::from(&sdk_config)
            .force_path_style(spaces_config.force_path_style)
            .build();

        let public_url_base = spaces_config
            .public_url_base
            .as_deref()
            .map(directory_url)
            .transpose()?;

        Ok(Self::from_client(
            s3::Client::from_conf(s3_config),
            spaces_config.bucket_name.clone(),
            Duration::from_secs(spaces_config.url_expiry_secs),
            public_url_base,
        ))
    }

    pub fn from_client(
        client: s3::Client,
        bucket: String,
        url_expiry: Duration,
        public_url_base: Option<Url>,
    ) -> Self {
        Self {
            client,
            bucket,
            url_expiry,
            public_url_base,
        }
    }
}

#[async_trait]
impl AttachmentSink for S3Sink {
    async fn write_text(&self, path: &str, contents: &str) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(path)
            .content_type(TEXT_CONTENT_TYPE)
            .body(ByteStream::from(contents.as_bytes().to_vec()))
            .send()
            .await
            .map_err(|e| {
                StorageError::S3Sdk(format!(
                    "Failed to upload object {} to bucket {}: {}",
                    path,
                    self.bucket,
                    DisplayErrorContext(&e)
                ))
            })?;

        debug!(bucket = %self.bucket, key = %path, size = contents.len(), "s3 sink: put_object");
        Ok(())
    }

    async fn url(&self, path: &str) -> Result<String, StorageError> {
        if let Some(base) = &self.public_url_base {
            return Ok(object_url(base, path)?.to_string());
        }

        let presigning = PresigningConfig::expires_in(self.url_expiry)
            .map_err(|e| StorageError::S3Sdk(format!("Invalid presigning expiry: {}", e)))?;
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .presigned(presigning)
            .await
            .map_err(|e| {
                StorageError::S3Sdk(format!(
                    "Failed to presign object {} in bucket {}: {}",
                    path,
                    self.bucket,
                    DisplayErrorContext(&e)
                ))
            })?;
        Ok(request.uri().to_string())
    }
}
