//! Object storage for uploaded drug images and documents.

use std::io::Cursor;

use async_trait::async_trait;
use minio::s3::args::{BucketExistsArgs, MakeBucketArgs, PutObjectArgs, RemoveObjectArgs, StatObjectArgs};
use minio::s3::client::{Client, ClientBuilder};
use minio::s3::creds::StaticProvider;
use minio::s3::error::Error as S3ClientError;
use minio::s3::http::BaseUrl;
use tracing::{debug, error, info, instrument, warn};

use crate::config::MinioConfig;

#[derive(Debug, thiserror::Error)]
pub enum MinioError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Connection error: {0}")]
    ConnectionError(String),
    #[error("Operation error: {0}")]
    OperationError(String),
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("Object not found: {0}")]
    ObjectNotFound(String),
}

/// Flat key/value blob store behind the upload routes.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_object(&self, object_name: &str, data: Vec<u8>, content_type: Option<&str>) -> Result<(), MinioError>;
    /// Fails with `ObjectNotFound` when nothing is stored under `object_name`.
    async fn remove_object(&self, object_name: &str) -> Result<(), MinioError>;
    fn object_url(&self, object_name: &str) -> String;
}

pub fn public_link(links_prefix: &str, bucket: &str, object_name: &str) -> String {
    format!("{}/{}/{}", links_prefix.trim_end_matches('/'), bucket, object_name)
}

fn operation_error(action: &str, e: S3ClientError) -> MinioError {
    error!("MinIO {} failed: {}", action, e);
    MinioError::OperationError(format!("{} failed: {}", action, e))
}

/// MinIO-backed store scoped to one bucket.
#[derive(Debug, Clone)]
pub struct MinioService {
    client: Client,
    bucket: String,
    links_prefix: String,
}

impl MinioService {
    /// Connects and creates the bucket when it is missing.
    #[instrument(skip(config), fields(endpoint = %config.endpoint, bucket = %config.bucket_name))]
    pub async fn new(config: MinioConfig) -> Result<Self, MinioError> {
        config.validate().map_err(|e| MinioError::ConfigError(e.to_string()))?;

        let base_url = config
            .get_endpoint_url()
            .parse::<BaseUrl>()
            .map_err(|e| MinioError::ConnectionError(format!("Invalid endpoint URL: {}", e)))?;
        let provider = StaticProvider::new(&config.access_key, &config.secret_key, None);
        let client = ClientBuilder::new(base_url)
            .provider(Some(Box::new(provider)))
            .build()
            .map_err(|e| MinioError::ConnectionError(format!("Client creation failed: {}", e)))?;

        let service = MinioService { client, bucket: config.bucket_name, links_prefix: config.links_prefix };
        service.ensure_bucket().await?;
        info!("Object storage ready");
        Ok(service)
    }

    async fn ensure_bucket(&self) -> Result<(), MinioError> {
        let exists_args =
            BucketExistsArgs::new(&self.bucket).map_err(|e| MinioError::InvalidArguments(e.to_string()))?;
        if self
            .client
            .bucket_exists(&exists_args)
            .await
            .map_err(|e| operation_error("bucket check", e))?
        {
            debug!(bucket = %self.bucket, "Bucket exists");
            return Ok(());
        }
        warn!(bucket = %self.bucket, "Bucket missing, creating it");
        let make_args = MakeBucketArgs::new(&self.bucket).map_err(|e| MinioError::InvalidArguments(e.to_string()))?;
        self.client
            .make_bucket(&make_args)
            .await
            .map_err(|e| operation_error("bucket creation", e))?;
        Ok(())
    }

    async fn exists(&self, object_name: &str) -> Result<bool, MinioError> {
        let args =
            StatObjectArgs::new(&self.bucket, object_name).map_err(|e| MinioError::InvalidArguments(e.to_string()))?;
        match self.client.stat_object(&args).await {
            Ok(_) => Ok(true),
            Err(S3ClientError::S3Error(response)) if response.code == "NoSuchKey" => Ok(false),
            Err(e) => Err(operation_error("stat", e)),
        }
    }
}

#[async_trait]
impl ObjectStore for MinioService {
    #[instrument(skip(self, data), fields(size = data.len()))]
    async fn put_object(&self, object_name: &str, data: Vec<u8>, content_type: Option<&str>) -> Result<(), MinioError> {
        let client = self.client.clone();
        let bucket = self.bucket.clone();
        let object_name = object_name.to_string();
        let content_type = content_type.map(str::to_string);

        // PutObjectArgs holds a non-Send reader, so the upload runs on the blocking pool.
        tokio::task::spawn_blocking(move || {
            let size = data.len();
            let mut reader = Cursor::new(data);
            let mut args = PutObjectArgs::new(&bucket, &object_name, &mut reader, Some(size), None)
                .map_err(|e| MinioError::InvalidArguments(e.to_string()))?;
            if let Some(content_type) = content_type.as_deref() {
                args.content_type = content_type;
            }
            futures::executor::block_on(client.put_object(&mut args)).map_err(|e| operation_error("upload", e))?;
            debug!(object = %object_name, "Object stored");
            Ok(())
        })
        .await
        .map_err(|e| MinioError::OperationError(format!("Upload task failed: {}", e)))?
    }

    #[instrument(skip(self))]
    async fn remove_object(&self, object_name: &str) -> Result<(), MinioError> {
        if !self.exists(object_name).await? {
            return Err(MinioError::ObjectNotFound(object_name.to_string()));
        }
        let args =
            RemoveObjectArgs::new(&self.bucket, object_name).map_err(|e| MinioError::InvalidArguments(e.to_string()))?;
        self.client
            .remove_object(&args)
            .await
            .map_err(|e| operation_error("delete", e))?;
        Ok(())
    }

    fn object_url(&self, object_name: &str) -> String {
        public_link(&self.links_prefix, &self.bucket, object_name)
    }
}
