#![doc = "S3 integration: implements the core `ObjectStore` contract on top of aws-sdk-s3."]
//
//! # S3 Store
//!
//! [`S3Store`] is the live [`ObjectStore`] used by the CLI. Construction performs
//! all startup-fatal work: credential wiring, optional custom endpoint, and
//! bucket-region resolution when no region is configured.
//!
//! ## Error classification
//! - `SdkError::ServiceError` → [`StoreError::Service`] (retried by the worker)
//! - timeouts, dispatch failures, unreadable responses → [`StoreError::Transport`] (retried)
//! - anything else, including a local body that cannot be streamed → [`StoreError::Unclassified`] (fatal)

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::Client;
use bucket_mirror_core::contract::{ObjectStore, PutObjectRequest, StoreError};
use bucket_mirror_core::MirrorError;
use std::fmt;

/// Region used to ask S3 where a bucket lives.
pub const REGION_PROBE: &str = "us-west-2";
const BUCKET_REGION_HEADER: &str = "x-amz-bucket-region";

/// Static access key pair.
#[derive(Clone, PartialEq, Eq)]
pub struct StaticCredentials {
    pub access_key: String,
    pub secret_key: String,
}

impl fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Everything needed to build the S3 client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSettings {
    pub bucket: String,
    /// `None` resolves the region from the bucket itself.
    pub region: Option<String>,
    /// Custom S3-compatible endpoint (MinIO, R2, ...).
    pub endpoint: Option<String>,
    pub path_style: bool,
    /// `None` falls back to the SDK default credential chain.
    pub credentials: Option<StaticCredentials>,
}

pub struct S3Store {
    client: Client,
    region: String,
}

impl S3Store {
    /// Build a client for `settings`, resolving the bucket region if necessary.
    pub async fn connect(settings: &StoreSettings) -> Result<Self, MirrorError> {
        let region = match &settings.region {
            Some(region) if !region.is_empty() => region.clone(),
            _ => {
                tracing::info!(bucket = %settings.bucket, "No region configured, resolving from bucket");
                let probe = build_client(settings, REGION_PROBE).await;
                resolve_bucket_region(&probe, &settings.bucket)
                    .await
                    .ok_or_else(|| MirrorError::Config("unknown region".to_string()))?
            }
        };
        tracing::info!(
            bucket = %settings.bucket,
            region = %region,
            endpoint = ?settings.endpoint,
            static_credentials = settings.credentials.is_some(),
            "Initialized S3 client"
        );
        Ok(Self {
            client: build_client(settings, &region).await,
            region,
        })
    }

    pub fn region(&self) -> &str {
        &self.region
    }
}

async fn build_client(settings: &StoreSettings, region: &str) -> Client {
    let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region.to_string()));
    if let Some(creds) = &settings.credentials {
        loader = loader.credentials_provider(Credentials::new(
            creds.access_key.clone(),
            creds.secret_key.clone(),
            None,
            None,
            "bucket-mirror",
        ));
    }
    if let Some(endpoint) = &settings.endpoint {
        loader = loader.endpoint_url(endpoint);
    }
    let sdk_config = loader.load().await;
    let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
        .force_path_style(settings.path_style)
        .build();
    Client::from_conf(s3_config)
}

/// Ask S3 for the region of `bucket`. A redirect error still carries the region header.
async fn resolve_bucket_region(client: &Client, bucket: &str) -> Option<String> {
    match client.head_bucket().bucket(bucket).send().await {
        Ok(output) => output.bucket_region().map(str::to_string),
        Err(SdkError::ServiceError(err)) => {
            let region = err
                .raw()
                .headers()
                .get(BUCKET_REGION_HEADER)
                .map(str::to_string);
            if region.is_none() {
                tracing::error!(bucket, error = ?err.err(), "HeadBucket failed without a region hint");
            }
            region
        }
        Err(e) => {
            tracing::error!(bucket, error = %e, "Failed to resolve bucket region");
            None
        }
    }
}

/// Map an SDK failure onto the pipeline's retry classification.
pub fn classify<E, R>(err: SdkError<E, R>) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: fmt::Debug,
{
    match err {
        SdkError::ServiceError(service) => {
            let inner = service.err();
            StoreError::Service {
                code: inner.code().unwrap_or("Unknown").to_string(),
                message: inner.message().unwrap_or_default().to_string(),
            }
        }
        SdkError::TimeoutError(_) => StoreError::Transport("request timed out".to_string()),
        SdkError::DispatchFailure(failure) => StoreError::Transport(format!("dispatch failure: {failure:?}")),
        SdkError::ResponseError(response) => StoreError::Transport(format!("response error: {response:?}")),
        other => StoreError::Unclassified(other.to_string()),
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put_object(&self, req: PutObjectRequest) -> Result<(), StoreError> {
        let body = ByteStream::read_from()
            .file(req.body)
            .build()
            .await
            .map_err(|e| StoreError::Unclassified(format!("failed to stream {}: {e}", req.key)))?;

        tracing::debug!(bucket = %req.bucket, key = %req.key, content_type = %req.content_type, "Putting object");
        let result = self
            .client
            .put_object()
            .bucket(&req.bucket)
            .key(&req.key)
            .acl(ObjectCannedAcl::from(req.acl.as_str()))
            .content_type(&req.content_type)
            .set_cache_control(req.cache_control.clone())
            .body(body)
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                let classified = classify(e);
                tracing::error!(key = %req.key, error = %classified, "S3 put_object failed");
                Err(classified)
            }
        }
    }
}
