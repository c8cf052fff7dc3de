use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::{ByteStream, DateTime as SmithyDateTime};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use super::backend::{BucketInfo, ObjectMetadata, StorageBackend};
use crate::cache::{ListingPage, ObjectEntry, PrefixEntry};
use crate::error::{RemoteError, RemoteErrorKind};

/// Delimiter used for every listing; folders are `/`-separated
pub const DELIMITER: &str = "/";

/// Characters escaped in `x-amz-copy-source`; `/` separates bucket and key
const COPY_SOURCE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// `bucket/key` as S3 expects it in a copy request (the server URL-decodes it)
pub fn copy_source(bucket: &str, key: &str) -> String {
    format!("{bucket}/{}", utf8_percent_encode(key, COPY_SOURCE))
}

/// Wrapper around AWS S3 client
pub struct S3Client {
    client: Client,
    region: String,
    /// `max-keys` for each listing page
    page_size: i32,
}

impl S3Client {
    /// Wrap an already configured SDK client
    pub fn from_client(client: Client, region: String) -> Self {
        S3Client {
            client,
            region,
            page_size: 1000,
        }
    }

    /// Set the page size used for listings
    pub fn with_page_size(mut self, page_size: i32) -> Self {
        self.page_size = page_size.clamp(1, 1000);
        self
    }

    /// Region the client was configured for
    pub fn region(&self) -> &str {
        &self.region
    }
}

/// Convert an SDK failure into a classified [`RemoteError`]
fn remote_error<E>(err: SdkError<E, HttpResponse>, context: String) -> RemoteError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    let kind = match &err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => RemoteErrorKind::Network,
        SdkError::ServiceError(ctx) => {
            RemoteErrorKind::from_status(ctx.raw().status().as_u16(), ctx.err().code())
        }
        SdkError::ResponseError(ctx) => {
            RemoteErrorKind::from_status(ctx.raw().status().as_u16(), None)
        }
        _ => RemoteErrorKind::Unknown,
    };
    let err = RemoteError::new(kind, format!("{context}: {}", DisplayErrorContext(&err)));
    log::warn!("{err}");
    err
}

fn to_chrono(d: &SmithyDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(d.secs(), d.subsec_nanos())
}

#[async_trait]
impl StorageBackend for S3Client {
    async fn list_buckets(&self) -> Result<Vec<BucketInfo>, RemoteError> {
        let resp = self
            .client
            .list_buckets()
            .send()
            .await
            .map_err(|e| remote_error(e, "Failed to list S3 buckets".to_string()))?;

        let buckets = resp
            .buckets()
            .iter()
            .map(|b| BucketInfo {
                name: b.name().unwrap_or("").to_string(),
                creation_date: b.creation_date().and_then(to_chrono),
            })
            .collect();

        Ok(buckets)
    }

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: Option<&str>,
        continuation_token: Option<&str>,
    ) -> Result<ListingPage, RemoteError> {
        let mut req = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .delimiter(DELIMITER)
            .max_keys(self.page_size);

        if let Some(prefix) = prefix.filter(|p| !p.is_empty()) {
            req = req.prefix(prefix);
        }

        if let Some(token) = continuation_token {
            req = req.continuation_token(token);
        }

        let resp = req.send().await.map_err(|e| {
            remote_error(
                e,
                format!("Failed to list s3://{}/{}", bucket, prefix.unwrap_or("")),
            )
        })?;

        let prefixes = resp
            .common_prefixes()
            .iter()
            .filter_map(|p| p.prefix())
            .map(PrefixEntry::new)
            .collect();

        let objects = resp
            .contents()
            .iter()
            .map(|obj| ObjectEntry {
                key: obj.key().unwrap_or("").to_string(),
                size: obj.size().unwrap_or(0).max(0) as u64,
                last_modified: obj.last_modified().and_then(to_chrono),
                etag: obj.e_tag().map(String::from),
                storage_class: obj.storage_class().map(|c| c.as_str().to_string()),
            })
            .collect();

        Ok(ListingPage {
            objects,
            prefixes,
            is_truncated: resp.is_truncated().unwrap_or(false),
            continuation_token: resp.next_continuation_token().map(String::from),
        })
    }

    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectMetadata, RemoteError> {
        let resp = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                remote_error(e, format!("Failed to get metadata for s3://{bucket}/{key}"))
            })?;

        Ok(ObjectMetadata {
            size: resp.content_length().unwrap_or(0).max(0) as u64,
            content_type: resp.content_type().map(String::from),
            last_modified: resp.last_modified().and_then(to_chrono),
            etag: resp.e_tag().map(String::from),
        })
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, RemoteError> {
        let resp = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| remote_error(e, format!("Failed to get object s3://{bucket}/{key}")))?;

        let bytes = resp
            .body
            .collect()
            .await
            .map_err(|e| {
                RemoteError::new(
                    RemoteErrorKind::Network,
                    format!("Failed to read body of s3://{bucket}/{key}: {e}"),
                )
            })?
            .into_bytes();

        Ok(bytes)
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> Result<(), RemoteError> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| remote_error(e, format!("Failed to write s3://{bucket}/{key}")))?;
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), RemoteError> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| remote_error(e, format!("Failed to delete s3://{bucket}/{key}")))?;
        Ok(())
    }

    async fn copy_object(
        &self,
        bucket: &str,
        source_key: &str,
        dest_key: &str,
    ) -> Result<(), RemoteError> {
        self.client
            .copy_object()
            .bucket(bucket)
            .copy_source(copy_source(bucket, source_key))
            .key(dest_key)
            .send()
            .await
            .map_err(|e| {
                remote_error(
                    e,
                    format!("Failed to copy s3://{bucket}/{source_key} to {dest_key}"),
                )
            })?;
        Ok(())
    }
}
