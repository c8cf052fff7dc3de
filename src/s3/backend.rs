use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::cache::ListingPage;
use crate::error::RemoteError;

/// Information about a bucket
#[derive(Debug, Clone, PartialEq)]
pub struct BucketInfo {
    pub name: String,
    pub creation_date: Option<DateTime<Utc>>,
}

/// Metadata about a single object
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectMetadata {
    pub size: u64,
    pub content_type: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
    pub etag: Option<String>,
}

/// Remote calls the browse layer depends on.
///
/// `list_objects` is the listing RPC: one delimited page under `prefix`,
/// continuing from `continuation_token` when given. Mutations carry no
/// cache responsibility here; callers invalidate after they succeed.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn list_buckets(&self) -> Result<Vec<BucketInfo>, RemoteError>;

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: Option<&str>,
        continuation_token: Option<&str>,
    ) -> Result<ListingPage, RemoteError>;

    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectMetadata, RemoteError>;

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, RemoteError>;

    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> Result<(), RemoteError>;

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), RemoteError>;

    /// Server-side copy within one bucket
    async fn copy_object(
        &self,
        bucket: &str,
        source_key: &str,
        dest_key: &str,
    ) -> Result<(), RemoteError>;
}
