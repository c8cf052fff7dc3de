//! In-process object store with S3 listing semantics.
//!
//! Keys are kept sorted, listings group keys under `/`-delimited common
//! prefixes, and pages are cut at `page_size` items (objects and prefixes
//! both count, as with `max-keys`). Failures can be queued to exercise the
//! error paths of the listing layer.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};
use std::time::Duration;

use super::backend::{BucketInfo, ObjectMetadata, StorageBackend};
use crate::cache::{ListingPage, ObjectEntry, PrefixEntry};
use crate::error::{RemoteError, RemoteErrorKind};

const TOKEN_TAG: &str = "mem1:";

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    last_modified: DateTime<Utc>,
}

#[derive(Debug)]
struct Bucket {
    created: DateTime<Utc>,
    objects: BTreeMap<String, StoredObject>,
}

/// In-memory [`StorageBackend`]
#[derive(Debug)]
pub struct MemoryBackend {
    buckets: RwLock<BTreeMap<String, Bucket>>,
    page_size: usize,
    latency: Option<Duration>,
    failures: Mutex<VecDeque<RemoteError>>,
    list_calls: AtomicUsize,
    mutation_calls: AtomicUsize,
}

impl MemoryBackend {
    pub fn new(page_size: usize) -> Self {
        MemoryBackend {
            buckets: RwLock::new(BTreeMap::new()),
            page_size: page_size.max(1),
            latency: None,
            failures: Mutex::new(VecDeque::new()),
            list_calls: AtomicUsize::new(0),
            mutation_calls: AtomicUsize::new(0),
        }
    }

    /// Delay every call by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn create_bucket(&self, name: &str) {
        self.buckets
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(name.to_string())
            .or_insert_with(|| Bucket {
                created: Utc::now(),
                objects: BTreeMap::new(),
            });
    }

    /// Store an object directly, creating the bucket if needed
    pub fn insert(&self, bucket: &str, key: &str, data: impl Into<Bytes>) {
        self.create_bucket(bucket);
        let mut buckets = self.buckets.write().unwrap_or_else(|e| e.into_inner());
        if let Some(b) = buckets.get_mut(bucket) {
            b.objects.insert(
                key.to_string(),
                StoredObject {
                    data: data.into(),
                    last_modified: Utc::now(),
                },
            );
        }
    }

    /// Remove a bucket and everything in it
    pub fn drop_bucket(&self, bucket: &str) {
        self.buckets
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(bucket);
    }

    /// Sorted keys currently stored in a bucket
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.buckets
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(bucket)
            .map(|b| b.objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Make the next remote call fail with `kind`
    pub fn fail_next(&self, kind: RemoteErrorKind) {
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(RemoteError::new(kind, "injected failure"));
    }

    /// Number of `list_objects` calls served so far
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Number of put/delete/copy calls served so far
    pub fn mutation_calls(&self) -> usize {
        self.mutation_calls.load(Ordering::SeqCst)
    }

    async fn begin_call(&self) -> Result<(), RemoteError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        match self
            .failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
        {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn no_such_bucket(bucket: &str) -> RemoteError {
        RemoteError::new(
            RemoteErrorKind::NotFound,
            format!("NoSuchBucket: {bucket}"),
        )
    }

    fn no_such_key(bucket: &str, key: &str) -> RemoteError {
        RemoteError::new(
            RemoteErrorKind::NotFound,
            format!("NoSuchKey: s3://{bucket}/{key}"),
        )
    }
}

enum Item {
    Object(ObjectEntry),
    Prefix(String),
}

impl Item {
    fn name(&self) -> &str {
        match self {
            Item::Object(obj) => &obj.key,
            Item::Prefix(p) => p,
        }
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn list_buckets(&self) -> Result<Vec<BucketInfo>, RemoteError> {
        self.begin_call().await?;
        let buckets = self.buckets.read().unwrap_or_else(|e| e.into_inner());
        Ok(buckets
            .iter()
            .map(|(name, b)| BucketInfo {
                name: name.clone(),
                creation_date: Some(b.created),
            })
            .collect())
    }

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: Option<&str>,
        continuation_token: Option<&str>,
    ) -> Result<ListingPage, RemoteError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.begin_call().await?;

        let start_after = match continuation_token {
            Some(token) => Some(token.strip_prefix(TOKEN_TAG).ok_or_else(|| {
                RemoteError::new(
                    RemoteErrorKind::BadRequest,
                    "InvalidArgument: The continuation token provided is incorrect",
                )
            })?),
            None => None,
        };

        let buckets = self.buckets.read().unwrap_or_else(|e| e.into_inner());
        let b = buckets.get(bucket).ok_or_else(|| Self::no_such_bucket(bucket))?;
        let prefix = prefix.unwrap_or("");

        let mut items: Vec<Item> = Vec::new();
        let mut is_truncated = false;

        for (key, obj) in b.objects.range(prefix.to_string()..) {
            if !key.starts_with(prefix) {
                break;
            }
            let rest = &key[prefix.len()..];
            let item = match rest.find('/') {
                Some(pos) => Item::Prefix(format!("{prefix}{}", &rest[..=pos])),
                None => Item::Object(ObjectEntry {
                    key: key.clone(),
                    size: obj.data.len() as u64,
                    last_modified: Some(obj.last_modified),
                    etag: Some(format!("\"{:x}\"", obj.data.len())),
                    storage_class: Some("STANDARD".to_string()),
                }),
            };

            if start_after.is_some_and(|after| item.name() <= after) {
                continue;
            }
            // Keys under one common prefix are contiguous
            if items.last().is_some_and(|last| last.name() == item.name()) {
                continue;
            }
            if items.len() == self.page_size {
                is_truncated = true;
                break;
            }
            items.push(item);
        }

        let continuation_token = if is_truncated {
            items.last().map(|i| format!("{TOKEN_TAG}{}", i.name()))
        } else {
            None
        };

        let mut page = ListingPage {
            is_truncated,
            continuation_token,
            ..ListingPage::default()
        };
        for item in items {
            match item {
                Item::Object(obj) => page.objects.push(obj),
                Item::Prefix(p) => page.prefixes.push(PrefixEntry::new(p)),
            }
        }
        Ok(page)
    }

    async fn head_object(&self, bucket: &str, key: &str) -> Result<ObjectMetadata, RemoteError> {
        self.begin_call().await?;
        let buckets = self.buckets.read().unwrap_or_else(|e| e.into_inner());
        let b = buckets.get(bucket).ok_or_else(|| Self::no_such_bucket(bucket))?;
        let obj = b
            .objects
            .get(key)
            .ok_or_else(|| Self::no_such_key(bucket, key))?;
        Ok(ObjectMetadata {
            size: obj.data.len() as u64,
            content_type: None,
            last_modified: Some(obj.last_modified),
            etag: None,
        })
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, RemoteError> {
        self.begin_call().await?;
        let buckets = self.buckets.read().unwrap_or_else(|e| e.into_inner());
        let b = buckets.get(bucket).ok_or_else(|| Self::no_such_bucket(bucket))?;
        b.objects
            .get(key)
            .map(|o| o.data.clone())
            .ok_or_else(|| Self::no_such_key(bucket, key))
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> Result<(), RemoteError> {
        self.mutation_calls.fetch_add(1, Ordering::SeqCst);
        self.begin_call().await?;
        let mut buckets = self.buckets.write().unwrap_or_else(|e| e.into_inner());
        let b = buckets
            .get_mut(bucket)
            .ok_or_else(|| Self::no_such_bucket(bucket))?;
        b.objects.insert(
            key.to_string(),
            StoredObject {
                data: body,
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), RemoteError> {
        self.mutation_calls.fetch_add(1, Ordering::SeqCst);
        self.begin_call().await?;
        let mut buckets = self.buckets.write().unwrap_or_else(|e| e.into_inner());
        let b = buckets
            .get_mut(bucket)
            .ok_or_else(|| Self::no_such_bucket(bucket))?;
        // Deleting a missing key succeeds, as on S3
        b.objects.remove(key);
        Ok(())
    }

    async fn copy_object(
        &self,
        bucket: &str,
        source_key: &str,
        dest_key: &str,
    ) -> Result<(), RemoteError> {
        self.mutation_calls.fetch_add(1, Ordering::SeqCst);
        self.begin_call().await?;
        let mut buckets = self.buckets.write().unwrap_or_else(|e| e.into_inner());
        let b = buckets
            .get_mut(bucket)
            .ok_or_else(|| Self::no_such_bucket(bucket))?;
        let obj = b
            .objects
            .get(source_key)
            .cloned()
            .ok_or_else(|| Self::no_such_key(bucket, source_key))?;
        b.objects.insert(
            dest_key.to_string(),
            StoredObject {
                data: obj.data,
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }
}
