//! The shared read path: consult the cache, fetch on a miss, populate,
//! hand the entry back for materializing.
//!
//! Concurrent requests for one key are not coalesced. Both fetches run and
//! both write; the later write wins. Either result reflects the same remote
//! state, so this only costs an extra request.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use crate::cache::{CacheEntry, ListingCache, ListingKey, ListingPage};
use crate::error::{BrowseError, RemoteErrorKind, Result};
use crate::s3::metrics::ListingRequest;
use crate::s3::{BucketInfo, ListingMetrics, StorageBackend};
use crate::vfs::{DisplayNode, materialize};

/// Listing layer shared by the tree and the filesystem
pub struct ListingService {
    backend: Arc<dyn StorageBackend>,
    cache: ListingCache,
    metrics: Arc<ListingMetrics>,
}

impl ListingService {
    pub fn new(backend: Arc<dyn StorageBackend>, cache: ListingCache) -> Self {
        ListingService {
            backend,
            cache,
            metrics: ListingMetrics::new(),
        }
    }

    pub fn cache(&self) -> &ListingCache {
        &self.cache
    }

    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    pub fn metrics(&self) -> &Arc<ListingMetrics> {
        &self.metrics
    }

    pub async fn list_buckets(&self) -> Result<Vec<BucketInfo>> {
        self.backend
            .list_buckets()
            .await
            .map_err(|e| BrowseError::from_remote(e, "", ""))
    }

    /// One remote page. On failure the cache is left alone, except that a
    /// key reported missing is dropped along with its ancestors.
    async fn fetch(
        &self,
        bucket: &str,
        prefix: Option<&str>,
        continuation_token: Option<&str>,
    ) -> Result<ListingPage> {
        let key = ListingKey::new(bucket, prefix);
        let started = Instant::now();

        match self
            .backend
            .list_objects(bucket, prefix, continuation_token)
            .await
        {
            Ok(page) => {
                self.metrics.record_request(ListingRequest {
                    items: page.objects.len() + page.prefixes.len(),
                    duration: started.elapsed(),
                    continuation: continuation_token.is_some(),
                    key,
                });
                Ok(page)
            }
            Err(err) => {
                self.metrics.record_error();
                log::warn!("listing {key} failed: {err}");
                if err.kind == RemoteErrorKind::NotFound {
                    let scope = Some(key.prefix.as_str()).filter(|p| !p.is_empty());
                    self.cache.invalidate(bucket, scope);
                }
                Err(BrowseError::from_remote(err, bucket, &key.prefix))
            }
        }
    }

    /// Contents of `(bucket, prefix)`: cached if fresh, otherwise the first
    /// page fetched now.
    pub async fn list(&self, bucket: &str, prefix: Option<&str>) -> Result<CacheEntry> {
        match self.cache.get(bucket, prefix) {
            Some(entry) => Ok(entry),
            None => self.refresh(bucket, prefix).await,
        }
    }

    /// Re-fetch the first page, replacing whatever was cached
    pub async fn refresh(&self, bucket: &str, prefix: Option<&str>) -> Result<CacheEntry> {
        let page = self.fetch(bucket, prefix, None).await?;
        Ok(self.cache.set(bucket, prefix, page))
    }

    /// Fetch the page behind `continuation_token` and merge it in.
    ///
    /// The token belongs to a cached listing. If that listing was
    /// invalidated or went stale since, the key is reloaded from its first
    /// page instead, and the token is not used.
    ///
    /// If the store rejects the token, the key is reloaded from its first
    /// page and [`BrowseError::MalformedContinuationToken`] is returned so
    /// the caller can tell the user the view was reset.
    pub async fn load_more(
        &self,
        bucket: &str,
        prefix: Option<&str>,
        continuation_token: &str,
    ) -> Result<CacheEntry> {
        if self.cache.get(bucket, prefix).is_none() {
            log::debug!(
                "no live listing for s3://{bucket}/{}, reloading first page",
                prefix.unwrap_or("")
            );
            return self.refresh(bucket, prefix).await;
        }

        match self.fetch(bucket, prefix, Some(continuation_token)).await {
            Ok(page) => Ok(self.cache.append(bucket, prefix, page)),
            Err(BrowseError::Remote(err)) if err.kind == RemoteErrorKind::BadRequest => {
                log::info!(
                    "continuation token rejected for s3://{bucket}/{}, reloading first page",
                    prefix.unwrap_or("")
                );
                self.refresh(bucket, prefix).await?;
                Err(BrowseError::MalformedContinuationToken {
                    bucket: bucket.to_string(),
                    prefix: prefix.unwrap_or("").to_string(),
                })
            }
            Err(err) => Err(err),
        }
    }

    /// Contents of `(bucket, prefix)` with every page loaded
    pub async fn list_complete(&self, bucket: &str, prefix: Option<&str>) -> Result<CacheEntry> {
        let mut entry = self.list(bucket, prefix).await?;
        let mut seen = HashSet::new();
        while let Some(token) = entry.continuation_token.clone().filter(|_| entry.is_truncated) {
            if !seen.insert(token.clone()) {
                log::warn!(
                    "listing s3://{bucket}/{} repeated continuation token {token}, stopping",
                    prefix.unwrap_or("")
                );
                break;
            }
            entry = self.load_more(bucket, prefix, &token).await?;
        }
        Ok(entry)
    }

    /// Render the contents of `(bucket, prefix)` as display nodes
    pub async fn children(&self, bucket: &str, prefix: Option<&str>) -> Result<Vec<DisplayNode>> {
        let entry = self.list(bucket, prefix).await?;
        Ok(materialize(bucket, prefix, &entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{DEFAULT_TTL, ObjectEntry};
    use crate::error::RemoteError;
    use crate::s3::{MemoryBackend, ObjectMetadata};
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Pages `p0`, `p1`, `p2`, then hands back `t1` again forever
    #[derive(Default)]
    struct CyclingBackend {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl StorageBackend for CyclingBackend {
        async fn list_buckets(&self) -> Result<Vec<BucketInfo>, RemoteError> {
            Ok(Vec::new())
        }

        async fn list_objects(
            &self,
            _bucket: &str,
            _prefix: Option<&str>,
            continuation_token: Option<&str>,
        ) -> Result<ListingPage, RemoteError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let (key, next) = match continuation_token {
                None => ("p0", "t1"),
                Some("t1") => ("p1", "t2"),
                Some(_) => ("p2", "t1"),
            };
            Ok(ListingPage::truncated(
                vec![ObjectEntry::new(key, 1)],
                Vec::new(),
                next,
            ))
        }

        async fn head_object(
            &self,
            _bucket: &str,
            _key: &str,
        ) -> Result<ObjectMetadata, RemoteError> {
            Err(RemoteError::new(RemoteErrorKind::NotFound, "no objects"))
        }

        async fn get_object(
            &self,
            _bucket: &str,
            _key: &str,
        ) -> Result<Bytes, RemoteError> {
            Err(RemoteError::new(RemoteErrorKind::NotFound, "no objects"))
        }

        async fn put_object(
            &self,
            _bucket: &str,
            _key: &str,
            _body: Bytes,
        ) -> Result<(), RemoteError> {
            Ok(())
        }

        async fn delete_object(
            &self,
            _bucket: &str,
            _key: &str,
        ) -> Result<(), RemoteError> {
            Ok(())
        }

        async fn copy_object(
            &self,
            _bucket: &str,
            _source_key: &str,
            _dest_key: &str,
        ) -> Result<(), RemoteError> {
            Ok(())
        }
    }

    fn service(page_size: usize) -> (ListingService, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new(page_size));
        for key in ["a/1.txt", "a/2.txt", "b.txt", "c.txt", "d.txt"] {
            backend.insert("bkt", key, key.as_bytes().to_vec());
        }
        let service = ListingService::new(backend.clone(), ListingCache::new(DEFAULT_TTL));
        (service, backend)
    }

    #[tokio::test]
    async fn test_second_list_is_served_from_cache() {
        let (service, backend) = service(100);
        let first = service.list("bkt", None).await.unwrap();
        let second = service.list("bkt", None).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(backend.list_calls(), 1);
        assert_eq!(service.metrics().request_count(), 1);
    }

    #[tokio::test]
    async fn test_refresh_always_fetches() {
        let (service, backend) = service(100);
        service.list("bkt", None).await.unwrap();
        backend.insert("bkt", "e.txt", "e");
        let entry = service.refresh("bkt", None).await.unwrap();
        assert_eq!(backend.list_calls(), 2);
        assert!(entry.objects.iter().any(|o| o.key == "e.txt"));
    }

    #[tokio::test]
    async fn test_list_complete_follows_tokens() {
        let (service, backend) = service(2);
        let entry = service.list_complete("bkt", None).await.unwrap();
        assert!(!entry.is_truncated);
        assert_eq!(entry.prefixes.len(), 1);
        assert_eq!(entry.objects.len(), 3);
        assert_eq!(backend.list_calls(), 2);
        assert!(service.metrics().recent()[1].continuation);
    }

    #[tokio::test]
    async fn test_network_failure_leaves_cache_untouched() {
        let (service, backend) = service(100);
        let cached = service.list("bkt", Some("a/")).await.unwrap();

        backend.fail_next(RemoteErrorKind::Network);
        let err = service.refresh("bkt", Some("a/")).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(service.cache().get("bkt", Some("a/")), Some(cached));
        assert_eq!(service.metrics().error_count(), 1);
    }

    #[tokio::test]
    async fn test_list_complete_stops_on_cycling_tokens() {
        let backend = Arc::new(CyclingBackend::default());
        let service = ListingService::new(backend.clone(), ListingCache::new(DEFAULT_TTL));

        let entry = service.list_complete("bkt", None).await.unwrap();
        let keys: Vec<_> = entry.objects.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["p0", "p1", "p2"]);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_load_more_without_live_listing_reloads_first_page() {
        let (service, backend) = service(2);
        let first = service.list("bkt", None).await.unwrap();
        let token = first.continuation_token.clone().unwrap();

        service.cache().invalidate("bkt", Some("e.txt"));
        let entry = service.load_more("bkt", None, &token).await.unwrap();
        assert_eq!(entry, service.cache().get("bkt", None).unwrap());
        assert_eq!(entry.prefixes, first.prefixes);
        assert_eq!(entry.objects, first.objects);
        assert_eq!(backend.list_calls(), 2);
        assert!(!service.metrics().recent()[1].continuation);
    }
}
