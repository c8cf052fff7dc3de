//! Hierarchical browse tree over buckets, folders and objects.

use std::sync::Arc;

use crate::error::Result;
use crate::listing::ListingService;
use crate::vfs::{DisplayNode, materialize, parent_prefix};

/// Tree consumer of the listing layer
pub struct BucketTree {
    service: Arc<ListingService>,
    /// Bucket names to show at the root; empty shows all
    bucket_filter: Vec<String>,
}

impl BucketTree {
    pub fn new(service: Arc<ListingService>, bucket_filter: Vec<String>) -> Self {
        BucketTree {
            service,
            bucket_filter,
        }
    }

    /// Top-level bucket nodes
    pub async fn roots(&self) -> Result<Vec<DisplayNode>> {
        let buckets = self.service.list_buckets().await?;
        Ok(buckets
            .into_iter()
            .filter(|b| self.bucket_filter.is_empty() || self.bucket_filter.contains(&b.name))
            .map(|b| DisplayNode::Bucket { bucket: b.name })
            .collect())
    }

    /// Children of a node.
    ///
    /// Expanding a load-more node fetches the next page and returns the
    /// whole re-rendered listing it belongs to.
    pub async fn children(&self, node: &DisplayNode) -> Result<Vec<DisplayNode>> {
        match node {
            DisplayNode::Bucket { bucket } => self.service.children(bucket, None).await,
            DisplayNode::Folder { bucket, prefix } => {
                self.service.children(bucket, Some(prefix)).await
            }
            DisplayNode::Object { .. } => Ok(Vec::new()),
            DisplayNode::LoadMore {
                bucket,
                prefix,
                continuation_token,
            } => {
                let prefix = prefix.as_deref();
                let entry = self
                    .service
                    .load_more(bucket, prefix, continuation_token)
                    .await?;
                Ok(materialize(bucket, prefix, &entry))
            }
        }
    }

    /// Re-fetch the listing a node shows or belongs to, returning its
    /// fresh contents.
    pub async fn refresh(&self, node: &DisplayNode) -> Result<Vec<DisplayNode>> {
        let (bucket, prefix) = match node {
            DisplayNode::Bucket { bucket } => (bucket.as_str(), None),
            DisplayNode::Folder { bucket, prefix } => (bucket.as_str(), Some(prefix.as_str())),
            DisplayNode::Object { bucket, key, .. } => {
                (bucket.as_str(), Some(parent_prefix(key)).filter(|p| !p.is_empty()))
            }
            DisplayNode::LoadMore { bucket, prefix, .. } => (bucket.as_str(), prefix.as_deref()),
        };
        let entry = self.service.refresh(bucket, prefix).await?;
        Ok(materialize(bucket, prefix, &entry))
    }

    /// Forget every cached listing
    pub fn refresh_all(&self) {
        self.service.cache().invalidate_all();
    }
}
