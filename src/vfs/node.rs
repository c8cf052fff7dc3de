use chrono::{DateTime, Utc};

use crate::cache::{CacheEntry, ListingKey};

/// Label shown for the pagination sentinel
pub const LOAD_MORE_LABEL: &str = "Load more...";

/// A renderable node produced from a listing.
///
/// Nodes are recomputed from the cache on every render and are never the
/// source of truth.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayNode {
    /// A bucket at the root of the tree
    Bucket { bucket: String },

    /// A common prefix, shown as a folder
    Folder { bucket: String, prefix: String },

    /// A single object
    Object {
        bucket: String,
        key: String,
        size: u64,
        last_modified: Option<DateTime<Utc>>,
    },

    /// Sentinel for the next page of a truncated listing
    LoadMore {
        bucket: String,
        /// `None` for the bucket root
        prefix: Option<String>,
        continuation_token: String,
    },
}

impl DisplayNode {
    pub fn bucket(&self) -> &str {
        match self {
            DisplayNode::Bucket { bucket }
            | DisplayNode::Folder { bucket, .. }
            | DisplayNode::Object { bucket, .. }
            | DisplayNode::LoadMore { bucket, .. } => bucket,
        }
    }

    /// Short name for display
    pub fn label(&self) -> String {
        match self {
            DisplayNode::Bucket { bucket } => format!("{bucket}/"),
            DisplayNode::Folder { prefix, .. } => {
                let trimmed = prefix.trim_end_matches('/');
                format!("{}/", trimmed.rsplit('/').next().unwrap_or(trimmed))
            }
            DisplayNode::Object { key, .. } => key.rsplit('/').next().unwrap_or(key).to_string(),
            DisplayNode::LoadMore { .. } => LOAD_MORE_LABEL.to_string(),
        }
    }

    /// Whether the node has children of its own
    pub fn is_expandable(&self) -> bool {
        match self {
            DisplayNode::Bucket { .. } | DisplayNode::Folder { .. } => true,
            DisplayNode::Object { .. } | DisplayNode::LoadMore { .. } => false,
        }
    }

    /// Cache key whose listing this node shows (containers) or continues
    /// (load more). Objects have none.
    pub fn listing_key(&self) -> Option<ListingKey> {
        match self {
            DisplayNode::Bucket { bucket } => Some(ListingKey::new(bucket, None)),
            DisplayNode::Folder { bucket, prefix } => Some(ListingKey::new(bucket, Some(prefix))),
            DisplayNode::LoadMore { bucket, prefix, .. } => {
                Some(ListingKey::new(bucket, prefix.as_deref()))
            }
            DisplayNode::Object { .. } => None,
        }
    }
}

/// Render a listing into nodes: folders, then objects, each in listing
/// order, then one load-more sentinel if the listing is truncated.
pub fn materialize(bucket: &str, prefix: Option<&str>, entry: &CacheEntry) -> Vec<DisplayNode> {
    let mut nodes = Vec::with_capacity(entry.prefixes.len() + entry.objects.len() + 1);

    nodes.extend(entry.prefixes.iter().map(|p| DisplayNode::Folder {
        bucket: bucket.to_string(),
        prefix: p.prefix.clone(),
    }));

    nodes.extend(entry.objects.iter().map(|o| DisplayNode::Object {
        bucket: bucket.to_string(),
        key: o.key.clone(),
        size: o.size,
        last_modified: o.last_modified,
    }));

    if entry.is_truncated
        && let Some(token) = &entry.continuation_token
    {
        nodes.push(DisplayNode::LoadMore {
            bucket: bucket.to_string(),
            prefix: prefix.filter(|p| !p.is_empty()).map(String::from),
            continuation_token: token.clone(),
        });
    }

    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{ObjectEntry, PrefixEntry};

    fn entry(is_truncated: bool, token: Option<&str>) -> CacheEntry {
        CacheEntry {
            objects: vec![ObjectEntry::new("a/o1", 1), ObjectEntry::new("a/o2", 2)],
            prefixes: vec![PrefixEntry::new("a/p1/"), PrefixEntry::new("a/p2/")],
            last_fetched: Utc::now(),
            is_truncated,
            continuation_token: token.map(String::from),
        }
    }

    #[test]
    fn test_ordering() {
        let nodes = materialize("bkt", Some("a/"), &entry(true, Some("tok")));
        let labels: Vec<_> = nodes.iter().map(|n| n.label()).collect();
        assert_eq!(labels, vec!["p1/", "p2/", "o1", "o2", LOAD_MORE_LABEL]);

        assert_eq!(
            nodes[4],
            DisplayNode::LoadMore {
                bucket: "bkt".to_string(),
                prefix: Some("a/".to_string()),
                continuation_token: "tok".to_string(),
            }
        );
    }

    #[test]
    fn test_no_sentinel_when_complete() {
        let nodes = materialize("bkt", Some("a/"), &entry(false, Some("tok")));
        assert_eq!(nodes.len(), 4);
        assert!(
            !nodes
                .iter()
                .any(|n| matches!(n, DisplayNode::LoadMore { .. }))
        );
    }

    #[test]
    fn test_root_load_more_has_no_prefix() {
        let nodes = materialize("bkt", Some(""), &entry(true, Some("tok")));
        match nodes.last() {
            Some(DisplayNode::LoadMore { prefix, .. }) => assert_eq!(prefix, &None),
            other => panic!("expected load more, got {other:?}"),
        }
    }

    #[test]
    fn test_listing_keys() {
        let folder = DisplayNode::Folder {
            bucket: "bkt".to_string(),
            prefix: "a/".to_string(),
        };
        assert_eq!(folder.listing_key(), Some(ListingKey::new("bkt", Some("a/"))));
        assert!(folder.is_expandable());

        let bucket = DisplayNode::Bucket {
            bucket: "bkt".to_string(),
        };
        assert_eq!(bucket.listing_key(), Some(ListingKey::new("bkt", None)));
        assert_eq!(bucket.label(), "bkt/");

        let object = DisplayNode::Object {
            bucket: "bkt".to_string(),
            key: "a/x.txt".to_string(),
            size: 3,
            last_modified: None,
        };
        assert_eq!(object.listing_key(), None);
        assert_eq!(object.bucket(), "bkt");
        assert!(!object.is_expandable());
    }
}
