use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashSet;

/// Cache key: a bucket plus a listing prefix ("" is the bucket root)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListingKey {
    pub bucket: String,
    pub prefix: String,
}

impl ListingKey {
    pub fn new(bucket: &str, prefix: Option<&str>) -> Self {
        ListingKey {
            bucket: bucket.to_string(),
            prefix: prefix.unwrap_or("").to_string(),
        }
    }

    /// Whether this key addresses the bucket root
    pub fn is_root(&self) -> bool {
        self.prefix.is_empty()
    }
}

impl std::fmt::Display for ListingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.prefix)
    }
}

/// One remote object as returned by a listing
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectEntry {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
    pub etag: Option<String>,
    pub storage_class: Option<String>,
}

impl ObjectEntry {
    pub fn new(key: impl Into<String>, size: u64) -> Self {
        ObjectEntry {
            key: key.into(),
            size,
            last_modified: None,
            etag: None,
            storage_class: None,
        }
    }

    /// Last path segment of the key
    pub fn name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }
}

/// A virtual folder synthesized by the delimiter
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrefixEntry {
    pub prefix: String,
}

impl PrefixEntry {
    pub fn new(prefix: impl Into<String>) -> Self {
        PrefixEntry {
            prefix: prefix.into(),
        }
    }

    /// Folder name without the trailing slash
    pub fn name(&self) -> &str {
        let trimmed = self.prefix.trim_end_matches('/');
        trimmed.rsplit('/').next().unwrap_or(trimmed)
    }
}

/// One page returned by `list_objects`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingPage {
    pub objects: Vec<ObjectEntry>,
    pub prefixes: Vec<PrefixEntry>,
    pub is_truncated: bool,
    pub continuation_token: Option<String>,
}

impl ListingPage {
    /// A final page
    pub fn complete(objects: Vec<ObjectEntry>, prefixes: Vec<PrefixEntry>) -> Self {
        ListingPage {
            objects,
            prefixes,
            is_truncated: false,
            continuation_token: None,
        }
    }

    /// A page with more results behind `token`
    pub fn truncated(
        objects: Vec<ObjectEntry>,
        prefixes: Vec<PrefixEntry>,
        token: impl Into<String>,
    ) -> Self {
        ListingPage {
            objects,
            prefixes,
            is_truncated: true,
            continuation_token: Some(token.into()),
        }
    }

    /// Enforce "token present iff truncated".
    ///
    /// A truncated page without a token cannot be continued, so it is
    /// treated as complete; a token on a complete page is dropped.
    fn pagination(&self) -> (bool, Option<String>) {
        let token = self
            .continuation_token
            .clone()
            .filter(|_| self.is_truncated);
        if self.is_truncated && token.is_none() {
            log::warn!("truncated listing page arrived without a continuation token");
        }
        (token.is_some(), token)
    }
}

/// Cached listing state for one [`ListingKey`]
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// Objects in listing order
    pub objects: Vec<ObjectEntry>,
    /// Sub-prefixes in listing order
    pub prefixes: Vec<PrefixEntry>,
    pub last_fetched: DateTime<Utc>,
    pub is_truncated: bool,
    pub continuation_token: Option<String>,
}

impl CacheEntry {
    pub(crate) fn from_page(page: ListingPage, now: DateTime<Utc>) -> Self {
        let (is_truncated, continuation_token) = page.pagination();
        let mut entry = CacheEntry {
            objects: Vec::with_capacity(page.objects.len()),
            prefixes: Vec::with_capacity(page.prefixes.len()),
            last_fetched: now,
            is_truncated,
            continuation_token,
        };
        entry.extend(page.objects, page.prefixes);
        entry
    }

    /// Fold a continuation page into this entry
    pub(crate) fn merge(&mut self, page: ListingPage, now: DateTime<Utc>) {
        let (is_truncated, continuation_token) = page.pagination();
        self.extend(page.objects, page.prefixes);
        self.last_fetched = now;
        self.is_truncated = is_truncated;
        self.continuation_token = continuation_token;
    }

    // Later duplicates are dropped; first occurrences keep their position.
    fn extend(&mut self, objects: Vec<ObjectEntry>, prefixes: Vec<PrefixEntry>) {
        let mut seen: HashSet<String> = self.objects.iter().map(|o| o.key.clone()).collect();
        for obj in objects {
            if seen.insert(obj.key.clone()) {
                self.objects.push(obj);
            }
        }

        let mut seen: HashSet<String> = self.prefixes.iter().map(|p| p.prefix.clone()).collect();
        for p in prefixes {
            if seen.insert(p.prefix.clone()) {
                self.prefixes.push(p);
            }
        }
    }

    /// Fresh iff `now - last_fetched <= ttl`
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: TimeDelta) -> bool {
        now - self.last_fetched <= ttl
    }

    /// Whether the listing is known to be empty and complete
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty() && self.prefixes.is_empty() && !self.is_truncated
    }
}
