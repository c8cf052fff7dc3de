use std::sync::Arc;
use std::time::Duration;

use s3tree::cache::{
    CacheEntry, DEFAULT_TTL, ListingCache, ListingKey, ListingPage, ManualClock, ObjectEntry,
    PrefixEntry,
};
use s3tree::vfs::{DisplayNode, materialize};

fn cache() -> (ListingCache, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::default());
    (ListingCache::with_clock(DEFAULT_TTL, clock.clone()), clock)
}

fn objects(keys: &[&str]) -> Vec<ObjectEntry> {
    keys.iter().map(|k| ObjectEntry::new(*k, 1)).collect()
}

fn prefixes(names: &[&str]) -> Vec<PrefixEntry> {
    names.iter().map(|p| PrefixEntry::new(*p)).collect()
}

fn keys(cache: &ListingCache) -> Vec<String> {
    cache.stats().keys.iter().map(|k| k.to_string()).collect()
}

#[test]
fn test_stale_entry_is_evicted_on_get() {
    let (cache, clock) = cache();
    cache.set("bkt", None, ListingPage::complete(objects(&["a.txt"]), Vec::new()));
    cache.set("bkt", Some("x/"), ListingPage::default());

    clock.advance(DEFAULT_TTL);
    assert!(cache.get("bkt", None).is_some(), "exactly ttl old is still fresh");

    clock.advance(Duration::from_secs(1));
    assert!(cache.get("bkt", None).is_none());
    assert_eq!(cache.stats().size, 1);
    assert_eq!(keys(&cache), vec!["s3://bkt/x/"]);
}

#[test]
fn test_set_replaces_wholesale_and_restamps() {
    let (cache, clock) = cache();
    cache.set(
        "bkt",
        None,
        ListingPage::truncated(objects(&["a", "b"]), prefixes(&["p/"]), "tok"),
    );

    clock.advance(Duration::from_secs(200));
    cache.set("bkt", None, ListingPage::complete(objects(&["c"]), Vec::new()));

    // The second set restarted the TTL window
    clock.advance(Duration::from_secs(200));
    let entry = cache.get("bkt", None).unwrap();
    assert_eq!(entry.objects, objects(&["c"]));
    assert!(entry.prefixes.is_empty());
    assert!(!entry.is_truncated);
    assert_eq!(entry.continuation_token, None);
}

#[test]
fn test_append_twice_is_idempotent() {
    let (cache, _clock) = cache();
    cache.set(
        "bkt",
        None,
        ListingPage::truncated(objects(&["a"]), prefixes(&["p/"]), "tok1"),
    );

    let page = ListingPage::truncated(objects(&["b", "c"]), prefixes(&["q/"]), "tok2");
    let once = cache.append("bkt", None, page.clone());
    let twice = cache.append("bkt", None, page);

    assert_eq!(once.objects.len(), 3);
    assert_eq!(once.prefixes.len(), 2);
    assert_eq!(twice.objects, once.objects);
    assert_eq!(twice.prefixes, once.prefixes);
    assert_eq!(twice.continuation_token.as_deref(), Some("tok2"));
}

#[test]
fn test_append_keeps_first_occurrence_order() {
    let (cache, _clock) = cache();
    cache.set(
        "bkt",
        None,
        ListingPage::truncated(objects(&["b", "a"]), Vec::new(), "tok"),
    );
    let entry = cache.append(
        "bkt",
        None,
        ListingPage::complete(objects(&["a", "c", "b"]), Vec::new()),
    );
    assert_eq!(entry.objects, objects(&["b", "a", "c"]));
}

#[test]
fn test_append_final_page_clears_token() {
    let (cache, _clock) = cache();
    cache.set(
        "bkt",
        None,
        ListingPage::truncated(objects(&["o1"]), Vec::new(), "tok1"),
    );
    let entry = cache.append(
        "bkt",
        None,
        ListingPage::complete(objects(&["o2"]), Vec::new()),
    );
    assert_eq!(entry.objects, objects(&["o1", "o2"]));
    assert!(!entry.is_truncated);
    assert_eq!(entry.continuation_token, None);
}

#[test]
fn test_append_without_entry_behaves_like_set() {
    let (cache, _clock) = cache();
    let entry = cache.append(
        "bkt",
        Some("a/"),
        ListingPage::truncated(objects(&["a/1"]), Vec::new(), "tok"),
    );
    assert_eq!(cache.get("bkt", Some("a/")), Some(entry));
}

#[test]
fn test_invalidate_cascades_to_ancestors() {
    let (cache, _clock) = cache();
    for prefix in [None, Some("a/"), Some("a/c/"), Some("z/")] {
        cache.set("b", prefix, ListingPage::default());
    }

    let removed = cache.invalidate("b", Some("a/c/x.txt"));
    assert_eq!(removed, 3);
    assert_eq!(keys(&cache), vec!["s3://b/z/"]);
}

#[test]
fn test_invalidate_leaves_sibling_subtrees() {
    let (cache, _clock) = cache();
    for prefix in [None, Some("a/"), Some("a/b/"), Some("a/b/d/")] {
        cache.set("bkt", prefix, ListingPage::default());
    }

    cache.invalidate("bkt", Some("a/b/c.txt"));
    assert_eq!(keys(&cache), vec!["s3://bkt/a/b/d/"]);
}

#[test]
fn test_bucket_wide_invalidation() {
    let (cache, _clock) = cache();
    for bucket in ["b", "b2", "other"] {
        cache.set(bucket, None, ListingPage::default());
        cache.set(bucket, Some("x/"), ListingPage::default());
    }

    assert_eq!(cache.invalidate("b", None), 2);
    let remaining = cache.stats().keys;
    assert_eq!(remaining.len(), 4);
    assert!(remaining.iter().all(|k| k.bucket != "b"));

    cache.invalidate_all();
    assert!(cache.is_empty());
}

#[test]
fn test_empty_listing_is_distinct_from_absent() {
    let (cache, _clock) = cache();
    assert_eq!(cache.get("bkt", None), None);

    cache.set("bkt", None, ListingPage::complete(Vec::new(), Vec::new()));
    let entry: CacheEntry = cache.get("bkt", None).unwrap();
    assert!(entry.is_empty());
    assert!(!entry.is_truncated);
}

#[test]
fn test_root_key_and_empty_prefix_are_the_same() {
    let (cache, _clock) = cache();
    cache.set("bkt", Some(""), ListingPage::default());
    assert!(cache.get("bkt", None).is_some());
    assert!(ListingKey::new("bkt", None).is_root());
}

#[test]
fn test_materialized_order_folders_objects_sentinel() {
    let (cache, _clock) = cache();
    let entry = cache.set(
        "bkt",
        None,
        ListingPage::truncated(objects(&["o1", "o2"]), prefixes(&["p1/", "p2/"]), "tok"),
    );

    let nodes = materialize("bkt", None, &entry);
    let bkt = "bkt".to_string();
    assert_eq!(
        nodes,
        vec![
            DisplayNode::Folder {
                bucket: bkt.clone(),
                prefix: "p1/".to_string()
            },
            DisplayNode::Folder {
                bucket: bkt.clone(),
                prefix: "p2/".to_string()
            },
            DisplayNode::Object {
                bucket: bkt.clone(),
                key: "o1".to_string(),
                size: 1,
                last_modified: None
            },
            DisplayNode::Object {
                bucket: bkt.clone(),
                key: "o2".to_string(),
                size: 1,
                last_modified: None
            },
            DisplayNode::LoadMore {
                bucket: bkt,
                prefix: None,
                continuation_token: "tok".to_string()
            },
        ]
    );

    // Rendering again from the cached copy gives the same nodes
    assert_eq!(materialize("bkt", None, &cache.get("bkt", None).unwrap()), nodes);
}

#[test]
fn test_no_sentinel_when_not_truncated() {
    let (cache, _clock) = cache();
    let page = ListingPage {
        objects: objects(&["o1"]),
        prefixes: Vec::new(),
        is_truncated: false,
        continuation_token: Some("stray".to_string()),
    };
    let entry = cache.set("bkt", None, page);
    assert_eq!(entry.continuation_token, None);

    let nodes = materialize("bkt", None, &entry);
    assert!(!nodes.iter().any(|n| matches!(n, DisplayNode::LoadMore { .. })));
}

#[test]
fn test_sweep_drops_only_stale_entries() {
    let (cache, clock) = cache();
    cache.set("bkt", Some("old/"), ListingPage::default());
    clock.advance(Duration::from_secs(250));
    cache.set("bkt", Some("new/"), ListingPage::default());
    clock.advance(Duration::from_secs(100));

    assert_eq!(cache.sweep_expired(), 1);
    assert_eq!(keys(&cache), vec!["s3://bkt/new/"]);
    assert_eq!(cache.stats().evictions, 1);
}
