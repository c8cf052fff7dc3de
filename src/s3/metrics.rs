//! Metrics collection for remote listing calls.
//!
//! Tracks how often the listing layer actually went to the network, how
//! many items came back, how long it took and how many calls failed.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::cache::ListingKey;

/// One completed listing request
#[derive(Debug, Clone)]
pub struct ListingRequest {
    pub key: ListingKey,
    /// Objects plus prefixes returned
    pub items: usize,
    pub duration: Duration,
    /// Whether this was a continuation page
    pub continuation: bool,
}

/// Collector for listing metrics.
///
/// Thread-safe; shared by every consumer of a listing service.
#[derive(Debug, Default)]
pub struct ListingMetrics {
    request_count: AtomicUsize,
    error_count: AtomicUsize,
    total_items: AtomicU64,
    total_request_time_ns: AtomicU64,
    /// Most recent requests, oldest first
    recent: RwLock<Vec<ListingRequest>>,
}

/// How many requests [`ListingMetrics::recent`] keeps
const RECENT_LIMIT: usize = 64;

impl ListingMetrics {
    /// Create a new metrics collector wrapped in Arc for sharing
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Record a successful listing call
    pub fn record_request(&self, request: ListingRequest) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        self.total_items
            .fetch_add(request.items as u64, Ordering::Relaxed);
        self.total_request_time_ns
            .fetch_add(request.duration.as_nanos() as u64, Ordering::Relaxed);

        let mut recent = self.recent.write().unwrap_or_else(|e| e.into_inner());
        if recent.len() == RECENT_LIMIT {
            recent.remove(0);
        }
        recent.push(request);
    }

    /// Record a failed listing call
    pub fn record_error(&self) {
        self.error_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Relaxed)
    }

    pub fn error_count(&self) -> usize {
        self.error_count.load(Ordering::Relaxed)
    }

    pub fn total_items(&self) -> u64 {
        self.total_items.load(Ordering::Relaxed)
    }

    /// Get total request time
    pub fn total_request_time(&self) -> Duration {
        Duration::from_nanos(self.total_request_time_ns.load(Ordering::Relaxed))
    }

    /// Recent requests, oldest first
    pub fn recent(&self) -> Vec<ListingRequest> {
        self.recent
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Reset all metrics
    pub fn reset(&self) {
        self.request_count.store(0, Ordering::Relaxed);
        self.error_count.store(0, Ordering::Relaxed);
        self.total_items.store(0, Ordering::Relaxed);
        self.total_request_time_ns.store(0, Ordering::Relaxed);
        self.recent
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(prefix: &str, items: usize, millis: u64) -> ListingRequest {
        ListingRequest {
            key: ListingKey::new("bkt", Some(prefix)),
            items,
            duration: Duration::from_millis(millis),
            continuation: false,
        }
    }

    #[test]
    fn test_metrics_tracking() {
        let metrics = ListingMetrics::new();

        metrics.record_request(request("", 10, 50));
        metrics.record_request(request("a/", 5, 100));
        metrics.record_error();

        assert_eq!(metrics.request_count(), 2);
        assert_eq!(metrics.error_count(), 1);
        assert_eq!(metrics.total_items(), 15);
        assert_eq!(metrics.total_request_time(), Duration::from_millis(150));

        let recent = metrics.recent();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[1].key.prefix, "a/");
    }

    #[test]
    fn test_recent_is_bounded() {
        let metrics = ListingMetrics::new();
        for i in 0..(RECENT_LIMIT + 5) {
            metrics.record_request(request(&format!("p{i}/"), 1, 1));
        }
        let recent = metrics.recent();
        assert_eq!(recent.len(), RECENT_LIMIT);
        assert_eq!(recent[0].key.prefix, "p5/");
    }

    #[test]
    fn test_metrics_reset() {
        let metrics = ListingMetrics::new();

        metrics.record_request(request("", 3, 50));
        metrics.record_error();

        metrics.reset();
        assert_eq!(metrics.request_count(), 0);
        assert_eq!(metrics.error_count(), 0);
        assert_eq!(metrics.total_items(), 0);
        assert!(metrics.recent().is_empty());
    }
}
