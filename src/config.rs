//! Command-line and runtime configuration.

use clap::Parser;
use std::time::Duration;

use crate::cache::DEFAULT_TTL;
use crate::providers::{ProviderKind, ProviderOptions};

/// Default `max-keys` per listing page
pub const DEFAULT_PAGE_SIZE: i32 = 1000;

/// Browse S3-compatible object stores from an interactive shell
#[derive(Debug, Parser)]
#[command(name = "s3tree", version, about)]
pub struct Cli {
    /// Object store provider
    #[arg(long, value_enum, env = "S3TREE_PROVIDER", default_value = "aws")]
    pub provider: ProviderKind,

    /// Custom endpoint URL (MinIO, R2, LocalStack, ...)
    #[arg(long, env = "S3TREE_ENDPOINT_URL")]
    pub endpoint_url: Option<String>,

    /// Region override
    #[arg(long, env = "AWS_REGION")]
    pub region: Option<String>,

    /// Cloudflare account id (R2 only)
    #[arg(long, env = "R2_ACCOUNT_ID")]
    pub account_id: Option<String>,

    /// Seconds a cached listing stays fresh
    #[arg(long, default_value_t = DEFAULT_TTL.as_secs())]
    pub cache_ttl: u64,

    /// Maximum items per listing page (1-1000)
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE, value_parser = clap::value_parser!(i32).range(1..=1000))]
    pub page_size: i32,

    /// Sweep stale listings every N seconds (off by default)
    #[arg(long)]
    pub sweep_interval: Option<u64>,

    /// Only show these buckets at the root (repeatable)
    #[arg(long = "bucket")]
    pub buckets: Vec<String>,
}

impl Cli {
    pub fn provider_options(&self) -> ProviderOptions {
        ProviderOptions {
            endpoint_url: self.endpoint_url.clone(),
            region: self.region.clone(),
            account_id: self.account_id.clone(),
        }
    }

    pub fn browser_config(&self) -> BrowserConfig {
        BrowserConfig {
            cache_ttl: Duration::from_secs(self.cache_ttl),
            page_size: self.page_size,
            sweep_interval: self
                .sweep_interval
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            buckets: self.buckets.clone(),
        }
    }
}

/// Settings for the listing cache and its consumers
#[derive(Debug, Clone, PartialEq)]
pub struct BrowserConfig {
    pub cache_ttl: Duration,
    pub page_size: i32,
    pub sweep_interval: Option<Duration>,
    /// Bucket names shown at the root; empty means all
    pub buckets: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        BrowserConfig {
            cache_ttl: DEFAULT_TTL,
            page_size: DEFAULT_PAGE_SIZE,
            sweep_interval: None,
            buckets: Vec::new(),
        }
    }
}
