mod aws;
mod minio;
mod r2;

pub use aws::AwsProvider;
pub use minio::MinioProvider;
pub use r2::R2Provider;

use anyhow::Result;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Region;

use crate::s3::S3Client;

/// Configuration for creating an S3 client
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    /// Optional custom endpoint URL
    pub endpoint_url: Option<String>,
    /// Whether to use path-style addressing (required for some S3-compatible services)
    pub force_path_style: bool,
    /// Whether to skip credentials (for anonymous/public access)
    pub anonymous: bool,
    /// Optional region override
    pub region: Option<String>,
}

/// Trait for S3 provider implementations
/// Providers supply configuration for creating S3 clients
#[async_trait::async_trait]
pub trait Provider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &str;

    /// Get provider description
    fn description(&self) -> &str;

    /// Build the provider configuration
    async fn build_config(&self) -> Result<ProviderConfig>;
}

/// Which object store to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ProviderKind {
    #[default]
    Aws,
    R2,
    Minio,
}

/// Options a provider may draw on
#[derive(Debug, Clone, Default)]
pub struct ProviderOptions {
    pub endpoint_url: Option<String>,
    pub region: Option<String>,
    pub account_id: Option<String>,
}

impl ProviderKind {
    /// Instantiate the provider for this kind
    pub fn provider(self, options: ProviderOptions) -> Box<dyn Provider> {
        match self {
            ProviderKind::Aws => Box::new(AwsProvider::new(options.region)),
            ProviderKind::R2 => Box::new(R2Provider::new(options.account_id, options.endpoint_url)),
            ProviderKind::Minio => {
                Box::new(MinioProvider::new(options.endpoint_url, options.region))
            }
        }
    }
}

/// Factory function to create an [`S3Client`] from provider configuration
pub async fn create_s3_client(config: ProviderConfig, page_size: i32) -> Result<S3Client> {
    let mut sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest());

    // Handle anonymous access
    if config.anonymous {
        sdk_config = sdk_config.no_credentials();
    }

    if let Some(region) = config.region.clone() {
        sdk_config = sdk_config.region(Region::new(region));
    }

    let base_config = sdk_config.load().await;

    let region = base_config
        .region()
        .map(|r| r.as_ref().to_string())
        .unwrap_or_else(|| "us-east-1".to_string());

    // Build S3-specific config
    let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&base_config);

    if let Some(endpoint) = config.endpoint_url {
        s3_config_builder = s3_config_builder.endpoint_url(endpoint);
    }

    if config.force_path_style {
        s3_config_builder = s3_config_builder.force_path_style(true);
    }

    let client = Client::from_conf(s3_config_builder.build());
    log::info!("created S3 client for region {region}");

    Ok(S3Client::from_client(client, region).with_page_size(page_size))
}
