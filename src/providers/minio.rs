use super::{Provider, ProviderConfig};
use anyhow::Result;

/// Local MinIO address used when no endpoint is configured
const DEFAULT_ENDPOINT: &str = "http://localhost:9000";

/// MinIO (or any self-hosted S3-compatible server)
pub struct MinioProvider {
    endpoint_url: Option<String>,
    region: Option<String>,
}

impl MinioProvider {
    pub fn new(endpoint_url: Option<String>, region: Option<String>) -> Self {
        Self {
            endpoint_url,
            region,
        }
    }
}

#[async_trait::async_trait]
impl Provider for MinioProvider {
    fn name(&self) -> &str {
        "minio"
    }

    fn description(&self) -> &str {
        "MinIO / self-hosted S3-compatible server"
    }

    async fn build_config(&self) -> Result<ProviderConfig> {
        Ok(ProviderConfig {
            endpoint_url: Some(
                self.endpoint_url
                    .clone()
                    .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            ),
            // MinIO does not serve virtual-hosted bucket names by default
            force_path_style: true,
            anonymous: false,
            region: Some(self.region.clone().unwrap_or_else(|| "us-east-1".to_string())),
        })
    }
}
