use super::{Provider, ProviderConfig};
use anyhow::{Result, anyhow};

/// Cloudflare R2 provider
///
/// R2 is addressed per account; the endpoint is derived from the account id
/// unless an explicit endpoint is given.
pub struct R2Provider {
    account_id: Option<String>,
    endpoint_url: Option<String>,
}

impl R2Provider {
    pub fn new(account_id: Option<String>, endpoint_url: Option<String>) -> Self {
        Self {
            account_id,
            endpoint_url,
        }
    }
}

#[async_trait::async_trait]
impl Provider for R2Provider {
    fn name(&self) -> &str {
        "r2"
    }

    fn description(&self) -> &str {
        "Cloudflare R2"
    }

    async fn build_config(&self) -> Result<ProviderConfig> {
        let endpoint = match (&self.endpoint_url, &self.account_id) {
            (Some(url), _) => url.clone(),
            (None, Some(account)) => format!("https://{account}.r2.cloudflarestorage.com"),
            (None, None) => {
                return Err(anyhow!(
                    "R2 needs an account id (--account-id or R2_ACCOUNT_ID) or an --endpoint-url"
                ));
            }
        };

        Ok(ProviderConfig {
            endpoint_url: Some(endpoint),
            force_path_style: false,
            anonymous: false,
            // R2 ignores the region but the SDK requires one
            region: Some("auto".to_string()),
        })
    }
}
