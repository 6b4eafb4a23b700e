//! Cloudflare integration: DNS records and single redirects.

pub mod client;
mod create_dns_record;
mod create_redirect_rule;
mod delete_dns_record;

pub use client::{CloudflareApiError, CloudflareClient, CloudflareError, ErrorDetail};
pub use create_dns_record::CreateDnsRecord;
pub use create_redirect_rule::{CreateRedirectRule, REDIRECT_PHASE};
pub use delete_dns_record::DeleteDnsRecord;

use crate::core::component::Component;
use crate::core::error::AppError;
use crate::core::integration::Integration;
use crate::core::types::ErrorCategory;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.cloudflare.com/client/v4";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudflareSettings {
    pub api_token: String,
    pub base_url: String,
}

impl Default for CloudflareSettings {
    fn default() -> Self {
        Self {
            api_token: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

pub struct CloudflareIntegration {
    client: Arc<CloudflareClient>,
}

impl CloudflareIntegration {
    pub fn new(settings: &CloudflareSettings, timeout: Duration) -> Self {
        Self {
            client: Arc::new(CloudflareClient::new(
                &settings.base_url,
                &settings.api_token,
                timeout,
            )),
        }
    }
}

#[async_trait]
impl Integration for CloudflareIntegration {
    fn name(&self) -> &'static str {
        "cloudflare"
    }

    fn label(&self) -> &'static str {
        "Cloudflare"
    }

    async fn sync(&self) -> Result<Value, AppError> {
        let token = self.client.verify_token().await?;
        let status = token.get("status").and_then(Value::as_str).unwrap_or("unknown");
        if status != "active" {
            return Err(AppError::new(
                ErrorCategory::AuthenticationError,
                format!("Cloudflare API token is {}", status),
            )
            .with_code("CLOUDFLARE-TOKEN-INACTIVE"));
        }
        Ok(json!({
            "tokenId": token.get("id").cloned().unwrap_or(Value::Null),
            "status": status,
            "expiresOn": token.get("expires_on").cloned().unwrap_or(Value::Null),
        }))
    }

    fn components(&self) -> Vec<Arc<dyn Component>> {
        vec![
            Arc::new(CreateDnsRecord::new(self.client.clone())),
            Arc::new(DeleteDnsRecord::new(self.client.clone())),
            Arc::new(CreateRedirectRule::new(self.client.clone())),
        ]
    }
}
