#![allow(clippy::result_large_err)]

use super::IntegrationsConfig;
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use std::env;
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = "superplane.toml";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load config from workspace root (workspace/superplane.toml)
    /// Environment variables override config file values
    pub fn load_from_workspace(workspace_path: &Path) -> Result<IntegrationsConfig, AppError> {
        let config_path = workspace_path.join(CONFIG_FILE_NAME);
        let mut config = Self::load_from_file(&config_path)?.unwrap_or_default();
        Self::apply_env_overrides(&mut config);
        Ok(config)
    }

    /// Load config from specific file path
    /// Returns Ok(None) if file doesn't exist
    pub fn load_from_file(path: &Path) -> Result<Option<IntegrationsConfig>, AppError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::new(
                ErrorCategory::IoError,
                format!("Failed to read config file {}: {}", path.display(), e),
            )
        })?;

        let config: IntegrationsConfig = toml::from_str(&content).map_err(|e| {
            AppError::new(
                ErrorCategory::ConfigurationError,
                format!("Failed to parse config file {}: {}", path.display(), e),
            )
        })?;

        Ok(Some(config))
    }

    /// Apply environment variable overrides to the configuration.
    /// A credential set through the environment creates its section when the file has none.
    pub fn apply_env_overrides(config: &mut IntegrationsConfig) {
        if let Some(timeout) = env_value("SUPERPLANE_HTTP_TIMEOUT_SECONDS") {
            if let Ok(timeout) = timeout.parse::<u64>() {
                config.http.timeout_seconds = timeout;
            }
        }
        if let Some(bind) = env_value("SUPERPLANE_SERVER_BIND") {
            config.server.bind = bind;
        }

        // AWS
        if let Some(value) = env_value("SUPERPLANE_AWS_ACCESS_KEY_ID") {
            config.aws.get_or_insert_with(Default::default).access_key_id = value;
        }
        if let Some(value) = env_value("SUPERPLANE_AWS_SECRET_ACCESS_KEY") {
            config
                .aws
                .get_or_insert_with(Default::default)
                .secret_access_key = value;
        }
        if let Some(aws) = config.aws.as_mut() {
            if let Some(value) = env_value("SUPERPLANE_AWS_SESSION_TOKEN") {
                aws.session_token = Some(value);
            }
            if let Some(value) = env_value("SUPERPLANE_AWS_REGION") {
                aws.region = value;
            }
            if let Some(value) = env_value("SUPERPLANE_AWS_ENDPOINT") {
                aws.endpoint = Some(value);
            }
        }

        // Cloudflare
        if let Some(value) = env_value("SUPERPLANE_CLOUDFLARE_API_TOKEN") {
            config
                .cloudflare
                .get_or_insert_with(Default::default)
                .api_token = value;
        }
        if let Some(cloudflare) = config.cloudflare.as_mut() {
            if let Some(value) = env_value("SUPERPLANE_CLOUDFLARE_BASE_URL") {
                cloudflare.base_url = value;
            }
        }

        // Dash0
        if let Some(value) = env_value("SUPERPLANE_DASH0_API_TOKEN") {
            config.dash0.get_or_insert_with(Default::default).api_token = value;
        }
        if let Some(dash0) = config.dash0.as_mut() {
            if let Some(value) = env_value("SUPERPLANE_DASH0_API_URL") {
                dash0.api_url = value;
            }
            if let Some(value) = env_value("SUPERPLANE_DASH0_INGRESS_URL") {
                dash0.ingress_url = value;
            }
            if let Some(value) = env_value("SUPERPLANE_DASH0_DATASET") {
                dash0.dataset = value;
            }
        }

        // Daytona
        if let Some(value) = env_value("SUPERPLANE_DAYTONA_API_KEY") {
            config.daytona.get_or_insert_with(Default::default).api_key = value;
        }
        if let Some(daytona) = config.daytona.as_mut() {
            if let Some(value) = env_value("SUPERPLANE_DAYTONA_BASE_URL") {
                daytona.base_url = value;
            }
        }

        // New Relic
        if let Some(value) = env_value("SUPERPLANE_NEWRELIC_USER_API_KEY") {
            config
                .newrelic
                .get_or_insert_with(Default::default)
                .user_api_key = value;
        }
        if let Some(value) = env_value("SUPERPLANE_NEWRELIC_LICENSE_KEY") {
            config
                .newrelic
                .get_or_insert_with(Default::default)
                .license_key = value;
        }
        if let Some(newrelic) = config.newrelic.as_mut() {
            if let Some(value) = env_value("SUPERPLANE_NEWRELIC_ACCOUNT_ID") {
                if let Ok(account_id) = value.parse::<u64>() {
                    newrelic.account_id = Some(account_id);
                }
            }
            if let Some(value) = env_value("SUPERPLANE_NEWRELIC_REGION") {
                if let Ok(region) = value.parse() {
                    newrelic.region = region;
                }
            }
        }

        // Grafana
        if let Some(value) = env_value("SUPERPLANE_GRAFANA_API_TOKEN") {
            config.grafana.get_or_insert_with(Default::default).api_token = value;
        }
        if let Some(value) = env_value("SUPERPLANE_GRAFANA_BASE_URL") {
            config.grafana.get_or_insert_with(Default::default).base_url = value;
        }

        // SMTP
        if let Some(value) = env_value("SUPERPLANE_SMTP_HOST") {
            config.smtp.get_or_insert_with(Default::default).host = value;
        }
        if let Some(smtp) = config.smtp.as_mut() {
            if let Some(value) = env_value("SUPERPLANE_SMTP_PORT") {
                if let Ok(port) = value.parse::<u16>() {
                    smtp.port = port;
                }
            }
            if let Some(value) = env_value("SUPERPLANE_SMTP_USERNAME") {
                smtp.username = Some(value);
            }
            if let Some(value) = env_value("SUPERPLANE_SMTP_PASSWORD") {
                smtp.password = Some(value);
            }
            if let Some(value) = env_value("SUPERPLANE_SMTP_FROM_ADDRESS") {
                smtp.from_address = value;
            }
        }
    }

    /// Get documentation for supported environment variables
    pub fn env_var_documentation() -> &'static [&'static str] {
        &[
            "SUPERPLANE_HTTP_TIMEOUT_SECONDS - Outbound request timeout (default: 30)",
            "SUPERPLANE_SERVER_BIND - Trigger webhook server address (default: 127.0.0.1:8686)",
            "SUPERPLANE_AWS_ACCESS_KEY_ID / SUPERPLANE_AWS_SECRET_ACCESS_KEY - AWS credentials",
            "SUPERPLANE_AWS_SESSION_TOKEN - Optional AWS session token",
            "SUPERPLANE_AWS_REGION - AWS region (default: us-east-1)",
            "SUPERPLANE_AWS_ENDPOINT - Override the ECS endpoint",
            "SUPERPLANE_CLOUDFLARE_API_TOKEN - Cloudflare API token",
            "SUPERPLANE_CLOUDFLARE_BASE_URL - Override the Cloudflare API base URL",
            "SUPERPLANE_DASH0_API_TOKEN - Dash0 auth token",
            "SUPERPLANE_DASH0_API_URL / SUPERPLANE_DASH0_INGRESS_URL - Dash0 endpoints",
            "SUPERPLANE_DASH0_DATASET - Dash0 dataset (default: default)",
            "SUPERPLANE_DAYTONA_API_KEY - Daytona API key",
            "SUPERPLANE_DAYTONA_BASE_URL - Override the Daytona API base URL",
            "SUPERPLANE_NEWRELIC_USER_API_KEY - New Relic user key (NerdGraph)",
            "SUPERPLANE_NEWRELIC_LICENSE_KEY - New Relic license key (ingest)",
            "SUPERPLANE_NEWRELIC_ACCOUNT_ID - New Relic account id",
            "SUPERPLANE_NEWRELIC_REGION - US or EU (default: US)",
            "SUPERPLANE_GRAFANA_BASE_URL / SUPERPLANE_GRAFANA_API_TOKEN - Grafana instance",
            "SUPERPLANE_SMTP_HOST / SUPERPLANE_SMTP_PORT - SMTP server",
            "SUPERPLANE_SMTP_USERNAME / SUPERPLANE_SMTP_PASSWORD - SMTP credentials",
            "SUPERPLANE_SMTP_FROM_ADDRESS - Default sender address",
        ]
    }
}

fn env_value(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
