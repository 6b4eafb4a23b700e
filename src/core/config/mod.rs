pub mod loader;
pub mod validation;

pub use loader::ConfigLoader;
pub use validation::ConfigValidator;

use crate::core::http::DEFAULT_TIMEOUT_SECONDS;
use crate::integrations::aws::AwsSettings;
use crate::integrations::cloudflare::CloudflareSettings;
use crate::integrations::dash0::Dash0Settings;
use crate::integrations::daytona::DaytonaSettings;
use crate::integrations::grafana::GrafanaSettings;
use crate::integrations::newrelic::NewRelicSettings;
use crate::integrations::smtp::SmtpSettings;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

/// Main configuration loaded from superplane.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IntegrationsConfig {
    /// Outbound HTTP settings shared by every integration
    #[serde(default)]
    pub http: HttpSettings,

    /// Trigger webhook server settings
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws: Option<AwsSettings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloudflare: Option<CloudflareSettings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dash0: Option<Dash0Settings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daytona: Option<DaytonaSettings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub newrelic: Option<NewRelicSettings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grafana: Option<GrafanaSettings>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smtp: Option<SmtpSettings>,

    /// Trigger configuration keyed by trigger name, e.g. `[triggers."dash0.onAlertEvent"]`
    #[serde(default)]
    pub triggers: BTreeMap<String, Value>,
}

impl IntegrationsConfig {
    /// Configuration handed to a trigger, `null` when none was provided.
    pub fn trigger_configuration(&self, trigger: &str) -> Value {
        self.triggers.get(trigger).cloned().unwrap_or(Value::Null)
    }
}

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpSettings {
    /// Request timeout applied to every outbound call (seconds)
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl HttpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Webhook server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Address the trigger webhook server binds to
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Largest accepted webhook body
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_timeout_seconds() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}

fn default_bind() -> String {
    "127.0.0.1:8686".to_string()
}

fn default_max_body_bytes() -> usize {
    1_048_576
}
