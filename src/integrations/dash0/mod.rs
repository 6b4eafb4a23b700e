//! Dash0 integration: alert webhooks, OTLP log ingestion, check rules and PromQL queries.

pub mod alert_event;
mod create_check_rule;
mod on_alert_event;
mod query_prometheus;
mod send_log_event;

pub use create_check_rule::CreateCheckRule;
pub use on_alert_event::OnAlertEvent;
pub use query_prometheus::QueryPrometheus;
pub use send_log_event::SendLogEvent;

use crate::core::component::Component;
use crate::core::error::AppError;
use crate::core::http::{self, join_url, HttpError};
use crate::core::integration::Integration;
use crate::core::trigger::Trigger;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

const SERVICE: &str = "dash0";
pub const DEFAULT_API_URL: &str = "https://api.eu-west-1.aws.dash0.com";
pub const DEFAULT_INGRESS_URL: &str = "https://ingress.eu-west-1.aws.dash0.com";
pub const DEFAULT_DATASET: &str = "default";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Dash0Settings {
    pub api_token: String,
    pub api_url: String,
    pub ingress_url: String,
    pub dataset: String,
}

impl Default for Dash0Settings {
    fn default() -> Self {
        Self {
            api_token: String::new(),
            api_url: DEFAULT_API_URL.to_string(),
            ingress_url: DEFAULT_INGRESS_URL.to_string(),
            dataset: DEFAULT_DATASET.to_string(),
        }
    }
}

pub struct Dash0Client {
    http: reqwest::Client,
    api_url: String,
    ingress_url: String,
    api_token: String,
    dataset: String,
}

impl Dash0Client {
    pub fn new(settings: &Dash0Settings, timeout: Duration) -> Self {
        Self {
            http: http::build_client(timeout),
            api_url: settings.api_url.clone(),
            ingress_url: settings.ingress_url.clone(),
            api_token: settings.api_token.clone(),
            dataset: settings.dataset.clone(),
        }
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    /// OTLP/JSON export to the ingress endpoint.
    pub async fn send_logs(&self, export_request: &Value) -> Result<(), HttpError> {
        let url = join_url(&self.ingress_url, &["v1", "logs"]);
        tracing::debug!(url = %url, "exporting logs to Dash0");
        let request = self
            .http
            .post(url.as_str())
            .bearer_auth(&self.api_token)
            .header("Dash0-Dataset", self.dataset.as_str())
            .json(export_request);
        http::send(SERVICE, request).await.map(|_| ())
    }

    pub async fn create_check_rule(&self, rule: &Value) -> Result<Value, HttpError> {
        let url = join_url(&self.api_url, &["api", "alerting", "check-rules"]);
        tracing::debug!(url = %url, "creating Dash0 check rule");
        let request = self
            .http
            .post(url.as_str())
            .bearer_auth(&self.api_token)
            .query(&[("dataset", self.dataset.as_str())])
            .json(rule);
        http::send_json(SERVICE, request).await
    }

    pub async fn list_check_rules(&self) -> Result<Value, HttpError> {
        let url = join_url(&self.api_url, &["api", "alerting", "check-rules"]);
        let request = self
            .http
            .get(url.as_str())
            .bearer_auth(&self.api_token)
            .query(&[("dataset", self.dataset.as_str())]);
        http::send_json(SERVICE, request).await
    }

    /// Instant PromQL query, form encoded as the Prometheus HTTP API expects.
    pub async fn query_prometheus(
        &self,
        query: &str,
        time: Option<&str>,
    ) -> Result<Value, HttpError> {
        let url = join_url(&self.api_url, &["api", "prometheus", "api", "v1", "query"]);
        let mut form = vec![("query", query), ("dataset", self.dataset.as_str())];
        if let Some(time) = time {
            form.push(("time", time));
        }
        tracing::debug!(url = %url, "querying Dash0 Prometheus API");
        let request = self
            .http
            .post(url.as_str())
            .bearer_auth(&self.api_token)
            .form(&form);
        match http::send(SERVICE, request).await {
            Ok((_, body)) => http::decode(SERVICE, &body),
            // Prometheus reports bad queries as 400/422 with a regular envelope.
            Err(HttpError::Status { status, body, .. })
                if matches!(status.as_u16(), 400 | 422) && body.contains("\"status\"") =>
            {
                match http::decode::<Value>(SERVICE, &body) {
                    Ok(envelope) => Ok(envelope),
                    Err(_) => Err(HttpError::Status {
                        service: SERVICE,
                        status,
                        body,
                    }),
                }
            }
            Err(err) => Err(err),
        }
    }
}

pub struct Dash0Integration {
    client: Arc<Dash0Client>,
}

impl Dash0Integration {
    pub fn new(settings: &Dash0Settings, timeout: Duration) -> Self {
        Self {
            client: Arc::new(Dash0Client::new(settings, timeout)),
        }
    }
}

#[async_trait]
impl Integration for Dash0Integration {
    fn name(&self) -> &'static str {
        "dash0"
    }

    fn label(&self) -> &'static str {
        "Dash0"
    }

    async fn sync(&self) -> Result<Value, AppError> {
        let rules = self.client.list_check_rules().await?;
        let count = match &rules {
            Value::Array(items) => items.len(),
            Value::Object(map) => map
                .get("items")
                .or_else(|| map.get("checkRules"))
                .and_then(Value::as_array)
                .map(Vec::len)
                .unwrap_or(0),
            _ => 0,
        };
        Ok(json!({ "dataset": self.client.dataset(), "checkRules": count }))
    }

    fn components(&self) -> Vec<Arc<dyn Component>> {
        vec![
            Arc::new(SendLogEvent::new(self.client.clone())),
            Arc::new(CreateCheckRule::new(self.client.clone())),
            Arc::new(QueryPrometheus::new(self.client.clone())),
        ]
    }

    fn triggers(&self) -> Vec<Arc<dyn Trigger>> {
        vec![Arc::new(OnAlertEvent)]
    }
}
