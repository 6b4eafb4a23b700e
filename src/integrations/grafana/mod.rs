//! Grafana: data source queries, annotations and alert notifications.

mod create_annotation;
mod frames;
mod on_alert_firing;
mod query_data_source;

pub use create_annotation::CreateAnnotation;
pub use on_alert_firing::OnAlertFiring;
pub use query_data_source::QueryDataSource;

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

const SERVICE: &str = "grafana";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GrafanaSettings {
    pub base_url: String,
    /// Service account token.
    pub api_token: String,
}

pub struct GrafanaClient {
    http: reqwest::Client,
    base_url: String,
    api_token: String,
}

impl GrafanaClient {
    pub fn new(settings: &GrafanaSettings, timeout: Duration) -> Self {
        Self {
            http: http::build_client(timeout),
            base_url: settings.base_url.clone(),
            api_token: settings.api_token.clone(),
        }
    }

    pub async fn query(&self, body: &Value) -> Result<Value, HttpError> {
        self.post(&["api", "ds", "query"], body).await
    }

    pub async fn create_annotation(&self, body: &Value) -> Result<Value, HttpError> {
        self.post(&["api", "annotations"], body).await
    }

    pub async fn search(&self, limit: u32) -> Result<Value, HttpError> {
        let url = join_url(&self.base_url, &["api", "search"]);
        let request = self
            .http
            .get(url.as_str())
            .bearer_auth(&self.api_token)
            .query(&[("limit", limit)]);
        http::send_json(SERVICE, request).await
    }

    async fn post(&self, segments: &[&str], body: &Value) -> Result<Value, HttpError> {
        let url = join_url(&self.base_url, segments);
        tracing::debug!(url = %url, "calling Grafana");
        let request = self
            .http
            .post(url.as_str())
            .bearer_auth(&self.api_token)
            .json(body);
        http::send_json(SERVICE, request).await
    }
}

pub struct GrafanaIntegration {
    client: Arc<GrafanaClient>,
}

impl GrafanaIntegration {
    pub fn new(settings: &GrafanaSettings, timeout: Duration) -> Self {
        Self {
            client: Arc::new(GrafanaClient::new(settings, timeout)),
        }
    }
}

#[async_trait]
impl Integration for GrafanaIntegration {
    fn name(&self) -> &'static str {
        "grafana"
    }

    fn label(&self) -> &'static str {
        "Grafana"
    }

    async fn sync(&self) -> Result<Value, AppError> {
        let results = self.client.search(1).await?;
        Ok(json!({
            "reachable": true,
            "sampleResults": results.as_array().map(Vec::len).unwrap_or(0),
        }))
    }

    fn components(&self) -> Vec<Arc<dyn Component>> {
        vec![
            Arc::new(QueryDataSource::new(self.client.clone())),
            Arc::new(CreateAnnotation::new(self.client.clone())),
        ]
    }

    fn triggers(&self) -> Vec<Arc<dyn Trigger>> {
        vec![Arc::new(OnAlertFiring)]
    }
}
