//! New Relic: Metric API ingestion and NRQL over NerdGraph.

mod report_metric;
mod run_nrql_query;

pub use report_metric::ReportMetric;
pub use run_nrql_query::RunNrqlQuery;

use crate::core::component::Component;
use crate::core::error::AppError;
use crate::core::http;
use crate::core::integration::Integration;
use crate::core::types::ErrorCategory;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

const SERVICE: &str = "newrelic";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NewRelicRegion {
    #[default]
    Us,
    Eu,
}

impl NewRelicRegion {
    pub fn graphql_url(self) -> &'static str {
        match self {
            NewRelicRegion::Us => "https://api.newrelic.com/graphql",
            NewRelicRegion::Eu => "https://api.eu.newrelic.com/graphql",
        }
    }

    pub fn metric_url(self) -> &'static str {
        match self {
            NewRelicRegion::Us => "https://metric-api.newrelic.com/metric/v1",
            NewRelicRegion::Eu => "https://metric-api.eu.newrelic.com/metric/v1",
        }
    }
}

impl FromStr for NewRelicRegion {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "US" => Ok(NewRelicRegion::Us),
            "EU" => Ok(NewRelicRegion::Eu),
            other => Err(format!("unknown New Relic region {}; expected US or EU", other)),
        }
    }
}

impl fmt::Display for NewRelicRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NewRelicRegion::Us => write!(f, "US"),
            NewRelicRegion::Eu => write!(f, "EU"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct NewRelicSettings {
    /// User key for NerdGraph queries.
    pub user_api_key: String,
    /// License key for the ingest APIs.
    pub license_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<u64>,
    pub region: NewRelicRegion,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graphql_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric_url: Option<String>,
}

pub struct NewRelicClient {
    http: reqwest::Client,
    user_api_key: String,
    license_key: String,
    account_id: Option<u64>,
    graphql_url: String,
    metric_url: String,
}

impl NewRelicClient {
    pub fn new(settings: &NewRelicSettings, timeout: Duration) -> Self {
        Self {
            http: http::build_client(timeout),
            user_api_key: settings.user_api_key.clone(),
            license_key: settings.license_key.clone(),
            account_id: settings.account_id,
            graphql_url: settings
                .graphql_url
                .clone()
                .unwrap_or_else(|| settings.region.graphql_url().to_string()),
            metric_url: settings
                .metric_url
                .clone()
                .unwrap_or_else(|| settings.region.metric_url().to_string()),
        }
    }

    pub fn account_id(&self) -> Option<u64> {
        self.account_id
    }

    /// Post a Metric API payload; New Relic answers 202 with a `requestId`.
    pub async fn report_metrics(&self, body: &Value) -> Result<Value, AppError> {
        if self.license_key.trim().is_empty() {
            return Err(missing_key("license_key", "report metrics"));
        }
        tracing::debug!(url = %self.metric_url, "posting metrics to New Relic");
        let request = self
            .http
            .post(self.metric_url.as_str())
            .header("Api-Key", self.license_key.as_str())
            .json(body);
        let response: Value = http::send_json(SERVICE, request).await?;
        Ok(response)
    }

    /// Run a NerdGraph query and return its `data`. GraphQL `errors` become an ApiError.
    pub async fn graphql(&self, query: &str, variables: Value) -> Result<Value, AppError> {
        if self.user_api_key.trim().is_empty() {
            return Err(missing_key("user_api_key", "query NerdGraph"));
        }
        tracing::debug!(url = %self.graphql_url, "querying NerdGraph");
        let request = self
            .http
            .post(self.graphql_url.as_str())
            .header("API-Key", self.user_api_key.as_str())
            .json(&json!({ "query": query, "variables": variables }));
        let response: Value = http::send_json(SERVICE, request).await?;

        if let Some(errors) = response
            .get("errors")
            .and_then(Value::as_array)
            .filter(|errors| !errors.is_empty())
        {
            let messages: Vec<&str> = errors
                .iter()
                .filter_map(|error| error.get("message").and_then(Value::as_str))
                .collect();
            return Err(AppError::new(
                ErrorCategory::ApiError,
                format!("NerdGraph returned errors: {}", messages.join("; ")),
            )
            .with_code("NEWRELIC-GRAPHQL"));
        }
        Ok(response.get("data").cloned().unwrap_or(Value::Null))
    }
}

fn missing_key(field: &str, action: &str) -> AppError {
    AppError::new(
        ErrorCategory::ConfigurationError,
        format!("newrelic.{} is required to {}", field, action),
    )
}

pub struct NewRelicIntegration {
    client: Arc<NewRelicClient>,
}

impl NewRelicIntegration {
    pub fn new(settings: &NewRelicSettings, timeout: Duration) -> Self {
        Self {
            client: Arc::new(NewRelicClient::new(settings, timeout)),
        }
    }
}

#[async_trait]
impl Integration for NewRelicIntegration {
    fn name(&self) -> &'static str {
        "newrelic"
    }

    fn label(&self) -> &'static str {
        "New Relic"
    }

    async fn sync(&self) -> Result<Value, AppError> {
        let data = self
            .client
            .graphql("{ actor { user { name email } } }", json!({}))
            .await?;
        Ok(json!({
            "user": data.pointer("/actor/user").cloned().unwrap_or(Value::Null),
            "accountId": self.client.account_id(),
        }))
    }

    fn components(&self) -> Vec<Arc<dyn Component>> {
        vec![
            Arc::new(ReportMetric::new(self.client.clone())),
            Arc::new(RunNrqlQuery::new(self.client.clone())),
        ]
    }
}
