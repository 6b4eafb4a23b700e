use super::Dash0Client;
use crate::core::component::{Component, ExecutionContext};
use crate::core::error::AppError;
use crate::core::helpers::decode_configuration;
use crate::core::payload::Emission;
use crate::core::types::ErrorCategory;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

const NAME: &str = "dash0.queryPrometheus";
const PAYLOAD_TYPE: &str = "dash0.prometheusResult";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryPrometheusSpec {
    #[serde(default)]
    query: String,
    time: Option<String>,
}

impl QueryPrometheusSpec {
    fn parse(configuration: &Value) -> Result<Self, AppError> {
        let spec: QueryPrometheusSpec = decode_configuration(NAME, configuration)?;
        if spec.query.trim().is_empty() {
            return Err(AppError::validation("query is required"));
        }
        Ok(spec)
    }
}

/// Prometheus HTTP API envelope.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    data: Option<QueryData>,
    error_type: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryData {
    #[serde(default)]
    result_type: String,
    #[serde(default)]
    result: Value,
}

pub struct QueryPrometheus {
    client: Arc<Dash0Client>,
}

impl QueryPrometheus {
    pub fn new(client: Arc<Dash0Client>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Component for QueryPrometheus {
    fn name(&self) -> &'static str {
        NAME
    }

    fn label(&self) -> &'static str {
        "Query Prometheus"
    }

    fn setup(&self, configuration: &Value) -> Result<(), AppError> {
        QueryPrometheusSpec::parse(configuration).map(|_| ())
    }

    async fn execute(&self, ctx: ExecutionContext) -> Result<Emission, AppError> {
        let spec = QueryPrometheusSpec::parse(&ctx.configuration)?;
        let time = spec
            .time
            .as_deref()
            .map(str::trim)
            .filter(|time| !time.is_empty());
        let raw = self.client.query_prometheus(spec.query.trim(), time).await?;
        let response: QueryResponse = serde_json::from_value(raw)?;

        if response.status != "success" {
            return Err(AppError::new(
                ErrorCategory::ApiError,
                format!(
                    "Dash0 Prometheus query failed: {}",
                    response.error.as_deref().unwrap_or("unknown error")
                ),
            )
            .with_code("DASH0-PROMQL")
            .with_context(
                "errorType",
                response.error_type.unwrap_or_else(|| "unknown".to_string()),
            ));
        }

        let data = response.data.unwrap_or(QueryData {
            result_type: String::new(),
            result: Value::Null,
        });
        Ok(Emission::default_channel(
            PAYLOAD_TYPE,
            json!({
                "resultType": data.result_type,
                "result": data.result,
            }),
        ))
    }
}
