use super::frames::frame_to_rows;
use super::GrafanaClient;
use crate::core::component::{Component, ExecutionContext};
use crate::core::error::AppError;
use crate::core::helpers::decode_configuration;
use crate::core::payload::{Emission, DEFAULT_CHANNEL, FAILED_CHANNEL};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

const NAME: &str = "grafana.queryDataSource";
const PAYLOAD_TYPE: &str = "grafana.queryResult";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryDataSourceSpec {
    #[serde(default)]
    data_source_uid: String,
    #[serde(default)]
    query: String,
    query_field: Option<String>,
    ref_id: Option<String>,
    from: Option<String>,
    to: Option<String>,
    max_data_points: Option<u64>,
    interval_ms: Option<u64>,
}

fn or_default(value: &Option<String>, default: &str) -> String {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(default)
        .to_string()
}

impl QueryDataSourceSpec {
    fn parse(configuration: &Value) -> Result<Self, AppError> {
        let spec: QueryDataSourceSpec = decode_configuration(NAME, configuration)?;
        if spec.data_source_uid.trim().is_empty() {
            return Err(AppError::validation("dataSourceUid is required"));
        }
        if spec.query.trim().is_empty() {
            return Err(AppError::validation("query is required"));
        }
        Ok(spec)
    }

    fn ref_id(&self) -> String {
        or_default(&self.ref_id, "A")
    }

    fn request_body(&self) -> Value {
        let mut query = Map::new();
        query.insert("refId".into(), json!(self.ref_id()));
        query.insert(
            "datasource".into(),
            json!({ "uid": self.data_source_uid.trim() }),
        );
        query.insert(or_default(&self.query_field, "expr"), json!(self.query));
        if let Some(points) = self.max_data_points {
            query.insert("maxDataPoints".into(), json!(points));
        }
        if let Some(interval) = self.interval_ms {
            query.insert("intervalMs".into(), json!(interval));
        }
        json!({
            "queries": [Value::Object(query)],
            "from": or_default(&self.from, "now-1h"),
            "to": or_default(&self.to, "now"),
        })
    }
}

pub struct QueryDataSource {
    client: Arc<GrafanaClient>,
}

impl QueryDataSource {
    pub fn new(client: Arc<GrafanaClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Component for QueryDataSource {
    fn name(&self) -> &'static str {
        NAME
    }

    fn label(&self) -> &'static str {
        "Query Data Source"
    }

    fn output_channels(&self) -> &'static [&'static str] {
        &[DEFAULT_CHANNEL, FAILED_CHANNEL]
    }

    fn setup(&self, configuration: &Value) -> Result<(), AppError> {
        QueryDataSourceSpec::parse(configuration).map(|_| ())
    }

    async fn execute(&self, ctx: ExecutionContext) -> Result<Emission, AppError> {
        let spec = QueryDataSourceSpec::parse(&ctx.configuration)?;
        let ref_id = spec.ref_id();
        tracing::debug!(datasource = %spec.data_source_uid, ref_id = %ref_id, "querying Grafana data source");

        let response = match self.client.query(&spec.request_body()).await {
            Ok(response) => response,
            Err(err)
                if matches!(
                    err.status(),
                    Some(StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY)
                ) =>
            {
                tracing::warn!(error = %err, "Grafana rejected query");
                let body = err.body_json();
                let message = ref_result(&body, &ref_id)
                    .and_then(|result| result.get("error"))
                    .or_else(|| body.get("message"))
                    .cloned()
                    .unwrap_or_else(|| body.clone());
                return Ok(Emission::failed(
                    PAYLOAD_TYPE,
                    json!({
                        "refId": ref_id,
                        "status": err.status().map(|status| status.as_u16()),
                        "error": message,
                    }),
                ));
            }
            Err(err) => return Err(err.into()),
        };

        let result = ref_result(&response, &ref_id)
            .cloned()
            .unwrap_or(Value::Null);
        if let Some(error) = result.get("error").filter(|error| !error.is_null()) {
            tracing::warn!(ref_id = %ref_id, "Grafana query returned an error");
            return Ok(Emission::failed(
                PAYLOAD_TYPE,
                json!({
                    "refId": ref_id,
                    "status": result.get("status").cloned().unwrap_or(Value::Null),
                    "error": error,
                }),
            ));
        }

        let frames: Vec<Value> = result
            .get("frames")
            .and_then(Value::as_array)
            .map(|frames| frames.iter().map(frame_to_rows).collect())
            .unwrap_or_default();
        let row_count: usize = frames
            .iter()
            .map(|frame| frame["rows"].as_array().map(Vec::len).unwrap_or(0))
            .sum();

        Ok(Emission::default_channel(
            PAYLOAD_TYPE,
            json!({
                "refId": ref_id,
                "frames": frames,
                "rowCount": row_count,
            }),
        ))
    }
}

/// Result entry for a refId. Keys are looked up verbatim since refIds may hold `/` or `~`.
fn ref_result<'a>(response: &'a Value, ref_id: &str) -> Option<&'a Value> {
    response.get("results").and_then(|results| results.get(ref_id))
}
