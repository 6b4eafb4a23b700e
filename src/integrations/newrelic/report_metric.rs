use super::NewRelicClient;
use crate::core::component::{Component, ExecutionContext};
use crate::core::error::AppError;
use crate::core::helpers::{decode_configuration, embed_json, object_or_empty};
use crate::core::payload::Emission;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

const NAME: &str = "newrelic.reportMetric";
const PAYLOAD_TYPE: &str = "newrelic.metric";
const SUMMARY_FIELDS: &[&str] = &["count", "sum", "min", "max"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MetricType {
    Gauge,
    Count,
    Summary,
}

impl MetricType {
    fn parse(value: Option<&str>) -> Result<Self, AppError> {
        match value
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or("gauge")
            .to_ascii_lowercase()
            .as_str()
        {
            "gauge" => Ok(MetricType::Gauge),
            "count" => Ok(MetricType::Count),
            "summary" => Ok(MetricType::Summary),
            other => Err(AppError::validation(format!(
                "type must be gauge, count or summary (got {})",
                other
            ))),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            MetricType::Gauge => "gauge",
            MetricType::Count => "count",
            MetricType::Summary => "summary",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportMetricSpec {
    #[serde(default)]
    name: String,
    #[serde(rename = "type")]
    metric_type: Option<String>,
    #[serde(default)]
    value: Value,
    interval_ms: Option<u64>,
    attributes: Option<Value>,
    timestamp: Option<Value>,
}

struct Metric {
    name: String,
    metric_type: MetricType,
    value: Value,
    interval_ms: Option<u64>,
    attributes: Map<String, Value>,
    timestamp_ms: i64,
}

impl ReportMetricSpec {
    fn parse(configuration: &Value) -> Result<Metric, AppError> {
        let spec: ReportMetricSpec = decode_configuration(NAME, configuration)?;
        if spec.name.trim().is_empty() {
            return Err(AppError::validation("name is required"));
        }
        let metric_type = MetricType::parse(spec.metric_type.as_deref())?;
        let value = match metric_type {
            MetricType::Summary => summary_value(&spec.value)?,
            MetricType::Gauge | MetricType::Count => json!(number_value(&spec.value)?),
        };
        let interval_ms = spec.interval_ms.filter(|interval| *interval > 0);
        if metric_type != MetricType::Gauge && interval_ms.is_none() {
            return Err(AppError::validation(format!(
                "intervalMs is required for {} metrics",
                metric_type.as_str()
            )));
        }
        Ok(Metric {
            name: spec.name.trim().to_string(),
            metric_type,
            value,
            interval_ms,
            attributes: object_or_empty("attributes", spec.attributes.as_ref())?,
            timestamp_ms: timestamp_ms(spec.timestamp.as_ref())?,
        })
    }
}

fn number_value(value: &Value) -> Result<f64, AppError> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|number| number.is_finite())
    .ok_or_else(|| AppError::validation("value must be a number"))
}

fn summary_value(value: &Value) -> Result<Value, AppError> {
    let embedded = embed_json(value);
    let Some(fields) = embedded.as_object() else {
        return Err(AppError::validation(
            "summary value must be an object with count, sum, min and max",
        ));
    };
    let mut summary = Map::new();
    for field in SUMMARY_FIELDS {
        let number = fields
            .get(*field)
            .and_then(Value::as_f64)
            .ok_or_else(|| AppError::validation(format!("summary value requires {}", field)))?;
        summary.insert((*field).to_string(), json!(number));
    }
    Ok(Value::Object(summary))
}

/// RFC3339 text or epoch milliseconds; defaults to now.
fn timestamp_ms(value: Option<&Value>) -> Result<i64, AppError> {
    match value {
        None | Some(Value::Null) => Ok(Utc::now().timestamp_millis()),
        Some(Value::String(text)) if text.trim().is_empty() => Ok(Utc::now().timestamp_millis()),
        Some(Value::Number(number)) => number
            .as_i64()
            .ok_or_else(|| AppError::validation("timestamp must be epoch milliseconds")),
        Some(Value::String(text)) => DateTime::parse_from_rfc3339(text.trim())
            .map(|parsed| parsed.timestamp_millis())
            .map_err(|err| AppError::validation(format!("timestamp must be RFC3339: {}", err))),
        Some(_) => Err(AppError::validation(
            "timestamp must be RFC3339 text or epoch milliseconds",
        )),
    }
}

impl Metric {
    fn request_body(&self) -> Value {
        let mut metric = Map::new();
        metric.insert("name".into(), json!(self.name));
        metric.insert("type".into(), json!(self.metric_type.as_str()));
        metric.insert("value".into(), self.value.clone());
        metric.insert("timestamp".into(), json!(self.timestamp_ms));
        if let Some(interval) = self.interval_ms {
            metric.insert("interval.ms".into(), json!(interval));
        }
        if !self.attributes.is_empty() {
            metric.insert("attributes".into(), Value::Object(self.attributes.clone()));
        }
        json!([{ "metrics": [Value::Object(metric)] }])
    }
}

pub struct ReportMetric {
    client: Arc<NewRelicClient>,
}

impl ReportMetric {
    pub fn new(client: Arc<NewRelicClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Component for ReportMetric {
    fn name(&self) -> &'static str {
        NAME
    }

    fn label(&self) -> &'static str {
        "Report Metric"
    }

    fn setup(&self, configuration: &Value) -> Result<(), AppError> {
        ReportMetricSpec::parse(configuration).map(|_| ())
    }

    async fn execute(&self, ctx: ExecutionContext) -> Result<Emission, AppError> {
        let metric = ReportMetricSpec::parse(&ctx.configuration)?;
        tracing::debug!(name = %metric.name, metric_type = metric.metric_type.as_str(), "reporting metric");
        let response = self.client.report_metrics(&metric.request_body()).await?;

        Ok(Emission::default_channel(
            PAYLOAD_TYPE,
            json!({
                "requestId": response.get("requestId").cloned().unwrap_or(Value::Null),
                "name": metric.name,
                "type": metric.metric_type.as_str(),
                "value": metric.value,
                "timestamp": metric.timestamp_ms,
            }),
        ))
    }
}
