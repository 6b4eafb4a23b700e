use super::Dash0Client;
use crate::core::component::{Component, ExecutionContext};
use crate::core::error::AppError;
use crate::core::helpers::{decode_configuration, object_or_empty};
use crate::core::payload::Emission;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

const NAME: &str = "dash0.sendLogEvent";
const PAYLOAD_TYPE: &str = "dash0.logEvent";
const DEFAULT_SERVICE_NAME: &str = "superplane";
const SCOPE_NAME: &str = "superplane.integrations";

/// OTLP severity numbers for the base level of each severity text.
const SEVERITIES: &[(&str, u8)] = &[
    ("TRACE", 1),
    ("DEBUG", 5),
    ("INFO", 9),
    ("WARN", 13),
    ("ERROR", 17),
    ("FATAL", 21),
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendLogEventSpec {
    #[serde(default)]
    body: String,
    severity: Option<String>,
    service_name: Option<String>,
    attributes: Option<Value>,
    resource_attributes: Option<Value>,
    timestamp: Option<String>,
}

struct LogEvent {
    body: String,
    severity_text: &'static str,
    severity_number: u8,
    service_name: String,
    attributes: Map<String, Value>,
    resource_attributes: Map<String, Value>,
    timestamp: DateTime<Utc>,
}

impl SendLogEventSpec {
    fn parse(configuration: &Value) -> Result<LogEvent, AppError> {
        let spec: SendLogEventSpec = decode_configuration(NAME, configuration)?;
        if spec.body.trim().is_empty() {
            return Err(AppError::validation("body is required"));
        }
        let requested = spec
            .severity
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or("INFO")
            .to_ascii_uppercase();
        let (severity_text, severity_number) = SEVERITIES
            .iter()
            .find(|(text, _)| *text == requested)
            .copied()
            .ok_or_else(|| {
                AppError::validation(format!(
                    "severity must be one of TRACE, DEBUG, INFO, WARN, ERROR, FATAL (got {})",
                    requested
                ))
            })?;
        let timestamp = match spec.timestamp.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => DateTime::parse_from_rfc3339(text)
                .map(|parsed| parsed.with_timezone(&Utc))
                .map_err(|err| {
                    AppError::validation(format!("timestamp must be RFC3339: {}", err))
                })?,
            _ => Utc::now(),
        };
        Ok(LogEvent {
            body: spec.body,
            severity_text,
            severity_number,
            service_name: spec
                .service_name
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string()),
            attributes: object_or_empty("attributes", spec.attributes.as_ref())?,
            resource_attributes: object_or_empty(
                "resourceAttributes",
                spec.resource_attributes.as_ref(),
            )?,
            timestamp,
        })
    }
}

impl LogEvent {
    /// OTLP/JSON `ExportLogsServiceRequest` holding this single record.
    fn export_request(&self) -> Value {
        let mut resource = self.resource_attributes.clone();
        resource.insert(
            "service.name".to_string(),
            Value::String(self.service_name.clone()),
        );
        let time = unix_nanos(self.timestamp);
        json!({
            "resourceLogs": [{
                "resource": { "attributes": key_values(&resource) },
                "scopeLogs": [{
                    "scope": { "name": SCOPE_NAME },
                    "logRecords": [{
                        "timeUnixNano": time,
                        "observedTimeUnixNano": time,
                        "severityNumber": self.severity_number,
                        "severityText": self.severity_text,
                        "body": { "stringValue": self.body },
                        "attributes": key_values(&self.attributes),
                    }]
                }]
            }]
        })
    }
}

fn unix_nanos(timestamp: DateTime<Utc>) -> String {
    let nanos = i128::from(timestamp.timestamp()) * 1_000_000_000
        + i128::from(timestamp.timestamp_subsec_nanos());
    nanos.to_string()
}

fn key_values(attributes: &Map<String, Value>) -> Vec<Value> {
    attributes
        .iter()
        .map(|(key, value)| json!({ "key": key, "value": any_value(value) }))
        .collect()
}

/// OTLP `AnyValue`; 64-bit integers travel as strings in OTLP/JSON.
fn any_value(value: &Value) -> Value {
    match value {
        Value::String(text) => json!({ "stringValue": text }),
        Value::Bool(flag) => json!({ "boolValue": flag }),
        Value::Number(number) if number.is_i64() || number.is_u64() => {
            json!({ "intValue": number.to_string() })
        }
        Value::Number(number) => json!({ "doubleValue": number.as_f64() }),
        other => json!({ "stringValue": other.to_string() }),
    }
}

pub struct SendLogEvent {
    client: Arc<Dash0Client>,
}

impl SendLogEvent {
    pub fn new(client: Arc<Dash0Client>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Component for SendLogEvent {
    fn name(&self) -> &'static str {
        NAME
    }

    fn label(&self) -> &'static str {
        "Send Log Event"
    }

    fn setup(&self, configuration: &Value) -> Result<(), AppError> {
        SendLogEventSpec::parse(configuration).map(|_| ())
    }

    async fn execute(&self, ctx: ExecutionContext) -> Result<Emission, AppError> {
        let event = SendLogEventSpec::parse(&ctx.configuration)?;
        tracing::debug!(severity = event.severity_text, service = %event.service_name, "sending log event to Dash0");
        self.client.send_logs(&event.export_request()).await?;

        Ok(Emission::default_channel(
            PAYLOAD_TYPE,
            json!({
                "sent": true,
                "severity": event.severity_text,
                "body": event.body,
                "serviceName": event.service_name,
                "timestamp": event.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            }),
        ))
    }
}
