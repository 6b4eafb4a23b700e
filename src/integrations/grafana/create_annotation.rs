use super::GrafanaClient;
use crate::core::component::{Component, ExecutionContext};
use crate::core::error::AppError;
use crate::core::helpers::decode_configuration;
use crate::core::payload::Emission;
use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

const NAME: &str = "grafana.createAnnotation";
const PAYLOAD_TYPE: &str = "grafana.annotation";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateAnnotationSpec {
    #[serde(default)]
    text: String,
    #[serde(default)]
    tags: Vec<String>,
    dashboard_uid: Option<String>,
    panel_id: Option<u64>,
    time: Option<Value>,
    time_end: Option<Value>,
}

impl CreateAnnotationSpec {
    fn parse(configuration: &Value) -> Result<Self, AppError> {
        let spec: CreateAnnotationSpec = decode_configuration(NAME, configuration)?;
        if spec.text.trim().is_empty() {
            return Err(AppError::validation("text is required"));
        }
        let time = epoch_ms("time", spec.time.as_ref())?;
        let time_end = epoch_ms("timeEnd", spec.time_end.as_ref())?;
        if let (Some(start), Some(end)) = (time, time_end) {
            if end < start {
                return Err(AppError::validation("timeEnd must not be before time"));
            }
        }
        Ok(spec)
    }

    fn request_body(&self) -> Result<Value, AppError> {
        let mut body = Map::new();
        body.insert("text".into(), json!(self.text));
        let tags: Vec<&str> = self
            .tags
            .iter()
            .map(|tag| tag.trim())
            .filter(|tag| !tag.is_empty())
            .collect();
        if !tags.is_empty() {
            body.insert("tags".into(), json!(tags));
        }
        if let Some(uid) = self.dashboard_uid.as_deref().map(str::trim).filter(|uid| !uid.is_empty()) {
            body.insert("dashboardUID".into(), json!(uid));
        }
        if let Some(panel_id) = self.panel_id {
            body.insert("panelId".into(), json!(panel_id));
        }
        if let Some(time) = epoch_ms("time", self.time.as_ref())? {
            body.insert("time".into(), json!(time));
        }
        if let Some(time_end) = epoch_ms("timeEnd", self.time_end.as_ref())? {
            body.insert("timeEnd".into(), json!(time_end));
        }
        Ok(Value::Object(body))
    }
}

/// RFC3339 text, or epoch milliseconds as a number or numeric string.
fn epoch_ms(field: &str, value: Option<&Value>) -> Result<Option<i64>, AppError> {
    let invalid = || AppError::validation(format!("{} must be RFC3339 or epoch milliseconds", field));
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(number)) => number.as_i64().map(Some).ok_or_else(invalid),
        Some(Value::String(text)) => {
            let text = text.trim();
            if text.is_empty() {
                return Ok(None);
            }
            if let Ok(ms) = text.parse::<i64>() {
                return Ok(Some(ms));
            }
            DateTime::parse_from_rfc3339(text)
                .map(|parsed| Some(parsed.timestamp_millis()))
                .map_err(|_| invalid())
        }
        Some(_) => Err(invalid()),
    }
}

pub struct CreateAnnotation {
    client: Arc<GrafanaClient>,
}

impl CreateAnnotation {
    pub fn new(client: Arc<GrafanaClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Component for CreateAnnotation {
    fn name(&self) -> &'static str {
        NAME
    }

    fn label(&self) -> &'static str {
        "Create Annotation"
    }

    fn setup(&self, configuration: &Value) -> Result<(), AppError> {
        CreateAnnotationSpec::parse(configuration).map(|_| ())
    }

    async fn execute(&self, ctx: ExecutionContext) -> Result<Emission, AppError> {
        let spec = CreateAnnotationSpec::parse(&ctx.configuration)?;
        let body = spec.request_body()?;
        tracing::info!(dashboard = ?spec.dashboard_uid, "creating Grafana annotation");
        let response = self.client.create_annotation(&body).await?;

        Ok(Emission::default_channel(
            PAYLOAD_TYPE,
            json!({
                "id": response.get("id").cloned().unwrap_or(Value::Null),
                "message": response.get("message").cloned().unwrap_or(Value::Null),
            }),
        ))
    }
}
