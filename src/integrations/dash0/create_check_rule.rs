use super::Dash0Client;
use crate::core::component::{Component, ExecutionContext};
use crate::core::error::AppError;
use crate::core::helpers::{decode_configuration, first_string, object_or_empty};
use crate::core::payload::{Emission, DEFAULT_CHANNEL, FAILED_CHANNEL};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

const NAME: &str = "dash0.createCheckRule";
const PAYLOAD_TYPE: &str = "dash0.checkRule";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateCheckRuleSpec {
    #[serde(default)]
    name: String,
    #[serde(default)]
    expression: String,
    interval: Option<String>,
    #[serde(rename = "for")]
    for_duration: Option<String>,
    keep_firing_for: Option<String>,
    degraded_threshold: Option<f64>,
    critical_threshold: Option<f64>,
    summary: Option<String>,
    description: Option<String>,
    labels: Option<Value>,
    annotations: Option<Value>,
    enabled: Option<bool>,
}

struct CheckRule {
    name: String,
    expression: String,
    interval: String,
    for_duration: String,
    keep_firing_for: Option<String>,
    thresholds: Map<String, Value>,
    summary: Option<String>,
    description: Option<String>,
    labels: Map<String, Value>,
    annotations: Map<String, Value>,
    enabled: bool,
}

impl CreateCheckRuleSpec {
    fn parse(configuration: &Value) -> Result<CheckRule, AppError> {
        let spec: CreateCheckRuleSpec = decode_configuration(NAME, configuration)?;
        if spec.name.trim().is_empty() {
            return Err(AppError::validation("name is required"));
        }
        if spec.expression.trim().is_empty() {
            return Err(AppError::validation("expression is required"));
        }

        let interval = duration("interval", spec.interval.as_deref(), "1m")?;
        if humantime::parse_duration(&interval).map(|d| d.is_zero()).unwrap_or(true) {
            return Err(AppError::validation("interval must be greater than zero"));
        }
        let for_duration = duration("for", spec.for_duration.as_deref(), "0s")?;
        let keep_firing_for = match spec.keep_firing_for.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => Some(duration("keepFiringFor", Some(text), "0s")?),
            _ => None,
        };

        let mut thresholds = Map::new();
        if let Some(value) = spec.degraded_threshold {
            thresholds.insert("degraded".to_string(), json!(value));
        }
        if let Some(value) = spec.critical_threshold {
            thresholds.insert("failed".to_string(), json!(value));
        }

        Ok(CheckRule {
            name: spec.name.trim().to_string(),
            expression: spec.expression.trim().to_string(),
            interval,
            for_duration,
            keep_firing_for,
            thresholds,
            summary: spec.summary.filter(|text| !text.trim().is_empty()),
            description: spec.description.filter(|text| !text.trim().is_empty()),
            labels: object_or_empty("labels", spec.labels.as_ref())?,
            annotations: object_or_empty("annotations", spec.annotations.as_ref())?,
            enabled: spec.enabled.unwrap_or(true),
        })
    }
}

/// Validate a duration like `1m` or `90s` and return it trimmed.
fn duration(field: &str, value: Option<&str>, default: &str) -> Result<String, AppError> {
    let text = value
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .unwrap_or(default);
    humantime::parse_duration(text).map_err(|err| {
        AppError::validation(format!("{} is not a valid duration ({}): {}", field, text, err))
    })?;
    Ok(text.to_string())
}

impl CheckRule {
    fn request_body(&self) -> Value {
        let mut annotations = self.annotations.clone();
        if let Some(summary) = &self.summary {
            annotations.insert("summary".to_string(), json!(summary));
        }
        if let Some(description) = &self.description {
            annotations.insert("description".to_string(), json!(description));
        }
        let mut body = Map::new();
        body.insert("name".into(), json!(self.name));
        body.insert("expression".into(), json!(self.expression));
        body.insert("interval".into(), json!(self.interval));
        body.insert("for".into(), json!(self.for_duration));
        if let Some(keep_firing_for) = &self.keep_firing_for {
            body.insert("keepFiringFor".into(), json!(keep_firing_for));
        }
        if !self.thresholds.is_empty() {
            body.insert("thresholds".into(), Value::Object(self.thresholds.clone()));
        }
        body.insert("labels".into(), Value::Object(self.labels.clone()));
        body.insert("annotations".into(), Value::Object(annotations));
        body.insert("enabled".into(), json!(self.enabled));
        Value::Object(body)
    }
}

pub struct CreateCheckRule {
    client: Arc<Dash0Client>,
}

impl CreateCheckRule {
    pub fn new(client: Arc<Dash0Client>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Component for CreateCheckRule {
    fn name(&self) -> &'static str {
        NAME
    }

    fn label(&self) -> &'static str {
        "Create Check Rule"
    }

    fn output_channels(&self) -> &'static [&'static str] {
        &[DEFAULT_CHANNEL, FAILED_CHANNEL]
    }

    fn setup(&self, configuration: &Value) -> Result<(), AppError> {
        CreateCheckRuleSpec::parse(configuration).map(|_| ())
    }

    async fn execute(&self, ctx: ExecutionContext) -> Result<Emission, AppError> {
        let rule = CreateCheckRuleSpec::parse(&ctx.configuration)?;
        tracing::info!(name = %rule.name, dataset = %self.client.dataset(), "creating Dash0 check rule");

        let created = match self.client.create_check_rule(&rule.request_body()).await {
            Ok(created) => created,
            Err(err)
                if matches!(
                    err.status(),
                    Some(StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY)
                ) =>
            {
                tracing::warn!(error = %err, "Dash0 rejected check rule");
                return Ok(Emission::failed(
                    PAYLOAD_TYPE,
                    json!({
                        "status": err.status().map(|status| status.as_u16()),
                        "error": err.body_json(),
                        "name": rule.name,
                    }),
                ));
            }
            Err(err) => return Err(err.into()),
        };

        Ok(Emission::default_channel(
            PAYLOAD_TYPE,
            json!({
                "id": first_string(&created, &["id", "metadata.id"]),
                "name": rule.name,
                "expression": rule.expression,
                "interval": rule.interval,
                "for": rule.for_duration,
                "enabled": rule.enabled,
                "dataset": self.client.dataset(),
            }),
        ))
    }
}
