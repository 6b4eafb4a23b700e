use super::DaytonaClient;
use crate::core::component::{Component, ExecutionContext};
use crate::core::error::AppError;
use crate::core::helpers::{decode_configuration, object_or_empty};
use crate::core::payload::{Emission, DEFAULT_CHANNEL, FAILED_CHANNEL};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

const NAME: &str = "daytona.createSandbox";
const PAYLOAD_TYPE: &str = "daytona.sandbox";
const LANGUAGES: &[&str] = &["python", "typescript", "javascript"];
const LANGUAGE_LABEL: &str = "code-toolbox-language";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSandboxSpec {
    snapshot: Option<String>,
    language: Option<String>,
    env: Option<Value>,
    labels: Option<Value>,
    auto_stop_interval: Option<i64>,
    public: Option<bool>,
}

impl CreateSandboxSpec {
    fn parse(configuration: &Value) -> Result<Self, AppError> {
        let spec: CreateSandboxSpec = if configuration.is_null() {
            decode_configuration(NAME, &json!({}))?
        } else {
            decode_configuration(NAME, configuration)?
        };
        if let Some(language) = spec.language() {
            if !LANGUAGES.contains(&language.as_str()) {
                return Err(AppError::validation(format!(
                    "language must be one of {}",
                    LANGUAGES.join(", ")
                )));
            }
        }
        if spec.auto_stop_interval.is_some_and(|minutes| minutes < 0) {
            return Err(AppError::validation(
                "autoStopInterval must be zero or a positive number of minutes",
            ));
        }
        spec.request_body()?;
        Ok(spec)
    }

    fn language(&self) -> Option<String> {
        self.language
            .as_deref()
            .map(str::trim)
            .filter(|language| !language.is_empty())
            .map(str::to_ascii_lowercase)
    }

    fn request_body(&self) -> Result<Value, AppError> {
        let env = object_or_empty("env", self.env.as_ref())?;
        let mut labels = object_or_empty("labels", self.labels.as_ref())?;
        if let Some(language) = self.language() {
            labels.insert(LANGUAGE_LABEL.to_string(), Value::String(language));
        }

        let mut body = Map::new();
        if let Some(snapshot) = self.snapshot.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            body.insert("snapshot".into(), json!(snapshot));
        }
        if !env.is_empty() {
            body.insert(
                "env".into(),
                Value::Object(
                    env.into_iter()
                        .map(|(key, value)| (key, Value::String(stringify(value))))
                        .collect(),
                ),
            );
        }
        if !labels.is_empty() {
            body.insert(
                "labels".into(),
                Value::Object(
                    labels
                        .into_iter()
                        .map(|(key, value)| (key, Value::String(stringify(value))))
                        .collect(),
                ),
            );
        }
        if let Some(minutes) = self.auto_stop_interval {
            body.insert("autoStopInterval".into(), json!(minutes));
        }
        if let Some(public) = self.public {
            body.insert("public".into(), json!(public));
        }
        Ok(Value::Object(body))
    }
}

/// Daytona expects string maps for env and labels.
fn stringify(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

pub struct CreateSandbox {
    client: Arc<DaytonaClient>,
}

impl CreateSandbox {
    pub fn new(client: Arc<DaytonaClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Component for CreateSandbox {
    fn name(&self) -> &'static str {
        NAME
    }

    fn label(&self) -> &'static str {
        "Create Sandbox"
    }

    fn output_channels(&self) -> &'static [&'static str] {
        &[DEFAULT_CHANNEL, FAILED_CHANNEL]
    }

    fn setup(&self, configuration: &Value) -> Result<(), AppError> {
        CreateSandboxSpec::parse(configuration).map(|_| ())
    }

    async fn execute(&self, ctx: ExecutionContext) -> Result<Emission, AppError> {
        let spec = CreateSandboxSpec::parse(&ctx.configuration)?;
        let body = spec.request_body()?;
        tracing::info!(snapshot = ?spec.snapshot, "creating Daytona sandbox");

        match self.client.create_sandbox(&body).await {
            Ok(sandbox) => Ok(Emission::default_channel(PAYLOAD_TYPE, sandbox.to_payload())),
            Err(err) if err.is_validation_failure() => {
                tracing::warn!(error = %err, "Daytona rejected sandbox");
                Ok(Emission::failed(
                    PAYLOAD_TYPE,
                    json!({
                        "status": err.status().map(|status| status.as_u16()),
                        "error": err.body_json(),
                    }),
                ))
            }
            Err(err) => Err(err.into()),
        }
    }
}
