use super::DaytonaClient;
use crate::core::component::{Component, ExecutionContext};
use crate::core::error::AppError;
use crate::core::helpers::decode_configuration;
use crate::core::payload::{Emission, DEFAULT_CHANNEL, FAILED_CHANNEL};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

const NAME: &str = "daytona.executeCommand";
const PAYLOAD_TYPE: &str = "daytona.commandResult";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecuteCommandSpec {
    #[serde(default)]
    sandbox_id: String,
    #[serde(default)]
    command: String,
    cwd: Option<String>,
    timeout: Option<u64>,
}

impl ExecuteCommandSpec {
    fn parse(configuration: &Value) -> Result<Self, AppError> {
        let spec: ExecuteCommandSpec = decode_configuration(NAME, configuration)?;
        if spec.sandbox_id.trim().is_empty() {
            return Err(AppError::validation("sandboxId is required"));
        }
        if spec.command.trim().is_empty() {
            return Err(AppError::validation("command is required"));
        }
        Ok(spec)
    }

    fn request_body(&self) -> Value {
        let mut body = Map::new();
        body.insert("command".into(), json!(self.command));
        if let Some(cwd) = self.cwd.as_deref().map(str::trim).filter(|cwd| !cwd.is_empty()) {
            body.insert("cwd".into(), json!(cwd));
        }
        if let Some(timeout) = self.timeout.filter(|seconds| *seconds > 0) {
            body.insert("timeout".into(), json!(timeout));
        }
        Value::Object(body)
    }
}

/// Runs a shell command in a sandbox; a non-zero exit code takes the `failed` channel.
pub struct ExecuteCommand {
    client: Arc<DaytonaClient>,
}

impl ExecuteCommand {
    pub fn new(client: Arc<DaytonaClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Component for ExecuteCommand {
    fn name(&self) -> &'static str {
        NAME
    }

    fn label(&self) -> &'static str {
        "Execute Command"
    }

    fn output_channels(&self) -> &'static [&'static str] {
        &[DEFAULT_CHANNEL, FAILED_CHANNEL]
    }

    fn setup(&self, configuration: &Value) -> Result<(), AppError> {
        ExecuteCommandSpec::parse(configuration).map(|_| ())
    }

    async fn execute(&self, ctx: ExecutionContext) -> Result<Emission, AppError> {
        let spec = ExecuteCommandSpec::parse(&ctx.configuration)?;
        let sandbox_id = spec.sandbox_id.trim();
        tracing::info!(sandbox = %sandbox_id, "executing Daytona command");

        let response = match self
            .client
            .execute_command(sandbox_id, &spec.request_body())
            .await
        {
            Ok(response) => response,
            Err(err) if err.is_validation_failure() => {
                tracing::warn!(error = %err, "Daytona rejected command");
                return Ok(Emission::failed(
                    PAYLOAD_TYPE,
                    json!({
                        "sandboxId": sandbox_id,
                        "status": err.status().map(|status| status.as_u16()),
                        "error": err.body_json(),
                    }),
                ));
            }
            Err(err) => return Err(err.into()),
        };

        let data = json!({
            "sandboxId": sandbox_id,
            "exitCode": response.exit_code,
            "result": response.result,
        });
        if response.exit_code == 0 {
            Ok(Emission::default_channel(PAYLOAD_TYPE, data))
        } else {
            tracing::warn!(sandbox = %sandbox_id, exit_code = response.exit_code, "command exited with failure");
            Ok(Emission::failed(PAYLOAD_TYPE, data))
        }
    }
}
