use super::DaytonaClient;
use crate::core::component::{Component, ExecutionContext};
use crate::core::error::AppError;
use crate::core::helpers::decode_configuration;
use crate::core::payload::{Emission, DEFAULT_CHANNEL, FAILED_CHANNEL};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

const NAME: &str = "daytona.deleteSandbox";
const PAYLOAD_TYPE: &str = "daytona.sandbox";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteSandboxSpec {
    #[serde(default)]
    sandbox_id: String,
    #[serde(default)]
    force: bool,
}

impl DeleteSandboxSpec {
    fn parse(configuration: &Value) -> Result<Self, AppError> {
        let spec: DeleteSandboxSpec = decode_configuration(NAME, configuration)?;
        if spec.sandbox_id.trim().is_empty() {
            return Err(AppError::validation("sandboxId is required"));
        }
        Ok(spec)
    }
}

pub struct DeleteSandbox {
    client: Arc<DaytonaClient>,
}

impl DeleteSandbox {
    pub fn new(client: Arc<DaytonaClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Component for DeleteSandbox {
    fn name(&self) -> &'static str {
        NAME
    }

    fn label(&self) -> &'static str {
        "Delete Sandbox"
    }

    fn output_channels(&self) -> &'static [&'static str] {
        &[DEFAULT_CHANNEL, FAILED_CHANNEL]
    }

    fn setup(&self, configuration: &Value) -> Result<(), AppError> {
        DeleteSandboxSpec::parse(configuration).map(|_| ())
    }

    async fn execute(&self, ctx: ExecutionContext) -> Result<Emission, AppError> {
        let spec = DeleteSandboxSpec::parse(&ctx.configuration)?;
        let sandbox_id = spec.sandbox_id.trim();
        tracing::info!(sandbox = %sandbox_id, force = spec.force, "deleting Daytona sandbox");

        match self.client.delete_sandbox(sandbox_id, spec.force).await {
            Ok(()) => Ok(Emission::default_channel(
                PAYLOAD_TYPE,
                json!({ "id": sandbox_id, "deleted": true }),
            )),
            Err(err) if err.status() == Some(StatusCode::NOT_FOUND) => {
                tracing::warn!(sandbox = %sandbox_id, "sandbox not found");
                Ok(Emission::failed(
                    PAYLOAD_TYPE,
                    json!({ "id": sandbox_id, "deleted": false, "error": err.body_json() }),
                ))
            }
            Err(err) => Err(err.into()),
        }
    }
}
