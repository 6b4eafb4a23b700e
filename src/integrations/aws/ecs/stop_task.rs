use super::{EcsClient, StopTaskRequest};
use crate::core::component::{Component, ExecutionContext};
use crate::core::error::AppError;
use crate::core::helpers::decode_configuration;
use crate::core::payload::{Emission, DEFAULT_CHANNEL, FAILED_CHANNEL};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

const NAME: &str = "aws.ecs.stopTask";
const PAYLOAD_TYPE: &str = "aws.ecs.task";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StopTaskSpec {
    #[serde(default)]
    cluster: String,
    #[serde(default)]
    task: String,
    reason: Option<String>,
}

impl StopTaskSpec {
    fn parse(configuration: &Value) -> Result<Self, AppError> {
        let spec: StopTaskSpec = decode_configuration(NAME, configuration)?;
        if spec.cluster.trim().is_empty() {
            return Err(AppError::validation("cluster is required"));
        }
        if spec.task.trim().is_empty() {
            return Err(AppError::validation("task is required"));
        }
        Ok(spec)
    }

    fn into_request(self) -> StopTaskRequest {
        StopTaskRequest {
            cluster: self.cluster.trim().to_string(),
            task: self.task.trim().to_string(),
            reason: self
                .reason
                .map(|reason| reason.trim().to_string())
                .filter(|reason| !reason.is_empty()),
        }
    }
}

pub struct StopTask {
    client: Arc<EcsClient>,
}

impl StopTask {
    pub fn new(client: Arc<EcsClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Component for StopTask {
    fn name(&self) -> &'static str {
        NAME
    }

    fn label(&self) -> &'static str {
        "Stop ECS Task"
    }

    fn output_channels(&self) -> &'static [&'static str] {
        &[DEFAULT_CHANNEL, FAILED_CHANNEL]
    }

    fn setup(&self, configuration: &Value) -> Result<(), AppError> {
        StopTaskSpec::parse(configuration).map(|_| ())
    }

    async fn execute(&self, ctx: ExecutionContext) -> Result<Emission, AppError> {
        let request = StopTaskSpec::parse(&ctx.configuration)?.into_request();
        tracing::info!(cluster = %request.cluster, task = %request.task, "stopping ECS task");

        match self.client.stop_task(&request).await {
            Ok(response) => Ok(Emission::default_channel(
                PAYLOAD_TYPE,
                json!({ "task": response.task.map(|task| task.to_payload()) }),
            )),
            Err(err) if err.is_client_error() => {
                tracing::warn!(error = %err, "ECS rejected StopTask");
                Ok(Emission::failed(PAYLOAD_TYPE, err.failure_payload()))
            }
            Err(err) => Err(err.into()),
        }
    }
}
