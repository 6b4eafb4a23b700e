use super::{DescribeTasksRequest, EcsClient};
use crate::core::component::{Component, ExecutionContext};
use crate::core::error::AppError;
use crate::core::helpers::decode_configuration;
use crate::core::payload::{Emission, DEFAULT_CHANNEL, FAILED_CHANNEL};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

const NAME: &str = "aws.ecs.describeTask";
const PAYLOAD_TYPE: &str = "aws.ecs.task";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeTaskSpec {
    #[serde(default)]
    cluster: String,
    #[serde(default)]
    task: String,
}

impl DescribeTaskSpec {
    fn parse(configuration: &Value) -> Result<Self, AppError> {
        let spec: DescribeTaskSpec = decode_configuration(NAME, configuration)?;
        if spec.cluster.trim().is_empty() {
            return Err(AppError::validation("cluster is required"));
        }
        if spec.task.trim().is_empty() {
            return Err(AppError::validation("task is required"));
        }
        Ok(spec)
    }
}

/// Reads the current state of a single task.
pub struct DescribeTask {
    client: Arc<EcsClient>,
}

impl DescribeTask {
    pub fn new(client: Arc<EcsClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Component for DescribeTask {
    fn name(&self) -> &'static str {
        NAME
    }

    fn label(&self) -> &'static str {
        "Describe ECS Task"
    }

    fn output_channels(&self) -> &'static [&'static str] {
        &[DEFAULT_CHANNEL, FAILED_CHANNEL]
    }

    fn setup(&self, configuration: &Value) -> Result<(), AppError> {
        DescribeTaskSpec::parse(configuration).map(|_| ())
    }

    async fn execute(&self, ctx: ExecutionContext) -> Result<Emission, AppError> {
        let spec = DescribeTaskSpec::parse(&ctx.configuration)?;
        let request = DescribeTasksRequest {
            cluster: spec.cluster.trim().to_string(),
            tasks: vec![spec.task.trim().to_string()],
        };
        tracing::debug!(cluster = %request.cluster, task = %spec.task, "describing ECS task");

        let response = match self.client.describe_tasks(&request).await {
            Ok(response) => response,
            Err(err) if err.is_client_error() => {
                tracing::warn!(error = %err, "ECS rejected DescribeTasks");
                return Ok(Emission::failed(PAYLOAD_TYPE, err.failure_payload()));
            }
            Err(err) => return Err(err.into()),
        };

        match response.tasks.first() {
            Some(task) => Ok(Emission::default_channel(
                PAYLOAD_TYPE,
                json!({ "task": task.to_payload() }),
            )),
            None => {
                let failure = response.failures.first();
                tracing::warn!(
                    reason = failure.and_then(|f| f.reason.as_deref()).unwrap_or("unknown"),
                    "ECS task not found"
                );
                Ok(Emission::failed(
                    PAYLOAD_TYPE,
                    json!({
                        "task": Value::Null,
                        "failures": serde_json::to_value(&response.failures)?,
                    }),
                ))
            }
        }
    }
}
