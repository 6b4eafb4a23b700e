#![allow(clippy::result_large_err)]

use super::{
    AwsVpcConfiguration, ContainerOverride, EcsClient, KeyValuePair, NetworkConfiguration,
    RunTaskRequest, TaskOverride,
};
use crate::core::component::{Component, ExecutionContext};
use crate::core::error::AppError;
use crate::core::helpers::{decode_configuration, embed_json};
use crate::core::payload::{Emission, DEFAULT_CHANNEL, FAILED_CHANNEL};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

const NAME: &str = "aws.ecs.runTask";
const PAYLOAD_TYPE: &str = "aws.ecs.task";
const MAX_COUNT: u32 = 10;
const LAUNCH_TYPES: &[&str] = &["FARGATE", "EC2", "EXTERNAL"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunTaskSpec {
    #[serde(default)]
    cluster: String,
    #[serde(default)]
    task_definition: String,
    count: Option<u32>,
    launch_type: Option<String>,
    platform_version: Option<String>,
    #[serde(default)]
    subnets: Vec<String>,
    #[serde(default)]
    security_groups: Vec<String>,
    #[serde(default)]
    assign_public_ip: bool,
    started_by: Option<String>,
    group: Option<String>,
    #[serde(default)]
    container_overrides: Value,
}

#[derive(Debug, Deserialize)]
struct ContainerOverrideSpec {
    #[serde(default)]
    name: String,
    #[serde(default)]
    command: Vec<String>,
    #[serde(default)]
    environment: Map<String, Value>,
}

impl RunTaskSpec {
    fn parse(configuration: &Value) -> Result<Self, AppError> {
        let spec: RunTaskSpec = decode_configuration(NAME, configuration)?;
        spec.validate()?;
        Ok(spec)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.cluster.trim().is_empty() {
            return Err(AppError::validation("cluster is required"));
        }
        if self.task_definition.trim().is_empty() {
            return Err(AppError::validation("taskDefinition is required"));
        }
        let count = self.count.unwrap_or(1);
        if count == 0 || count > MAX_COUNT {
            return Err(AppError::validation(format!(
                "count must be between 1 and {}",
                MAX_COUNT
            )));
        }
        if let Some(launch_type) = self.launch_type() {
            if !LAUNCH_TYPES.contains(&launch_type.as_str()) {
                return Err(AppError::validation(format!(
                    "launchType must be one of {}",
                    LAUNCH_TYPES.join(", ")
                )));
            }
            if launch_type == "FARGATE" && self.subnets().is_empty() {
                return Err(AppError::validation(
                    "subnets are required for the FARGATE launch type",
                ));
            }
        }
        self.container_overrides()?;
        Ok(())
    }

    fn launch_type(&self) -> Option<String> {
        self.launch_type
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_ascii_uppercase)
    }

    fn subnets(&self) -> Vec<String> {
        non_empty(&self.subnets)
    }

    fn container_overrides(&self) -> Result<Vec<ContainerOverride>, AppError> {
        let raw = embed_json(&self.container_overrides);
        if raw.is_null() || raw.as_str().is_some_and(|text| text.trim().is_empty()) {
            return Ok(Vec::new());
        }
        let specs: Vec<ContainerOverrideSpec> = serde_json::from_value(raw).map_err(|err| {
            AppError::validation(format!("containerOverrides must be a list of overrides: {}", err))
        })?;
        specs
            .into_iter()
            .map(|spec| {
                if spec.name.trim().is_empty() {
                    return Err(AppError::validation(
                        "each container override requires a name",
                    ));
                }
                let environment = spec
                    .environment
                    .into_iter()
                    .map(|(name, value)| KeyValuePair {
                        name,
                        value: match value {
                            Value::String(text) => text,
                            other => other.to_string(),
                        },
                    })
                    .collect();
                Ok(ContainerOverride {
                    name: spec.name.trim().to_string(),
                    command: spec.command,
                    environment,
                })
            })
            .collect()
    }

    fn into_request(self) -> Result<RunTaskRequest, AppError> {
        let overrides = self.container_overrides()?;
        let subnets = self.subnets();
        let network_configuration = if subnets.is_empty() {
            None
        } else {
            Some(NetworkConfiguration {
                awsvpc_configuration: AwsVpcConfiguration {
                    subnets,
                    security_groups: non_empty(&self.security_groups),
                    assign_public_ip: if self.assign_public_ip {
                        "ENABLED".to_string()
                    } else {
                        "DISABLED".to_string()
                    },
                },
            })
        };
        Ok(RunTaskRequest {
            launch_type: self.launch_type(),
            cluster: self.cluster.trim().to_string(),
            task_definition: self.task_definition.trim().to_string(),
            count: self.count.unwrap_or(1),
            platform_version: self.platform_version.filter(|value| !value.is_empty()),
            network_configuration,
            overrides: if overrides.is_empty() {
                None
            } else {
                Some(TaskOverride {
                    container_overrides: overrides,
                })
            },
            started_by: self.started_by.filter(|value| !value.is_empty()),
            group: self.group.filter(|value| !value.is_empty()),
        })
    }
}

fn non_empty(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}

/// Starts one or more tasks from a task definition.
pub struct RunTask {
    client: Arc<EcsClient>,
}

impl RunTask {
    pub fn new(client: Arc<EcsClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Component for RunTask {
    fn name(&self) -> &'static str {
        NAME
    }

    fn label(&self) -> &'static str {
        "Run ECS Task"
    }

    fn output_channels(&self) -> &'static [&'static str] {
        &[DEFAULT_CHANNEL, FAILED_CHANNEL]
    }

    fn setup(&self, configuration: &Value) -> Result<(), AppError> {
        RunTaskSpec::parse(configuration).map(|_| ())
    }

    async fn execute(&self, ctx: ExecutionContext) -> Result<Emission, AppError> {
        let request = RunTaskSpec::parse(&ctx.configuration)?.into_request()?;
        tracing::info!(
            cluster = %request.cluster,
            task_definition = %request.task_definition,
            count = request.count,
            "running ECS task"
        );

        let response = match self.client.run_task(&request).await {
            Ok(response) => response,
            Err(err) if err.is_client_error() => {
                tracing::warn!(error = %err, "ECS rejected RunTask");
                return Ok(Emission::failed(PAYLOAD_TYPE, err.failure_payload()));
            }
            Err(err) => return Err(err.into()),
        };

        let tasks: Vec<Value> = response.tasks.iter().map(|task| task.to_payload()).collect();
        let failures = serde_json::to_value(&response.failures)?;
        if tasks.is_empty() && !response.failures.is_empty() {
            tracing::warn!(failures = response.failures.len(), "no ECS task was started");
            return Ok(Emission::failed(
                PAYLOAD_TYPE,
                json!({ "tasks": tasks, "failures": failures }),
            ));
        }
        Ok(Emission::default_channel(
            PAYLOAD_TYPE,
            json!({ "tasks": tasks, "failures": failures }),
        ))
    }
}
