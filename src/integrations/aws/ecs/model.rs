use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RunTaskRequest {
    pub cluster: String,
    pub task_definition: String,
    pub count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub launch_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_configuration: Option<NetworkConfiguration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overrides: Option<TaskOverride>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfiguration {
    pub awsvpc_configuration: AwsVpcConfiguration,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsVpcConfiguration {
    pub subnets: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub security_groups: Vec<String>,
    pub assign_public_ip: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskOverride {
    pub container_overrides: Vec<ContainerOverride>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerOverride {
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub environment: Vec<KeyValuePair>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeyValuePair {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RunTaskResponse {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub failures: Vec<Failure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StopTaskRequest {
    pub cluster: String,
    pub task: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct StopTaskResponse {
    pub task: Option<Task>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DescribeTasksRequest {
    pub cluster: String,
    pub tasks: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct DescribeTasksResponse {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub failures: Vec<Failure>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListClustersResponse {
    #[serde(default)]
    pub cluster_arns: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub task_arn: Option<String>,
    pub cluster_arn: Option<String>,
    pub task_definition_arn: Option<String>,
    pub last_status: Option<String>,
    pub desired_status: Option<String>,
    pub launch_type: Option<String>,
    /// Epoch seconds with fractional part, as returned by the JSON protocol.
    pub created_at: Option<f64>,
    pub started_at: Option<f64>,
    pub stopped_at: Option<f64>,
    pub started_by: Option<String>,
    pub group: Option<String>,
    pub stopped_reason: Option<String>,
    pub stop_code: Option<String>,
    #[serde(default)]
    pub containers: Vec<Container>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub name: Option<String>,
    pub container_arn: Option<String>,
    pub last_status: Option<String>,
    pub exit_code: Option<i64>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Failure {
    pub arn: Option<String>,
    pub reason: Option<String>,
    pub detail: Option<String>,
}

impl Task {
    /// Task id is the last segment of the task ARN.
    pub fn task_id(&self) -> Option<&str> {
        self.task_arn
            .as_deref()
            .and_then(|arn| arn.rsplit('/').next())
    }

    /// Normalized output shape shared by the ECS components.
    pub fn to_payload(&self) -> Value {
        json!({
            "taskArn": self.task_arn,
            "taskId": self.task_id(),
            "clusterArn": self.cluster_arn,
            "taskDefinitionArn": self.task_definition_arn,
            "lastStatus": self.last_status,
            "desiredStatus": self.desired_status,
            "launchType": self.launch_type,
            "createdAt": self.created_at.and_then(epoch_to_rfc3339),
            "startedAt": self.started_at.and_then(epoch_to_rfc3339),
            "stoppedAt": self.stopped_at.and_then(epoch_to_rfc3339),
            "startedBy": self.started_by,
            "group": self.group,
            "stoppedReason": self.stopped_reason,
            "stopCode": self.stop_code,
            "containers": self.containers.iter().map(|container| json!({
                "name": container.name,
                "lastStatus": container.last_status,
                "exitCode": container.exit_code,
                "reason": container.reason,
            })).collect::<Vec<_>>(),
        })
    }
}

fn epoch_to_rfc3339(seconds: f64) -> Option<String> {
    let whole = seconds.trunc() as i64;
    let nanos = ((seconds - seconds.trunc()) * 1e9).round() as u32;
    DateTime::<Utc>::from_timestamp(whole, nanos.min(999_999_999))
        .map(|timestamp| timestamp.to_rfc3339_opts(SecondsFormat::Millis, true))
}
