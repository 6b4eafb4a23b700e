use serde_json::json;
use std::time::Duration;
use superplane_integrations::core::catalog::Catalog;
use superplane_integrations::core::component::ExecutionContext;
use superplane_integrations::core::types::ErrorCategory;
use superplane_integrations::integrations::aws::{AwsIntegration, AwsSettings};
use wiremock::matchers::{body_partial_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TARGET: &str = "AmazonEC2ContainerServiceV20141113";

fn catalog(server: &MockServer) -> Catalog {
    let settings = AwsSettings {
        access_key_id: "AKIDEXAMPLE".to_string(),
        secret_access_key: "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".to_string(),
        session_token: None,
        region: "us-east-1".to_string(),
        endpoint: Some(format!("{}/", server.uri())),
    };
    let mut builder = Catalog::builder();
    builder.register(AwsIntegration::new(&settings, Duration::from_secs(5)).unwrap());
    builder.build()
}

fn task(arn: &str, status: &str) -> serde_json::Value {
    json!({
        "taskArn": arn,
        "clusterArn": "arn:aws:ecs:us-east-1:123456789012:cluster/prod",
        "taskDefinitionArn": "arn:aws:ecs:us-east-1:123456789012:task-definition/migrate:7",
        "lastStatus": status,
        "desiredStatus": "RUNNING",
        "launchType": "FARGATE",
        "createdAt": 1_700_000_000.0,
        "containers": [{"name": "app", "lastStatus": status}]
    })
}

#[tokio::test]
async fn run_task_signs_request_and_emits_tasks() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .and(header("x-amz-target", format!("{}.RunTask", TARGET).as_str()))
        .and(header("content-type", "application/x-amz-json-1.1"))
        .and(header_exists("authorization"))
        .and(header_exists("x-amz-date"))
        .and(body_partial_json(json!({
            "cluster": "prod",
            "taskDefinition": "migrate:7",
            "count": 1,
            "launchType": "FARGATE",
            "networkConfiguration": {"awsvpcConfiguration": {"subnets": ["subnet-1"], "assignPublicIp": "DISABLED"}}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tasks": [task("arn:aws:ecs:us-east-1:123456789012:task/prod/abc123", "PROVISIONING")],
            "failures": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let component = catalog(&server).component("aws.ecs.runTask").unwrap();
    let emission = component
        .execute(ExecutionContext::new(json!({
            "cluster": "prod",
            "taskDefinition": "migrate:7",
            "launchType": "FARGATE",
            "subnets": ["subnet-1"]
        })))
        .await
        .unwrap();

    assert_eq!(emission.channel, "default");
    assert_eq!(emission.payload_type(), Some("aws.ecs.task"));
    let first = &emission.data()["tasks"][0];
    assert_eq!(first["taskId"], "abc123");
    assert_eq!(first["lastStatus"], "PROVISIONING");
    assert_eq!(first["createdAt"], "2023-11-14T22:13:20.000Z");
}

#[tokio::test]
async fn run_task_with_only_failures_emits_failed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("x-amz-target", format!("{}.RunTask", TARGET).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tasks": [],
            "failures": [{"arn": "arn:aws:ecs:us-east-1:123456789012:container-instance/x", "reason": "RESOURCE:MEMORY"}]
        })))
        .mount(&server)
        .await;

    let component = catalog(&server).component("aws.ecs.runTask").unwrap();
    let emission = component
        .execute(ExecutionContext::new(
            json!({"cluster": "prod", "taskDefinition": "web:1", "launchType": "EC2"}),
        ))
        .await
        .unwrap();

    assert!(emission.is_failed());
    assert_eq!(emission.data()["failures"][0]["reason"], "RESOURCE:MEMORY");
}

#[tokio::test]
async fn client_exception_is_routed_to_failed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("x-amz-target", format!("{}.StopTask", TARGET).as_str()))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "__type": "com.amazonaws.ecs#ClusterNotFoundException",
            "message": "Cluster not found."
        })))
        .mount(&server)
        .await;

    let component = catalog(&server).component("aws.ecs.stopTask").unwrap();
    let emission = component
        .execute(ExecutionContext::new(
            json!({"cluster": "missing", "task": "abc123", "reason": "deploy rollback"}),
        ))
        .await
        .unwrap();

    assert!(emission.is_failed());
    assert_eq!(emission.data()["errorType"], "ClusterNotFoundException");
    assert_eq!(emission.data()["message"], "Cluster not found.");
}

#[tokio::test]
async fn stop_task_sends_reason_and_emits_task() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("x-amz-target", format!("{}.StopTask", TARGET).as_str()))
        .and(body_partial_json(json!({"cluster": "prod", "task": "abc123", "reason": "deploy rollback"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "task": task("arn:aws:ecs:us-east-1:123456789012:task/prod/abc123", "STOPPING")
        })))
        .expect(1)
        .mount(&server)
        .await;

    let component = catalog(&server).component("aws.ecs.stopTask").unwrap();
    let emission = component
        .execute(ExecutionContext::new(
            json!({"cluster": "prod", "task": "abc123", "reason": "deploy rollback"}),
        ))
        .await
        .unwrap();
    assert_eq!(emission.channel, "default");
    assert_eq!(emission.data()["task"]["lastStatus"], "STOPPING");
}

#[tokio::test]
async fn describe_unknown_task_emits_failed_with_failures() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("x-amz-target", format!("{}.DescribeTasks", TARGET).as_str()))
        .and(body_partial_json(json!({"cluster": "prod", "tasks": ["nope"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tasks": [],
            "failures": [{"arn": "nope", "reason": "MISSING"}]
        })))
        .mount(&server)
        .await;

    let component = catalog(&server).component("aws.ecs.describeTask").unwrap();
    let emission = component
        .execute(ExecutionContext::new(json!({"cluster": "prod", "task": "nope"})))
        .await
        .unwrap();
    assert!(emission.is_failed());
    assert!(emission.data()["task"].is_null());
    assert_eq!(emission.data()["failures"][0]["reason"], "MISSING");
}

#[tokio::test]
async fn server_errors_surface_as_api_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "__type": "ServerException",
            "message": "internal"
        })))
        .mount(&server)
        .await;

    let component = catalog(&server).component("aws.ecs.describeTask").unwrap();
    let err = component
        .execute(ExecutionContext::new(json!({"cluster": "prod", "task": "abc"})))
        .await
        .unwrap_err();
    assert_eq!(err.category, ErrorCategory::ApiError);
    assert_eq!(err.code, "AWS-ECS-ServerException");
}

#[tokio::test]
async fn setup_rejects_invalid_configuration_without_network() {
    let server = MockServer::start().await;
    let component = catalog(&server).component("aws.ecs.runTask").unwrap();
    let err = component
        .setup(&json!({"cluster": "prod", "taskDefinition": "web", "count": 0}))
        .unwrap_err();
    assert_eq!(err.category, ErrorCategory::ValidationError);
    assert!(server.received_requests().await.unwrap().is_empty());
}
