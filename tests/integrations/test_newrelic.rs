use serde_json::json;
use std::time::Duration;
use superplane_integrations::core::catalog::Catalog;
use superplane_integrations::core::component::ExecutionContext;
use superplane_integrations::core::types::ErrorCategory;
use superplane_integrations::integrations::newrelic::{NewRelicIntegration, NewRelicSettings};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings(server: &MockServer) -> NewRelicSettings {
    NewRelicSettings {
        user_api_key: "NRAK-user".to_string(),
        license_key: "license-123".to_string(),
        account_id: Some(1234567),
        graphql_url: Some(format!("{}/graphql", server.uri())),
        metric_url: Some(format!("{}/metric/v1", server.uri())),
        ..NewRelicSettings::default()
    }
}

fn catalog(settings: &NewRelicSettings) -> Catalog {
    let mut builder = Catalog::builder();
    builder.register(NewRelicIntegration::new(settings, Duration::from_secs(5)));
    builder.build()
}

#[tokio::test]
async fn report_metric_posts_with_license_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/metric/v1"))
        .and(header("Api-Key", "license-123"))
        .and(body_partial_json(json!([{
            "metrics": [{
                "name": "deploy.count",
                "type": "count",
                "value": 3.0,
                "interval.ms": 60000,
                "timestamp": 1709287200000i64,
                "attributes": {"service": "api"}
            }]
        }])))
        .respond_with(
            ResponseTemplate::new(202).set_body_json(json!({"requestId": "req-7f3a"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let component = catalog(&settings(&server))
        .component("newrelic.reportMetric")
        .unwrap();
    let emission = component
        .execute(ExecutionContext::new(json!({
            "name": "deploy.count",
            "type": "count",
            "value": 3,
            "intervalMs": 60000,
            "attributes": {"service": "api"},
            "timestamp": "2024-03-01T10:00:00Z"
        })))
        .await
        .unwrap();

    assert_eq!(emission.channel, "default");
    assert_eq!(emission.payload_type(), Some("newrelic.metric"));
    assert_eq!(emission.data()["requestId"], "req-7f3a");
    assert_eq!(emission.data()["type"], "count");
    assert_eq!(emission.data()["timestamp"], 1709287200000i64);
}

#[tokio::test]
async fn nrql_query_uses_integration_account() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(header("API-Key", "NRAK-user"))
        .and(body_partial_json(json!({
            "variables": {"accountId": 1234567, "nrql": "SELECT count(*) FROM Transaction"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"actor": {"account": {"nrql": {"results": [{"count": 42}]}}}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let component = catalog(&settings(&server))
        .component("newrelic.runNrqlQuery")
        .unwrap();
    let emission = component
        .execute(ExecutionContext::new(
            json!({"query": "  SELECT count(*) FROM Transaction "}),
        ))
        .await
        .unwrap();

    assert_eq!(emission.data()["accountId"], 1234567);
    assert_eq!(emission.data()["query"], "SELECT count(*) FROM Transaction");
    assert_eq!(emission.data()["results"][0]["count"], 42);
}

#[tokio::test]
async fn graphql_errors_become_api_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": null,
            "errors": [{"message": "NRQL Syntax Error: unexpected token"}]
        })))
        .mount(&server)
        .await;

    let component = catalog(&settings(&server))
        .component("newrelic.runNrqlQuery")
        .unwrap();
    let err = component
        .execute(ExecutionContext::new(
            json!({"query": "SELEKT *", "accountId": 99}),
        ))
        .await
        .unwrap_err();
    assert_eq!(err.category, ErrorCategory::ApiError);
    assert_eq!(err.code, "NEWRELIC-GRAPHQL");
    assert!(err.message.contains("NRQL Syntax Error"));
}

#[tokio::test]
async fn query_without_account_is_rejected_at_setup() {
    let server = MockServer::start().await;
    let settings = NewRelicSettings {
        account_id: None,
        ..settings(&server)
    };
    let component = catalog(&settings).component("newrelic.runNrqlQuery").unwrap();
    let err = component
        .setup(&json!({"query": "SELECT 1 FROM Transaction"}))
        .unwrap_err();
    assert_eq!(err.category, ErrorCategory::ValidationError);
    assert!(component
        .setup(&json!({"query": "SELECT 1 FROM Transaction", "accountId": 5}))
        .is_ok());
}

#[tokio::test]
async fn missing_license_key_is_a_configuration_error() {
    let server = MockServer::start().await;
    let settings = NewRelicSettings {
        license_key: String::new(),
        ..settings(&server)
    };
    let component = catalog(&settings).component("newrelic.reportMetric").unwrap();
    let err = component
        .execute(ExecutionContext::new(json!({"name": "x", "value": 1})))
        .await
        .unwrap_err();
    assert_eq!(err.category, ErrorCategory::ConfigurationError);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn sync_reports_current_user() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"actor": {"user": {"name": "Ops Bot", "email": "ops@example.com"}}}
        })))
        .mount(&server)
        .await;

    let integration = catalog(&settings(&server)).integration("newrelic").unwrap();
    let details = integration.sync().await.unwrap();
    assert_eq!(details["user"]["email"], "ops@example.com");
    assert_eq!(details["accountId"], 1234567);
}
