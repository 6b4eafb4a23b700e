use serde_json::json;
use std::time::Duration;
use superplane_integrations::core::catalog::Catalog;
use superplane_integrations::core::component::ExecutionContext;
use superplane_integrations::core::trigger::WebhookRequest;
use superplane_integrations::core::types::ErrorCategory;
use superplane_integrations::integrations::grafana::{GrafanaIntegration, GrafanaSettings};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn catalog(server: &MockServer) -> Catalog {
    let settings = GrafanaSettings {
        base_url: server.uri(),
        api_token: "glsa_token".to_string(),
    };
    let mut builder = Catalog::builder();
    builder.register(GrafanaIntegration::new(&settings, Duration::from_secs(5)));
    builder.build()
}

#[tokio::test]
async fn query_data_source_reshapes_frames() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ds/query"))
        .and(header("authorization", "Bearer glsa_token"))
        .and(body_partial_json(json!({
            "from": "now-6h",
            "to": "now",
            "queries": [{"refId": "A", "datasource": {"uid": "prom-1"}, "expr": "up"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": {
                "A": {
                    "status": 200,
                    "frames": [{
                        "schema": {
                            "name": "up",
                            "fields": [{"name": "Time"}, {"name": "Value", "config": {"displayNameFromDS": "api"}}]
                        },
                        "data": {"values": [[1709287200000i64, 1709287260000i64], [1, 0]]}
                    }]
                }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let component = catalog(&server)
        .component("grafana.queryDataSource")
        .unwrap();
    let emission = component
        .execute(ExecutionContext::new(json!({
            "dataSourceUid": "prom-1",
            "query": "up",
            "from": "now-6h"
        })))
        .await
        .unwrap();

    assert_eq!(emission.channel, "default");
    assert_eq!(emission.payload_type(), Some("grafana.queryResult"));
    let data = emission.data();
    assert_eq!(data["refId"], "A");
    assert_eq!(data["rowCount"], 2);
    assert_eq!(data["frames"][0]["fields"], json!(["Time", "api"]));
    assert_eq!(data["frames"][0]["rows"][1]["api"], 0);
}

#[tokio::test]
async fn rejected_query_emits_failed_with_ref_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ds/query"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "results": {"B": {"status": 400, "error": "bad_data: parse error at char 3"}}
        })))
        .mount(&server)
        .await;

    let component = catalog(&server)
        .component("grafana.queryDataSource")
        .unwrap();
    let emission = component
        .execute(ExecutionContext::new(json!({
            "dataSourceUid": "prom-1",
            "query": "up{",
            "refId": "B"
        })))
        .await
        .unwrap();

    assert!(emission.is_failed());
    assert_eq!(emission.data()["refId"], "B");
    assert_eq!(emission.data()["status"], 400);
    assert_eq!(emission.data()["error"], "bad_data: parse error at char 3");
}

#[tokio::test]
async fn ref_ids_with_slashes_resolve_their_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ds/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": {
                "latency/p95": {
                    "status": 200,
                    "frames": [{
                        "schema": {"fields": [{"name": "Time"}, {"name": "Value"}]},
                        "data": {"values": [[1709287200000i64], [0.42]]}
                    }]
                }
            }
        })))
        .mount(&server)
        .await;

    let component = catalog(&server)
        .component("grafana.queryDataSource")
        .unwrap();
    let emission = component
        .execute(ExecutionContext::new(json!({
            "dataSourceUid": "prom-1",
            "query": "histogram_quantile(0.95, rate(http_duration_bucket[5m]))",
            "refId": "latency/p95"
        })))
        .await
        .unwrap();

    assert_eq!(emission.channel, "default");
    assert_eq!(emission.data()["refId"], "latency/p95");
    assert_eq!(emission.data()["rowCount"], 1);
}

#[tokio::test]
async fn create_annotation_converts_times() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/annotations"))
        .and(body_partial_json(json!({
            "text": "Deployed v2.3.0",
            "tags": ["deploy", "api"],
            "dashboardUID": "dash-1",
            "time": 1709287200000i64
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 77,
            "message": "Annotation added"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let component = catalog(&server)
        .component("grafana.createAnnotation")
        .unwrap();
    let emission = component
        .execute(ExecutionContext::new(json!({
            "text": "Deployed v2.3.0",
            "tags": ["deploy", "api"],
            "dashboardUid": "dash-1",
            "time": "2024-03-01T10:00:00Z"
        })))
        .await
        .unwrap();

    assert_eq!(emission.data(), &json!({"id": 77, "message": "Annotation added"}));
}

#[tokio::test]
async fn annotation_server_error_is_returned() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/annotations"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let component = catalog(&server)
        .component("grafana.createAnnotation")
        .unwrap();
    let err = component
        .execute(ExecutionContext::new(json!({"text": "x"})))
        .await
        .unwrap_err();
    assert_eq!(err.category, ErrorCategory::ApiError);
    assert_eq!(err.code, "GRAFANA-HTTP-500");
}

#[tokio::test]
async fn alert_trigger_emits_one_event_per_firing_alert() {
    let server = MockServer::start().await;
    let trigger = catalog(&server).trigger("grafana.onAlertFiring").unwrap();
    let body = json!({
        "receiver": "superplane",
        "status": "firing",
        "externalURL": "https://grafana.example.com/",
        "groupKey": "{}:{alertname=\"HighLatency\"}",
        "title": "[FIRING:1] HighLatency",
        "alerts": [
            {
                "status": "firing",
                "labels": {"alertname": "HighLatency", "service": "api"},
                "annotations": {"summary": "p99 above 2s"},
                "startsAt": "2024-03-01T10:00:00Z",
                "endsAt": "0001-01-01T00:00:00Z",
                "fingerprint": "a1b2",
                "generatorURL": "https://grafana.example.com/alerting/grafana/abc/view",
                "dashboardURL": ""
            },
            {
                "status": "resolved",
                "labels": {"alertname": "DiskFull"},
                "startsAt": "2024-03-01T09:00:00Z",
                "endsAt": "2024-03-01T09:30:00Z"
            }
        ]
    });

    let payloads = trigger
        .handle_webhook(WebhookRequest::new(body.to_string(), serde_json::Value::Null))
        .await
        .unwrap();

    assert_eq!(payloads.len(), 1);
    let alert = &payloads[0].data;
    assert_eq!(payloads[0].payload_type, "grafana.alert");
    assert_eq!(alert["alertName"], "HighLatency");
    assert_eq!(alert["status"], "firing");
    assert!(alert["endsAt"].is_null());
    assert!(alert["dashboardUrl"].is_null());
    assert_eq!(alert["receiver"], "superplane");
    assert_eq!(alert["externalUrl"], "https://grafana.example.com/");
}

#[tokio::test]
async fn alert_trigger_filters_names_and_checks_secret() {
    let server = MockServer::start().await;
    let trigger = catalog(&server).trigger("grafana.onAlertFiring").unwrap();
    let body = json!({
        "status": "resolved",
        "alerts": [
            {"labels": {"alertname": "DiskFull"}},
            {"labels": {"alertname": "CPUHigh"}}
        ]
    })
    .to_string();
    let configuration = json!({
        "statuses": ["resolved"],
        "alertNames": ["diskfull"],
        "secret": "hook-secret"
    });

    let denied = trigger
        .handle_webhook(WebhookRequest::new(body.clone(), configuration.clone()))
        .await
        .unwrap_err();
    assert_eq!(denied.category, ErrorCategory::AuthenticationError);

    let payloads = trigger
        .handle_webhook(
            WebhookRequest::new(body, configuration)
                .with_header("Authorization", "Bearer hook-secret"),
        )
        .await
        .unwrap();
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0].data["alertName"], "DiskFull");
    assert_eq!(payloads[0].data["status"], "resolved");
}

#[tokio::test]
async fn malformed_notification_is_a_validation_error() {
    let server = MockServer::start().await;
    let trigger = catalog(&server).trigger("grafana.onAlertFiring").unwrap();
    let err = trigger
        .handle_webhook(WebhookRequest::new("not json", serde_json::Value::Null))
        .await
        .unwrap_err();
    assert_eq!(err.category, ErrorCategory::ValidationError);
}

#[tokio::test]
async fn sync_searches_with_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/search"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"uid": "dash-1"}])))
        .expect(1)
        .mount(&server)
        .await;

    let integration = catalog(&server).integration("grafana").unwrap();
    let details = integration.sync().await.unwrap();
    assert_eq!(details["reachable"], true);
    assert_eq!(details["sampleResults"], 1);
}
