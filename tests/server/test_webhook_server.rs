use async_trait::async_trait;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use superplane_integrations::core::catalog::Catalog;
use superplane_integrations::core::config::IntegrationsConfig;
use superplane_integrations::core::error::AppError;
use superplane_integrations::core::payload::Payload;
use superplane_integrations::core::webhook::{serve_webhook_with_ready_notifier, EventSink};
use superplane_integrations::integrations::dash0::{Dash0Integration, Dash0Settings};
use superplane_integrations::integrations::grafana::{GrafanaIntegration, GrafanaSettings};
use tokio::sync::oneshot;

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<(String, Payload)>>,
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn publish(&self, trigger: &str, payloads: &[Payload]) -> Result<(), AppError> {
        let mut events = self.events.lock().unwrap();
        for payload in payloads {
            events.push((trigger.to_string(), payload.clone()));
        }
        Ok(())
    }
}

async fn start_server(sink: Arc<RecordingSink>) -> SocketAddr {
    let mut config = IntegrationsConfig::default();
    config.server.bind = "127.0.0.1:0".to_string();
    config.server.max_body_bytes = 2048;
    config.triggers.insert(
        "dash0.onAlertEvent".to_string(),
        json!({"secret": "s3cret"}),
    );

    let timeout = Duration::from_secs(5);
    let mut builder = Catalog::builder();
    builder
        .register(Dash0Integration::new(
            &Dash0Settings {
                api_token: "auth_x".to_string(),
                ..Dash0Settings::default()
            },
            timeout,
        ))
        .register(GrafanaIntegration::new(
            &GrafanaSettings {
                base_url: "http://127.0.0.1:9".to_string(),
                api_token: "glsa_x".to_string(),
            },
            timeout,
        ));
    let catalog = builder.build();

    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        let _ = serve_webhook_with_ready_notifier(catalog, config, sink, tx).await;
    });
    rx.await.unwrap()
}

fn url(addr: SocketAddr, trigger: &str) -> String {
    format!("http://{}/v1/webhooks/{}", addr, trigger)
}

#[tokio::test]
async fn delivers_trigger_events_to_sink() {
    let sink = Arc::new(RecordingSink::default());
    let addr = start_server(sink.clone()).await;

    let response = reqwest::Client::new()
        .post(url(addr, "grafana.onAlertFiring"))
        .json(&json!({
            "status": "firing",
            "alerts": [
                {"labels": {"alertname": "HighLatency"}},
                {"status": "resolved", "labels": {"alertname": "DiskFull"}}
            ]
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["trigger"], "grafana.onAlertFiring");
    assert_eq!(body["events"], 1);
    assert_eq!(body["payloads"][0]["type"], "grafana.alert");

    let events = sink.events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].0, "grafana.onAlertFiring");
    assert_eq!(events[0].1.data["alertName"], "HighLatency");
}

#[tokio::test]
async fn unknown_trigger_is_not_found() {
    let sink = Arc::new(RecordingSink::default());
    let addr = start_server(sink).await;

    let response = reqwest::Client::new()
        .post(url(addr, "nope.onThing"))
        .body("{}")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], "WEBHOOK-404");
    assert_eq!(body["error"]["message"], "unknown trigger: nope.onThing");
}

#[tokio::test]
async fn configured_secret_is_enforced() {
    let sink = Arc::new(RecordingSink::default());
    let addr = start_server(sink.clone()).await;
    let client = reqwest::Client::new();
    let event = json!({"events": [{"id": "evt-1", "status": "firing", "checkRuleName": "Latency"}]});

    let denied = client
        .post(url(addr, "dash0.onAlertEvent"))
        .header("Authorization", "Bearer wrong")
        .json(&event)
        .send()
        .await
        .unwrap();
    assert_eq!(denied.status(), 401);
    let body: Value = denied.json().await.unwrap();
    assert_eq!(body["error"]["code"], "WEBHOOK-401");

    let accepted = client
        .post(url(addr, "dash0.onAlertEvent"))
        .header("Authorization", "Bearer s3cret")
        .json(&event)
        .send()
        .await
        .unwrap();
    assert_eq!(accepted.status(), 200);
    assert_eq!(sink.events.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let sink = Arc::new(RecordingSink::default());
    let addr = start_server(sink.clone()).await;

    let response = reqwest::Client::new()
        .post(url(addr, "grafana.onAlertFiring"))
        .body("not json")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], "WEBHOOK-400");
    assert!(sink.events.lock().unwrap().is_empty());
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let sink = Arc::new(RecordingSink::default());
    let addr = start_server(sink.clone()).await;

    let response = reqwest::Client::new()
        .post(url(addr, "grafana.onAlertFiring"))
        .body("x".repeat(4096))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 413);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], "WEBHOOK-413");
    assert!(sink.events.lock().unwrap().is_empty());
}
