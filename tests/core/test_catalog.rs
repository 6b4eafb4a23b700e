use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use superplane_integrations::core::catalog::Catalog;
use superplane_integrations::core::component::{Component, ExecutionContext};
use superplane_integrations::core::config::IntegrationsConfig;
use superplane_integrations::core::error::AppError;
use superplane_integrations::core::integration::Integration;
use superplane_integrations::core::payload::{Emission, Payload, FAILED_CHANNEL};
use superplane_integrations::core::trigger::{Trigger, WebhookRequest};
use superplane_integrations::integrations::cloudflare::CloudflareSettings;
use superplane_integrations::integrations::dash0::Dash0Settings;
use superplane_integrations::integrations::load_catalog;
use superplane_integrations::integrations::smtp::{SmtpSettings, TlsMode};

struct Echo;

#[async_trait]
impl Component for Echo {
    fn name(&self) -> &'static str {
        "test.echo"
    }

    fn label(&self) -> &'static str {
        "Echo"
    }

    fn setup(&self, _configuration: &Value) -> Result<(), AppError> {
        Ok(())
    }

    async fn execute(&self, ctx: ExecutionContext) -> Result<Emission, AppError> {
        Ok(Emission::default_channel(
            "test.echo",
            json!({"configuration": ctx.configuration, "input": ctx.input}),
        ))
    }
}

struct Passthrough;

#[async_trait]
impl Trigger for Passthrough {
    fn name(&self) -> &'static str {
        "test.onEvent"
    }

    fn label(&self) -> &'static str {
        "On Event"
    }

    fn setup(&self, _configuration: &Value) -> Result<(), AppError> {
        Ok(())
    }

    async fn handle_webhook(&self, request: WebhookRequest) -> Result<Vec<Payload>, AppError> {
        let data: Value = serde_json::from_slice(&request.body)?;
        Ok(vec![Payload::new("test.event", data)])
    }
}

struct TestIntegration;

#[async_trait]
impl Integration for TestIntegration {
    fn name(&self) -> &'static str {
        "test"
    }

    fn label(&self) -> &'static str {
        "Test"
    }

    async fn sync(&self) -> Result<Value, AppError> {
        Ok(json!({"ok": true}))
    }

    fn components(&self) -> Vec<Arc<dyn Component>> {
        vec![Arc::new(Echo)]
    }

    fn triggers(&self) -> Vec<Arc<dyn Trigger>> {
        vec![Arc::new(Passthrough)]
    }
}

#[tokio::test]
async fn registered_integration_exposes_components_and_triggers() {
    let mut builder = Catalog::builder();
    builder.register(TestIntegration);
    let catalog = builder.build();

    assert!(!catalog.is_empty());
    assert_eq!(catalog.integration("test").unwrap().label(), "Test");
    assert!(catalog.component("test.missing").is_none());

    let echo = catalog.component("test.echo").unwrap();
    let emission = echo
        .execute(ExecutionContext::new(json!({"a": 1})).with_input(json!("hi")))
        .await
        .unwrap();
    assert_eq!(emission.data(), &json!({"configuration": {"a": 1}, "input": "hi"}));

    let trigger = catalog.trigger("test.onEvent").unwrap();
    let payloads = trigger
        .handle_webhook(WebhookRequest::new(r#"{"id": 7}"#, Value::Null))
        .await
        .unwrap();
    assert_eq!(payloads[0].data["id"], 7);
}

#[test]
#[should_panic(expected = "duplicate integration registered: test")]
fn duplicate_integration_panics() {
    let mut builder = Catalog::builder();
    builder.register(TestIntegration).register(TestIntegration);
}

#[test]
fn clones_share_the_same_registrations() {
    let mut builder = Catalog::builder();
    builder.register(TestIntegration);
    let catalog = builder.build();
    let shared = catalog.clone();
    assert_eq!(shared.components().count(), 1);
    assert_eq!(shared.triggers().count(), 1);
}

#[test]
fn configured_sections_register_their_integrations() {
    let config = IntegrationsConfig {
        cloudflare: Some(CloudflareSettings {
            api_token: "token".to_string(),
            ..Default::default()
        }),
        dash0: Some(Dash0Settings {
            api_token: "auth_x".to_string(),
            ..Default::default()
        }),
        smtp: Some(SmtpSettings {
            host: "smtp.example.com".to_string(),
            from_address: "bot@example.com".to_string(),
            tls: Some(TlsMode::None),
            ..Default::default()
        }),
        ..Default::default()
    };
    let catalog = load_catalog(&config).unwrap();

    let names: Vec<&str> = catalog.integrations().map(|i| i.name()).collect();
    assert_eq!(names, vec!["cloudflare", "dash0", "smtp"]);
    assert!(catalog.component("cloudflare.createRedirectRule").is_some());
    assert!(catalog.component("dash0.queryPrometheus").is_some());
    assert!(catalog.component("smtp.sendEmail").is_some());
    assert!(catalog.trigger("dash0.onAlertEvent").is_some());
    assert!(catalog.component("aws.ecs.runTask").is_none());
}

#[test]
fn failing_components_declare_failed_channel() {
    let config = IntegrationsConfig {
        cloudflare: Some(CloudflareSettings {
            api_token: "token".to_string(),
            ..Default::default()
        }),
        ..Default::default()
    };
    let catalog = load_catalog(&config).unwrap();
    let create = catalog.component("cloudflare.createDnsRecord").unwrap();
    assert!(create.output_channels().contains(&FAILED_CHANNEL));
}
