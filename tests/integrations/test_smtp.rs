use async_trait::async_trait;
use serde_json::json;
use std::sync::{Arc, Mutex};
use superplane_integrations::core::catalog::Catalog;
use superplane_integrations::core::component::ExecutionContext;
use superplane_integrations::core::error::AppError;
use superplane_integrations::core::types::ErrorCategory;
use superplane_integrations::integrations::smtp::{
    Delivery, MailTransport, OutgoingEmail, SmtpIntegration, SmtpSettings,
};

#[derive(Default)]
struct RecordingTransport {
    sent: Mutex<Vec<OutgoingEmail>>,
    reject: bool,
    reachable: bool,
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn send(&self, email: &OutgoingEmail) -> Result<Delivery, AppError> {
        if self.reject {
            return Err(
                AppError::new(ErrorCategory::ApiError, "550 mailbox unavailable")
                    .with_code("SMTP-SEND"),
            );
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(Delivery {
            response: "250 2.0.0 Ok: queued".to_string(),
        })
    }

    async fn test_connection(&self) -> Result<bool, AppError> {
        Ok(self.reachable)
    }
}

fn settings() -> SmtpSettings {
    SmtpSettings {
        host: "smtp.example.com".to_string(),
        from_address: "deploy@Example.COM".to_string(),
        from_name: Some("Deploy Bot".to_string()),
        ..SmtpSettings::default()
    }
}

fn catalog(transport: Arc<RecordingTransport>) -> Catalog {
    let mut builder = Catalog::builder();
    builder.register(SmtpIntegration::with_transport(&settings(), transport));
    builder.build()
}

#[tokio::test]
async fn send_email_normalizes_recipients_and_reports_delivery() {
    let transport = Arc::new(RecordingTransport::default());
    let component = catalog(transport.clone())
        .component("smtp.sendEmail")
        .unwrap();

    let emission = component
        .execute(ExecutionContext::new(json!({
            "to": "Ops Team <ops@Example.com>, dev@example.com; ops@example.com",
            "bcc": ["audit@example.com"],
            "subject": "  Deploy finished ",
            "body": "<p>v2.3.0 is live</p>",
            "contentType": "HTML",
            "replyTo": "noreply@example.com"
        })))
        .await
        .unwrap();

    assert_eq!(emission.channel, "default");
    assert_eq!(emission.payload_type(), Some("smtp.email"));
    let data = emission.data();
    assert_eq!(data["to"], json!(["ops@example.com", "dev@example.com"]));
    assert_eq!(data["bcc"], json!(["audit@example.com"]));
    assert_eq!(data["subject"], "Deploy finished");
    assert_eq!(data["response"], "250 2.0.0 Ok: queued");
    let message_id = data["messageId"].as_str().unwrap();
    assert!(message_id.starts_with('<'));
    assert!(message_id.ends_with("@example.com>"));

    let sent = transport.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].html);
    assert_eq!(sent[0].from_address, "deploy@example.com");
    assert_eq!(sent[0].from_name.as_deref(), Some("Deploy Bot"));
    assert_eq!(sent[0].reply_to.as_deref(), Some("noreply@example.com"));
}

#[tokio::test]
async fn per_message_sender_name_overrides_default() {
    let transport = Arc::new(RecordingTransport::default());
    let component = catalog(transport.clone())
        .component("smtp.sendEmail")
        .unwrap();

    component
        .execute(ExecutionContext::new(json!({
            "cc": "lead@example.com",
            "subject": "Heads up",
            "body": "Rollout paused",
            "fromName": "Release Train"
        })))
        .await
        .unwrap();

    let sent = transport.sent.lock().unwrap();
    assert!(!sent[0].html);
    assert!(sent[0].to.is_empty());
    assert_eq!(sent[0].cc, vec!["lead@example.com".to_string()]);
    assert_eq!(sent[0].from_name.as_deref(), Some("Release Train"));
}

#[tokio::test]
async fn setup_rejects_bad_messages() {
    let transport = Arc::new(RecordingTransport::default());
    let component = catalog(transport.clone())
        .component("smtp.sendEmail")
        .unwrap();

    let no_recipients = component
        .setup(&json!({"subject": "x", "body": "y"}))
        .unwrap_err();
    assert_eq!(no_recipients.category, ErrorCategory::ValidationError);

    assert!(component
        .setup(&json!({"to": "not-an-address", "subject": "x", "body": "y"}))
        .is_err());
    assert!(component
        .setup(&json!({"to": "a@example.com", "subject": " ", "body": "y"}))
        .is_err());
    assert!(component
        .setup(&json!({"to": "a@example.com", "subject": "x", "body": "y", "contentType": "markdown"}))
        .is_err());
    assert!(transport.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn delivery_failure_is_returned() {
    let transport = Arc::new(RecordingTransport {
        reject: true,
        ..RecordingTransport::default()
    });
    let component = catalog(transport).component("smtp.sendEmail").unwrap();
    let err = component
        .execute(ExecutionContext::new(json!({
            "to": "ops@example.com",
            "subject": "x",
            "body": "y"
        })))
        .await
        .unwrap_err();
    assert_eq!(err.code, "SMTP-SEND");
}

#[tokio::test]
async fn sync_checks_connection() {
    let up = Arc::new(RecordingTransport {
        reachable: true,
        ..RecordingTransport::default()
    });
    let details = catalog(up).integration("smtp").unwrap().sync().await.unwrap();
    assert_eq!(details["host"], "smtp.example.com");
    assert_eq!(details["port"], 587);
    assert_eq!(details["connected"], true);

    let down = Arc::new(RecordingTransport::default());
    let err = catalog(down)
        .integration("smtp")
        .unwrap()
        .sync()
        .await
        .unwrap_err();
    assert_eq!(err.code, "SMTP-CONNECT");
}
