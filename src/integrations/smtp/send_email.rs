use super::transport::{MailTransport, OutgoingEmail};
use super::SmtpSettings;
use crate::core::component::{Component, ExecutionContext};
use crate::core::error::AppError;
use crate::core::helpers::{decode_configuration, normalize_email, normalize_email_list};
use crate::core::payload::Emission;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

const NAME: &str = "smtp.sendEmail";
const PAYLOAD_TYPE: &str = "smtp.email";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendEmailSpec {
    #[serde(default)]
    to: Value,
    #[serde(default)]
    cc: Value,
    #[serde(default)]
    bcc: Value,
    reply_to: Option<String>,
    #[serde(default)]
    subject: String,
    #[serde(default)]
    body: String,
    content_type: Option<String>,
    from_name: Option<String>,
}

pub struct SendEmail {
    transport: Arc<dyn MailTransport>,
    from_address: String,
    from_name: Option<String>,
}

impl SendEmail {
    pub fn new(transport: Arc<dyn MailTransport>, settings: &SmtpSettings) -> Self {
        Self {
            transport,
            from_address: settings.from_address.clone(),
            from_name: settings.from_name.clone(),
        }
    }

    fn prepare(&self, configuration: &Value) -> Result<OutgoingEmail, AppError> {
        let spec: SendEmailSpec = decode_configuration(NAME, configuration)?;
        let to = normalize_email_list(&spec.to)?;
        let cc = normalize_email_list(&spec.cc)?;
        let bcc = normalize_email_list(&spec.bcc)?;
        if to.is_empty() && cc.is_empty() && bcc.is_empty() {
            return Err(AppError::validation(
                "at least one recipient is required in to, cc or bcc",
            ));
        }
        if spec.subject.trim().is_empty() {
            return Err(AppError::validation("subject is required"));
        }
        if spec.body.trim().is_empty() {
            return Err(AppError::validation("body is required"));
        }
        let html = match spec
            .content_type
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            None | Some("text") => false,
            Some("html") => true,
            Some(other) => {
                return Err(AppError::validation(format!(
                    "contentType must be text or html (got {})",
                    other
                )))
            }
        };
        let reply_to = match spec.reply_to.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => Some(normalize_email(text).ok_or_else(|| {
                AppError::validation(format!("invalid replyTo address: {}", text))
            })?),
            _ => None,
        };
        let from_address = normalize_email(&self.from_address).ok_or_else(|| {
            AppError::validation(format!(
                "smtp.from_address is not a valid address: {}",
                self.from_address
            ))
        })?;
        let from_name = spec
            .from_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .or_else(|| self.from_name.clone());
        let domain = from_address
            .rsplit_once('@')
            .map(|(_, domain)| domain.to_string())
            .unwrap_or_else(|| "localhost".to_string());

        Ok(OutgoingEmail {
            message_id: format!("<{}@{}>", uuid::Uuid::new_v4(), domain),
            from_address,
            from_name,
            to,
            cc,
            bcc,
            reply_to,
            subject: spec.subject.trim().to_string(),
            body: spec.body,
            html,
        })
    }
}

#[async_trait]
impl Component for SendEmail {
    fn name(&self) -> &'static str {
        NAME
    }

    fn label(&self) -> &'static str {
        "Send Email"
    }

    fn setup(&self, configuration: &Value) -> Result<(), AppError> {
        self.prepare(configuration).map(|_| ())
    }

    async fn execute(&self, ctx: ExecutionContext) -> Result<Emission, AppError> {
        let email = self.prepare(&ctx.configuration)?;
        tracing::info!(
            recipients = email.to.len() + email.cc.len() + email.bcc.len(),
            subject = %email.subject,
            "sending email"
        );
        let delivery = self.transport.send(&email).await?;

        Ok(Emission::default_channel(
            PAYLOAD_TYPE,
            json!({
                "to": email.to,
                "cc": email.cc,
                "bcc": email.bcc,
                "subject": email.subject,
                "messageId": email.message_id,
                "response": delivery.response,
            }),
        ))
    }
}
