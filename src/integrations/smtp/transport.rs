//! Mail delivery seam. The default implementation speaks SMTP through lettre.

use super::{SmtpSettings, TlsMode};
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, MessageBuilder};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;

/// A fully resolved message ready for delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub from_address: String,
    pub from_name: Option<String>,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub reply_to: Option<String>,
    pub subject: String,
    pub body: String,
    pub html: bool,
    pub message_id: String,
}

/// Outcome reported by the mail server.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub response: String,
}

#[async_trait]
pub trait MailTransport: Send + Sync + 'static {
    async fn send(&self, email: &OutgoingEmail) -> Result<Delivery, AppError>;

    /// Open a connection and greet the server without sending anything.
    async fn test_connection(&self) -> Result<bool, AppError>;
}

pub struct LettreTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl LettreTransport {
    pub fn new(settings: &SmtpSettings, timeout: Duration) -> Result<Self, AppError> {
        let tls_mode = settings.tls_mode();
        let builder = match tls_mode {
            TlsMode::None => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host)
                    .port(settings.port)
                    .tls(Tls::None)
            }
            TlsMode::Starttls => {
                let parameters = TlsParameters::builder(settings.host.clone())
                    .build_rustls()
                    .map_err(|err| smtp_config_error(format!("TLS configuration error: {}", err)))?;
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host)
                    .port(settings.port)
                    .tls(Tls::Required(parameters))
            }
            TlsMode::Implicit => AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
                .map_err(|err| smtp_config_error(err.to_string()))?
                .port(settings.port),
        };

        let builder = match (&settings.username, &settings.password) {
            (Some(username), Some(password)) => {
                builder.credentials(Credentials::new(username.clone(), password.clone()))
            }
            _ => builder,
        };

        tracing::debug!(
            host = %settings.host,
            port = settings.port,
            tls = ?tls_mode,
            "SMTP transport configured"
        );
        Ok(Self {
            transport: builder.timeout(Some(timeout)).build(),
        })
    }
}

fn smtp_config_error(message: String) -> AppError {
    AppError::new(ErrorCategory::ConfigurationError, message).with_code("SMTP-CONFIG")
}

fn parse_address(address: &str) -> Result<Address, AppError> {
    address.parse::<Address>().map_err(|err| {
        AppError::validation(format!("invalid email address {}: {}", address, err))
    })
}

fn build_message(email: &OutgoingEmail) -> Result<Message, AppError> {
    let from = Mailbox::new(email.from_name.clone(), parse_address(&email.from_address)?);
    let mut builder: MessageBuilder = Message::builder()
        .from(from)
        .subject(email.subject.clone())
        .message_id(Some(email.message_id.clone()));
    for address in &email.to {
        builder = builder.to(Mailbox::new(None, parse_address(address)?));
    }
    for address in &email.cc {
        builder = builder.cc(Mailbox::new(None, parse_address(address)?));
    }
    for address in &email.bcc {
        builder = builder.bcc(Mailbox::new(None, parse_address(address)?));
    }
    if let Some(reply_to) = &email.reply_to {
        builder = builder.reply_to(Mailbox::new(None, parse_address(reply_to)?));
    }
    let content_type = if email.html {
        ContentType::TEXT_HTML
    } else {
        ContentType::TEXT_PLAIN
    };
    builder
        .header(content_type)
        .body(email.body.clone())
        .map_err(|err| AppError::validation(format!("failed to build email: {}", err)))
}

#[async_trait]
impl MailTransport for LettreTransport {
    async fn send(&self, email: &OutgoingEmail) -> Result<Delivery, AppError> {
        let message = build_message(email)?;
        let response = self.transport.send(message).await.map_err(|err| {
            tracing::error!(error = %err, "SMTP delivery failed");
            AppError::new(ErrorCategory::ApiError, format!("SMTP delivery failed: {}", err))
                .with_code("SMTP-SEND")
        })?;
        Ok(Delivery {
            response: format!(
                "{} {}",
                response.code(),
                response.message().collect::<Vec<_>>().join(" ")
            ),
        })
    }

    async fn test_connection(&self) -> Result<bool, AppError> {
        self.transport.test_connection().await.map_err(|err| {
            AppError::new(
                ErrorCategory::HttpError,
                format!("SMTP connection failed: {}", err),
            )
            .with_code("SMTP-CONNECT")
        })
    }
}
