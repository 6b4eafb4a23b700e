//! SMTP email delivery.

mod send_email;
pub mod transport;

pub use send_email::SendEmail;
pub use transport::{Delivery, LettreTransport, MailTransport, OutgoingEmail};

use crate::core::component::Component;
use crate::core::error::AppError;
use crate::core::integration::Integration;
use crate::core::types::ErrorCategory;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 587;
const IMPLICIT_TLS_PORT: u16 = 465;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TlsMode {
    Starttls,
    Implicit,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Defaults to implicit TLS on port 465 and STARTTLS elsewhere.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsMode>,
    pub from_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_name: Option<String>,
    /// Overrides `[http] timeout_seconds` for SMTP sessions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_PORT,
            username: None,
            password: None,
            tls: None,
            from_address: String::new(),
            from_name: None,
            timeout_seconds: None,
        }
    }
}

impl SmtpSettings {
    pub fn tls_mode(&self) -> TlsMode {
        self.tls.unwrap_or(if self.port == IMPLICIT_TLS_PORT {
            TlsMode::Implicit
        } else {
            TlsMode::Starttls
        })
    }
}

pub struct SmtpIntegration {
    settings: SmtpSettings,
    transport: Arc<dyn MailTransport>,
}

impl SmtpIntegration {
    pub fn new(settings: &SmtpSettings, timeout: Duration) -> Result<Self, AppError> {
        let timeout = settings
            .timeout_seconds
            .map(Duration::from_secs)
            .unwrap_or(timeout);
        let transport = LettreTransport::new(settings, timeout)?;
        Ok(Self::with_transport(settings, Arc::new(transport)))
    }

    /// Use a custom transport, e.g. a recording one in tests.
    pub fn with_transport(settings: &SmtpSettings, transport: Arc<dyn MailTransport>) -> Self {
        Self {
            settings: settings.clone(),
            transport,
        }
    }
}

#[async_trait]
impl Integration for SmtpIntegration {
    fn name(&self) -> &'static str {
        "smtp"
    }

    fn label(&self) -> &'static str {
        "SMTP"
    }

    async fn sync(&self) -> Result<Value, AppError> {
        if !self.transport.test_connection().await? {
            return Err(AppError::new(
                ErrorCategory::HttpError,
                format!("SMTP server {} did not accept the connection", self.settings.host),
            )
            .with_code("SMTP-CONNECT"));
        }
        Ok(json!({
            "host": self.settings.host,
            "port": self.settings.port,
            "connected": true,
        }))
    }

    fn components(&self) -> Vec<Arc<dyn Component>> {
        vec![Arc::new(SendEmail::new(
            self.transport.clone(),
            &self.settings,
        ))]
    }
}
