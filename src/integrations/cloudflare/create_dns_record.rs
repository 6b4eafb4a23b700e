use super::client::CloudflareClient;
use crate::core::component::{Component, ExecutionContext};
use crate::core::error::AppError;
use crate::core::helpers::decode_configuration;
use crate::core::payload::{Emission, DEFAULT_CHANNEL, FAILED_CHANNEL};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

const NAME: &str = "cloudflare.createDnsRecord";
const PAYLOAD_TYPE: &str = "cloudflare.dnsRecord";
const RECORD_TYPES: &[&str] = &["A", "AAAA", "CNAME", "TXT", "MX", "NS", "SRV", "CAA"];
const PROXIABLE_TYPES: &[&str] = &["A", "AAAA", "CNAME"];

/// TTL of 1 lets Cloudflare choose.
const AUTOMATIC_TTL: u32 = 1;
const MIN_TTL: u32 = 60;
const MAX_TTL: u32 = 86_400;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateDnsRecordSpec {
    #[serde(default)]
    zone_id: String,
    #[serde(rename = "type", default)]
    record_type: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    content: String,
    ttl: Option<u32>,
    proxied: Option<bool>,
    priority: Option<u16>,
    comment: Option<String>,
}

impl CreateDnsRecordSpec {
    fn parse(configuration: &Value) -> Result<Self, AppError> {
        let mut spec: CreateDnsRecordSpec = decode_configuration(NAME, configuration)?;
        spec.record_type = spec.record_type.trim().to_ascii_uppercase();
        spec.validate()?;
        Ok(spec)
    }

    fn validate(&self) -> Result<(), AppError> {
        for (field, value) in [
            ("zoneId", &self.zone_id),
            ("type", &self.record_type),
            ("name", &self.name),
            ("content", &self.content),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::validation(format!("{} is required", field)));
            }
        }
        if !RECORD_TYPES.contains(&self.record_type.as_str()) {
            return Err(AppError::validation(format!(
                "unsupported record type {}; expected one of {}",
                self.record_type,
                RECORD_TYPES.join(", ")
            )));
        }
        let ttl = self.ttl();
        if ttl != AUTOMATIC_TTL && !(MIN_TTL..=MAX_TTL).contains(&ttl) {
            return Err(AppError::validation(format!(
                "ttl must be 1 (automatic) or between {} and {}",
                MIN_TTL, MAX_TTL
            )));
        }
        if self.proxied == Some(true) && !PROXIABLE_TYPES.contains(&self.record_type.as_str()) {
            return Err(AppError::validation(format!(
                "{} records cannot be proxied",
                self.record_type
            )));
        }
        if self.record_type == "MX" && self.priority.is_none() {
            return Err(AppError::validation("priority is required for MX records"));
        }
        Ok(())
    }

    fn ttl(&self) -> u32 {
        self.ttl.unwrap_or(AUTOMATIC_TTL)
    }

    fn request_body(&self) -> Value {
        let mut body = Map::new();
        body.insert("type".into(), json!(self.record_type));
        body.insert("name".into(), json!(self.name.trim()));
        body.insert("content".into(), json!(self.content.trim()));
        body.insert("ttl".into(), json!(self.ttl()));
        if PROXIABLE_TYPES.contains(&self.record_type.as_str()) {
            body.insert("proxied".into(), json!(self.proxied.unwrap_or(false)));
        }
        if let Some(priority) = self.priority {
            body.insert("priority".into(), json!(priority));
        }
        if let Some(comment) = self.comment.as_deref().filter(|c| !c.trim().is_empty()) {
            body.insert("comment".into(), json!(comment));
        }
        Value::Object(body)
    }
}

pub struct CreateDnsRecord {
    client: Arc<CloudflareClient>,
}

impl CreateDnsRecord {
    pub fn new(client: Arc<CloudflareClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Component for CreateDnsRecord {
    fn name(&self) -> &'static str {
        NAME
    }

    fn label(&self) -> &'static str {
        "Create DNS Record"
    }

    fn output_channels(&self) -> &'static [&'static str] {
        &[DEFAULT_CHANNEL, FAILED_CHANNEL]
    }

    fn setup(&self, configuration: &Value) -> Result<(), AppError> {
        CreateDnsRecordSpec::parse(configuration).map(|_| ())
    }

    async fn execute(&self, ctx: ExecutionContext) -> Result<Emission, AppError> {
        let spec = CreateDnsRecordSpec::parse(&ctx.configuration)?;
        tracing::info!(zone = %spec.zone_id, record_type = %spec.record_type, name = %spec.name, "creating DNS record");

        match self
            .client
            .create_dns_record(spec.zone_id.trim(), &spec.request_body())
            .await
        {
            Ok(record) => Ok(Emission::default_channel(
                PAYLOAD_TYPE,
                json!({
                    "id": record.id,
                    "zoneId": record.zone_id.unwrap_or_else(|| spec.zone_id.trim().to_string()),
                    "type": record.record_type,
                    "name": record.name,
                    "content": record.content,
                    "ttl": record.ttl,
                    "proxied": record.proxied.unwrap_or(false),
                    "comment": record.comment,
                    "createdOn": record.created_on,
                }),
            )),
            Err(err) if err.is_validation_failure() => {
                tracing::warn!(error = %err, "Cloudflare rejected DNS record");
                Ok(Emission::failed(PAYLOAD_TYPE, err.failure_payload()))
            }
            Err(err) => Err(err.into()),
        }
    }
}
