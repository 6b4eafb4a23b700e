use super::client::CloudflareClient;
use crate::core::component::{Component, ExecutionContext};
use crate::core::error::AppError;
use crate::core::helpers::decode_configuration;
use crate::core::payload::{Emission, DEFAULT_CHANNEL, FAILED_CHANNEL};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

const NAME: &str = "cloudflare.deleteDnsRecord";
const PAYLOAD_TYPE: &str = "cloudflare.dnsRecord";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteDnsRecordSpec {
    #[serde(default)]
    zone_id: String,
    #[serde(default)]
    record_id: String,
}

impl DeleteDnsRecordSpec {
    fn parse(configuration: &Value) -> Result<Self, AppError> {
        let spec: DeleteDnsRecordSpec = decode_configuration(NAME, configuration)?;
        if spec.zone_id.trim().is_empty() {
            return Err(AppError::validation("zoneId is required"));
        }
        if spec.record_id.trim().is_empty() {
            return Err(AppError::validation("recordId is required"));
        }
        Ok(spec)
    }
}

pub struct DeleteDnsRecord {
    client: Arc<CloudflareClient>,
}

impl DeleteDnsRecord {
    pub fn new(client: Arc<CloudflareClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Component for DeleteDnsRecord {
    fn name(&self) -> &'static str {
        NAME
    }

    fn label(&self) -> &'static str {
        "Delete DNS Record"
    }

    fn output_channels(&self) -> &'static [&'static str] {
        &[DEFAULT_CHANNEL, FAILED_CHANNEL]
    }

    fn setup(&self, configuration: &Value) -> Result<(), AppError> {
        DeleteDnsRecordSpec::parse(configuration).map(|_| ())
    }

    async fn execute(&self, ctx: ExecutionContext) -> Result<Emission, AppError> {
        let spec = DeleteDnsRecordSpec::parse(&ctx.configuration)?;
        let record_id = spec.record_id.trim();
        tracing::info!(zone = %spec.zone_id, record = %record_id, "deleting DNS record");

        match self
            .client
            .delete_dns_record(spec.zone_id.trim(), record_id)
            .await
        {
            Ok(result) => {
                let id = result
                    .as_ref()
                    .and_then(|value| value.get("id"))
                    .and_then(Value::as_str)
                    .unwrap_or(record_id)
                    .to_string();
                Ok(Emission::default_channel(PAYLOAD_TYPE, json!({ "id": id })))
            }
            Err(err) if err.is_not_found() => {
                tracing::warn!(error = %err, "DNS record not found");
                Ok(Emission::failed(PAYLOAD_TYPE, err.failure_payload()))
            }
            Err(err) => Err(err.into()),
        }
    }
}
