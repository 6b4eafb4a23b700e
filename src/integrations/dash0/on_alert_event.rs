use super::alert_event::{self, STATUS_FIRING, STATUS_RESOLVED, STATUS_UNKNOWN};
use crate::core::error::AppError;
use crate::core::helpers::{decode_configuration, verify_bearer};
use crate::core::payload::Payload;
use crate::core::trigger::{Trigger, WebhookRequest};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

const NAME: &str = "dash0.onAlertEvent";
const PAYLOAD_TYPE: &str = "dash0.alertEvent";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OnAlertEventSpec {
    #[serde(default)]
    statuses: Vec<String>,
    #[serde(default)]
    check_rules: Vec<String>,
    secret: Option<String>,
}

impl OnAlertEventSpec {
    fn parse(configuration: &Value) -> Result<Self, AppError> {
        if configuration.is_null() {
            return Ok(Self::default());
        }
        let spec: OnAlertEventSpec = decode_configuration(NAME, configuration)?;
        for status in &spec.statuses {
            let status = status.trim().to_ascii_lowercase();
            if ![STATUS_FIRING, STATUS_RESOLVED, STATUS_UNKNOWN].contains(&status.as_str()) {
                return Err(AppError::validation(format!(
                    "unsupported status filter {}; expected firing, resolved or unknown",
                    status
                )));
            }
        }
        Ok(spec)
    }

    fn accepts_status(&self, status: &str) -> bool {
        if self.statuses.is_empty() {
            return status == STATUS_FIRING || status == STATUS_RESOLVED;
        }
        self.statuses
            .iter()
            .any(|allowed| allowed.trim().eq_ignore_ascii_case(status))
    }

    fn accepts_check_rule(&self, check_rule: Option<&str>) -> bool {
        let filters: Vec<&str> = self
            .check_rules
            .iter()
            .map(|rule| rule.trim())
            .filter(|rule| !rule.is_empty())
            .collect();
        if filters.is_empty() {
            return true;
        }
        check_rule.is_some_and(|name| {
            filters
                .iter()
                .any(|filter| filter.eq_ignore_ascii_case(name.trim()))
        })
    }
}

/// Emits one workflow event per Dash0 alert notification that passes the filters.
pub struct OnAlertEvent;

#[async_trait]
impl Trigger for OnAlertEvent {
    fn name(&self) -> &'static str {
        NAME
    }

    fn label(&self) -> &'static str {
        "On Dash0 Alert Event"
    }

    fn setup(&self, configuration: &Value) -> Result<(), AppError> {
        OnAlertEventSpec::parse(configuration).map(|_| ())
    }

    async fn handle_webhook(&self, request: WebhookRequest) -> Result<Vec<Payload>, AppError> {
        let spec = OnAlertEventSpec::parse(&request.configuration)?;
        verify_bearer(&request, spec.secret.as_deref())?;

        let body: Value = serde_json::from_slice(&request.body).map_err(|err| {
            AppError::validation(format!("Dash0 webhook body is not valid JSON: {}", err))
        })?;

        let events = alert_event::split_events(&body);
        let received = events.len();
        let payloads: Vec<Payload> = events
            .into_iter()
            .map(alert_event::normalize)
            .filter(|event| {
                spec.accepts_status(event.status)
                    && spec.accepts_check_rule(event.check_rule.as_deref())
            })
            .map(|event| Payload::new(PAYLOAD_TYPE, event.to_payload()))
            .collect();

        tracing::debug!(received, emitted = payloads.len(), "handled Dash0 alert webhook");
        Ok(payloads)
    }
}
