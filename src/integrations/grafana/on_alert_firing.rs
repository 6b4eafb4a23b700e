use crate::core::error::AppError;
use crate::core::helpers::{decode_configuration, verify_bearer};
use crate::core::payload::Payload;
use crate::core::trigger::{Trigger, WebhookRequest};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};

const NAME: &str = "grafana.onAlertFiring";
const PAYLOAD_TYPE: &str = "grafana.alert";
const STATUSES: &[&str] = &["firing", "resolved"];

/// Grafana sends the Go zero time for alerts that have not ended.
const ZERO_TIME_PREFIX: &str = "0001-01-01";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OnAlertFiringSpec {
    #[serde(default)]
    statuses: Vec<String>,
    #[serde(default)]
    alert_names: Vec<String>,
    secret: Option<String>,
}

impl OnAlertFiringSpec {
    fn parse(configuration: &Value) -> Result<Self, AppError> {
        if configuration.is_null() {
            return Ok(Self::default());
        }
        let spec: OnAlertFiringSpec = decode_configuration(NAME, configuration)?;
        for status in &spec.statuses {
            if !STATUSES.contains(&status.trim().to_ascii_lowercase().as_str()) {
                return Err(AppError::validation(format!(
                    "unsupported status filter {}; expected firing or resolved",
                    status
                )));
            }
        }
        Ok(spec)
    }

    fn accepts(&self, status: &str, alert_name: Option<&str>) -> bool {
        let status_ok = if self.statuses.is_empty() {
            status.eq_ignore_ascii_case("firing")
        } else {
            self.statuses
                .iter()
                .any(|allowed| allowed.trim().eq_ignore_ascii_case(status))
        };
        let names: Vec<&str> = self
            .alert_names
            .iter()
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .collect();
        let name_ok = names.is_empty()
            || alert_name.is_some_and(|alert| names.iter().any(|name| name.eq_ignore_ascii_case(alert)));
        status_ok && name_ok
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Notification {
    receiver: Option<String>,
    status: Option<String>,
    #[serde(rename = "externalURL")]
    external_url: Option<String>,
    group_key: Option<String>,
    title: Option<String>,
    #[serde(default)]
    alerts: Vec<Alert>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Alert {
    status: Option<String>,
    #[serde(default)]
    labels: Map<String, Value>,
    #[serde(default)]
    annotations: Map<String, Value>,
    starts_at: Option<String>,
    ends_at: Option<String>,
    fingerprint: Option<String>,
    #[serde(rename = "generatorURL")]
    generator_url: Option<String>,
    #[serde(rename = "dashboardURL")]
    dashboard_url: Option<String>,
    #[serde(rename = "panelURL")]
    panel_url: Option<String>,
    #[serde(rename = "silenceURL")]
    silence_url: Option<String>,
    values: Option<Value>,
}

fn non_zero_time(value: Option<&str>) -> Option<&str> {
    value
        .map(str::trim)
        .filter(|time| !time.is_empty() && !time.starts_with(ZERO_TIME_PREFIX))
}

fn blank_to_none(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

impl Notification {
    fn alert_payload(&self, alert: &Alert, status: &str) -> Value {
        json!({
            "status": status,
            "alertName": alert.labels.get("alertname").cloned().unwrap_or(Value::Null),
            "labels": alert.labels,
            "annotations": alert.annotations,
            "startsAt": non_zero_time(alert.starts_at.as_deref()),
            "endsAt": non_zero_time(alert.ends_at.as_deref()),
            "fingerprint": alert.fingerprint,
            "generatorUrl": blank_to_none(alert.generator_url.as_deref()),
            "dashboardUrl": blank_to_none(alert.dashboard_url.as_deref()),
            "panelUrl": blank_to_none(alert.panel_url.as_deref()),
            "silenceUrl": blank_to_none(alert.silence_url.as_deref()),
            "values": alert.values.clone().unwrap_or(Value::Null),
            "receiver": self.receiver,
            "externalUrl": self.external_url,
            "groupKey": self.group_key,
            "title": self.title,
        })
    }
}

/// Emits one event per Grafana alert in a notification.
pub struct OnAlertFiring;

#[async_trait]
impl Trigger for OnAlertFiring {
    fn name(&self) -> &'static str {
        NAME
    }

    fn label(&self) -> &'static str {
        "On Grafana Alert Firing"
    }

    fn setup(&self, configuration: &Value) -> Result<(), AppError> {
        OnAlertFiringSpec::parse(configuration).map(|_| ())
    }

    async fn handle_webhook(&self, request: WebhookRequest) -> Result<Vec<Payload>, AppError> {
        let spec = OnAlertFiringSpec::parse(&request.configuration)?;
        verify_bearer(&request, spec.secret.as_deref())?;

        let notification: Notification = serde_json::from_slice(&request.body).map_err(|err| {
            AppError::validation(format!("invalid Grafana alert notification: {}", err))
        })?;

        let payloads: Vec<Payload> = notification
            .alerts
            .iter()
            .filter_map(|alert| {
                let status = alert
                    .status
                    .as_deref()
                    .or(notification.status.as_deref())
                    .unwrap_or("firing")
                    .to_ascii_lowercase();
                let name = alert.labels.get("alertname").and_then(Value::as_str);
                spec.accepts(&status, name)
                    .then(|| Payload::new(PAYLOAD_TYPE, notification.alert_payload(alert, &status)))
            })
            .collect();

        tracing::debug!(
            received = notification.alerts.len(),
            emitted = payloads.len(),
            "handled Grafana alert notification"
        );
        Ok(payloads)
    }
}
