//! Best-effort normalization of Dash0 alert notifications.
//!
//! Dash0 webhook bodies differ between notification channels and versions, so every field is
//! looked up along a list of candidate paths and the first usable value wins.

use crate::core::helpers::{first_string, lookup_path};
use chrono::{DateTime, Datelike, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{json, Map, Value};

const ID_PATHS: &[&str] = &[
    "id",
    "eventId",
    "alertId",
    "fingerprint",
    "issue.id",
    "data.id",
    "data.issue.id",
];

const STATUS_PATHS: &[&str] = &[
    "status",
    "state",
    "issue.status",
    "alert.status",
    "event.status",
    "data.status",
    "data.issue.status",
    "data.alert.status",
];

const CHECK_RULE_PATHS: &[&str] = &[
    "checkRuleName",
    "checkRule.name",
    "ruleName",
    "rule.name",
    "alertname",
    "labels.alertname",
    "issue.checkRule.name",
    "data.checkRule.name",
    "data.issue.checkRule.name",
    "data.alert.labels.alertname",
    "alert.name",
    "name",
];

const SEVERITY_PATHS: &[&str] = &[
    "severity",
    "labels.severity",
    "issue.severity",
    "alert.severity",
    "data.severity",
    "data.issue.severity",
    "data.alert.labels.severity",
];

const SUMMARY_PATHS: &[&str] = &[
    "summary",
    "annotations.summary",
    "issue.summary",
    "data.summary",
    "data.issue.summary",
    "data.annotations.summary",
    "title",
    "message",
];

const DESCRIPTION_PATHS: &[&str] = &[
    "description",
    "annotations.description",
    "issue.description",
    "data.description",
    "data.issue.description",
    "data.annotations.description",
];

const URL_PATHS: &[&str] = &[
    "url",
    "link",
    "issueUrl",
    "dashboardUrl",
    "issue.url",
    "data.url",
    "generatorURL",
];

const STARTED_AT_PATHS: &[&str] = &[
    "startsAt",
    "startedAt",
    "start",
    "issue.start",
    "data.startsAt",
    "data.issue.start",
    "alert.startsAt",
    "timestamp",
    "time",
    "createdAt",
    "data.timestamp",
];

const ENDED_AT_PATHS: &[&str] = &[
    "endsAt",
    "endedAt",
    "end",
    "issue.end",
    "data.endsAt",
    "data.issue.end",
    "alert.endsAt",
];

const LABEL_PATHS: &[&str] = &[
    "labels",
    "issue.labels",
    "alert.labels",
    "data.labels",
    "data.issue.labels",
    "data.alert.labels",
];

const FIRING_STATES: &[&str] = &[
    "firing",
    "critical",
    "degraded",
    "failed",
    "failing",
    "open",
    "active",
    "triggered",
    "alerting",
    "problem",
];

const RESOLVED_STATES: &[&str] = &[
    "resolved",
    "closed",
    "ok",
    "inactive",
    "cleared",
    "healthy",
    "recovered",
    "passed",
];

pub const STATUS_FIRING: &str = "firing";
pub const STATUS_RESOLVED: &str = "resolved";
pub const STATUS_UNKNOWN: &str = "unknown";

/// Canonical alert event emitted by the trigger.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertEvent {
    pub id: Option<String>,
    pub status: &'static str,
    pub check_rule: Option<String>,
    pub severity: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub labels: Map<String, Value>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub raw: Value,
}

impl AlertEvent {
    pub fn to_payload(&self) -> Value {
        json!({
            "id": self.id,
            "status": self.status,
            "checkRule": self.check_rule,
            "severity": self.severity,
            "summary": self.summary,
            "description": self.description,
            "url": self.url,
            "labels": self.labels,
            "startedAt": self.started_at.map(format_timestamp),
            "endedAt": self.ended_at.map(format_timestamp),
            "raw": self.raw,
        })
    }
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Split a webhook body into individual events: a single event, an array of events, or an
/// object carrying an `events` or `alerts` array.
pub fn split_events(body: &Value) -> Vec<&Value> {
    match body {
        Value::Array(items) => items.iter().filter(|item| item.is_object()).collect(),
        Value::Object(map) => ["events", "alerts"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_array))
            .map(|items| items.iter().filter(|item| item.is_object()).collect())
            .unwrap_or_else(|| vec![body]),
        _ => Vec::new(),
    }
}

pub fn normalize(event: &Value) -> AlertEvent {
    let raw_status = first_string(event, STATUS_PATHS).map(|status| status.to_ascii_lowercase());
    let status = raw_status
        .as_deref()
        .map(map_status)
        .unwrap_or(STATUS_UNKNOWN);
    let severity = first_string(event, SEVERITY_PATHS).or_else(|| {
        raw_status
            .clone()
            .filter(|raw| raw == "critical" || raw == "degraded")
    });

    AlertEvent {
        id: first_string(event, ID_PATHS),
        status,
        check_rule: first_string(event, CHECK_RULE_PATHS),
        severity,
        summary: first_string(event, SUMMARY_PATHS),
        description: first_string(event, DESCRIPTION_PATHS),
        url: first_string(event, URL_PATHS),
        labels: collect_labels(event),
        started_at: first_timestamp(event, STARTED_AT_PATHS),
        ended_at: first_timestamp(event, ENDED_AT_PATHS),
        raw: event.clone(),
    }
}

pub fn map_status(raw: &str) -> &'static str {
    let lowered = raw.trim().to_ascii_lowercase();
    if FIRING_STATES.contains(&lowered.as_str()) {
        STATUS_FIRING
    } else if RESOLVED_STATES.contains(&lowered.as_str()) {
        STATUS_RESOLVED
    } else {
        STATUS_UNKNOWN
    }
}

/// Earlier label sources win on key conflicts.
fn collect_labels(event: &Value) -> Map<String, Value> {
    let mut labels = Map::new();
    for path in LABEL_PATHS {
        let Some(source) = lookup_path(event, path) else {
            continue;
        };
        for (key, value) in flatten_labels(source) {
            labels.entry(key).or_insert(value);
        }
    }
    labels
}

/// Accepts a plain object or an OTLP-style `[{key, value: {stringValue}}]` list.
fn flatten_labels(source: &Value) -> Vec<(String, Value)> {
    match source {
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| (key.clone(), label_value(value)))
            .collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| {
                let key = item.get("key").and_then(Value::as_str)?;
                let value = match item.get("value") {
                    Some(Value::Object(typed)) => typed
                        .get("stringValue")
                        .or_else(|| typed.values().next())
                        .map(label_value)
                        .unwrap_or(Value::Null),
                    Some(other) => label_value(other),
                    None => Value::Null,
                };
                Some((key.to_string(), value))
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn label_value(value: &Value) -> Value {
    match value {
        Value::String(_) | Value::Null => value.clone(),
        other => Value::String(other.to_string()),
    }
}

fn first_timestamp(event: &Value, paths: &[&str]) -> Option<DateTime<Utc>> {
    paths
        .iter()
        .find_map(|path| lookup_path(event, path).and_then(parse_timestamp))
}

/// Parse numbers (unit inferred by magnitude), numeric strings, RFC3339 and
/// `YYYY-MM-DD HH:MM:SS` values. Zero and the Go zero time count as absent.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .and_then(from_epoch_integer)
            .or_else(|| number.as_f64().and_then(from_epoch_float)),
        Value::String(text) => parse_timestamp_text(text.trim()),
        _ => None,
    }
}

fn parse_timestamp_text(text: &str) -> Option<DateTime<Utc>> {
    if text.is_empty() {
        return None;
    }
    if let Ok(integer) = text.parse::<i64>() {
        return from_epoch_integer(integer);
    }
    if let Ok(float) = text.parse::<f64>() {
        return from_epoch_float(float);
    }
    let parsed = DateTime::parse_from_rfc3339(text)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc())
        })?;
    if parsed.year() <= 1 {
        return None;
    }
    Some(parsed)
}

/// Nanoseconds per unit for an epoch value of the given magnitude.
fn unit_nanos(magnitude: f64) -> i128 {
    if magnitude >= 1e17 {
        1
    } else if magnitude >= 1e14 {
        1_000
    } else if magnitude >= 1e11 {
        1_000_000
    } else {
        1_000_000_000
    }
}

fn from_epoch_integer(value: i64) -> Option<DateTime<Utc>> {
    if value == 0 {
        return None;
    }
    let nanos = i128::from(value) * unit_nanos(value.unsigned_abs() as f64);
    from_unix_nanos(nanos)
}

fn from_epoch_float(value: f64) -> Option<DateTime<Utc>> {
    if value == 0.0 || !value.is_finite() {
        return None;
    }
    let nanos = (value * unit_nanos(value.abs()) as f64).round() as i128;
    from_unix_nanos(nanos)
}

fn from_unix_nanos(nanos: i128) -> Option<DateTime<Utc>> {
    let seconds = i64::try_from(nanos.div_euclid(1_000_000_000)).ok()?;
    let subsec = u32::try_from(nanos.rem_euclid(1_000_000_000)).ok()?;
    DateTime::<Utc>::from_timestamp(seconds, subsec)
}
