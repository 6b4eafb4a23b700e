use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use serde_json::Value;

/// Channel every component emits on when nothing went wrong.
pub const DEFAULT_CHANNEL: &str = "default";

/// Channel used for validation-class API failures and unsuccessful outcomes.
pub const FAILED_CHANNEL: &str = "failed";

/// A single typed payload handed to the workflow engine.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Payload {
    #[serde(rename = "type")]
    pub payload_type: String,
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub data: Value,
}

impl Payload {
    pub fn new<T: Into<String>>(payload_type: T, data: Value) -> Self {
        Self {
            payload_type: payload_type.into(),
            timestamp: Utc::now(),
            data,
        }
    }
}

/// Result of one component execution: the channel taken and the payloads emitted on it.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Emission {
    pub channel: String,
    pub payloads: Vec<Payload>,
}

impl Emission {
    pub fn new<C: Into<String>, T: Into<String>>(channel: C, payload_type: T, data: Value) -> Self {
        Self {
            channel: channel.into(),
            payloads: vec![Payload::new(payload_type, data)],
        }
    }

    pub fn default_channel<T: Into<String>>(payload_type: T, data: Value) -> Self {
        Self::new(DEFAULT_CHANNEL, payload_type, data)
    }

    pub fn failed<T: Into<String>>(payload_type: T, data: Value) -> Self {
        Self::new(FAILED_CHANNEL, payload_type, data)
    }

    pub fn is_failed(&self) -> bool {
        self.channel == FAILED_CHANNEL
    }

    /// Data of the first payload, which is the only one for every built-in component.
    pub fn data(&self) -> &Value {
        self.payloads
            .first()
            .map(|payload| &payload.data)
            .unwrap_or(&Value::Null)
    }

    pub fn payload_type(&self) -> Option<&str> {
        self.payloads
            .first()
            .map(|payload| payload.payload_type.as_str())
    }
}

fn serialize_timestamp<S>(timestamp: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&timestamp.to_rfc3339_opts(SecondsFormat::Millis, true))
}
