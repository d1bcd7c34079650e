use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AuditError, AuditResult};

/// Schema version stamped onto every emitted event.
pub const AUDIT_EVENT_VERSION: &str = "1.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorKind {
    User,
    Service,
    System,
}

/// One audit record: who did what to what, for which tenant.
///
/// Callers fill in what they know; `id`, `timestamp` and `version` are
/// completed during emission. `team_id` doubles as the Kafka routing key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub version: String,
    pub id: String,
    #[serde(default, with = "timestamp_micros")]
    pub timestamp: Option<DateTime<Utc>>,
    pub team_id: String,
    pub event: EventInfo,
    pub target: Target,
    pub actor: Option<Actor>,
    pub context: Option<Context>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changes: Option<Changes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventInfo {
    #[serde(rename = "type")]
    pub kind: String,
    pub category: String,
    pub description: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "type")]
    pub kind: ActorKind,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Before/after snapshot carried by mutation events.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Changes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<HashMap<String, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<HashMap<String, serde_json::Value>>,
}

pub type Metadata = HashMap<String, serde_json::Value>;

impl AuditEvent {
    pub(crate) fn to_payload(&self) -> AuditResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|err| AuditError::Serialization(err.to_string()))
    }
}

/// Structural validation. Only the tenant id and the event type are
/// mandatory; every other field is genuinely optional.
pub fn validate(event: &AuditEvent) -> AuditResult<()> {
    if event.team_id.is_empty() {
        return Err(AuditError::EmptyTeamId);
    }
    if event.event.kind.is_empty() {
        return Err(AuditError::EmptyEventType);
    }
    Ok(())
}

/// Fixed-layout UTC timestamp at microsecond precision. Sub-microsecond
/// information is truncated on the wire.
pub(crate) mod timestamp_micros {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(ts) => serializer.serialize_str(&ts.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) => {
                let naive = NaiveDateTime::parse_from_str(&raw, FORMAT)
                    .map_err(serde::de::Error::custom)?;
                Ok(Some(DateTime::from_naive_utc_and_offset(naive, Utc)))
            }
            None => Ok(None),
        }
    }
}
