use std::env;
use std::time::Duration;

use crate::error::{AuditError, AuditResult};

pub const DEFAULT_AUDIT_EVENTS_TOPIC: &str = "audit_events";
pub const DEFAULT_AUDIT_LOGS_INGEST_TOPIC: &str = "audit_logs_ingest";

pub const ENV_AUDIT_EVENTS_TOPIC: &str = "AUDIT_EVENTS_TOPIC";
pub const ENV_AUDIT_LOGS_INGEST_TOPIC: &str = "AUDIT_LOGS_INGEST_TOPIC";

/// Client configuration. Zero/empty fields are filled by
/// [`AuditConfig::apply_defaults`] before the client is built; only the
/// broker list has no default and must be supplied.
#[derive(Debug, Clone, Default)]
pub struct AuditConfig {
    pub brokers: Vec<String>,
    pub audit_events_topic: String,
    pub audit_logs_ingest_topic: String,
    pub client_id: String,
    pub batch_size: usize,
    pub batch_timeout: Duration,
    pub retry_max: i32,
    pub retry_backoff: Duration,
    pub required_acks: i32,
    pub topic_auto_create: bool,
    pub topic_num_partitions: i32,
    pub topic_replication: i32,
    pub tls: Option<TlsConfig>,
    pub sasl: Option<SaslConfig>,
}

#[derive(Debug, Clone, Default)]
pub struct TlsConfig {
    pub enable: bool,
    pub cert_file: String,
    pub key_file: String,
    pub ca_file: String,
    pub insecure_skip_verify: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SaslConfig {
    pub enable: bool,
    pub mechanism: String,
    pub username: String,
    pub password: String,
}

impl AuditConfig {
    pub fn apply_defaults(&mut self) {
        self.audit_events_topic = resolve_value(
            &self.audit_events_topic,
            ENV_AUDIT_EVENTS_TOPIC,
            DEFAULT_AUDIT_EVENTS_TOPIC,
        );
        self.audit_logs_ingest_topic = resolve_value(
            &self.audit_logs_ingest_topic,
            ENV_AUDIT_LOGS_INGEST_TOPIC,
            DEFAULT_AUDIT_LOGS_INGEST_TOPIC,
        );

        if self.client_id.is_empty() {
            self.client_id = "audit-sdk".to_string();
        }
        if self.batch_size == 0 {
            self.batch_size = 100;
        }
        if self.batch_timeout.is_zero() {
            self.batch_timeout = Duration::from_secs(1);
        }
        if self.retry_max == 0 {
            self.retry_max = 3;
        }
        if self.retry_backoff.is_zero() {
            self.retry_backoff = Duration::from_millis(100);
        }
        if self.required_acks == 0 {
            self.required_acks = 1;
        }
        if self.topic_num_partitions == 0 {
            self.topic_num_partitions = 3;
        }
        if self.topic_replication == 0 {
            self.topic_replication = 1;
        }
    }

    pub fn validate(&self) -> AuditResult<()> {
        if self.brokers.is_empty() {
            return Err(AuditError::NoBrokers);
        }
        Ok(())
    }

    /// The destination topics, in emission order.
    pub fn topics(&self) -> Vec<String> {
        vec![
            self.audit_events_topic.clone(),
            self.audit_logs_ingest_topic.clone(),
        ]
    }
}

/// Stateless resolution chain: explicit config value > environment > default.
fn resolve_value(config_value: &str, env_key: &str, default_value: &str) -> String {
    if !config_value.is_empty() {
        return config_value.to_string();
    }
    if let Ok(env_value) = env::var(env_key) {
        if !env_value.is_empty() {
            return env_value;
        }
    }
    default_value.to_string()
}
