use std::time::Duration;

use async_trait::async_trait;
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::config::ClientConfig;
use rdkafka::error::RDKafkaErrorCode;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use tracing::{debug, info, warn};

use crate::config::AuditConfig;
use crate::error::{AuditError, AuditResult};
use crate::producer::EventProducer;

const METADATA_TIMEOUT: Duration = Duration::from_secs(5);
const CREATE_TOPICS_TIMEOUT: Duration = Duration::from_secs(10);
const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

type TopicResult = Result<String, (String, RDKafkaErrorCode)>;

/// rdkafka-backed [`EventProducer`]: a `FutureProducer` for dispatch and an
/// `AdminClient` sharing the same configuration for topic provisioning.
pub struct KafkaProducer {
    producer: FutureProducer,
    admin: AdminClient<DefaultClientContext>,
    num_partitions: i32,
    replication: i32,
}

impl KafkaProducer {
    pub fn new(config: &AuditConfig) -> AuditResult<Self> {
        let client_config = build_client_config(config);

        let producer: FutureProducer = client_config
            .create()
            .map_err(|err| AuditError::Kafka(err.to_string()))?;
        let admin: AdminClient<DefaultClientContext> = client_config
            .create()
            .map_err(|err| AuditError::Kafka(err.to_string()))?;

        Ok(Self {
            producer,
            admin,
            num_partitions: config.topic_num_partitions,
            replication: config.topic_replication,
        })
    }

    fn topic_exists(&self, topic: &str) -> bool {
        match self
            .producer
            .client()
            .fetch_metadata(Some(topic), METADATA_TIMEOUT)
        {
            Ok(metadata) => metadata
                .topics()
                .iter()
                .any(|t| t.name() == topic && t.error().is_none()),
            Err(err) => {
                debug!(topic = %topic, error = %err, "metadata lookup failed, treating topic as missing");
                false
            }
        }
    }
}

#[async_trait]
impl EventProducer for KafkaProducer {
    fn produce_async(&self, topics: &[String], key: &[u8], payload: &[u8]) {
        for topic in topics {
            let record = FutureRecord::to(topic).key(key).payload(payload);
            // Fire-and-forget: the delivery future is dropped, librdkafka's
            // internal queue owns the message from here.
            if let Err((err, _)) = self.producer.send_result(record) {
                warn!(topic = %topic, error = %err, "failed to enqueue audit event");
            }
        }
    }

    async fn ensure_topics(&self, topics: &[String]) -> AuditResult<()> {
        let missing = missing_topics(topics, |topic| self.topic_exists(topic));
        if missing.is_empty() {
            return Ok(());
        }

        info!(
            topics = ?missing,
            partitions = self.num_partitions,
            replication = self.replication,
            "creating missing audit topics"
        );

        let specs: Vec<NewTopic<'_>> = missing
            .iter()
            .map(|name| {
                NewTopic::new(
                    name,
                    self.num_partitions,
                    TopicReplication::Fixed(self.replication),
                )
            })
            .collect();
        let options = AdminOptions::new().operation_timeout(Some(CREATE_TOPICS_TIMEOUT));

        let results = self
            .admin
            .create_topics(specs.iter(), &options)
            .await
            .map_err(|err| AuditError::Provisioning(err.to_string()))?;

        if let Some((topic, code)) = first_creation_error(&results) {
            return Err(AuditError::Provisioning(format!("{topic}: {code}")));
        }
        Ok(())
    }

    async fn close(&self) -> AuditResult<()> {
        self.producer
            .flush(FLUSH_TIMEOUT)
            .map_err(|err| AuditError::Kafka(err.to_string()))
    }
}

/// Maps the SDK configuration onto librdkafka properties. SASL, when
/// enabled, wins the security.protocol selection over plain TLS.
pub fn build_client_config(config: &AuditConfig) -> ClientConfig {
    let mut client_config = ClientConfig::new();
    client_config
        .set("bootstrap.servers", config.brokers.join(","))
        .set("client.id", config.client_id.as_str())
        .set("acks", config.required_acks.to_string())
        .set("retries", config.retry_max.to_string())
        .set(
            "retry.backoff.ms",
            config.retry_backoff.as_millis().to_string(),
        )
        .set("reconnect.backoff.ms", "100")
        .set("reconnect.backoff.max.ms", "10000")
        .set("socket.keepalive.enable", "true")
        .set("metadata.max.age.ms", "300000");

    let sasl_enabled = config.sasl.as_ref().is_some_and(|sasl| sasl.enable);

    if let Some(sasl) = config.sasl.as_ref().filter(|sasl| sasl.enable) {
        client_config
            .set("security.protocol", "SASL_SSL")
            .set("sasl.mechanisms", sasl.mechanism.as_str())
            .set("sasl.username", sasl.username.as_str())
            .set("sasl.password", sasl.password.as_str());
    }

    if let Some(tls) = config.tls.as_ref().filter(|tls| tls.enable) {
        if !sasl_enabled {
            client_config.set("security.protocol", "SSL");
        }
        if !tls.ca_file.is_empty() {
            client_config.set("ssl.ca.location", tls.ca_file.as_str());
        }
        if !tls.cert_file.is_empty() {
            client_config.set("ssl.certificate.location", tls.cert_file.as_str());
        }
        if !tls.key_file.is_empty() {
            client_config.set("ssl.key.location", tls.key_file.as_str());
        }
        client_config.set(
            "enable.ssl.certificate.verification",
            if tls.insecure_skip_verify { "false" } else { "true" },
        );
    }

    client_config
}

fn missing_topics<'a>(
    requested: &'a [String],
    exists: impl Fn(&str) -> bool,
) -> Vec<&'a str> {
    requested
        .iter()
        .map(String::as_str)
        .filter(|topic| !exists(topic))
        .collect()
}

/// A per-topic "already exists" outcome is success: another instance won the
/// provisioning race. Anything else aborts.
fn first_creation_error(results: &[TopicResult]) -> Option<(String, RDKafkaErrorCode)> {
    results
        .iter()
        .filter_map(|result| result.as_ref().err())
        .find(|(_, code)| *code != RDKafkaErrorCode::TopicAlreadyExists)
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SaslConfig, TlsConfig};

    fn base_config() -> AuditConfig {
        let mut cfg = AuditConfig {
            brokers: vec!["broker1:9092".into(), "broker2:9092".into()],
            client_id: "test-client".into(),
            ..Default::default()
        };
        cfg.apply_defaults();
        cfg
    }

    #[test]
    fn client_config_basic() {
        let cfg = build_client_config(&base_config());

        assert_eq!(cfg.get("bootstrap.servers"), Some("broker1:9092,broker2:9092"));
        assert_eq!(cfg.get("client.id"), Some("test-client"));
        assert_eq!(cfg.get("acks"), Some("1"));
        assert_eq!(cfg.get("retries"), Some("3"));
        assert_eq!(cfg.get("reconnect.backoff.ms"), Some("100"));
        assert_eq!(cfg.get("reconnect.backoff.max.ms"), Some("10000"));
        assert_eq!(cfg.get("socket.keepalive.enable"), Some("true"));
        assert_eq!(cfg.get("security.protocol"), None);
    }

    #[test]
    fn client_config_sasl() {
        let mut config = base_config();
        config.sasl = Some(SaslConfig {
            enable: true,
            mechanism: "PLAIN".into(),
            username: "user".into(),
            password: "pass".into(),
        });
        let cfg = build_client_config(&config);

        assert_eq!(cfg.get("security.protocol"), Some("SASL_SSL"));
        assert_eq!(cfg.get("sasl.mechanisms"), Some("PLAIN"));
        assert_eq!(cfg.get("sasl.username"), Some("user"));
        assert_eq!(cfg.get("sasl.password"), Some("pass"));
    }

    #[test]
    fn client_config_tls() {
        let mut config = base_config();
        config.tls = Some(TlsConfig {
            enable: true,
            ca_file: "/path/to/ca.pem".into(),
            cert_file: "/path/to/cert.pem".into(),
            key_file: "/path/to/key.pem".into(),
            insecure_skip_verify: false,
        });
        let cfg = build_client_config(&config);

        assert_eq!(cfg.get("security.protocol"), Some("SSL"));
        assert_eq!(cfg.get("ssl.ca.location"), Some("/path/to/ca.pem"));
        assert_eq!(cfg.get("ssl.certificate.location"), Some("/path/to/cert.pem"));
        assert_eq!(cfg.get("ssl.key.location"), Some("/path/to/key.pem"));
        assert_eq!(cfg.get("enable.ssl.certificate.verification"), Some("true"));
    }

    #[test]
    fn client_config_tls_insecure_disables_verification() {
        let mut config = base_config();
        config.tls = Some(TlsConfig {
            enable: true,
            insecure_skip_verify: true,
            ..Default::default()
        });
        let cfg = build_client_config(&config);

        assert_eq!(cfg.get("enable.ssl.certificate.verification"), Some("false"));
    }

    #[test]
    fn client_config_sasl_wins_protocol_over_tls() {
        let mut config = base_config();
        config.sasl = Some(SaslConfig {
            enable: true,
            mechanism: "PLAIN".into(),
            username: "user".into(),
            password: "pass".into(),
        });
        config.tls = Some(TlsConfig {
            enable: true,
            ca_file: "/path/to/ca.pem".into(),
            ..Default::default()
        });
        let cfg = build_client_config(&config);

        assert_eq!(cfg.get("security.protocol"), Some("SASL_SSL"));
        assert_eq!(cfg.get("ssl.ca.location"), Some("/path/to/ca.pem"));
    }

    #[test]
    fn client_config_disabled_blocks_are_ignored() {
        let mut config = base_config();
        config.sasl = Some(SaslConfig::default());
        config.tls = Some(TlsConfig {
            ca_file: "/path/to/ca.pem".into(),
            ..Default::default()
        });
        let cfg = build_client_config(&config);

        assert_eq!(cfg.get("security.protocol"), None);
        assert_eq!(cfg.get("ssl.ca.location"), None);
    }

    #[test]
    fn missing_topics_picks_only_absent_ones() {
        let requested = vec!["events".to_string(), "logs".to_string()];
        let missing = missing_topics(&requested, |topic| topic == "events");
        assert_eq!(missing, vec!["logs"]);

        let missing = missing_topics(&requested, |_| true);
        assert!(missing.is_empty());
    }

    #[test]
    fn creation_tolerates_already_exists() {
        let results: Vec<TopicResult> = vec![
            Ok("events".into()),
            Err(("logs".into(), RDKafkaErrorCode::TopicAlreadyExists)),
        ];
        assert!(first_creation_error(&results).is_none());

        let results: Vec<TopicResult> = vec![
            Ok("events".into()),
            Err(("logs".into(), RDKafkaErrorCode::InvalidReplicationFactor)),
        ];
        let (topic, code) = first_creation_error(&results).expect("error surfaced");
        assert_eq!(topic, "logs");
        assert_eq!(code, RDKafkaErrorCode::InvalidReplicationFactor);
    }
}
