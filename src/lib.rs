pub mod client;
pub mod config;
pub mod enrich;
pub mod error;
pub mod event;
pub mod producer;
// Real Kafka transport only when the producer feature (or the legacy kafka
// umbrella) is enabled; everything else compiles without librdkafka.
#[cfg(feature = "kafka-producer")]
pub mod kafka;

pub use client::AuditClient;
pub use config::{AuditConfig, SaslConfig, TlsConfig};
pub use enrich::Enricher;
pub use error::{AuditError, AuditResult};
pub use event::{
    validate, Actor, ActorKind, AuditEvent, Changes, Context, EventInfo, Metadata, Target,
    AUDIT_EVENT_VERSION,
};
#[cfg(feature = "kafka-producer")]
pub use kafka::KafkaProducer;
pub use producer::{EventProducer, NoopProducer};
