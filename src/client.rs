use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::AuditConfig;
use crate::enrich::Enricher;
use crate::error::AuditResult;
use crate::event::{validate, AuditEvent};
#[cfg(feature = "kafka-producer")]
use crate::kafka::KafkaProducer;
use crate::producer::EventProducer;

/// Audit emission client.
///
/// `emit` is fire-and-forget: after successful construction no per-event
/// failure is ever surfaced to the caller. Invalid or unserializable events
/// are dropped (logged and counted), transport errors stay inside the
/// producer's own retry machinery. Once closed, `emit` is a silent no-op.
pub struct AuditClient {
    producer: Arc<dyn EventProducer>,
    topics: Vec<String>,
    closed: RwLock<bool>,
    enricher: Enricher,
    dropped: AtomicU64,
}

impl AuditClient {
    /// Builds the Kafka-backed client: resolves configuration defaults,
    /// constructs the producer and, when `topic_auto_create` is set,
    /// provisions the destination topics. Any failure here is fatal and the
    /// client is not returned.
    #[cfg(feature = "kafka-producer")]
    pub async fn new(mut config: AuditConfig) -> AuditResult<Self> {
        config.apply_defaults();
        config.validate()?;
        let producer = KafkaProducer::new(&config)?;
        Self::with_parts(config, Arc::new(producer), Enricher::default()).await
    }

    /// Same construction semantics as [`AuditClient::new`] with a
    /// caller-supplied transport.
    pub async fn with_producer(
        config: AuditConfig,
        producer: Arc<dyn EventProducer>,
    ) -> AuditResult<Self> {
        Self::with_parts(config, producer, Enricher::default()).await
    }

    /// Full dependency-injection constructor; the enricher seam exists for
    /// deterministic id/clock sources.
    pub async fn with_parts(
        mut config: AuditConfig,
        producer: Arc<dyn EventProducer>,
        enricher: Enricher,
    ) -> AuditResult<Self> {
        config.apply_defaults();
        config.validate()?;

        let topics = config.topics();
        if config.topic_auto_create {
            if let Err(err) = producer.ensure_topics(&topics).await {
                let _ = producer.close().await;
                return Err(err);
            }
        }

        Ok(Self {
            producer,
            topics,
            closed: RwLock::new(false),
            enricher,
            dropped: AtomicU64::new(0),
        })
    }

    /// Validates, enriches, serializes and hands the event to the producer,
    /// once per configured topic, keyed by the raw tenant id bytes. Never
    /// blocks on broker I/O and never returns an error.
    pub async fn emit(&self, mut event: AuditEvent) {
        let closed = self.closed.read().await;
        if *closed {
            return;
        }

        if let Err(err) = validate(&event) {
            warn!(error = %err, "dropping invalid audit event");
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return;
        }

        self.enricher.enrich(&mut event);

        let payload = match event.to_payload() {
            Ok(payload) => payload,
            Err(err) => {
                warn!(error = %err, event_id = %event.id, "dropping unserializable audit event");
                self.dropped.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };

        debug!(
            event_id = %event.id,
            team_id = %event.team_id,
            event_type = %event.event.kind,
            category = %event.event.category,
            "emitting audit event"
        );

        // The read guard is still held here, so close() cannot release the
        // producer between the state check and the enqueue.
        self.producer
            .produce_async(&self.topics, event.team_id.as_bytes(), &payload);
    }

    /// Marks the client closed and flushes/releases the producer. Idempotent;
    /// only the first call touches the producer. Safe to call concurrently
    /// with `emit`.
    pub async fn close(&self) -> AuditResult<()> {
        let mut closed = self.closed.write().await;
        if *closed {
            return Ok(());
        }
        *closed = true;
        self.producer.close().await
    }

    /// Number of events dropped by validation or serialization since
    /// construction. Fire-and-forget loss is silent per event; this counter
    /// keeps it observable in aggregate.
    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// The destination topics, as resolved at construction.
    pub fn topics(&self) -> &[String] {
        &self.topics
    }
}
