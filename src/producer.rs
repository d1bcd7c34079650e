use async_trait::async_trait;

use crate::error::AuditResult;

/// Capability the emission client consumes: non-blocking keyed publish to a
/// set of topics, idempotent topic provisioning, and flush-and-release.
#[async_trait]
pub trait EventProducer: Send + Sync {
    /// Hands one message per topic to the transport's internal queue and
    /// returns without waiting for broker acknowledgment.
    fn produce_async(&self, topics: &[String], key: &[u8], payload: &[u8]);

    /// Creates any of the given topics that do not exist yet. Must tolerate
    /// concurrent provisioning of the same topics by another instance.
    async fn ensure_topics(&self, topics: &[String]) -> AuditResult<()>;

    /// Flushes in-flight messages (bounded) and releases the transport.
    async fn close(&self) -> AuditResult<()>;
}

/// Producer that discards everything. Stands in where auditing is disabled.
pub struct NoopProducer;

#[async_trait]
impl EventProducer for NoopProducer {
    fn produce_async(&self, _topics: &[String], _key: &[u8], _payload: &[u8]) {}

    async fn ensure_topics(&self, _topics: &[String]) -> AuditResult<()> {
        Ok(())
    }

    async fn close(&self) -> AuditResult<()> {
        Ok(())
    }
}
