use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::event::{AuditEvent, AUDIT_EVENT_VERSION};

pub type IdSource = Box<dyn Fn() -> String + Send + Sync>;
pub type Clock = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Fills derived fields before dispatch. The id and clock sources are
/// injectable so enrichment stays deterministic under test.
pub struct Enricher {
    id_source: IdSource,
    clock: Clock,
}

impl Default for Enricher {
    fn default() -> Self {
        Self {
            id_source: Box::new(|| Uuid::new_v4().to_string()),
            clock: Box::new(Utc::now),
        }
    }
}

impl Enricher {
    pub fn new(id_source: IdSource, clock: Clock) -> Self {
        Self { id_source, clock }
    }

    /// The schema version is always overwritten; `id` and `timestamp` are
    /// only defaulted when the caller left them unset.
    pub fn enrich(&self, event: &mut AuditEvent) {
        event.version = AUDIT_EVENT_VERSION.to_string();

        if event.id.is_empty() {
            event.id = (self.id_source)();
        }

        if event.timestamp.is_none() {
            event.timestamp = Some((self.clock)());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn defaults_missing_id_and_timestamp() {
        let enricher = Enricher::default();
        let mut event = AuditEvent {
            team_id: "team-123".into(),
            ..Default::default()
        };

        enricher.enrich(&mut event);

        assert_eq!(event.version, AUDIT_EVENT_VERSION);
        assert!(!event.id.is_empty());
        let ts = event.timestamp.expect("timestamp set");
        assert!((Utc::now() - ts).num_seconds().abs() <= 1);
    }

    #[test]
    fn preserves_caller_supplied_id_and_timestamp() {
        let enricher = Enricher::default();
        let supplied = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut event = AuditEvent {
            version: "9.9".into(),
            id: "existing-id".into(),
            timestamp: Some(supplied),
            team_id: "team-123".into(),
            ..Default::default()
        };

        enricher.enrich(&mut event);

        assert_eq!(event.version, AUDIT_EVENT_VERSION);
        assert_eq!(event.id, "existing-id");
        assert_eq!(event.timestamp, Some(supplied));
    }

    #[test]
    fn injected_sources_make_enrichment_deterministic() {
        let fixed = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
        let enricher = Enricher::new(
            Box::new(|| "fixed-id".to_string()),
            Box::new(move || fixed),
        );
        let mut event = AuditEvent::default();

        enricher.enrich(&mut event);

        assert_eq!(event.id, "fixed-id");
        assert_eq!(event.timestamp, Some(fixed));
    }
}
