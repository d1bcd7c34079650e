use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("no kafka brokers configured")]
    NoBrokers,
    #[error("teamId is required")]
    EmptyTeamId,
    #[error("event type is required")]
    EmptyEventType,
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("kafka error: {0}")]
    Kafka(String),
    #[error("topic provisioning failed: {0}")]
    Provisioning(String),
}

pub type AuditResult<T> = Result<T, AuditError>;
