use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Ledger entry not found: {0}")]
    EntryNotFound(Uuid),
    #[error("Insolvency effect not found: {0}")]
    EffectNotFound(Uuid),
    #[error("Invalid rule `{name}`: {message}")]
    InvalidRule { name: String, message: String },
    #[error("Governance violation: {0}")]
    Governance(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Storage error: {0}")]
    Storage(String),
}
