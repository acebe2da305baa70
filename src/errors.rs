use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DesirePathError {
    #[error("zone {index} is malformed: {reason}")]
    InvalidZone { index: usize, reason: String },
    #[error("poi {id} is malformed: {reason}")]
    InvalidPoi { id: i64, reason: String },
    #[error("insufficient input: {0}")]
    InsufficientInput(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("generation cancelled")]
    Cancelled,
    #[error("generation exceeded its time limit of {limit_ms} ms")]
    TimedOut { limit_ms: u64 },
}

impl DesirePathError {
    pub(crate) fn zone(index: usize, reason: impl Into<String>) -> Self {
        DesirePathError::InvalidZone {
            index,
            reason: reason.into(),
        }
    }

    pub(crate) fn poi(id: i64, reason: impl Into<String>) -> Self {
        DesirePathError::InvalidPoi {
            id,
            reason: reason.into(),
        }
    }

    pub(crate) fn insufficient(reason: impl Into<String>) -> Self {
        DesirePathError::InsufficientInput(reason.into())
    }

    /// True for the errors a caller should present as "not enough to work with"
    /// rather than a fault.
    pub fn is_insufficient_input(&self) -> bool {
        matches!(self, DesirePathError::InsufficientInput(_))
    }
}
