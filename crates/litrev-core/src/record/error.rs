use thiserror::Error;

use crate::record::RecordState;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Invalid status transition for record '{id}': {from} -> {to}")]
    InvalidTransition {
        id: String,
        from: RecordState,
        to: RecordState,
    },

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Record already exists: {0}")]
    DuplicateId(String),

    #[error("Record store is malformed: {0}")]
    MalformedStore(String),
}
