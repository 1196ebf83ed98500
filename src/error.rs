// src/error.rs
use thiserror::Error;

use crate::models::record::RecordId;

/// Failures raised by the consolidation core.
///
/// `Configuration` is fatal to a whole consolidation call. `MalformedRecord`
/// is scoped to the duplicate group that contains the offending record and is
/// reported alongside the groups that did complete.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConsolidationError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Malformed record{}: {reason}", .record_id.as_ref().map(|id| format!(" {}", id)).unwrap_or_default())]
    MalformedRecord {
        record_id: Option<RecordId>,
        reason: String,
    },
}

impl ConsolidationError {
    pub fn configuration(message: impl Into<String>) -> Self {
        ConsolidationError::Configuration(message.into())
    }

    pub fn malformed(record_id: Option<RecordId>, reason: impl Into<String>) -> Self {
        ConsolidationError::MalformedRecord {
            record_id,
            reason: reason.into(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, ConsolidationError::Configuration(_))
    }
}
