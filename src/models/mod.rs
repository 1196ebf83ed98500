pub mod consolidation;
pub mod record;
pub mod stats_models;

pub use consolidation::{
    ConsolidationOutcome, ConsolidationResult, Decision, DecisionOutcome, DuplicateGroup,
    GroupFailure, GroupKey, UnreadableTimestamp,
};
pub use record::{FieldValue, Record, RecordId, RecordSchema};
