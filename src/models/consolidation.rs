// src/models/consolidation.rs
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ConsolidationError;
use crate::models::record::{FieldValue, Record, RecordId};

/// Separator used when the discarded ids are flattened into a single cell.
pub const DISCARDED_ID_SEPARATOR: &str = ";";

/// Identifies a duplicate group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupKey {
    /// Trimmed values of the key fields, in key-field order.
    Shared(Vec<String>),
    /// A record with an empty key value. `position` is its index in the input.
    Unkeyed { position: usize },
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Shared(parts) => write!(f, "{}", parts.join(" | ")),
            GroupKey::Unkeyed { position } => write!(f, "<unkeyed #{}>", position),
        }
    }
}

/// Records believed to represent the same real-world entity, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateGroup {
    pub key: GroupKey,
    pub records: Vec<Record>,
}

impl DuplicateGroup {
    pub fn is_singleton(&self) -> bool {
        self.records.len() == 1
    }
}

/// The survivor of one duplicate group and the ids folded into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidationResult {
    pub group_key: GroupKey,
    pub survivor_id: RecordId,
    pub survivor: Record,
    /// In the order the records were discarded.
    pub discarded_ids: Vec<RecordId>,
    /// Survivor fields filled from other group members.
    pub backfilled_fields: Vec<String>,
}

impl ConsolidationResult {
    pub fn is_merged(&self) -> bool {
        !self.discarded_ids.is_empty()
    }

    pub fn discarded_ids_cell(&self) -> String {
        self.discarded_ids
            .iter()
            .map(|id| id.0.as_str())
            .collect::<Vec<_>>()
            .join(DISCARDED_ID_SEPARATOR)
    }

    /// The survivor with the provenance field attached, ready to be written out.
    pub fn to_output_record(&self, provenance_field: &str) -> Record {
        let mut record = self.survivor.clone();
        record.set(provenance_field, FieldValue::Text(self.discarded_ids_cell()));
        record
    }
}

/// A duplicate group that could not be consolidated.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupFailure {
    pub group_key: GroupKey,
    /// Ids of the group members that had one.
    pub record_ids: Vec<RecordId>,
    pub error: ConsolidationError,
}

impl GroupFailure {
    pub fn to_record(&self) -> Record {
        Record::from_pairs([
            ("group_key", self.group_key.to_string()),
            (
                "record_ids",
                self.record_ids
                    .iter()
                    .map(|id| id.0.as_str())
                    .collect::<Vec<_>>()
                    .join(DISCARDED_ID_SEPARATOR),
            ),
            ("error", self.error.to_string()),
        ])
    }
}

/// A record whose timestamp is present but unreadable. It is still
/// consolidated, ranking as if it had no timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct UnreadableTimestamp {
    pub group_key: GroupKey,
    pub record_id: Option<RecordId>,
    pub raw: String,
}

/// Why a survivor comparison ended the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DecisionOutcome {
    /// Candidate replaced the base: strictly newer timestamp.
    CandidateNewer,
    /// Candidate replaced the base: same timestamp, strictly more complete.
    CandidateMoreComplete { base_score: usize, candidate_score: usize },
    /// Base kept: strictly newer timestamp.
    BaseNewer,
    /// Base kept: same timestamp, at least as complete.
    BaseAtLeastAsComplete { base_score: usize, candidate_score: usize },
}

impl DecisionOutcome {
    pub fn replaces(&self) -> bool {
        matches!(
            self,
            DecisionOutcome::CandidateNewer | DecisionOutcome::CandidateMoreComplete { .. }
        )
    }
}

impl fmt::Display for DecisionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionOutcome::CandidateNewer => write!(f, "candidate replaces base (newer timestamp)"),
            DecisionOutcome::CandidateMoreComplete { base_score, candidate_score } => write!(
                f,
                "candidate replaces base (same timestamp, {} > {} filled fields)",
                candidate_score, base_score
            ),
            DecisionOutcome::BaseNewer => write!(f, "base kept (newer timestamp)"),
            DecisionOutcome::BaseAtLeastAsComplete { base_score, candidate_score } => write!(
                f,
                "base kept (same timestamp, {} >= {} filled fields)",
                base_score, candidate_score
            ),
        }
    }
}

/// One entry of the survivor decision trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub group_key: String,
    pub base_id: RecordId,
    pub candidate_id: RecordId,
    pub outcome: DecisionOutcome,
}

/// Everything a consolidation call produces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConsolidationOutcome {
    pub results: Vec<ConsolidationResult>,
    pub failures: Vec<GroupFailure>,
    /// Empty unless the decision trail was requested.
    pub decisions: Vec<Decision>,
    pub unreadable_timestamps: Vec<UnreadableTimestamp>,
}

impl ConsolidationOutcome {
    pub fn discarded_count(&self) -> usize {
        self.results.iter().map(|r| r.discarded_ids.len()).sum()
    }

    pub fn merged_group_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_merged()).count()
    }

    pub fn backfilled_field_count(&self) -> usize {
        self.results.iter().map(|r| r.backfilled_fields.len()).sum()
    }
}
