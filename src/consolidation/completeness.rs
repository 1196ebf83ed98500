// src/consolidation/completeness.rs
use crate::models::record::Record;

/// Counts the fields of `record` holding a non-empty value.
pub fn completeness(record: &Record) -> usize {
    record.iter().filter(|(_, value)| !value.is_empty()).count()
}
