// src/consolidation/grouping.rs
use log::debug;
use std::collections::HashMap;

use crate::error::ConsolidationError;
use crate::models::consolidation::{DuplicateGroup, GroupKey};
use crate::models::record::{FieldValue, Record};

/// Trimmed key values of `record`, or `None` when any key field is empty or absent.
pub fn duplicate_key(record: &Record, key_fields: &[String]) -> Option<Vec<String>> {
    key_fields
        .iter()
        .map(|field| record.get(field).and_then(FieldValue::as_key_part))
        .collect()
}

/// Checks that a grouping request makes sense for this record set.
///
/// Fails when no key field is given, or when a key field is absent from every
/// record. An empty record set passes: there is nothing to check it against.
pub fn validate_key_fields(records: &[Record], key_fields: &[String]) -> Result<(), ConsolidationError> {
    if key_fields.is_empty() {
        return Err(ConsolidationError::configuration("no duplicate key fields were given"));
    }
    if let Some(blank) = key_fields.iter().find(|f| f.trim().is_empty()) {
        return Err(ConsolidationError::configuration(format!(
            "duplicate key field name '{}' is blank",
            blank
        )));
    }
    if records.is_empty() {
        return Ok(());
    }
    for field in key_fields {
        if !records.iter().any(|r| r.contains_field(field)) {
            return Err(ConsolidationError::configuration(format!(
                "key field '{}' is absent from every record",
                field
            )));
        }
    }
    Ok(())
}

/// Partitions record positions by duplicate key.
///
/// Groups come out in first-seen order of their key and hold positions in
/// input order. A record without a usable key gets a group of its own.
pub fn group_indices(
    records: &[Record],
    key_fields: &[String],
) -> Result<Vec<(GroupKey, Vec<usize>)>, ConsolidationError> {
    validate_key_fields(records, key_fields)?;

    let mut groups: Vec<(GroupKey, Vec<usize>)> = Vec::new();
    let mut slot_by_key: HashMap<Vec<String>, usize> = HashMap::new();
    let mut unkeyed = 0usize;

    for (position, record) in records.iter().enumerate() {
        match duplicate_key(record, key_fields) {
            Some(key) => match slot_by_key.get(&key) {
                Some(&slot) => groups[slot].1.push(position),
                None => {
                    slot_by_key.insert(key.clone(), groups.len());
                    groups.push((GroupKey::Shared(key), vec![position]));
                }
            },
            None => {
                unkeyed += 1;
                groups.push((GroupKey::Unkeyed { position }, vec![position]));
            }
        }
    }

    debug!(
        "Grouped {} records into {} groups ({} without a usable key)",
        records.len(),
        groups.len(),
        unkeyed
    );
    Ok(groups)
}

/// Partitions `records` into duplicate groups keyed on `key_fields`.
pub fn group(records: Vec<Record>, key_fields: &[String]) -> Result<Vec<DuplicateGroup>, ConsolidationError> {
    let layout = group_indices(&records, key_fields)?;
    let mut slots: Vec<Option<Record>> = records.into_iter().map(Some).collect();

    Ok(layout
        .into_iter()
        .map(|(key, positions)| DuplicateGroup {
            key,
            records: positions
                .into_iter()
                .filter_map(|position| slots[position].take())
                .collect(),
        })
        .collect())
}
