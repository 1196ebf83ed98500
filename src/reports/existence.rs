// src/reports/existence.rs
use std::collections::HashSet;
use std::fmt;

use crate::models::record::{FieldValue, Record, RecordId, RecordSchema};

pub const EXISTENCE_COLUMN: &str = "Record Exists";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExistenceStatus {
    Exists,
    DoesNotExist,
}

impl fmt::Display for ExistenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExistenceStatus::Exists => write!(f, "Exists"),
            ExistenceStatus::DoesNotExist => write!(f, "Does Not Exist"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExistenceReport {
    /// Input rows with [`EXISTENCE_COLUMN`] appended.
    pub annotated: Vec<Record>,
    /// Source records whose id does not appear in the table.
    pub new_records: Vec<Record>,
}

impl ExistenceReport {
    pub fn missing_count(&self) -> usize {
        self.annotated
            .iter()
            .filter(|r| {
                r.get(EXISTENCE_COLUMN)
                    .map_or(false, |v| v.to_string() == ExistenceStatus::DoesNotExist.to_string())
            })
            .count()
    }
}

/// Checks each row's `id_column` against the ids of `source_records`.
pub fn verify_existence(
    table_rows: Vec<Record>,
    id_column: &str,
    source_records: &[Record],
    schema: &RecordSchema,
) -> ExistenceReport {
    let source_ids: HashSet<RecordId> = source_records.iter().filter_map(|r| r.id(schema)).collect();

    let mut table_ids = HashSet::new();
    let annotated = table_rows
        .into_iter()
        .map(|mut row| {
            let id = row.get(id_column).and_then(FieldValue::as_key_part).map(RecordId);
            let status = match &id {
                Some(id) if source_ids.contains(id) => ExistenceStatus::Exists,
                _ => ExistenceStatus::DoesNotExist,
            };
            if let Some(id) = id {
                table_ids.insert(id);
            }
            row.set(EXISTENCE_COLUMN, status.to_string());
            row
        })
        .collect();

    let new_records = source_records
        .iter()
        .filter(|r| r.id(schema).map_or(false, |id| !table_ids.contains(&id)))
        .cloned()
        .collect();

    ExistenceReport {
        annotated,
        new_records,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_existence() {
        let table = vec![
            Record::from_pairs([("Account_18_Digit_ID__c", "a")]),
            Record::from_pairs([("Account_18_Digit_ID__c", "x")]),
            Record::from_pairs([("Account_18_Digit_ID__c", "")]),
        ];
        let source = vec![
            Record::from_pairs([("Id", "a"), ("Name", "Acme")]),
            Record::from_pairs([("Id", "b"), ("Name", "Bolt")]),
        ];
        let report = verify_existence(table, "Account_18_Digit_ID__c", &source, &RecordSchema::default());

        let statuses: Vec<String> = report
            .annotated
            .iter()
            .map(|r| r.get(EXISTENCE_COLUMN).unwrap().to_string())
            .collect();
        assert_eq!(statuses, vec!["Exists", "Does Not Exist", "Does Not Exist"]);
        assert_eq!(report.missing_count(), 2);
        assert_eq!(report.new_records.len(), 1);
        assert_eq!(report.new_records[0].get("Name").unwrap().to_string(), "Bolt");
    }
}
