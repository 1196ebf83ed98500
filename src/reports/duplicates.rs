// src/reports/duplicates.rs
use log::info;

use crate::consolidation::grouping::group_indices;
use crate::error::ConsolidationError;
use crate::models::consolidation::GroupKey;
use crate::models::record::{Record, RecordId, RecordSchema};

pub const REPORT_ID_COLUMN: &str = "Record ID";

/// A key value shared by more than one record.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateKey {
    /// Trimmed key values, in key-field order.
    pub key: Vec<String>,
    /// Ids of the records sharing it, in input order. Records without an id are skipped.
    pub ids: Vec<RecordId>,
    /// Number of records sharing the key, id or not.
    pub count: usize,
}

/// Lists every key shared by more than one record, in first-seen order.
pub fn find_duplicate_keys(
    records: &[Record],
    key_fields: &[String],
    schema: &RecordSchema,
) -> Result<Vec<DuplicateKey>, ConsolidationError> {
    let duplicates: Vec<DuplicateKey> = group_indices(records, key_fields)?
        .into_iter()
        .filter(|(_, positions)| positions.len() > 1)
        .filter_map(|(key, positions)| match key {
            GroupKey::Shared(key) => Some(DuplicateKey {
                key,
                count: positions.len(),
                ids: positions
                    .iter()
                    .filter_map(|&p| records[p].id(schema))
                    .collect(),
            }),
            GroupKey::Unkeyed { .. } => None,
        })
        .collect();

    info!(
        "Found {} duplicated keys covering {} records",
        duplicates.len(),
        duplicates.iter().map(|d| d.count).sum::<usize>()
    );
    Ok(duplicates)
}

/// One report row per (key, id) pair: the key fields followed by [`REPORT_ID_COLUMN`].
pub fn duplicate_report_rows(duplicates: &[DuplicateKey], key_fields: &[String]) -> Vec<Record> {
    duplicates
        .iter()
        .flat_map(|dup| {
            dup.ids.iter().map(move |id| {
                let mut row = Record::from_pairs(key_fields.iter().cloned().zip(dup.key.iter().cloned()));
                row.set(REPORT_ID_COLUMN, id.0.clone());
                row
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(id: &str, tax_id: &str) -> Record {
        Record::from_pairs([("Id", id), ("NEO_Cpfcnpj__c", tax_id)])
    }

    #[test]
    fn test_find_duplicate_keys() {
        let records = vec![
            account("a", "111"),
            account("b", "222"),
            account("c", "111 "),
            account("d", ""),
            account("e", ""),
            account("f", "222"),
            account("g", "333"),
        ];
        let keys = vec!["NEO_Cpfcnpj__c".to_string()];
        let duplicates = find_duplicate_keys(&records, &keys, &RecordSchema::default()).unwrap();
        assert_eq!(duplicates.len(), 2);
        assert_eq!(duplicates[0].key, vec!["111"]);
        assert_eq!(duplicates[0].ids, vec![RecordId::from("a"), RecordId::from("c")]);
        assert_eq!(duplicates[1].ids, vec![RecordId::from("b"), RecordId::from("f")]);

        let rows = duplicate_report_rows(&duplicates, &keys);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1].get("NEO_Cpfcnpj__c").unwrap().to_string(), "111");
        assert_eq!(rows[1].get(REPORT_ID_COLUMN).unwrap().to_string(), "c");
    }

    #[test]
    fn test_no_duplicates() {
        let records = vec![account("a", "111"), account("b", "222")];
        let keys = vec!["NEO_Cpfcnpj__c".to_string()];
        assert!(find_duplicate_keys(&records, &keys, &RecordSchema::default())
            .unwrap()
            .is_empty());
    }
}
