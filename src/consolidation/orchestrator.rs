// src/consolidation/orchestrator.rs
use log::{debug, info, warn};
use std::collections::HashSet;
use std::time::Instant;

use crate::consolidation::backfill::backfill_from_all;
use crate::consolidation::grouping::group;
use crate::consolidation::selection::select_survivor;
use crate::error::ConsolidationError;
use crate::models::consolidation::{
    ConsolidationOutcome, ConsolidationResult, Decision, DuplicateGroup, GroupFailure, GroupKey,
    UnreadableTimestamp,
};
use crate::models::record::{Record, RecordId, RecordSchema};

/// Drives grouping, survivor selection and backfill over a record set.
///
/// The consolidator owns no data between calls; every invocation works on the
/// records it is handed and returns fresh results.
#[derive(Debug, Clone, Default)]
pub struct Consolidator {
    schema: RecordSchema,
    record_decisions: bool,
}

impl Consolidator {
    pub fn new(schema: RecordSchema) -> Self {
        Self {
            schema,
            record_decisions: false,
        }
    }

    /// Keep every survivor comparison in [`ConsolidationOutcome::decisions`].
    pub fn with_decision_log(mut self, enabled: bool) -> Self {
        self.record_decisions = enabled;
        self
    }

    pub fn consolidate(
        &self,
        records: Vec<Record>,
        key_fields: &[String],
    ) -> Result<ConsolidationOutcome, ConsolidationError> {
        self.consolidate_observed(records, key_fields, |_, _| {})
    }

    /// Same as [`Consolidator::consolidate`], calling `on_group(done, total)`
    /// after each group so callers can drive a progress display.
    pub fn consolidate_observed<F>(
        &self,
        records: Vec<Record>,
        key_fields: &[String],
        mut on_group: F,
    ) -> Result<ConsolidationOutcome, ConsolidationError>
    where
        F: FnMut(usize, usize),
    {
        if records.is_empty() {
            warn!("EmptyInputWarning: no records to consolidate, returning an empty result");
            return Ok(ConsolidationOutcome::default());
        }

        let start = Instant::now();
        let record_count = records.len();
        let groups = group(records, key_fields)?;
        let total = groups.len();
        info!(
            "Consolidating {} records in {} groups on key {:?}",
            record_count, total, key_fields
        );

        let mut outcome = ConsolidationOutcome::default();
        for (done, duplicate_group) in groups.into_iter().enumerate() {
            let group_key = duplicate_group.key.clone();
            let record_ids: Vec<RecordId> = duplicate_group
                .records
                .iter()
                .filter_map(|r| r.id(&self.schema))
                .collect();

            self.note_unreadable_timestamps(&duplicate_group, &mut outcome);

            match self.consolidate_group(duplicate_group, key_fields) {
                Ok((result, decisions)) => {
                    outcome.results.push(result);
                    if self.record_decisions {
                        outcome.decisions.extend(decisions);
                    }
                }
                Err(error) => {
                    warn!("Group {} could not be consolidated: {}", group_key, error);
                    outcome.failures.push(GroupFailure {
                        group_key,
                        record_ids,
                        error,
                    });
                }
            }
            on_group(done + 1, total);
        }

        info!(
            "Consolidation finished in {:.2?}: {} survivors, {} discarded, {} failed groups",
            start.elapsed(),
            outcome.results.len(),
            outcome.discarded_count(),
            outcome.failures.len()
        );
        Ok(outcome)
    }

    /// Resolves one duplicate group into its survivor.
    pub fn consolidate_group(
        &self,
        duplicate_group: DuplicateGroup,
        key_fields: &[String],
    ) -> Result<(ConsolidationResult, Vec<Decision>), ConsolidationError> {
        let DuplicateGroup { key, records } = duplicate_group;
        let ids = self.validate_members(&records, &key, key_fields)?;

        let selection = select_survivor(&records, &self.schema)
            .ok_or_else(|| ConsolidationError::malformed(None, "duplicate group is empty"))?;

        let key_label = key.to_string();
        let decisions: Vec<Decision> = selection
            .comparisons
            .iter()
            .map(|&(base, candidate, outcome)| {
                debug!(
                    "Group {}: base {} vs candidate {}: {}",
                    key_label, ids[base], ids[candidate], outcome
                );
                Decision {
                    group_key: key_label.clone(),
                    base_id: ids[base].clone(),
                    candidate_id: ids[candidate].clone(),
                    outcome,
                }
            })
            .collect();

        let mut survivor = records[selection.survivor].clone();
        let backfilled_fields = backfill_from_all(
            &mut survivor,
            records
                .iter()
                .enumerate()
                .filter(|(position, _)| *position != selection.survivor)
                .map(|(_, record)| record),
        );
        if !backfilled_fields.is_empty() {
            debug!(
                "Group {}: backfilled {:?} on survivor {}",
                key_label, backfilled_fields, ids[selection.survivor]
            );
        }

        let result = ConsolidationResult {
            group_key: key,
            survivor_id: ids[selection.survivor].clone(),
            survivor,
            discarded_ids: selection.discarded.iter().map(|&i| ids[i].clone()).collect(),
            backfilled_fields,
        };
        Ok((result, decisions))
    }

    /// Warns once per member whose timestamp is present but unreadable and
    /// keeps a record of it. The member still takes part, ranking lowest.
    fn note_unreadable_timestamps(&self, duplicate_group: &DuplicateGroup, outcome: &mut ConsolidationOutcome) {
        for record in &duplicate_group.records {
            if let Some(raw) = record.unreadable_timestamp(&self.schema) {
                let record_id = record.id(&self.schema);
                warn!(
                    "Record {} in group {} has an unreadable '{}' value {:?}, ranking it as oldest",
                    record_id.as_ref().map_or("<no id>", |id| id.0.as_str()),
                    duplicate_group.key,
                    self.schema.timestamp_field,
                    raw.to_string()
                );
                outcome.unreadable_timestamps.push(UnreadableTimestamp {
                    group_key: duplicate_group.key.clone(),
                    record_id,
                    raw: raw.to_string(),
                });
            }
        }
    }

    /// Every member needs an id, unique within the group, and must carry the
    /// key fields. Returns the ids in member order.
    fn validate_members(
        &self,
        records: &[Record],
        key: &GroupKey,
        key_fields: &[String],
    ) -> Result<Vec<RecordId>, ConsolidationError> {
        let mut ids = Vec::with_capacity(records.len());
        let mut seen = HashSet::with_capacity(records.len());

        for (position, record) in records.iter().enumerate() {
            let id = record.id(&self.schema).ok_or_else(|| {
                ConsolidationError::malformed(
                    None,
                    format!(
                        "member {} of group {} has no '{}' value",
                        position, key, self.schema.id_field
                    ),
                )
            })?;
            if !seen.insert(id.clone()) {
                return Err(ConsolidationError::malformed(
                    Some(id),
                    format!("id appears more than once in group {}", key),
                ));
            }
            if let Some(missing) = key_fields.iter().find(|f| !record.contains_field(f)) {
                return Err(ConsolidationError::malformed(
                    Some(id),
                    format!("missing key field '{}'", missing),
                ));
            }
            ids.push(id);
        }
        Ok(ids)
    }
}

/// Consolidates `records` with the default schema (`Id`, `LastModifiedDate`).
///
/// Returns the survivors in group order plus the groups that failed.
pub fn consolidate(
    records: Vec<Record>,
    key_fields: &[String],
) -> Result<(Vec<ConsolidationResult>, Vec<GroupFailure>), ConsolidationError> {
    let outcome = Consolidator::default().consolidate(records, key_fields)?;
    Ok((outcome.results, outcome.failures))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consolidation::completeness::completeness;
    use crate::models::consolidation::DecisionOutcome;
    use crate::models::record::FieldValue;
    use std::collections::HashMap;

    const TAX_ID: &str = "NEO_Cpfcnpj__c";

    fn key_fields() -> Vec<String> {
        vec![TAX_ID.to_string()]
    }

    fn account(id: &str, tax_id: &str, modified: &str, extra: &[(&str, &str)]) -> Record {
        let mut record = Record::from_pairs([
            ("Id", id),
            (TAX_ID, tax_id),
            ("LastModifiedDate", modified),
        ]);
        for (name, value) in extra {
            record.set(*name, *value);
        }
        record
    }

    fn ids(values: &[&str]) -> Vec<RecordId> {
        values.iter().map(|v| RecordId::from(*v)).collect()
    }

    #[test]
    fn test_newer_record_survives() {
        let records = vec![
            account("first", "111", "2024-01-01", &[]),
            account("second", "111", "2024-02-01", &[]),
        ];
        let (results, failures) = consolidate(records, &key_fields()).unwrap();
        assert!(failures.is_empty());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].survivor_id, RecordId::from("second"));
        assert_eq!(results[0].discarded_ids, ids(&["first"]));
    }

    #[test]
    fn test_tie_picks_more_complete_and_backfills() {
        let x = account(
            "X",
            "111",
            "2024-01-01",
            &[("Phone", "555"), ("Fax", "777"), ("Website", ""), ("Industry", ""), ("Rating", "")],
        );
        let y = account(
            "Y",
            "111",
            "2024-01-01",
            &[("Phone", "999"), ("Fax", ""), ("Website", "y.example"), ("Industry", "Retail"), ("Rating", "Hot")],
        );
        assert_eq!(completeness(&x), 5);
        assert_eq!(completeness(&y), 7);

        let (results, _) = consolidate(vec![x, y], &key_fields()).unwrap();
        let result = &results[0];
        assert_eq!(result.survivor_id, RecordId::from("Y"));
        assert_eq!(result.discarded_ids, ids(&["X"]));
        assert_eq!(result.survivor.get("Fax"), Some(&FieldValue::from("777")));
        assert_eq!(result.survivor.get("Phone"), Some(&FieldValue::from("999")));
        assert_eq!(result.backfilled_fields, vec!["Fax"]);
    }

    #[test]
    fn test_backfill_follows_input_order_not_selection_order() {
        let records = vec![
            account("d1", "111", "2024-01-01", &[("Phone", "111")]),
            account("s", "111", "2024-03-01", &[("Phone", "")]),
            account("d2", "111", "2024-02-01", &[("Phone", "222")]),
        ];
        let (results, failures) = consolidate(records, &key_fields()).unwrap();
        assert!(failures.is_empty());
        let result = &results[0];
        assert_eq!(result.survivor_id, RecordId::from("s"));
        assert_eq!(result.survivor.get("Phone"), Some(&FieldValue::from("111")));
        assert_eq!(result.discarded_ids, ids(&["d2", "d1"]));
        assert_eq!(result.backfilled_fields, vec!["Phone"]);
    }

    #[test]
    fn test_unreadable_timestamp_is_recorded_and_ranks_lowest() {
        let records = vec![
            account("old", "111", "2024-01-01", &[]),
            account("new", "111", "15/03/2024 10:00", &[]),
            account("other", "222", "2024-01-01", &[]),
        ];
        let outcome = Consolidator::default()
            .consolidate(records, &key_fields())
            .unwrap();
        assert!(outcome.failures.is_empty());
        assert_eq!(outcome.results[0].survivor_id, RecordId::from("old"));
        assert_eq!(outcome.results[0].discarded_ids, ids(&["new"]));
        assert_eq!(
            outcome.unreadable_timestamps,
            vec![UnreadableTimestamp {
                group_key: GroupKey::Shared(vec!["111".to_string()]),
                record_id: Some(RecordId::from("new")),
                raw: "15/03/2024 10:00".to_string(),
            }]
        );
    }

    #[test]
    fn test_singleton_group_is_unchanged() {
        let record = account("solo", "111", "2024-01-01", &[("Phone", "")]);
        let (results, failures) = consolidate(vec![record.clone()], &key_fields()).unwrap();
        assert!(failures.is_empty());
        assert_eq!(results[0].survivor, record);
        assert!(results[0].discarded_ids.is_empty());
        assert!(results[0].backfilled_fields.is_empty());
    }

    #[test]
    fn test_empty_tax_id_is_not_merged() {
        let records = vec![
            account("a", "", "2024-01-01", &[]),
            account("b", "", "2024-02-01", &[]),
            account("c", "111", "2024-01-01", &[]),
        ];
        let (results, failures) = consolidate(records, &key_fields()).unwrap();
        assert!(failures.is_empty());
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].group_key, GroupKey::Unkeyed { position: 0 });
        assert!(results.iter().all(|r| r.discarded_ids.is_empty()));
    }

    #[test]
    fn test_thousand_records_in_fifty_groups() {
        let mut records = Vec::new();
        for i in 0..1000 {
            let day = 1 + (i % 28);
            records.push(account(
                &format!("acc-{:04}", i),
                &format!("tax-{:02}", i % 50),
                &format!("2024-03-{:02}", day),
                &[("Phone", if i % 3 == 0 { "" } else { "555" })],
            ));
        }
        let (results, failures) = consolidate(records, &key_fields()).unwrap();
        assert!(failures.is_empty());
        assert_eq!(results.len(), 50);
        assert_eq!(results.iter().map(|r| r.discarded_ids.len()).sum::<usize>(), 950);

        let mut seen = HashSet::new();
        for result in &results {
            assert!(seen.insert(result.survivor_id.clone()));
            for id in &result.discarded_ids {
                assert!(seen.insert(id.clone()));
            }
        }
        assert_eq!(seen.len(), 1000);
    }

    #[test]
    fn test_consolidation_is_deterministic() {
        let build = || {
            (0..60)
                .map(|i| {
                    account(
                        &format!("id-{}", i),
                        &format!("{}", i % 7),
                        if i % 2 == 0 { "2024-05-01" } else { "2024-05-02" },
                        &[("Phone", if i % 5 == 0 { "" } else { "1" }), ("Fax", if i % 4 == 0 { "2" } else { "" })],
                    )
                })
                .collect::<Vec<_>>()
        };
        let first = consolidate(build(), &key_fields()).unwrap();
        let second = consolidate(build(), &key_fields()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_survivor_properties_hold_per_group() {
        let records: Vec<Record> = (0..40)
            .map(|i| {
                let modified = match i % 4 {
                    0 => "2023-12-31",
                    1 => "2024-01-15",
                    2 => "",
                    _ => "2024-01-15",
                };
                account(
                    &format!("r{}", i),
                    &format!("{}", i % 6),
                    modified,
                    &[
                        ("Phone", if i % 3 == 0 { "p" } else { "" }),
                        ("Fax", if i % 5 == 0 { "f" } else { "NA" }),
                        ("Website", if i % 7 == 0 { "w" } else { "" }),
                    ],
                )
            })
            .collect();
        let schema = RecordSchema::default();
        let mut by_id: HashMap<RecordId, Record> = HashMap::new();
        for record in &records {
            by_id.insert(record.id(&schema).unwrap(), record.clone());
        }

        let (results, _) = consolidate(records, &key_fields()).unwrap();
        for result in &results {
            let original_survivor = &by_id[&result.survivor_id];
            let survivor_ts = original_survivor.timestamp(&schema);
            let members: Vec<&Record> = std::iter::once(original_survivor)
                .chain(result.discarded_ids.iter().map(|id| &by_id[id]))
                .collect();

            assert!(!result.discarded_ids.contains(&result.survivor_id));
            for member in &members {
                let ts = member.timestamp(&schema);
                assert!(survivor_ts >= ts);
                if ts == survivor_ts {
                    assert!(completeness(original_survivor) >= completeness(member));
                }
            }
            for (name, value) in result.survivor.iter() {
                if value.is_empty() {
                    assert!(members.iter().all(|m| m.get(name).map_or(true, |v| v.is_empty())));
                }
            }
        }
    }

    #[test]
    fn test_missing_id_fails_only_its_group() {
        let mut broken = account("", "222", "2024-01-01", &[]);
        broken.set("Id", FieldValue::Null);
        let records = vec![
            account("a", "111", "2024-01-01", &[]),
            broken,
            account("b", "111", "2024-02-01", &[]),
            account("c", "222", "2024-02-01", &[]),
        ];
        let (results, failures) = consolidate(records, &key_fields()).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].survivor_id, RecordId::from("b"));
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].group_key, GroupKey::Shared(vec!["222".to_string()]));
        assert_eq!(failures[0].record_ids, ids(&["c"]));
        assert!(matches!(failures[0].error, ConsolidationError::MalformedRecord { .. }));
    }

    #[test]
    fn test_repeated_id_in_group_is_malformed() {
        let records = vec![
            account("a", "111", "2024-01-01", &[]),
            account("a", "111", "2024-02-01", &[]),
        ];
        let (results, failures) = consolidate(records, &key_fields()).unwrap();
        assert!(results.is_empty());
        assert_eq!(
            failures[0].error,
            ConsolidationError::malformed(Some(RecordId::from("a")), "id appears more than once in group 111")
        );
    }

    #[test]
    fn test_absent_key_field_fails_its_group() {
        let records = vec![
            account("a", "111", "2024-01-01", &[]),
            Record::from_pairs([("Id", "b"), ("LastModifiedDate", "2024-01-01")]),
        ];
        let (results, failures) = consolidate(records, &key_fields()).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].group_key, GroupKey::Unkeyed { position: 1 });
        assert_eq!(
            failures[0].error,
            ConsolidationError::malformed(Some(RecordId::from("b")), "missing key field 'NEO_Cpfcnpj__c'")
        );
    }

    #[test]
    fn test_configuration_error_is_fatal() {
        let records = vec![account("a", "111", "2024-01-01", &[])];
        let err = consolidate(records, &["NEO_Clave_Cliente__c".to_string()]).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_empty_input_is_empty_output() {
        let (results, failures) = consolidate(Vec::new(), &key_fields()).unwrap();
        assert!(results.is_empty());
        assert!(failures.is_empty());
    }

    #[test]
    fn test_decision_log_and_observer() {
        let records = vec![
            account("a", "111", "2024-01-01", &[]),
            account("b", "111", "2024-01-01", &[("Phone", "1")]),
            account("c", "222", "2024-01-01", &[]),
        ];
        let consolidator = Consolidator::default().with_decision_log(true);
        let mut progress = Vec::new();
        let outcome = consolidator
            .consolidate_observed(records, &key_fields(), |done, total| progress.push((done, total)))
            .unwrap();

        assert_eq!(progress, vec![(1, 2), (2, 2)]);
        assert_eq!(outcome.decisions.len(), 1);
        let decision = &outcome.decisions[0];
        assert_eq!(decision.group_key, "111");
        assert_eq!(decision.base_id, RecordId::from("a"));
        assert_eq!(decision.candidate_id, RecordId::from("b"));
        assert_eq!(
            decision.outcome,
            DecisionOutcome::CandidateMoreComplete { base_score: 3, candidate_score: 4 }
        );

        let quiet = Consolidator::default()
            .consolidate(vec![account("a", "1", "", &[]), account("b", "1", "", &[])], &key_fields())
            .unwrap();
        assert!(quiet.decisions.is_empty());
    }

    #[test]
    fn test_custom_schema() {
        let schema = RecordSchema::new("id", "updated_at");
        let records = vec![
            Record::from_pairs([("id", "1"), ("tax", "9"), ("updated_at", "2024-02-01")]),
            Record::from_pairs([("id", "2"), ("tax", "9"), ("updated_at", "2024-03-01")]),
        ];
        let outcome = Consolidator::new(schema)
            .consolidate(records, &["tax".to_string()])
            .unwrap();
        assert_eq!(outcome.results[0].survivor_id, RecordId::from("2"));
        assert_eq!(outcome.results[0].discarded_ids, ids(&["1"]));
    }
}
