// src/consolidation/selection.rs
use std::cmp::Ordering;

use crate::consolidation::completeness::completeness;
use crate::models::consolidation::DecisionOutcome;
use crate::models::record::{Record, RecordSchema};

/// Decides whether `candidate` should replace `base` as the group survivor.
///
/// The newer last-modified timestamp wins outright. On an exact tie the
/// record with strictly more filled fields wins; otherwise the base stays.
/// A missing timestamp sorts below every present one, so two records that
/// both lack one fall through to the completeness comparison.
pub fn compare_for_survival(base: &Record, candidate: &Record, schema: &RecordSchema) -> DecisionOutcome {
    match candidate.timestamp(schema).cmp(&base.timestamp(schema)) {
        Ordering::Greater => DecisionOutcome::CandidateNewer,
        Ordering::Less => DecisionOutcome::BaseNewer,
        Ordering::Equal => {
            let base_score = completeness(base);
            let candidate_score = completeness(candidate);
            if candidate_score > base_score {
                DecisionOutcome::CandidateMoreComplete { base_score, candidate_score }
            } else {
                DecisionOutcome::BaseAtLeastAsComplete { base_score, candidate_score }
            }
        }
    }
}

/// Processing order for survivor selection: timestamp descending, missing
/// timestamps last, input order kept among equal timestamps.
pub fn selection_order(records: &[Record], schema: &RecordSchema) -> Vec<usize> {
    let timestamps: Vec<_> = records.iter().map(|r| r.timestamp(schema)).collect();
    let mut order: Vec<usize> = (0..records.len()).collect();
    order.sort_by(|&a, &b| timestamps[b].cmp(&timestamps[a]));
    order
}

/// Outcome of running the survivor rule across a whole group. All indices
/// refer to positions in the slice passed to [`select_survivor`].
#[derive(Debug, Clone, PartialEq)]
pub struct SurvivorSelection {
    pub survivor: usize,
    /// In the order the records were discarded.
    pub discarded: Vec<usize>,
    /// `(base, candidate, outcome)` for every comparison made.
    pub comparisons: Vec<(usize, usize, DecisionOutcome)>,
}

/// Folds the survivor rule over `records` in [`selection_order`].
///
/// Whichever record loses a comparison is discarded at that point: the old
/// base when it is replaced, the candidate otherwise. Returns `None` for an
/// empty slice.
pub fn select_survivor(records: &[Record], schema: &RecordSchema) -> Option<SurvivorSelection> {
    let order = selection_order(records, schema);
    let (&first, rest) = order.split_first()?;

    let mut base = first;
    let mut discarded = Vec::with_capacity(rest.len());
    let mut comparisons = Vec::with_capacity(rest.len());

    for &candidate in rest {
        let outcome = compare_for_survival(&records[base], &records[candidate], schema);
        comparisons.push((base, candidate, outcome));
        if outcome.replaces() {
            discarded.push(base);
            base = candidate;
        } else {
            discarded.push(candidate);
        }
    }

    Some(SurvivorSelection {
        survivor: base,
        discarded,
        comparisons,
    })
}
