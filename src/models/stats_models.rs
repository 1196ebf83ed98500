// src/models/stats_models.rs
use chrono::NaiveDateTime;
use serde::Serialize;

use crate::models::consolidation::ConsolidationOutcome;

#[derive(Debug, Clone, Serialize)]
pub struct ConsolidationStats {
    pub run_id: String,
    pub run_timestamp: NaiveDateTime,
    pub description: Option<String>,
    pub total_records: usize,
    pub total_groups: usize,
    pub merged_groups: usize,
    pub survivors: usize,
    pub discarded: usize,
    pub failed_groups: usize,
    pub records_in_failed_groups: usize,
    pub fields_backfilled: usize,
    pub unreadable_timestamps: usize,
    pub loading_time: f64,
    pub consolidation_time: f64,
    pub output_time: f64,
    pub fingerprint: Option<String>,
}

impl ConsolidationStats {
    pub fn new(run_id: &str, run_timestamp: NaiveDateTime, description: Option<&str>) -> Self {
        Self {
            run_id: run_id.to_string(),
            run_timestamp,
            description: description.map(|s| s.to_string()),
            total_records: 0,
            total_groups: 0,
            merged_groups: 0,
            survivors: 0,
            discarded: 0,
            failed_groups: 0,
            records_in_failed_groups: 0,
            fields_backfilled: 0,
            unreadable_timestamps: 0,
            loading_time: 0.0,
            consolidation_time: 0.0,
            output_time: 0.0,
            fingerprint: None,
        }
    }

    /// Folds the counts of a finished consolidation into the run statistics.
    pub fn record_outcome(&mut self, total_records: usize, outcome: &ConsolidationOutcome) {
        self.total_records = total_records;
        self.survivors = outcome.results.len();
        self.failed_groups = outcome.failures.len();
        self.total_groups = self.survivors + self.failed_groups;
        self.merged_groups = outcome.merged_group_count();
        self.discarded = outcome.discarded_count();
        self.fields_backfilled = outcome.backfilled_field_count();
        self.unreadable_timestamps = outcome.unreadable_timestamps.len();
        self.records_in_failed_groups = total_records.saturating_sub(self.survivors + self.discarded);
    }

    pub fn total_processing_time(&self) -> f64 {
        self.loading_time + self.consolidation_time + self.output_time
    }
}
