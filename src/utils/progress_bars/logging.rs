// src/utils/progress_bars/logging.rs - Logging helpers for pipeline phases
use log::{info, warn};
use std::time::Instant;

use crate::models::consolidation::GroupFailure;
use crate::models::stats_models::ConsolidationStats;

#[derive(Clone)]
pub struct ConsolidationLogger {
    phase_name: &'static str,
    phase_emoji: &'static str,
    start_time: Instant,
}

impl ConsolidationLogger {
    pub fn new(phase_name: &'static str, phase_emoji: &'static str) -> Self {
        Self {
            phase_name,
            phase_emoji,
            start_time: Instant::now(),
        }
    }

    pub fn consolidation() -> Self {
        Self::new("CONSOLIDATE", "🧬")
    }

    pub fn log_start(&self, run_id: &str, key_fields: &[String]) {
        info!(
            "[{}] {} 🚀 Starting run {} (duplicate key: {:?})",
            self.phase_name, self.phase_emoji, run_id, key_fields
        );
    }

    pub fn log_phase(&self, phase: &str, details: Option<&str>) {
        let elapsed = self.start_time.elapsed();
        let msg = if let Some(details) = details {
            format!(
                "[{}] {} 🔄 Phase: {} - {} [+{:.1}s]",
                self.phase_name, self.phase_emoji, phase, details, elapsed.as_secs_f32()
            )
        } else {
            format!(
                "[{}] {} 🔄 Phase: {} [+{:.1}s]",
                self.phase_name, self.phase_emoji, phase, elapsed.as_secs_f32()
            )
        };
        info!("{}", msg);
    }

    pub fn log_data_loaded(&self, count: usize, source: &str) {
        info!(
            "[{}] {} 📊 Loaded {} records from {}",
            self.phase_name, self.phase_emoji, count, source
        );
    }

    pub fn log_group_failures(&self, failures: &[GroupFailure]) {
        if failures.is_empty() {
            return;
        }
        warn!(
            "[{}] {} ⚠️  {} groups could not be consolidated",
            self.phase_name,
            self.phase_emoji,
            failures.len()
        );
        for failure in failures {
            warn!(
                "[{}] {}    group {} ({} ids): {}",
                self.phase_name,
                self.phase_emoji,
                failure.group_key,
                failure.record_ids.len(),
                failure.error
            );
        }
    }

    pub fn log_output_written(&self, path: &str, rows: usize) {
        info!(
            "[{}] {} 💾 Wrote {} rows to {}",
            self.phase_name, self.phase_emoji, rows, path
        );
    }

    pub fn log_completion(&self, stats: &ConsolidationStats) {
        info!(
            "[{}] {} 🎉 COMPLETED in {:.2?}: {} records → {} survivors ({} merged groups, {} discarded)",
            self.phase_name,
            self.phase_emoji,
            self.start_time.elapsed(),
            stats.total_records,
            stats.survivors,
            stats.merged_groups,
            stats.discarded
        );
        if stats.fields_backfilled > 0 {
            info!(
                "[{}] {} 🧩 Backfilled {} empty survivor fields from discarded records",
                self.phase_name, self.phase_emoji, stats.fields_backfilled
            );
        }
        if stats.unreadable_timestamps > 0 {
            warn!(
                "[{}] {} ⚠️  {} records had an unreadable timestamp and ranked as oldest",
                self.phase_name, self.phase_emoji, stats.unreadable_timestamps
            );
        }
        if stats.failed_groups > 0 {
            warn!(
                "[{}] {} ⚠️  {} failed groups left {} records unconsolidated",
                self.phase_name, self.phase_emoji, stats.failed_groups, stats.records_in_failed_groups
            );
        }
    }

    pub fn log_warning(&self, message: &str) {
        warn!("[{}] {} ⚠️  {}", self.phase_name, self.phase_emoji, message);
    }
}
