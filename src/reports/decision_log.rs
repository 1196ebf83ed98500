// src/reports/decision_log.rs
use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::models::consolidation::{Decision, DecisionOutcome};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecisionSummary {
    pub comparisons: usize,
    pub replaced_newer: usize,
    pub replaced_more_complete: usize,
    pub kept_newer: usize,
    pub kept_at_least_as_complete: usize,
}

pub fn summarize(decisions: &[Decision]) -> DecisionSummary {
    let mut summary = DecisionSummary {
        comparisons: decisions.len(),
        ..Default::default()
    };
    for decision in decisions {
        match decision.outcome {
            DecisionOutcome::CandidateNewer => summary.replaced_newer += 1,
            DecisionOutcome::CandidateMoreComplete { .. } => summary.replaced_more_complete += 1,
            DecisionOutcome::BaseNewer => summary.kept_newer += 1,
            DecisionOutcome::BaseAtLeastAsComplete { .. } => summary.kept_at_least_as_complete += 1,
        }
    }
    summary
}

/// Writes one JSON object per decision.
pub fn write_decision_log(path: impl AsRef<Path>, decisions: &[Decision]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for decision in decisions {
        serde_json::to_writer(&mut writer, decision).context("Failed to serialize decision")?;
        writer.write_all(b"\n")?;
    }
    writer.flush().with_context(|| format!("Failed to flush {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::RecordId;
    use tempfile::TempDir;

    fn decision(outcome: DecisionOutcome) -> Decision {
        Decision {
            group_key: "111".to_string(),
            base_id: RecordId::from("a"),
            candidate_id: RecordId::from("b"),
            outcome,
        }
    }

    #[test]
    fn test_summarize() {
        let summary = summarize(&[
            decision(DecisionOutcome::CandidateNewer),
            decision(DecisionOutcome::BaseNewer),
            decision(DecisionOutcome::BaseAtLeastAsComplete { base_score: 3, candidate_score: 3 }),
        ]);
        assert_eq!(summary.comparisons, 3);
        assert_eq!(summary.replaced_newer, 1);
        assert_eq!(summary.kept_newer, 1);
        assert_eq!(summary.kept_at_least_as_complete, 1);
        assert_eq!(summary.replaced_more_complete, 0);
    }

    #[test]
    fn test_write_decision_log() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("decisions.jsonl");
        write_decision_log(
            &path,
            &[decision(DecisionOutcome::CandidateMoreComplete { base_score: 2, candidate_score: 4 })],
        )
        .unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 1);
        let parsed: Decision = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed.candidate_id, RecordId::from("b"));
        assert!(parsed.outcome.replaces());
        assert!(lines[0].contains("\"reason\":\"candidate_more_complete\""));
    }
}
