// src/utils/signature.rs

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

use crate::models::consolidation::ConsolidationResult;

/// SHA-256 over the survivors of a run, in output order. Two runs over the
/// same input and key fields produce the same fingerprint.
pub fn fingerprint_results(results: &[ConsolidationResult], provenance_field: &str) -> Result<String> {
    let mut hasher = Sha256::new();
    for result in results {
        let canonical = serde_json::to_string(&result.to_output_record(provenance_field))
            .context("Failed to serialize survivor for fingerprinting")?;
        hasher.update(canonical.as_bytes());
        hasher.update(b"\n");
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consolidation::consolidate;
    use crate::models::record::Record;

    fn records() -> Vec<Record> {
        vec![
            Record::from_pairs([("Id", "a"), ("Tax", "1"), ("LastModifiedDate", "2024-01-01"), ("Phone", "")]),
            Record::from_pairs([("Id", "b"), ("Tax", "1"), ("LastModifiedDate", "2024-01-02"), ("Phone", "9")]),
            Record::from_pairs([("Id", "c"), ("Tax", "2"), ("LastModifiedDate", "2024-01-01"), ("Phone", "")]),
        ]
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let keys = vec!["Tax".to_string()];
        let (first, _) = consolidate(records(), &keys).unwrap();
        let (second, _) = consolidate(records(), &keys).unwrap();
        let a = fingerprint_results(&first, "Discarded_Ids").unwrap();
        let b = fingerprint_results(&second, "Discarded_Ids").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_fingerprint_changes_with_survivors() {
        let keys = vec!["Tax".to_string()];
        let (results, _) = consolidate(records(), &keys).unwrap();
        let full = fingerprint_results(&results, "Discarded_Ids").unwrap();
        let partial = fingerprint_results(&results[..1], "Discarded_Ids").unwrap();
        assert_ne!(full, partial);
    }
}
