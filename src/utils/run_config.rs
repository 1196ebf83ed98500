//! Run configuration for the consolidation pipeline.
//! Every setting can come from the environment and be overridden on the command line.

use log::{debug, info, warn};
use std::env;

use crate::models::record::RecordSchema;

pub const DEFAULT_KEY_FIELDS: &str = "NEO_Cpfcnpj__c";
pub const DEFAULT_ID_FIELD: &str = "Id";
pub const DEFAULT_TIMESTAMP_FIELD: &str = "LastModifiedDate";
pub const DEFAULT_PROVENANCE_FIELD: &str = "Discarded_Ids";
pub const DEFAULT_SOURCE_TABLE: &str = "account";

#[derive(Debug, Clone, PartialEq)]
pub struct ConsolidationConfig {
    /// Fields whose trimmed values form the duplicate key.
    pub key_fields: Vec<String>,
    pub id_field: String,
    pub timestamp_field: String,
    /// Output column receiving the discarded ids of each survivor.
    pub provenance_field: String,
    /// Keep the trail of survivor comparisons.
    pub decision_log: bool,
    /// Table read by the PostgreSQL record source.
    pub source_table: String,
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            key_fields: parse_field_list(DEFAULT_KEY_FIELDS),
            id_field: DEFAULT_ID_FIELD.to_string(),
            timestamp_field: DEFAULT_TIMESTAMP_FIELD.to_string(),
            provenance_field: DEFAULT_PROVENANCE_FIELD.to_string(),
            decision_log: false,
            source_table: DEFAULT_SOURCE_TABLE.to_string(),
        }
    }
}

/// Splits a comma-separated field list, dropping blanks.
pub fn parse_field_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl ConsolidationConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Self {
        let key_fields = parse_field_list(
            &env::var("DEDUPE_KEY_FIELDS").unwrap_or_else(|_| DEFAULT_KEY_FIELDS.to_string()),
        );
        let config = Self {
            key_fields,
            id_field: env::var("DEDUPE_ID_FIELD").unwrap_or_else(|_| DEFAULT_ID_FIELD.to_string()),
            timestamp_field: env::var("DEDUPE_TIMESTAMP_FIELD")
                .unwrap_or_else(|_| DEFAULT_TIMESTAMP_FIELD.to_string()),
            provenance_field: env::var("DEDUPE_PROVENANCE_FIELD")
                .unwrap_or_else(|_| DEFAULT_PROVENANCE_FIELD.to_string()),
            decision_log: env::var("DEDUPE_DECISION_LOG")
                .unwrap_or_else(|_| "false".to_string())
                .parse::<bool>()
                .unwrap_or(false),
            source_table: env::var("DEDUPE_SOURCE_TABLE")
                .unwrap_or_else(|_| DEFAULT_SOURCE_TABLE.to_string()),
        };
        debug!("Consolidation config from env: {:?}", config);
        config
    }

    /// Replaces the key fields when an override is given.
    pub fn with_key_fields(mut self, key_fields: Option<Vec<String>>) -> Self {
        if let Some(fields) = key_fields {
            let fields: Vec<String> = fields
                .into_iter()
                .map(|f| f.trim().to_string())
                .filter(|f| !f.is_empty())
                .collect();
            if !fields.is_empty() {
                self.key_fields = fields;
            }
        }
        self
    }

    pub fn schema(&self) -> RecordSchema {
        RecordSchema::new(self.id_field.clone(), self.timestamp_field.clone())
    }

    /// Log the current configuration
    pub fn log_config(&self) {
        info!("🔑 Duplicate key: {:?}", self.key_fields);
        info!(
            "   Id field: {}, last-modified field: {}",
            self.id_field, self.timestamp_field
        );
        info!("   Discarded ids written to column: {}", self.provenance_field);
        if self.decision_log {
            info!("📝 Decision log ENABLED");
        }
        if self.key_fields.len() > 1 {
            warn!(
                "⚠️ Composite key in use: records merge only when all of {:?} match",
                self.key_fields
            );
        }
    }
}
