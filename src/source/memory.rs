// src/source/memory.rs
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::models::record::{Record, RecordId, RecordSchema};
use crate::source::{Criteria, RecordSource};
use crate::table::read_table;

/// Records held in memory, typically read from an exported table.
#[derive(Debug, Clone)]
pub struct InMemorySource {
    records: Vec<Record>,
    schema: RecordSchema,
    origin: Option<PathBuf>,
}

impl InMemorySource {
    pub fn new(records: Vec<Record>, schema: RecordSchema) -> Self {
        Self {
            records,
            schema,
            origin: None,
        }
    }

    pub fn from_table(path: impl AsRef<Path>, schema: RecordSchema) -> Result<Self> {
        let path = path.as_ref();
        let records = read_table(path)?;
        Ok(Self {
            records,
            schema,
            origin: Some(path.to_path_buf()),
        })
    }

}

#[async_trait]
impl RecordSource for InMemorySource {
    fn describe(&self) -> String {
        match &self.origin {
            Some(path) => path.display().to_string(),
            None => format!("{} in-memory records", self.records.len()),
        }
    }

    async fn list_all(&self, criteria: &Criteria) -> Result<Vec<Record>> {
        Ok(self
            .records
            .iter()
            .filter(|r| criteria.matches(r))
            .cloned()
            .map(|r| criteria.project(r))
            .collect())
    }

    async fn fetch_by_ids(&self, ids: &[RecordId]) -> Result<Vec<Record>> {
        let wanted: HashSet<&str> = ids.iter().map(|id| id.0.trim()).collect();
        Ok(self
            .records
            .iter()
            .filter(|r| {
                r.id(&self.schema)
                    .map_or(false, |id| wanted.contains(id.0.as_str()))
            })
            .cloned()
            .collect())
    }
}
