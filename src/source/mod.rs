// src/source/mod.rs
//! Where records come from. The consolidation core never talks to a store
//! directly; binaries pick a [`RecordSource`] and hand its records over.

pub mod memory;
pub mod postgres;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::record::{FieldValue, Record, RecordId};

pub use memory::InMemorySource;
pub use postgres::PgRecordSource;

/// Projection and equality filters for a bulk query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    /// Fields to keep, in output order. `None` keeps every field.
    pub fields: Option<Vec<String>>,
    /// `(field, value)` pairs that must all match, compared on trimmed text.
    pub filters: Vec<(String, String)>,
}

impl Criteria {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn filter(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.filters.iter().all(|(field, expected)| {
            record
                .get(field)
                .and_then(FieldValue::as_key_part)
                .map_or(false, |actual| actual == expected.trim())
        })
    }

    /// Restricts `record` to the projected fields. Projected fields the
    /// record lacks come back as nulls.
    pub fn project(&self, record: Record) -> Record {
        match &self.fields {
            None => record,
            Some(fields) => Record::from_pairs(fields.iter().map(|field| {
                (
                    field.clone(),
                    record.get(field).cloned().unwrap_or(FieldValue::Null),
                )
            })),
        }
    }
}

/// Read access to the system of record.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Short label for logs, e.g. a file path or table name.
    fn describe(&self) -> String;

    async fn list_all(&self, criteria: &Criteria) -> Result<Vec<Record>>;

    async fn fetch_by_ids(&self, ids: &[RecordId]) -> Result<Vec<Record>>;

    async fn fetch_where(&self, field: &str, value: &str) -> Result<Vec<Record>> {
        self.list_all(&Criteria::all().filter(field, value)).await
    }
}
