// src/models/record.rs
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// Text value the source systems use to mean "no information".
pub const EMPTY_SENTINEL: &str = "NA";

/// Scalar held by a single record field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Null,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl FieldValue {
    /// Null, blank text and the `NA` sentinel all count as empty. Surrounding
    /// whitespace is ignored, so emptiness agrees with [`FieldValue::as_key_part`].
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::Text(s) => {
                let trimmed = s.trim();
                trimmed.is_empty() || trimmed == EMPTY_SENTINEL
            }
            _ => false,
        }
    }

    /// Canonical trimmed text used when comparing values across records
    /// (duplicate keys, ids, equality filters). `None` when there is nothing
    /// to compare.
    pub fn as_key_part(&self) -> Option<String> {
        if self.is_empty() {
            None
        } else {
            Some(self.to_string().trim().to_string())
        }
    }

    /// Interprets the value as a last-modified timestamp.
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            FieldValue::DateTime(dt) => Some(*dt),
            FieldValue::Date(d) => d.and_hms_opt(0, 0, 0),
            FieldValue::Text(s) if !self.is_empty() => parse_timestamp(s),
            _ => None,
        }
    }

    /// Builds a value from a raw table cell. Blank cells become `Null`.
    pub fn from_cell(cell: &str) -> Self {
        if cell.is_empty() {
            FieldValue::Null
        } else {
            FieldValue::Text(cell.to_string())
        }
    }
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc).naive_utc());
    }
    // Salesforce style: 2024-01-31T12:00:00.000+0000
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.with_timezone(&Utc).naive_utc());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => Ok(()),
            FieldValue::Text(s) => write!(f, "{}", s),
            FieldValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            FieldValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.f")),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<JsonValue> for FieldValue {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => FieldValue::Null,
            JsonValue::Bool(b) => FieldValue::Bool(b),
            JsonValue::Number(n) => n
                .as_f64()
                .map(FieldValue::Number)
                .unwrap_or_else(|| FieldValue::Text(n.to_string())),
            JsonValue::String(s) => FieldValue::Text(s),
            other => FieldValue::Text(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(pub String);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        RecordId(value.to_string())
    }
}

/// Names of the fields every record must carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSchema {
    pub id_field: String,
    pub timestamp_field: String,
}

impl Default for RecordSchema {
    fn default() -> Self {
        Self {
            id_field: "Id".to_string(),
            timestamp_field: "LastModifiedDate".to_string(),
        }
    }
}

impl RecordSchema {
    pub fn new(id_field: impl Into<String>, timestamp_field: impl Into<String>) -> Self {
        Self {
            id_field: id_field.into(),
            timestamp_field: timestamp_field.into(),
        }
    }
}

/// An ordered field map. Field order is the order in which fields were first set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    fields: Vec<(String, FieldValue)>,
}

impl Record {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FieldValue>,
    {
        let mut record = Record::new();
        for (name, value) in pairs {
            record.set(name, value);
        }
        record
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Overwrites an existing field in place or appends a new one.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(field, _)| *field == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn contains_field(&self, name: &str) -> bool {
        self.fields.iter().any(|(field, _)| field == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut FieldValue)> {
        self.fields
            .iter_mut()
            .map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn id(&self, schema: &RecordSchema) -> Option<RecordId> {
        self.get(&schema.id_field)
            .and_then(FieldValue::as_key_part)
            .map(RecordId)
    }

    pub fn timestamp(&self, schema: &RecordSchema) -> Option<NaiveDateTime> {
        self.get(&schema.timestamp_field)
            .and_then(FieldValue::as_timestamp)
    }

    /// The raw timestamp value when one is present but cannot be read as a
    /// date or datetime. Such a record ranks as if it had no timestamp.
    pub fn unreadable_timestamp(&self, schema: &RecordSchema) -> Option<&FieldValue> {
        self.get(&schema.timestamp_field)
            .filter(|value| !value.is_empty() && value.as_timestamp().is_none())
    }
}

impl TryFrom<JsonValue> for Record {
    type Error = anyhow::Error;

    fn try_from(value: JsonValue) -> Result<Self, Self::Error> {
        match value {
            JsonValue::Object(map) => Ok(Record {
                fields: map
                    .into_iter()
                    .map(|(name, value)| (name, FieldValue::from(value)))
                    .collect(),
            }),
            other => Err(anyhow::anyhow!(
                "Expected a JSON object for a record, got: {}",
                other
            )),
        }
    }
}
