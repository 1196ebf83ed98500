// src/source/postgres.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use serde_json::Value as JsonValue;
use tokio_postgres::types::ToSql;

use crate::error::ConsolidationError;
use crate::models::record::{Record, RecordId, RecordSchema};
use crate::source::{Criteria, RecordSource};
use crate::utils::db_connect::PgPool;

/// Ids sent per `= ANY($1)` query.
const ID_BATCH_SIZE: usize = 500;

/// Reads records from a PostgreSQL table. Each row is fetched as a
/// `row_to_json` document so every column maps onto a record field.
pub struct PgRecordSource {
    pool: PgPool,
    table: String,
    schema: RecordSchema,
}

/// Double-quotes a plain SQL identifier, optionally schema-qualified.
pub fn quote_ident(name: &str) -> Result<String, ConsolidationError> {
    let parts: Vec<&str> = name.split('.').collect();
    if parts.len() > 2 {
        return Err(ConsolidationError::configuration(format!(
            "identifier '{}' has too many qualifiers",
            name
        )));
    }
    let mut quoted = Vec::with_capacity(parts.len());
    for part in parts {
        let mut chars = part.chars();
        let valid = match chars.next() {
            Some(first) => {
                (first.is_ascii_alphabetic() || first == '_')
                    && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            None => false,
        };
        if !valid {
            return Err(ConsolidationError::configuration(format!(
                "'{}' is not a valid SQL identifier",
                name
            )));
        }
        quoted.push(format!("\"{}\"", part));
    }
    Ok(quoted.join("."))
}

fn select_list(fields: Option<&[String]>) -> Result<String, ConsolidationError> {
    match fields {
        None => Ok("*".to_string()),
        Some(fields) if fields.is_empty() => Ok("*".to_string()),
        Some(fields) => Ok(fields
            .iter()
            .map(|f| quote_ident(f))
            .collect::<Result<Vec<_>, _>>()?
            .join(", ")),
    }
}

/// Builds the document query for `criteria`. Filter values bind as `$1..$n`.
pub fn build_list_query(table: &str, criteria: &Criteria) -> Result<String, ConsolidationError> {
    let mut inner = format!(
        "SELECT {} FROM {}",
        select_list(criteria.fields.as_deref())?,
        quote_ident(table)?
    );
    if !criteria.filters.is_empty() {
        let predicates = criteria
            .filters
            .iter()
            .enumerate()
            .map(|(i, (field, _))| -> Result<String, ConsolidationError> {
                Ok(format!("btrim({}::text) = ${}", quote_ident(field)?, i + 1))
            })
            .collect::<Result<Vec<_>, _>>()?;
        inner.push_str(" WHERE ");
        inner.push_str(&predicates.join(" AND "));
    }
    Ok(format!("SELECT row_to_json(t) AS doc FROM ({}) t", inner))
}

/// Builds the document query fetching rows whose id is in `$1`.
pub fn build_ids_query(table: &str, id_field: &str) -> Result<String, ConsolidationError> {
    Ok(format!(
        "SELECT row_to_json(t) AS doc FROM (SELECT * FROM {} WHERE {}::text = ANY($1)) t",
        quote_ident(table)?,
        quote_ident(id_field)?
    ))
}

impl PgRecordSource {
    pub fn new(pool: PgPool, table: impl Into<String>, schema: RecordSchema) -> Result<Self> {
        let table = table.into();
        quote_ident(&table)?;
        quote_ident(&schema.id_field)?;
        Ok(Self { pool, table, schema })
    }

    async fn query_documents(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Vec<Record>> {
        let conn = self
            .pool
            .get()
            .await
            .context("Failed to get DB connection for record source")?;
        debug!("Record source query: {}", sql);
        let rows = conn
            .query(sql, params)
            .await
            .with_context(|| format!("Failed to query records from {}", self.table))?;

        rows.iter()
            .map(|row| -> Result<Record> {
                let doc: JsonValue = row.try_get("doc").context("Row is missing its JSON document")?;
                Record::try_from(doc)
            })
            .collect()
    }
}

#[async_trait]
impl RecordSource for PgRecordSource {
    fn describe(&self) -> String {
        format!("table {}", self.table)
    }

    async fn list_all(&self, criteria: &Criteria) -> Result<Vec<Record>> {
        let sql = build_list_query(&self.table, criteria)?;
        let values: Vec<String> = criteria
            .filters
            .iter()
            .map(|(_, value)| value.trim().to_string())
            .collect();
        let params: Vec<&(dyn ToSql + Sync)> =
            values.iter().map(|v| v as &(dyn ToSql + Sync)).collect();
        let records = self.query_documents(&sql, &params).await?;
        info!("Fetched {} records from {}", records.len(), self.table);
        Ok(records)
    }

    async fn fetch_by_ids(&self, ids: &[RecordId]) -> Result<Vec<Record>> {
        let sql = build_ids_query(&self.table, &self.schema.id_field)?;
        let mut records = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(ID_BATCH_SIZE) {
            let batch: Vec<String> = chunk.iter().map(|id| id.0.trim().to_string()).collect();
            records.extend(self.query_documents(&sql, &[&batch]).await?);
        }
        debug!("Fetched {} of {} requested ids from {}", records.len(), ids.len(), self.table);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("account").unwrap(), "\"account\"");
        assert_eq!(quote_ident("public.account").unwrap(), "\"public\".\"account\"");
        assert_eq!(quote_ident("NEO_Cpfcnpj__c").unwrap(), "\"NEO_Cpfcnpj__c\"");
        assert!(quote_ident("account; DROP TABLE x").is_err());
        assert!(quote_ident("a\"b").is_err());
        assert!(quote_ident("1st").is_err());
        assert!(quote_ident("").is_err());
        assert!(quote_ident("a.b.c").is_err());
    }

    #[test]
    fn test_build_list_query() {
        let sql = build_list_query("account", &Criteria::all()).unwrap();
        assert_eq!(sql, "SELECT row_to_json(t) AS doc FROM (SELECT * FROM \"account\") t");

        let criteria = Criteria::all()
            .with_fields(["Id", "NEO_Cpfcnpj__c"])
            .filter("NEO_Cpfcnpj__c", "111")
            .filter("Name", "Acme");
        let sql = build_list_query("account", &criteria).unwrap();
        assert_eq!(
            sql,
            "SELECT row_to_json(t) AS doc FROM (SELECT \"Id\", \"NEO_Cpfcnpj__c\" FROM \"account\" \
             WHERE btrim(\"NEO_Cpfcnpj__c\"::text) = $1 AND btrim(\"Name\"::text) = $2) t"
        );
    }

    #[test]
    fn test_build_queries_reject_bad_identifiers() {
        let criteria = Criteria::all().filter("x = x OR 1", "1");
        assert!(build_list_query("account", &criteria).is_err());
        assert!(build_ids_query("account", "Id\"--").is_err());
        assert_eq!(
            build_ids_query("account", "Id").unwrap(),
            "SELECT row_to_json(t) AS doc FROM (SELECT * FROM \"account\" WHERE \"Id\"::text = ANY($1)) t"
        );
    }
}
