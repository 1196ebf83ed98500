// src/bin/verify_existence.rs
use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::path::PathBuf;

use dedupe_lib::reports::existence::verify_existence;
use dedupe_lib::source::{Criteria, InMemorySource, PgRecordSource, RecordSource};
use dedupe_lib::table::{read_table, write_table};
use dedupe_lib::utils::db_connect::connect;
use dedupe_lib::utils::env::load_env;
use dedupe_lib::utils::run_config::ConsolidationConfig;

#[derive(Parser)]
#[command(author, version, about = "Checks which ids of a table still exist in the system of record", long_about = None)]
struct VerifyArgs {
    /// Table whose ids are checked
    #[arg(long)]
    table: PathBuf,

    /// Column of --table holding the ids
    #[arg(long, default_value = "Account_18_Digit_ID__c")]
    id_column: String,

    /// CSV export standing in for the system of record. Reads the configured
    /// PostgreSQL table when omitted
    #[arg(long)]
    source: Option<PathBuf>,

    /// Fields of the system of record kept in the new-records file
    #[arg(long, value_delimiter = ',', default_value = "Id,Name")]
    new_record_fields: Vec<String>,

    #[arg(long, default_value = "data/verified_ids.csv")]
    output: PathBuf,

    #[arg(long, default_value = "data/new_records.csv")]
    new_records: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    load_env();
    let args = VerifyArgs::parse();
    let config = ConsolidationConfig::from_env();
    let schema = config.schema();

    let source: Box<dyn RecordSource> = match &args.source {
        Some(path) => Box::new(InMemorySource::from_table(path, schema.clone())?),
        None => {
            let pool = connect().await.context("Failed to connect to database")?;
            Box::new(PgRecordSource::new(pool, config.source_table.clone(), schema.clone())?)
        }
    };

    let table_rows = read_table(&args.table)?;
    if let Some(first) = table_rows.first() {
        if !first.contains_field(&args.id_column) {
            anyhow::bail!(
                "Column '{}' not found in {}",
                args.id_column,
                args.table.display()
            );
        }
    }
    let source_records = source.list_all(&Criteria::all()).await?;
    info!(
        "Verifying {} rows of {} against {} records from {}",
        table_rows.len(),
        args.table.display(),
        source_records.len(),
        source.describe()
    );

    let report = verify_existence(table_rows, &args.id_column, &source_records, &schema);
    let written = write_table(&args.output, &report.annotated)?;
    info!(
        "{} of {} ids no longer exist. Results saved to {}",
        report.missing_count(),
        report.annotated.len(),
        written.display()
    );

    let projection = Criteria::all().with_fields(args.new_record_fields.iter().cloned());
    let new_records: Vec<_> = report
        .new_records
        .into_iter()
        .map(|r| projection.project(r))
        .collect();
    let written = write_table(&args.new_records, &new_records)?;
    info!("{} new records saved to {}", new_records.len(), written.display());
    Ok(())
}
