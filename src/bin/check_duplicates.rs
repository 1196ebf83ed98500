// src/bin/check_duplicates.rs
use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use std::path::PathBuf;

use dedupe_lib::reports::duplicates::{duplicate_report_rows, find_duplicate_keys};
use dedupe_lib::source::{Criteria, InMemorySource, PgRecordSource, RecordSource};
use dedupe_lib::table::write_table;
use dedupe_lib::utils::db_connect::connect;
use dedupe_lib::utils::env::load_env;
use dedupe_lib::utils::run_config::ConsolidationConfig;

#[derive(Parser)]
#[command(author, version, about = "Lists records that share a duplicate key", long_about = None)]
struct CheckArgs {
    /// CSV export to scan. Reads the configured PostgreSQL table when omitted
    #[arg(long)]
    input: Option<PathBuf>,

    /// Comma-separated duplicate key fields (overrides DEDUPE_KEY_FIELDS)
    #[arg(long, value_delimiter = ',')]
    key_fields: Option<Vec<String>>,

    /// Where the duplicate report is written
    #[arg(long, default_value = "data/duplicate_accounts.csv")]
    output: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    load_env();
    let args = CheckArgs::parse();

    let config = ConsolidationConfig::from_env().with_key_fields(args.key_fields.clone());
    config.log_config();

    let source: Box<dyn RecordSource> = match &args.input {
        Some(path) => Box::new(InMemorySource::from_table(path, config.schema())?),
        None => {
            let pool = connect().await.context("Failed to connect to database")?;
            Box::new(PgRecordSource::new(pool, config.source_table.clone(), config.schema())?)
        }
    };

    info!("Checking {} for duplicate keys {:?}", source.describe(), config.key_fields);
    let records = source.list_all(&Criteria::all()).await?;
    let duplicates = find_duplicate_keys(&records, &config.key_fields, &config.schema())?;

    if duplicates.is_empty() {
        info!("No duplicated records found.");
        return Ok(());
    }
    let missing_ids: usize = duplicates.iter().map(|d| d.count - d.ids.len()).sum();
    if missing_ids > 0 {
        warn!("{} duplicated records have no id and are left out of the report", missing_ids);
    }

    let rows = duplicate_report_rows(&duplicates, &config.key_fields);
    let written = write_table(&args.output, &rows)?;
    info!(
        "{} duplicated keys ({} records) saved to {}",
        duplicates.len(),
        rows.len(),
        written.display()
    );
    Ok(())
}
