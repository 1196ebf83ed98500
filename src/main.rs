// src/main.rs
use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use dedupe_lib::consolidation::Consolidator;
use dedupe_lib::models::record::Record;
use dedupe_lib::models::stats_models::ConsolidationStats;
use dedupe_lib::reports::decision_log::{summarize, write_decision_log};
use dedupe_lib::source::{Criteria, InMemorySource, PgRecordSource, RecordSource};
use dedupe_lib::table::{highlight, load_duplicate_ids, write_consolidation, write_table, Highlight};
use dedupe_lib::utils::db_connect::{connect, get_pool_status};
use dedupe_lib::utils::env::load_env;
use dedupe_lib::utils::get_memory_usage;
use dedupe_lib::utils::progress_bars::logging::ConsolidationLogger;
use dedupe_lib::utils::progress_bars::progress_config::ProgressConfig;
use dedupe_lib::utils::run_config::ConsolidationConfig;
use dedupe_lib::utils::signature::fingerprint_results;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use std::path::PathBuf;
use std::time::Instant;
use uuid::Uuid;

#[derive(Parser)]
#[command(author, version, about = "Consolidates duplicate customer records sharing a tax id", long_about = None)]
struct Args {
    /// CSV export to consolidate. Reads the configured PostgreSQL table when omitted
    #[arg(long)]
    input: Option<PathBuf>,

    /// Only consolidate the ids listed in this CSV
    #[arg(long)]
    ids_file: Option<PathBuf>,

    /// Column of --ids-file holding the ids
    #[arg(long, default_value = "Id")]
    id_column: String,

    /// Where the consolidated records are written
    #[arg(long, default_value = "data/consolidated_accounts.csv")]
    output: PathBuf,

    /// Comma-separated duplicate key fields (overrides DEDUPE_KEY_FIELDS)
    #[arg(long, value_delimiter = ',')]
    key_fields: Option<Vec<String>>,

    /// Write every survivor comparison to this JSON-lines file
    #[arg(long)]
    decision_log: Option<PathBuf>,

    /// Add the Highlight colour column to the output
    #[arg(long)]
    highlight: bool,

    /// Write groups that could not be consolidated to this CSV
    #[arg(long)]
    failures: Option<PathBuf>,
}

async fn update_main_pb_message(pb: &ProgressBar, phase: &str, config: &ProgressConfig) {
    if config.should_show_memory() {
        let memory_mb = get_memory_usage().await;
        pb.set_message(format!("{} (Memory: {} MB)", phase, memory_mb));
    } else {
        pb.set_message(phase.to_string());
    }
}

async fn open_source(args: &Args, config: &ConsolidationConfig) -> Result<Box<dyn RecordSource>> {
    match &args.input {
        Some(path) => Ok(Box::new(
            InMemorySource::from_table(path, config.schema())
                .with_context(|| format!("Failed to load {}", path.display()))?,
        )),
        None => {
            let pool = connect().await.context("Failed to connect to database")?;
            let (total, idle, in_use) = get_pool_status(&pool);
            info!("DB pool: {} connections ({} idle, {} in use)", total, idle, in_use);
            Ok(Box::new(PgRecordSource::new(
                pool,
                config.source_table.clone(),
                config.schema(),
            )?))
        }
    }
}

async fn load_records(args: &Args, source: &dyn RecordSource) -> Result<Vec<Record>> {
    match &args.ids_file {
        Some(ids_path) => {
            let ids = load_duplicate_ids(ids_path, &args.id_column)?;
            source.fetch_by_ids(&ids).await
        }
        None => source.list_all(&Criteria::all()).await,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    load_env();
    let args = Args::parse();

    let mut config = ConsolidationConfig::from_env().with_key_fields(args.key_fields.clone());
    if args.decision_log.is_some() {
        config.decision_log = true;
    }
    config.log_config();

    let progress_config = ProgressConfig::from_env();
    info!(
        "Progress tracking: enabled={}, detailed={}",
        progress_config.enabled, progress_config.detailed
    );
    let multi_progress = progress_config.create_multi_progress();

    let main_pb = multi_progress.as_ref().map(|mp| {
        let pb = mp.add(ProgressBar::new(3));
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("█▉▊▋▌▍▎▏  "));
        }
        pb.set_message("Initializing...");
        pb
    });

    let logger = ConsolidationLogger::consolidation();
    let run_id = Uuid::new_v4().to_string();
    let run_timestamp = Utc::now().naive_utc();
    let description = format!("Consolidation on key {}", config.key_fields.join(", "));
    let mut stats = ConsolidationStats::new(&run_id, run_timestamp, Some(&description));
    logger.log_start(&run_id, &config.key_fields);
    let total_start = Instant::now();

    // Phase 1: load
    if let Some(pb) = &main_pb {
        update_main_pb_message(pb, "Phase 1: Loading records", &progress_config).await;
    }
    let phase1_start = Instant::now();
    let source = open_source(&args, &config).await?;
    let records = load_records(&args, source.as_ref()).await?;
    let total_records = records.len();
    logger.log_data_loaded(total_records, &source.describe());
    if total_records == 0 {
        logger.log_warning("No records loaded, the output will be empty");
    }
    let phase1_duration = phase1_start.elapsed();
    stats.loading_time = phase1_duration.as_secs_f64();
    if let Some(pb) = &main_pb {
        pb.inc(1);
    }

    // Phase 2: consolidate
    if let Some(pb) = &main_pb {
        update_main_pb_message(pb, "Phase 2: Consolidating groups", &progress_config).await;
    }
    logger.log_phase("consolidation", Some(&format!("{} records", total_records)));
    let phase2_start = Instant::now();
    let consolidator = Consolidator::new(config.schema()).with_decision_log(config.decision_log);
    let group_pb = progress_config.add_bar(multi_progress.as_ref(), 0, "groups");
    let outcome = consolidator.consolidate_observed(records, &config.key_fields, |done, total| {
        if let Some(pb) = &group_pb {
            if pb.length() != Some(total as u64) {
                pb.set_length(total as u64);
            }
            pb.set_position(done as u64);
        }
    })?;
    if let Some(pb) = &group_pb {
        pb.finish_with_message("groups consolidated");
    }
    let phase2_duration = phase2_start.elapsed();
    stats.consolidation_time = phase2_duration.as_secs_f64();
    stats.record_outcome(total_records, &outcome);
    logger.log_group_failures(&outcome.failures);
    if let Some(pb) = &main_pb {
        pb.inc(1);
    }

    // Phase 3: write
    if let Some(pb) = &main_pb {
        update_main_pb_message(pb, "Phase 3: Writing output", &progress_config).await;
    }
    let phase3_start = Instant::now();
    let written = write_consolidation(&args.output, &outcome.results, &config.provenance_field)?;
    logger.log_output_written(&written.display().to_string(), outcome.results.len());

    if args.highlight {
        let provenance_field = config.provenance_field.clone();
        highlight(&written, |record| Highlight::for_provenance(record, &provenance_field))?;
    }
    if let Some(path) = &args.failures {
        if outcome.failures.is_empty() {
            info!("No failed groups, skipping {}", path.display());
        } else {
            let rows: Vec<Record> = outcome.failures.iter().map(|f| f.to_record()).collect();
            write_table(path, &rows)?;
            logger.log_output_written(&path.display().to_string(), rows.len());
        }
    }
    if let Some(path) = &args.decision_log {
        write_decision_log(path, &outcome.decisions)?;
        let summary = summarize(&outcome.decisions);
        info!(
            "Decision log: {} comparisons ({} replaced by newer, {} by more complete) written to {}",
            summary.comparisons,
            summary.replaced_newer,
            summary.replaced_more_complete,
            path.display()
        );
    }
    stats.fingerprint = Some(fingerprint_results(&outcome.results, &config.provenance_field)?);
    let phase3_duration = phase3_start.elapsed();
    stats.output_time = phase3_duration.as_secs_f64();
    if let Some(pb) = &main_pb {
        pb.inc(1);
        pb.finish_with_message(format!("Complete: {} survivors", stats.survivors));
    }

    logger.log_completion(&stats);
    let total_time = total_start.elapsed();
    info!("=== Consolidation Summary ===");
    info!("Run ID: {}", run_id);
    info!("Total records: {}", stats.total_records);
    info!("Total groups: {}", stats.total_groups);
    info!("Merged groups: {}", stats.merged_groups);
    info!("Survivors written: {}", stats.survivors);
    info!("Discarded records: {}", stats.discarded);
    info!("Failed groups: {}", stats.failed_groups);
    info!("Fields backfilled: {}", stats.fields_backfilled);
    info!("Unreadable timestamps: {}", stats.unreadable_timestamps);
    if let Some(fingerprint) = &stats.fingerprint {
        info!("Survivor fingerprint: {}", fingerprint);
    }
    info!("=== Timing Breakdown ===");
    info!("Phase 1 (Loading): {:.2?}", phase1_duration);
    info!("Phase 2 (Consolidation): {:.2?}", phase2_duration);
    info!("Phase 3 (Output): {:.2?}", phase3_duration);
    info!(
        "Total execution time: {:.2?} ({:.2}s in phases)",
        total_time,
        stats.total_processing_time()
    );
    if progress_config.should_show_memory() {
        info!("Final memory usage: {} MB", get_memory_usage().await);
    }
    info!("Consolidation completed successfully!");
    Ok(())
}
