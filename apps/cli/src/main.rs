//! `ratiofeed` - trigger and inspect financial-ratio ingestion runs.
//!
//! Exit code is 0 when a run ends `SUCCESS` or `PARTIAL` and non-zero when
//! it ends `FAILED` or cannot start.

mod config;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use ratiofeed_core::notify::{LogNotifier, MultiNotifier, WebhookNotifier};
use ratiofeed_core::{ExecutionLog, IngestionService, Notifier};
use ratiofeed_provider::{FieldSet, HttpRatioProvider, IdentifierSet, ProviderClient, ReplayProvider};
use ratiofeed_storage_sqlite::{
    create_pool, init, run_migrations, spawn_writer, IngestionLogRepository, RecordRepository,
};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{Config, LogFormat};

#[derive(Parser, Debug)]
#[command(name = "ratiofeed", version)]
#[command(about = "Pull, reconcile, validate and store provider financial ratios")]
#[command(
    after_help = "Environment:\n  RF_DB_PATH            SQLite database file\n  RF_IDENTIFIERS_FILE   JSON list of identifiers to request\n  RF_LOG_FORMAT         json|text"
)]
struct Cli {
    /// Print results as JSON
    #[arg(long, global = true, default_value_t = false)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one ingestion
    Run {
        #[arg(long, default_value = "basic", value_parser = parse_field_set)]
        field_set: FieldSet,
        /// Who started the run (recorded in the execution log)
        #[arg(long, default_value = "manual")]
        triggered_by: String,
        /// Replay a saved provider response instead of calling the provider
        #[arg(long)]
        replay: Option<PathBuf>,
    },
    /// Show the most recent run
    Status {
        #[arg(long, value_parser = parse_field_set)]
        field_set: Option<FieldSet>,
    },
    /// List recent runs, newest first
    History {
        #[arg(long, default_value_t = 10)]
        limit: i64,
    },
}

fn parse_field_set(raw: &str) -> Result<FieldSet, String> {
    raw.parse()
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(false).with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

struct Stores {
    records: Arc<RecordRepository>,
    logs: Arc<IngestionLogRepository>,
}

fn open_stores(config: &Config) -> anyhow::Result<Stores> {
    let db_path = init(&config.db_path)?;
    tracing::info!("Database path in use: {}", db_path);
    let pool = create_pool(&db_path)?;
    run_migrations(&pool)?;
    let writer = spawn_writer((*pool).clone());
    Ok(Stores {
        records: Arc::new(RecordRepository::new(pool.clone(), writer.clone())),
        logs: Arc::new(IngestionLogRepository::new(pool, writer)),
    })
}

fn build_notifier(config: &Config) -> anyhow::Result<Arc<dyn Notifier>> {
    let mut notifiers: Vec<Arc<dyn Notifier>> = vec![Arc::new(LogNotifier)];
    if let Some(url) = &config.webhook_url {
        notifiers.push(Arc::new(WebhookNotifier::new(url)?));
    }
    Ok(Arc::new(MultiNotifier::new(notifiers)))
}

fn build_service(
    config: &Config,
    stores: Stores,
    replay: Option<PathBuf>,
) -> anyhow::Result<IngestionService> {
    let identifiers = IdentifierSet::from_json_file(&config.identifiers_file).with_context(|| {
        format!(
            "Cannot load identifiers from {}",
            config.identifiers_file.display()
        )
    })?;

    let provider: Arc<dyn ProviderClient> = match replay {
        Some(path) => Arc::new(ReplayProvider::new(path)),
        None => Arc::new(HttpRatioProvider::new(config.http_provider()?)?),
    };

    Ok(IngestionService::new(
        provider,
        identifiers,
        stores.records,
        stores.logs,
        build_notifier(config)?,
        config.pipeline.clone(),
    ))
}

fn print_log(log: &ExecutionLog, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(log)?);
        return Ok(());
    }
    println!(
        "{}  {:<8} {:<18} fetched={:<4} inserted={:<4} duplicates={:<4} invalid={:<4} new={:<4} ({} ms, by {})",
        log.start_time.format("%Y-%m-%d %H:%M:%S"),
        log.status,
        log.data_source,
        log.fetched_count,
        log.inserted_count,
        log.skipped_duplicate_count,
        log.skipped_invalid_count,
        log.new_entry_count,
        log.duration_ms(),
        log.triggered_by
    );
    if let Some(message) = &log.error_message {
        println!("    error: {}", message);
    }
    Ok(())
}

async fn execute(cli: Cli, config: Config) -> anyhow::Result<ExitCode> {
    let stores = open_stores(&config)?;

    match cli.command {
        Commands::Run {
            field_set,
            triggered_by,
            replay,
        } => {
            let service = build_service(&config, stores, replay)?;
            let log = service.run_ingestion(field_set, &triggered_by).await?;
            print_log(&log, cli.json)?;
            Ok(if log.status.is_failure() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }
        Commands::Status { field_set } => {
            use ratiofeed_core::ExecutionLogStore;
            match stores.logs.last_run(field_set)? {
                Some(log) => print_log(&log, cli.json)?,
                None => println!("No runs recorded yet"),
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::History { limit } => {
            use ratiofeed_core::ExecutionLogStore;
            let logs = stores.logs.history(limit)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&logs)?);
            } else {
                for log in &logs {
                    print_log(log, false)?;
                }
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return ExitCode::from(2);
        }
    };
    init_tracing(config.log_format);

    match execute(cli, config).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
