//! Resource Indexer Main Entry Point
//!
//! Indexes, validates or describes one resource file.

mod cli;

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use dotenv::dotenv;
use resource_indexer::schema::{SchemaStore, TypeInferencer};
use resource_indexer::source::{CsvSource, TabularSource};
use resource_indexer::validator::{ensure_passed, Validator};
use resource_indexer::{Dependencies, IndexerConfig, IndexingError, IngestError};
use resource_indexer_shared::{ResourceRef, Schema};
use std::env;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cli::{Cli, Command, IndexArgs, SchemaArgs, ValidateArgs};

/// Initialize tracing/logging.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("resource_indexer=info,resource_indexer_repository=info")
    });

    let json = env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .pretty()
                    .with_writer(std::io::stderr),
            )
            .init();
    }

    info!(
        service_name = "resource-indexer",
        service_version = env!("CARGO_PKG_VERSION"),
        json,
        "Tracing initialized"
    );
}

fn read_schema(path: &Path) -> Result<Schema, IndexingError> {
    let text = std::fs::read_to_string(path).map_err(IngestError::from)?;
    serde_json::from_str(&text).map_err(|e| {
        IndexingError::from(IngestError::schema_override(format!(
            "{}: {}",
            path.display(),
            e
        )))
    })
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), IndexingError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| IndexingError::config(format!("Failed to serialize output: {}", e)))?;
    println!("{}", text);
    Ok(())
}

async fn run_index(config: IndexerConfig, args: IndexArgs) -> Result<(), IndexingError> {
    let source: Arc<dyn TabularSource> = Arc::new(CsvSource::open(&args.file)?);
    let schema = args.schema.as_deref().map(read_schema).transpose()?;

    let deps = Dependencies::new(config).await?;
    info!("Dependencies initialized successfully");

    let mut job = deps
        .job(ResourceRef::new(args.resource_id, args.title), source)
        .with_special_signs(&args.special_signs);
    if let Some(schema) = schema {
        job = job.with_schema(schema);
    }

    let summary = job.index(args.force, args.chunk_size).await?;
    print_json(&summary)
}

fn run_validate(config: IndexerConfig, args: ValidateArgs) -> Result<(), IndexingError> {
    let source: Arc<dyn TabularSource> = Arc::new(CsvSource::open(&args.file)?);
    let missing_values = config.job.missing_values.resolve(&args.special_signs);
    let mut store = SchemaStore::new(
        source.clone(),
        TypeInferencer::new(config.job.inference.clone()),
        missing_values.clone(),
    );
    if let Some(path) = args.schema.as_deref() {
        store = store.with_override(read_schema(path)?);
    }

    let report = Validator::new(config.job.validator)
        .validate_resource(&mut store, source.as_ref(), &missing_values)?;
    print_json(&report)?;
    Ok(ensure_passed(&report)?)
}

fn run_schema(config: IndexerConfig, args: SchemaArgs) -> Result<(), IndexingError> {
    let source: Arc<dyn TabularSource> = Arc::new(CsvSource::open(&args.file)?);
    let mut store = SchemaStore::new(
        source,
        TypeInferencer::new(config.job.inference.clone()),
        config.job.missing_values.resolve::<&str>(&[]),
    );
    let schema = store.get_schema(args.aliases, false)?;
    print_json(&schema)
}

#[tokio::main]
async fn main() -> Result<(), IndexingError> {
    // Load environment variables from .env file
    dotenv().ok();

    let cli = Cli::parse();
    init_tracing();

    let config = IndexerConfig::from_env();

    let result = match cli.command {
        Command::Index(args) => run_index(config, args).await,
        Command::Validate(args) => run_validate(config, args),
        Command::Schema(args) => run_schema(config, args),
    };

    if let Err(e) = &result {
        error!(error = %e, "Resource indexer failed");
    }
    result
}
