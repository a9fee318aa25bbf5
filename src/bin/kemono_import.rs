use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use indexmap::IndexMap;
use lol_improve::db::connect;
use lol_improve::env::{AppConfig, load_environment};
use lol_improve::import::{CategoryTable, DEFAULT_SERVICE, Importer, KemonoClient};
use lol_improve::telemetry::init_tracing;

/// Imports every video post of a kemono creator straight into the database.
#[derive(Parser, Debug)]
#[command(name = "kemono_import", version)]
struct Cli {
    /// Remote creator account id
    creator_id: String,
    #[arg(long, default_value = DEFAULT_SERVICE)]
    service: String,
    /// JSON object of title pattern -> category id
    #[arg(long)]
    mapping: Option<PathBuf>,
    /// Skip deriving creators after the import
    #[arg(long, default_value_t = false)]
    no_backfill: bool,
}

fn read_mapping(path: &PathBuf) -> Result<IndexMap<String, i64>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading mapping file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing mapping file {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    load_environment().map_err(|err| anyhow!("{}", err))?;
    let _otel_guard = init_tracing();

    let config = AppConfig::from_env()?;
    let pool = connect(&config.database_url).await?;
    let table = CategoryTable::load_or_embedded(config.category_table_path.as_deref())?;
    let client = KemonoClient::from_config(&config)?;

    let mapping = cli.mapping.as_ref().map(read_mapping).transpose()?;

    let report = Importer::new(&pool, &client, &table)
        .run(&cli.creator_id, &cli.service, mapping.as_ref(), !cli.no_backfill)
        .await?;

    println!(
        "Fetched {} posts: {} imported, {} skipped",
        report.total_videos, report.imported_videos, report.skipped_videos
    );
    for video in &report.videos {
        println!("  + {} ({})", video.title, video.video_type);
    }
    if report.creators_processed {
        println!("Creators backfilled");
    }

    Ok(())
}
