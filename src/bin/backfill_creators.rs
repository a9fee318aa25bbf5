use anyhow::{Result, anyhow};
use lol_improve::db::connect;
use lol_improve::env::{AppConfig, load_environment};
use lol_improve::import::backfill_creators;
use lol_improve::telemetry::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    load_environment().map_err(|err| anyhow!("{}", err))?;
    let _otel_guard = init_tracing();

    let config = AppConfig::from_env()?;
    let pool = connect(&config.database_url).await?;

    let creators = backfill_creators(&pool).await?;

    println!("Processed {} creators:", creators.len());
    for creator in creators {
        println!("  - {} (ID: {})", creator.name, creator.id);
    }

    Ok(())
}
