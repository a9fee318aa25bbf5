use std::sync::Arc;

use lol_improve::db::{clean_expired_sessions, connect};
use lol_improve::env::{AppConfig, load_environment};
use lol_improve::error::AppError;
use lol_improve::import::{CategoryTable, ContentSourceHandle, KemonoClient};
use lol_improve::init_rocket;
use lol_improve::telemetry::init_tracing;
use rocket::tokio;
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Environment(String),
    #[error("{0}")]
    Rocket(Box<rocket::Error>),
    #[error("Application error: {0}")]
    App(#[from] AppError),
}

impl From<rocket::Error> for Error {
    fn from(value: rocket::Error) -> Self {
        Error::Rocket(Box::new(value))
    }
}

#[rocket::main]
async fn main() -> Result<(), Error> {
    load_environment().map_err(|err| Error::Environment(err.to_string()))?;
    let _otel_guard = init_tracing();

    let config = AppConfig::from_env()?;

    let pool = connect(&config.database_url).await?;

    let pool_clone = pool.clone();

    tokio::spawn(async move {
        tokio::time::sleep(tokio::time::Duration::from_secs(5)).await;

        loop {
            match clean_expired_sessions(&pool_clone).await {
                Ok(count) => {
                    if count > 0 {
                        info!("Cleaned up {} expired sessions", count);
                    }
                }
                Err(e) => {
                    error!("Failed to clean expired sessions: {}", e);
                }
            }

            tokio::time::sleep(tokio::time::Duration::from_secs(3600)).await;
        }
    });

    let table = CategoryTable::load_or_embedded(config.category_table_path.as_deref())
        .map_err(AppError::from)?;
    let source: ContentSourceHandle = Arc::new(KemonoClient::from_config(&config)?);

    let _rocket = init_rocket(pool, source, table, config).launch().await?;

    Ok(())
}
