use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::sqlite::SqliteConnectOptions;
use tracing::{info, instrument};

use crate::error::AppError;

pub mod categories;
pub mod champion_pools;
pub mod creators;
pub mod game_sessions;
pub mod goals;
pub mod progress;
pub mod sessions;
pub mod users;
pub mod videos;

pub use categories::*;
pub use champion_pools::*;
pub use creators::*;
pub use game_sessions::*;
pub use goals::*;
pub use progress::*;
pub use sessions::*;
pub use users::*;
pub use videos::*;

/// Opens the database, creating the file if needed, and applies pending
/// migrations.
#[instrument]
pub async fn connect(database_url: &str) -> Result<SqlitePool, AppError> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    let pool = SqlitePool::connect_with(options).await?;

    info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Migrations completed successfully");

    Ok(pool)
}
