#[macro_use]
extern crate rocket;

pub mod api;
pub mod auth;
pub mod db;
pub mod env;
pub mod error;
pub mod import;
pub mod models;
pub mod telemetry;
pub mod validation;
#[cfg(test)]
mod test;

use rocket::{Build, Rocket};
use sqlx::SqlitePool;
use tracing::info;

use auth::{forbidden, not_found, unauthorized, unprocessable};
use env::AppConfig;
use import::{CategoryTable, ContentSourceHandle};
use telemetry::TelemetryFairing;

pub fn init_rocket(
    pool: SqlitePool,
    source: ContentSourceHandle,
    table: CategoryTable,
    config: AppConfig,
) -> Rocket<Build> {
    info!("Starting lol-improve");

    rocket::build()
        .manage(pool)
        .manage(source)
        .manage(table)
        .manage(config)
        .mount("/", api::routes())
        .register("/", catchers![unauthorized, forbidden, not_found, unprocessable])
        .attach(TelemetryFairing)
}
