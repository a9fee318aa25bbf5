use anyhow::{Context, Result, anyhow};
use lol_improve::db::{AdminProvision, connect, provision_admin};
use lol_improve::env::{AppConfig, load_environment};
use lol_improve::telemetry::init_tracing;

fn required(name: &str) -> Result<String> {
    dotenvy::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .with_context(|| format!("{} must be set", name))
}

#[tokio::main]
async fn main() -> Result<()> {
    load_environment().map_err(|err| anyhow!("{}", err))?;
    let _otel_guard = init_tracing();

    let username = required("ADMIN_USERNAME")?;
    let email = required("ADMIN_EMAIL")?;
    let password = required("ADMIN_PASSWORD")?;

    let config = AppConfig::from_env()?;
    let pool = connect(&config.database_url).await?;

    match provision_admin(&pool, &username, &email, &password).await? {
        AdminProvision::Created(id) => println!("Created admin {} (ID: {})", username, id),
        AdminProvision::Promoted(id) => println!("Promoted {} to admin (ID: {})", username, id),
        AdminProvision::Unchanged(id) => println!("{} is already an admin (ID: {})", username, id),
    }

    Ok(())
}
