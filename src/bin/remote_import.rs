use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use dialoguer::{Input, Password};
use lol_improve::import::DEFAULT_SERVICE;
use serde::Deserialize;
use serde_json::{Value, json};

/// Drives a running server's import endpoints with admin credentials.
#[derive(Parser, Debug)]
#[command(name = "remote_import", version)]
struct Cli {
    #[arg(long, env = "LOL_IMPROVE_API_URL", default_value = "http://localhost:8000")]
    api_url: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Commands {
    /// Import a kemono creator through /videos/kemono/import
    Import {
        creator_id: String,
        #[arg(long, default_value = DEFAULT_SERVICE)]
        service: String,
    },
    /// Derive creators from stored videos
    MigrateCreators,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct CreatorSummary {
    id: i64,
    name: String,
}

async fn login(http: &reqwest::Client, api_url: &str) -> Result<String> {
    let username: String = Input::new()
        .with_prompt("Admin username")
        .interact_text()
        .context("reading username")?;
    let password = Password::new()
        .with_prompt("Password")
        .interact()
        .context("reading password")?;

    let response = http
        .post(format!("{}/token", api_url))
        .form(&[("username", username.as_str()), ("password", password.as_str())])
        .send()
        .await
        .context("sending login request")?;

    if !response.status().is_success() {
        bail!("Login failed: {}", response.text().await.unwrap_or_default());
    }

    Ok(response.json::<TokenResponse>().await?.access_token)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let api_url = cli.api_url.trim_end_matches('/');
    let http = reqwest::Client::new();

    let token = login(&http, api_url).await?;

    match cli.command {
        Commands::Import {
            creator_id,
            service,
        } => {
            println!("Importing {} ({})...", creator_id, service);
            let response = http
                .post(format!("{}/videos/kemono/import", api_url))
                .bearer_auth(&token)
                .json(&json!({ "creator_id": creator_id, "service": service }))
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(anyhow!(
                    "Import failed: {}",
                    response.text().await.unwrap_or_default()
                ));
            }

            let report: Value = response.json().await?;
            println!(
                "Total: {}, imported: {}, skipped: {}, creators processed: {}",
                report["total_videos"],
                report["imported_videos"],
                report["skipped_videos"],
                report["creators_processed"]
            );
        }
        Commands::MigrateCreators => {
            println!("Starting creator migration...");
            let response = http
                .post(format!("{}/videos/creators/migrate-from-videos", api_url))
                .bearer_auth(&token)
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(anyhow!(
                    "Migration failed: {}",
                    response.text().await.unwrap_or_default()
                ));
            }

            let creators: Vec<CreatorSummary> = response.json().await?;
            println!("Successfully migrated {} creators:", creators.len());
            for creator in creators {
                println!("  - {} (ID: {})", creator.name, creator.id);
            }
        }
    }

    println!("Done!");
    Ok(())
}
