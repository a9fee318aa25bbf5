use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use lol_improve::env::{AppConfig, load_environment};
use lol_improve::import::{
    CategoryTable, ContentSource, DEFAULT_SERVICE, KemonoClient, KemonoPost, normalize,
};
use lol_improve::telemetry::init_tracing;
use serde::Serialize;
use tracing::info;

/// Dumps a kemono creator feed to spreadsheets without touching the database.
#[derive(Parser, Debug)]
#[command(name = "kemono_export", version)]
struct Cli {
    /// Remote creator account id
    creator_id: String,
    #[arg(long, default_value = DEFAULT_SERVICE)]
    service: String,
    /// Directory for the cached feed and the CSV files
    #[arg(long, default_value = ".")]
    out: PathBuf,
    /// Fetch the feed again even when a cached copy exists
    #[arg(long, default_value_t = false)]
    refresh: bool,
}

#[derive(Serialize)]
struct ContentRow<'a> {
    #[serde(rename = "Added Date")]
    added_date: &'a str,
    #[serde(rename = "Title")]
    title: &'a str,
    #[serde(rename = "Content")]
    content: String,
    #[serde(rename = "Video URL")]
    video_url: String,
    #[serde(rename = "Published Date")]
    published_date: &'a str,
    #[serde(rename = "Tags")]
    tags: String,
    #[serde(rename = "Description")]
    description: &'a str,
    #[serde(rename = "ID")]
    id: &'a str,
}

#[derive(Serialize)]
struct CategoryRow<'a> {
    #[serde(rename = "Title")]
    title: &'a str,
    #[serde(rename = "Published Date")]
    published_date: &'a str,
    #[serde(rename = "Key Points")]
    key_points: String,
    #[serde(rename = "Video URL")]
    video_url: String,
}

async fn load_feed(cli: &Cli, client: &KemonoClient) -> Result<Vec<KemonoPost>> {
    let cache = cli.out.join(format!("{}.json", slug(&cli.creator_id)));

    if cache.exists() && !cli.refresh {
        info!(path = %cache.display(), "Loading cached feed");
        let raw = fs::read_to_string(&cache)
            .with_context(|| format!("reading {}", cache.display()))?;
        return serde_json::from_str(&raw).with_context(|| format!("parsing {}", cache.display()));
    }

    let posts = client.fetch_all(&cli.creator_id, &cli.service).await;
    fs::write(&cache, serde_json::to_string_pretty(&posts)?)
        .with_context(|| format!("writing {}", cache.display()))?;
    info!(path = %cache.display(), posts = posts.len(), "Cached feed");

    Ok(posts)
}

fn slug(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

fn embed_description(post: &KemonoPost) -> &str {
    post.embed
        .as_ref()
        .and_then(|embed| embed.description.as_deref())
        .unwrap_or_default()
}

fn date_part(timestamp: &str) -> &str {
    timestamp.split('T').next().unwrap_or_default()
}

fn write_csv<T: Serialize>(path: &Path, rows: impl IntoIterator<Item = T>) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    load_environment().map_err(|err| anyhow!("{}", err))?;
    let _otel_guard = init_tracing();

    let config = AppConfig::from_env()?;
    let table = CategoryTable::load_or_embedded(config.category_table_path.as_deref())?;
    let client = KemonoClient::from_config(&config)?;

    fs::create_dir_all(&cli.out).with_context(|| format!("creating {}", cli.out.display()))?;

    let posts = load_feed(&cli, &client).await?;
    let base_url = client.file_base_url();

    let stem = slug(&cli.creator_id);
    let content_path = cli.out.join(format!("{}_content.csv", stem));
    write_csv(
        &content_path,
        posts.iter().map(|post| {
            let video = normalize(post, base_url);
            ContentRow {
                added_date: post.added.as_deref().unwrap_or_default(),
                title: post.title(),
                content: video.key_points,
                video_url: video.url,
                published_date: post.published.as_deref().unwrap_or_default(),
                tags: video.tags.join(", "),
                description: embed_description(post),
                id: post.id.as_deref().unwrap_or_default(),
            }
        }),
    )?;
    println!("Wrote {} posts to {}", posts.len(), content_path.display());

    for (category, members) in table.categorize(posts) {
        let path = cli.out.join(format!("{}_{}.csv", stem, slug(&category)));
        write_csv(
            &path,
            members.iter().map(|post| {
                let video = normalize(post, base_url);
                CategoryRow {
                    title: post.title(),
                    published_date: date_part(post.published.as_deref().unwrap_or_default()),
                    key_points: embed_description(post).replace("\n\n", "\n").trim().to_string(),
                    video_url: video.url,
                }
            }),
        )?;
        println!("  {}: {} posts -> {}", category, members.len(), path.display());
    }

    Ok(())
}
