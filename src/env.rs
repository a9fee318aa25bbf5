use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::AppError;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://lol_improve.db?mode=rwc";
pub const DEFAULT_KEMONO_API_URL: &str = "https://kemono.su/api/v1";
pub const DEFAULT_KEMONO_FILE_URL: &str = "https://kemono.su";
pub const DEFAULT_KEMONO_PAGE_SIZE: usize = 50;
pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 30;

pub fn load_environment() -> Result<(), Box<dyn std::error::Error>> {
    let is_production =
        dotenvy::var("ROCKET_PROFILE").unwrap_or("development".to_string()) == "production";

    let env_files = if is_production {
        vec!["config/common.env", "config/prod.env", ".secrets.env"]
    } else {
        vec!["config/common.env", "config/dev.env", ".secrets.env"]
    };

    for env_file in env_files {
        load_env_file(env_file)?;
    }

    Ok(())
}

fn load_env_file(path: &str) -> Result<(), Box<dyn std::error::Error>> {
    if !Path::new(path).exists() {
        warn!("Warning: Environment file {} not found, skipping", path);
        return Ok(());
    }

    dotenvy::from_filename_override(path)?;
    info!("Loaded environment from: {}", path);
    Ok(())
}

/// Settings shared by the server and the import scripts.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub database_url: String,
    pub kemono_api_url: String,
    pub kemono_file_url: String,
    pub kemono_page_size: usize,
    pub category_table_path: Option<PathBuf>,
    pub token_ttl_minutes: i64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            kemono_api_url: DEFAULT_KEMONO_API_URL.to_string(),
            kemono_file_url: DEFAULT_KEMONO_FILE_URL.to_string(),
            kemono_page_size: DEFAULT_KEMONO_PAGE_SIZE,
            category_table_path: None,
            token_ttl_minutes: DEFAULT_TOKEN_TTL_MINUTES,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let defaults = Self::default();

        let kemono_page_size = match dotenvy::var("KEMONO_PAGE_SIZE") {
            Ok(raw) => parse_positive("KEMONO_PAGE_SIZE", &raw)? as usize,
            Err(_) => defaults.kemono_page_size,
        };

        let token_ttl_minutes = match dotenvy::var("TOKEN_TTL_MINUTES") {
            Ok(raw) => parse_positive("TOKEN_TTL_MINUTES", &raw)?,
            Err(_) => defaults.token_ttl_minutes,
        };

        let category_table_path = dotenvy::var("CATEGORY_TABLE_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            database_url: dotenvy::var("DATABASE_URL").unwrap_or(defaults.database_url),
            kemono_api_url: trim_slash(
                dotenvy::var("KEMONO_API_URL").unwrap_or(defaults.kemono_api_url),
            ),
            kemono_file_url: trim_slash(
                dotenvy::var("KEMONO_FILE_URL").unwrap_or(defaults.kemono_file_url),
            ),
            kemono_page_size,
            category_table_path,
            token_ttl_minutes,
        })
    }
}

fn parse_positive(name: &str, raw: &str) -> Result<i64, AppError> {
    match raw.trim().parse::<i64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(AppError::Validation(format!(
            "{} must be a positive integer, got '{}'",
            name, raw
        ))),
    }
}

fn trim_slash(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
