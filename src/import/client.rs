use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderValue};
use tracing::{info, instrument, warn};

use crate::env::AppConfig;
use crate::error::AppError;

use super::normalize::KemonoPost;

/// A remote feed of posts for one creator account.
#[rocket::async_trait]
pub trait ContentSource: Send + Sync {
    /// Every post the source will hand out. Never fails: a broken page ends
    /// pagination and whatever was collected so far is returned.
    async fn fetch_all(&self, account_id: &str, service: &str) -> Vec<KemonoPost>;

    /// Prefix that turns a relative file path into a download URL.
    fn file_base_url(&self) -> &str;
}

pub type ContentSourceHandle = Arc<dyn ContentSource>;

#[derive(Debug, Clone)]
pub struct KemonoClient {
    http: reqwest::Client,
    api_url: String,
    file_url: String,
    page_size: usize,
}

impl KemonoClient {
    pub fn new(api_url: &str, file_url: &str, page_size: usize) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            file_url: file_url.trim_end_matches('/').to_string(),
            page_size: page_size.max(1),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        Self::new(
            &config.kemono_api_url,
            &config.kemono_file_url,
            config.kemono_page_size,
        )
    }

    #[instrument(skip(self))]
    pub async fn fetch_page(
        &self,
        account_id: &str,
        service: &str,
        offset: usize,
    ) -> Result<Vec<KemonoPost>, AppError> {
        let url = format!("{}/{}/user/{}", self.api_url, service, account_id);

        let response = self
            .http
            .get(&url)
            .query(&[("o", offset)])
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .send()
            .await?
            .error_for_status()?;

        let body = response.text().await?;
        let posts: Vec<KemonoPost> = serde_json::from_str(&body).map_err(|err| {
            AppError::ExternalService(format!("malformed page at offset {}: {}", offset, err))
        })?;

        Ok(posts)
    }
}

#[rocket::async_trait]
impl ContentSource for KemonoClient {
    #[instrument(skip(self))]
    async fn fetch_all(&self, account_id: &str, service: &str) -> Vec<KemonoPost> {
        collect_pages(self.page_size, move |offset| {
            self.fetch_page(account_id, service, offset)
        })
        .await
    }

    fn file_base_url(&self) -> &str {
        &self.file_url
    }
}

/// Walks an offset-paginated listing until a page comes back empty. A failed
/// page is logged and ends the walk with the items gathered so far.
pub async fn collect_pages<T, F, Fut>(page_size: usize, mut fetch_page: F) -> Vec<T>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<Vec<T>, AppError>>,
{
    let mut items = Vec::new();
    let mut offset = 0;

    loop {
        match fetch_page(offset).await {
            Ok(page) if page.is_empty() => break,
            Ok(page) => {
                info!(offset, count = page.len(), "Fetched page");
                items.extend(page);
                offset += page_size;
            }
            Err(err) => {
                warn!(offset, error = %err, collected = items.len(), "Stopping pagination after failed page");
                break;
            }
        }
    }

    items
}
