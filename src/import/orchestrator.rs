use indexmap::IndexMap;
use serde::Serialize;
use sqlx::{Pool, Sqlite};
use tracing::{error, info, instrument};

use super::backfill::backfill_creators;
use super::categories::{CategoryResolver, CategoryTable};
use super::client::ContentSource;
use super::normalize::{NormalizedVideo, normalize};
use crate::db::{
    find_video_by_title_and_url, insert_imported_video, list_categories, set_video_category,
    uncategorized_videos,
};
use crate::error::AppError;
use crate::models::Video;

pub const DEFAULT_SERVICE: &str = "patreon";

#[derive(Debug, Clone, Serialize)]
pub struct ImportOutcome {
    pub total: usize,
    pub imported: usize,
    pub skipped: usize,
    pub videos: Vec<Video>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub total_videos: usize,
    pub imported_videos: usize,
    pub skipped_videos: usize,
    pub videos: Vec<Video>,
    pub creators_processed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecategorizeReport {
    pub message: String,
    pub total_videos: usize,
    pub updated_videos: usize,
}

/// Where a run of the import pipeline reads from and writes to.
#[derive(Clone, Copy)]
pub struct Importer<'a> {
    pub pool: &'a Pool<Sqlite>,
    pub source: &'a dyn ContentSource,
    pub table: &'a CategoryTable,
}

impl<'a> Importer<'a> {
    pub fn new(
        pool: &'a Pool<Sqlite>,
        source: &'a dyn ContentSource,
        table: &'a CategoryTable,
    ) -> Self {
        Self {
            pool,
            source,
            table,
        }
    }

    async fn resolver(
        &self,
        mapping: Option<&IndexMap<String, i64>>,
    ) -> Result<CategoryResolver, AppError> {
        let persisted = list_categories(self.pool).await?;
        let derived = CategoryResolver::derived(self.table, &persisted);

        match mapping.filter(|mapping| !mapping.is_empty()) {
            Some(mapping) => Ok(CategoryResolver::explicit(mapping).followed_by(derived)),
            None => Ok(derived),
        }
    }

    /// Fetches every post for the account and stores the new ones. Each video
    /// is committed on its own, so an error leaves earlier inserts in place.
    #[instrument(skip(self, mapping))]
    pub async fn import_from(
        &self,
        account_id: &str,
        service: &str,
        mapping: Option<&IndexMap<String, i64>>,
    ) -> Result<ImportOutcome, AppError> {
        let posts = self.source.fetch_all(account_id, service).await;
        let total = posts.len();
        info!(total, "Fetched posts for import");

        let resolver = self.resolver(mapping).await?;
        let mut skipped = 0;
        let mut videos = Vec::new();

        for post in &posts {
            let video = normalize(post, self.source.file_base_url());

            if video.is_skippable() {
                skipped += 1;
                continue;
            }

            if find_video_by_title_and_url(self.pool, &video.title, &video.url)
                .await?
                .is_some()
            {
                skipped += 1;
                continue;
            }

            let category_id = resolver.resolve(&video.title);
            videos.push(insert_imported_video(self.pool, &video, category_id).await?);
        }

        let imported = videos.len();
        info!(total, imported, skipped, "Import finished");

        Ok(ImportOutcome {
            total,
            imported,
            skipped,
            videos,
        })
    }

    /// Import followed by creator backfill when anything new arrived. A failed
    /// backfill does not fail the import.
    #[instrument(skip(self, mapping))]
    pub async fn run(
        &self,
        account_id: &str,
        service: &str,
        mapping: Option<&IndexMap<String, i64>>,
        backfill: bool,
    ) -> Result<ImportReport, AppError> {
        let outcome = self.import_from(account_id, service, mapping).await?;

        let creators_processed = if backfill && outcome.imported > 0 {
            match backfill_creators(self.pool).await {
                Ok(_) => true,
                Err(err) => {
                    error!(error = %err, "Creator backfill after import failed");
                    false
                }
            }
        } else {
            false
        };

        Ok(ImportReport {
            total_videos: outcome.total,
            imported_videos: outcome.imported,
            skipped_videos: outcome.skipped,
            videos: outcome.videos,
            creators_processed,
        })
    }

    /// Fetched posts grouped by category and normalized; nothing is stored.
    #[instrument(skip(self))]
    pub async fn preview(
        &self,
        account_id: &str,
        service: &str,
    ) -> IndexMap<String, Vec<NormalizedVideo>> {
        let posts = self.source.fetch_all(account_id, service).await;
        let base_url = self.source.file_base_url();

        self.table
            .categorize(posts)
            .into_iter()
            .map(|(category, posts)| {
                let videos = posts.iter().map(|post| normalize(post, base_url)).collect();
                (category, videos)
            })
            .collect()
    }
}

/// Assigns a category to every stored video that has none, using the keyword
/// table joined with the persisted categories.
#[instrument(skip(pool, table))]
pub async fn recategorize_uncategorized(
    pool: &Pool<Sqlite>,
    table: &CategoryTable,
) -> Result<RecategorizeReport, AppError> {
    let persisted = list_categories(pool).await?;
    let resolver = CategoryResolver::derived(table, &persisted);

    let videos = uncategorized_videos(pool).await?;
    let mut updated = 0;

    for (video_id, title) in &videos {
        if let Some(category_id) = resolver.resolve(title) {
            set_video_category(pool, *video_id, category_id).await?;
            updated += 1;
        }
    }

    info!(total = videos.len(), updated, "Recategorized videos");

    Ok(RecategorizeReport {
        message: format!("Updated categories for {} videos", updated),
        total_videos: videos.len(),
        updated_videos: updated,
    })
}
