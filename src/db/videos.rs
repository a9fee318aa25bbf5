use std::collections::HashMap;

use chrono::NaiveDateTime;
use sqlx::{Pool, QueryBuilder, Sqlite};
use tracing::{info, instrument};

use super::categories::list_categories;
use super::creators::get_creator;
use super::progress::get_progress;
use crate::error::AppError;
use crate::import::normalize::{NormalizedVideo, encode_tags};
use crate::models::{DbVideo, ProgressView, Video, VideoDetail};

const VIDEO_COLUMNS: &str = "v.id, v.title, v.creator, v.creator_relation_id, v.url, v.description, \
     v.upload_date, v.video_type, v.key_points, v.kemono_id, v.service, v.creator_id, \
     v.added_date, v.published_date, v.tags, v.category_id";

/// A video entered by hand or through the bulk JSON import.
#[derive(Debug, Clone, Default)]
pub struct NewVideo {
    pub title: String,
    pub creator: Option<String>,
    pub url: String,
    pub description: Option<String>,
    pub video_type: String,
    pub key_points: Option<String>,
    pub category_id: Option<i64>,
    pub creator_relation_id: Option<i64>,
    pub upload_date: Option<NaiveDateTime>,
    pub kemono_id: Option<String>,
    pub service: Option<String>,
    pub creator_id: Option<String>,
    pub added_date: Option<NaiveDateTime>,
    pub published_date: Option<NaiveDateTime>,
    pub tags: Vec<String>,
}

/// The fields an update body may touch. Absent fields keep their value.
#[derive(Debug, Clone, Default)]
pub struct VideoChanges {
    pub title: Option<String>,
    pub creator: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub video_type: Option<String>,
    pub key_points: Option<String>,
    pub category_id: Option<i64>,
    pub creator_relation_id: Option<i64>,
    pub upload_date: Option<NaiveDateTime>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    PublishedDate,
    Title,
    Creator,
    LastWatched,
    Id,
}

impl SortField {
    /// Unknown names sort by id.
    pub fn parse(name: &str) -> Self {
        match name {
            "published_date" => SortField::PublishedDate,
            "title" => SortField::Title,
            "creator" => SortField::Creator,
            "last_watched" => SortField::LastWatched,
            _ => SortField::Id,
        }
    }

    fn column(&self) -> &'static str {
        match self {
            SortField::PublishedDate => "v.published_date",
            SortField::Title => "v.title",
            SortField::Creator => "v.creator",
            SortField::LastWatched => "p.last_watched",
            SortField::Id => "v.id",
        }
    }
}

/// Filters shared by the listing and search endpoints.
#[derive(Debug, Clone, Default)]
pub struct VideoQuery {
    pub text: Option<String>,
    pub title: Option<String>,
    pub creator: Option<String>,
    pub creator_name: Option<String>,
    pub creator_relation_id: Option<i64>,
    pub category_id: Option<i64>,
    pub tags: Vec<String>,
    pub min_published_date: Option<NaiveDateTime>,
    pub max_published_date: Option<NaiveDateTime>,
    pub watched: Option<bool>,
    pub bookmarked: Option<bool>,
    pub sort_by: SortField,
    pub ascending: bool,
    pub skip: i64,
    pub limit: i64,
}

/// Which related rows to attach to listed videos.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expand {
    pub category: bool,
    pub creator: bool,
    pub progress: bool,
}

impl Expand {
    /// `None` attaches category and creator, as older clients expect.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            None => Self {
                category: true,
                creator: true,
                progress: false,
            },
            Some(raw) => {
                let options: Vec<&str> = raw.split(',').map(str::trim).collect();
                Self {
                    category: options.contains(&"category"),
                    creator: options.contains(&"creator"),
                    progress: options.contains(&"progress"),
                }
            }
        }
    }
}

#[instrument(skip(pool))]
pub async fn get_video(pool: &Pool<Sqlite>, id: i64) -> Result<Video, AppError> {
    info!("Getting video");

    let row = sqlx::query_as::<_, DbVideo>(&format!(
        "SELECT {} FROM video_tutorials v WHERE v.id = ?",
        VIDEO_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(video) => Ok(Video::from(video)),
        _ => Err(AppError::NotFound("Video not found".to_string())),
    }
}

#[instrument(skip(pool))]
pub async fn find_video_by_title_and_url(
    pool: &Pool<Sqlite>,
    title: &str,
    url: &str,
) -> Result<Option<Video>, AppError> {
    let row = sqlx::query_as::<_, DbVideo>(&format!(
        "SELECT {} FROM video_tutorials v WHERE v.title = ? AND v.url = ? LIMIT 1",
        VIDEO_COLUMNS
    ))
    .bind(title)
    .bind(url)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Video::from))
}

#[instrument(skip(pool, video), fields(title = %video.title))]
pub async fn insert_imported_video(
    pool: &Pool<Sqlite>,
    video: &NormalizedVideo,
    category_id: Option<i64>,
) -> Result<Video, AppError> {
    info!("Inserting imported video");

    let res = sqlx::query(
        "INSERT INTO video_tutorials
            (title, creator, url, description, upload_date, video_type, key_points,
             kemono_id, service, creator_id, added_date, published_date, tags, category_id)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&video.title)
    .bind(&video.creator)
    .bind(&video.url)
    .bind(&video.description)
    .bind(video.upload_date)
    .bind(video.video_type.as_str())
    .bind(&video.key_points)
    .bind(&video.kemono_id)
    .bind(&video.service)
    .bind(&video.creator_id)
    .bind(video.added_date)
    .bind(video.published_date)
    .bind(encode_tags(&video.tags))
    .bind(category_id)
    .execute(pool)
    .await?;

    get_video(pool, res.last_insert_rowid()).await
}

#[instrument(skip(pool, video), fields(title = %video.title))]
pub async fn create_video(pool: &Pool<Sqlite>, video: NewVideo) -> Result<Video, AppError> {
    info!("Creating video");

    let res = sqlx::query(
        "INSERT INTO video_tutorials
            (title, creator, creator_relation_id, url, description, upload_date, video_type,
             key_points, kemono_id, service, creator_id, added_date, published_date, tags, category_id)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&video.title)
    .bind(&video.creator)
    .bind(video.creator_relation_id)
    .bind(&video.url)
    .bind(&video.description)
    .bind(video.upload_date)
    .bind(&video.video_type)
    .bind(&video.key_points)
    .bind(&video.kemono_id)
    .bind(&video.service)
    .bind(&video.creator_id)
    .bind(video.added_date)
    .bind(video.published_date)
    .bind(encode_tags(&video.tags))
    .bind(video.category_id)
    .execute(pool)
    .await?;

    get_video(pool, res.last_insert_rowid()).await
}

#[instrument(skip(pool, changes))]
pub async fn update_video(
    pool: &Pool<Sqlite>,
    id: i64,
    changes: VideoChanges,
) -> Result<Video, AppError> {
    info!("Updating video");

    get_video(pool, id).await?;

    sqlx::query(
        "UPDATE video_tutorials SET
            title = COALESCE(?, title),
            creator = COALESCE(?, creator),
            url = COALESCE(?, url),
            description = COALESCE(?, description),
            video_type = COALESCE(?, video_type),
            key_points = COALESCE(?, key_points),
            category_id = COALESCE(?, category_id),
            creator_relation_id = COALESCE(?, creator_relation_id),
            upload_date = COALESCE(?, upload_date),
            tags = COALESCE(?, tags)
         WHERE id = ?",
    )
    .bind(changes.title)
    .bind(changes.creator)
    .bind(changes.url)
    .bind(changes.description)
    .bind(changes.video_type)
    .bind(changes.key_points)
    .bind(changes.category_id)
    .bind(changes.creator_relation_id)
    .bind(changes.upload_date)
    .bind(changes.tags.as_deref().map(encode_tags))
    .bind(id)
    .execute(pool)
    .await?;

    get_video(pool, id).await
}

#[instrument(skip(pool))]
pub async fn delete_video(pool: &Pool<Sqlite>, id: i64) -> Result<(), AppError> {
    info!("Deleting video");

    get_video(pool, id).await?;

    sqlx::query("DELETE FROM video_progress WHERE video_id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    sqlx::query("DELETE FROM video_tutorials WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Lists videos matching `query`; watched/bookmarked filters and the
/// last-watched sort look at `user_id`'s progress.
#[instrument(skip(pool, query))]
pub async fn search_videos(
    pool: &Pool<Sqlite>,
    user_id: i64,
    query: &VideoQuery,
) -> Result<Vec<Video>, AppError> {
    info!("Searching videos");

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
        "SELECT {} FROM video_tutorials v \
         LEFT JOIN creators c ON c.id = v.creator_relation_id \
         LEFT JOIN video_progress p ON p.video_id = v.id AND p.user_id = ",
        VIDEO_COLUMNS
    ));
    qb.push_bind(user_id);
    qb.push(" WHERE 1 = 1");

    if let Some(text) = &query.text {
        qb.push(" AND (v.title LIKE '%' || ")
            .push_bind(text.clone())
            .push(" || '%' OR v.description LIKE '%' || ")
            .push_bind(text.clone())
            .push(" || '%')");
    }
    if let Some(title) = &query.title {
        qb.push(" AND v.title LIKE '%' || ")
            .push_bind(title.clone())
            .push(" || '%'");
    }
    if let Some(creator) = &query.creator {
        qb.push(" AND v.creator = ").push_bind(creator.clone());
    }
    if let Some(creator_name) = &query.creator_name {
        qb.push(" AND c.name LIKE '%' || ")
            .push_bind(creator_name.clone())
            .push(" || '%'");
    }
    if let Some(creator_relation_id) = query.creator_relation_id {
        qb.push(" AND v.creator_relation_id = ")
            .push_bind(creator_relation_id);
    }
    if let Some(category_id) = query.category_id {
        qb.push(" AND v.category_id = ").push_bind(category_id);
    }
    for tag in &query.tags {
        qb.push(
            " AND CASE WHEN json_valid(v.tags) THEN EXISTS \
             (SELECT 1 FROM json_each(v.tags) WHERE json_each.value = ",
        )
        .push_bind(tag.clone())
        .push(") ELSE 0 END");
    }
    if let Some(min) = query.min_published_date {
        qb.push(" AND v.published_date >= ").push_bind(min);
    }
    if let Some(max) = query.max_published_date {
        qb.push(" AND v.published_date <= ").push_bind(max);
    }
    if let Some(watched) = query.watched {
        qb.push(" AND COALESCE(p.is_watched, 0) = ").push_bind(watched);
    }
    if let Some(bookmarked) = query.bookmarked {
        qb.push(" AND COALESCE(p.is_bookmarked, 0) = ").push_bind(bookmarked);
    }

    let direction = if query.ascending { "ASC" } else { "DESC" };
    qb.push(format!(
        " ORDER BY {} {}, v.id {}",
        query.sort_by.column(),
        direction,
        direction
    ));
    qb.push(" LIMIT ").push_bind(query.limit);
    qb.push(" OFFSET ").push_bind(query.skip);

    let rows = qb.build_query_as::<DbVideo>().fetch_all(pool).await?;

    Ok(rows.into_iter().map(Video::from).collect())
}

/// Videos with a progress row for `user_id`, most recently watched first.
#[instrument(skip(pool))]
pub async fn list_watched_videos(
    pool: &Pool<Sqlite>,
    user_id: i64,
    bookmarked_only: bool,
    skip: i64,
    limit: i64,
) -> Result<Vec<Video>, AppError> {
    info!("Listing videos from user progress");

    let rows = sqlx::query_as::<_, DbVideo>(&format!(
        "SELECT {} FROM video_tutorials v
         JOIN video_progress p ON p.video_id = v.id AND p.user_id = ?
         WHERE (? = 0 OR p.is_bookmarked = 1)
         ORDER BY p.last_watched DESC, v.id DESC
         LIMIT ? OFFSET ?",
        VIDEO_COLUMNS
    ))
    .bind(user_id)
    .bind(bookmarked_only)
    .bind(limit)
    .bind(skip)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Video::from).collect())
}

#[instrument(skip(pool, videos))]
pub async fn attach_details(
    pool: &Pool<Sqlite>,
    user_id: i64,
    videos: Vec<Video>,
    expand: Expand,
) -> Result<Vec<VideoDetail>, AppError> {
    let categories: HashMap<i64, _> = if expand.category {
        list_categories(pool)
            .await?
            .into_iter()
            .map(|category| (category.id, category))
            .collect()
    } else {
        HashMap::new()
    };

    let mut creators = HashMap::new();
    let mut details = Vec::with_capacity(videos.len());

    for video in videos {
        let creator_obj = match video.creator_relation_id.filter(|_| expand.creator) {
            Some(id) => {
                if !creators.contains_key(&id) {
                    let creator = match get_creator(pool, id).await {
                        Ok(creator) => Some(creator),
                        Err(AppError::NotFound(_)) => None,
                        Err(err) => return Err(err),
                    };
                    creators.insert(id, creator);
                }
                creators.get(&id).cloned().flatten()
            }
            None => None,
        };

        let progress_data = if expand.progress {
            get_progress(pool, user_id, video.id)
                .await?
                .map(ProgressView::from)
        } else {
            None
        };

        details.push(VideoDetail {
            category: video.category_id.and_then(|id| categories.get(&id).cloned()),
            creator_obj,
            progress_data,
            video,
        });
    }

    Ok(details)
}

#[instrument(skip(pool))]
pub async fn set_video_creator(
    pool: &Pool<Sqlite>,
    video_id: i64,
    creator_id: i64,
) -> Result<Video, AppError> {
    info!("Linking video to creator");

    get_video(pool, video_id).await?;
    let creator = get_creator(pool, creator_id).await?;

    sqlx::query("UPDATE video_tutorials SET creator_relation_id = ?, creator = ? WHERE id = ?")
        .bind(creator.id)
        .bind(&creator.name)
        .bind(video_id)
        .execute(pool)
        .await?;

    get_video(pool, video_id).await
}

/// `(id, creator)` for every video that has no creator link yet.
#[instrument(skip(pool))]
pub async fn unlinked_video_creators(pool: &Pool<Sqlite>) -> Result<Vec<(i64, String)>, AppError> {
    let rows: Vec<(i64, String)> = sqlx::query_as(
        "SELECT id, creator FROM video_tutorials
         WHERE creator_relation_id IS NULL AND creator IS NOT NULL
         ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Every non-null creator string, linked or not.
#[instrument(skip(pool))]
pub async fn all_video_creators(pool: &Pool<Sqlite>) -> Result<Vec<String>, AppError> {
    let rows: Vec<(String,)> =
        sqlx::query_as("SELECT creator FROM video_tutorials WHERE creator IS NOT NULL")
            .fetch_all(pool)
            .await?;

    Ok(rows.into_iter().map(|(creator,)| creator).collect())
}

/// Sets the link only where none exists yet.
#[instrument(skip(pool))]
pub async fn link_video_creator(
    pool: &Pool<Sqlite>,
    video_id: i64,
    creator_id: i64,
) -> Result<bool, AppError> {
    let res = sqlx::query(
        "UPDATE video_tutorials SET creator_relation_id = ?
         WHERE id = ? AND creator_relation_id IS NULL",
    )
    .bind(creator_id)
    .bind(video_id)
    .execute(pool)
    .await?;

    Ok(res.rows_affected() > 0)
}

#[instrument(skip(pool))]
pub async fn uncategorized_videos(pool: &Pool<Sqlite>) -> Result<Vec<(i64, String)>, AppError> {
    let rows: Vec<(i64, String)> = sqlx::query_as(
        "SELECT id, title FROM video_tutorials WHERE category_id IS NULL ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

#[instrument(skip(pool))]
pub async fn set_video_category(
    pool: &Pool<Sqlite>,
    video_id: i64,
    category_id: i64,
) -> Result<(), AppError> {
    sqlx::query("UPDATE video_tutorials SET category_id = ? WHERE id = ?")
        .bind(category_id)
        .bind(video_id)
        .execute(pool)
        .await?;

    Ok(())
}
