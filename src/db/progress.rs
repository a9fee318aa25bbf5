use chrono::Utc;
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

use super::videos::get_video;
use crate::error::AppError;
use crate::models::VideoProgress;

const PROGRESS_COLUMNS: &str =
    "id, user_id, video_id, is_watched, watch_progress, personal_notes, is_bookmarked, last_watched";

/// Fields to merge into a user's progress row. `None` leaves the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressChanges {
    pub is_watched: Option<bool>,
    pub watch_progress: Option<f64>,
    pub personal_notes: Option<String>,
    pub is_bookmarked: Option<bool>,
}

#[instrument(skip(pool))]
pub async fn get_progress(
    pool: &Pool<Sqlite>,
    user_id: i64,
    video_id: i64,
) -> Result<Option<VideoProgress>, AppError> {
    let progress = sqlx::query_as::<_, VideoProgress>(&format!(
        "SELECT {} FROM video_progress WHERE user_id = ? AND video_id = ?",
        PROGRESS_COLUMNS
    ))
    .bind(user_id)
    .bind(video_id)
    .fetch_optional(pool)
    .await?;

    Ok(progress)
}

/// Creates or updates the single progress row for `(user_id, video_id)` and
/// stamps `last_watched`.
#[instrument(skip(pool, changes))]
pub async fn upsert_progress(
    pool: &Pool<Sqlite>,
    user_id: i64,
    video_id: i64,
    changes: ProgressChanges,
) -> Result<VideoProgress, AppError> {
    info!("Recording video progress");

    get_video(pool, video_id).await?;

    let now = Utc::now().naive_utc();

    sqlx::query(
        "INSERT INTO video_progress
            (user_id, video_id, is_watched, watch_progress, personal_notes, is_bookmarked, last_watched)
         VALUES (?, ?, COALESCE(?, FALSE), COALESCE(?, 0.0), ?, COALESCE(?, FALSE), ?)
         ON CONFLICT (user_id, video_id) DO UPDATE SET
            is_watched = COALESCE(?, is_watched),
            watch_progress = COALESCE(?, watch_progress),
            personal_notes = COALESCE(?, personal_notes),
            is_bookmarked = COALESCE(?, is_bookmarked),
            last_watched = excluded.last_watched",
    )
    .bind(user_id)
    .bind(video_id)
    .bind(changes.is_watched)
    .bind(changes.watch_progress)
    .bind(&changes.personal_notes)
    .bind(changes.is_bookmarked)
    .bind(now)
    .bind(changes.is_watched)
    .bind(changes.watch_progress)
    .bind(&changes.personal_notes)
    .bind(changes.is_bookmarked)
    .execute(pool)
    .await?;

    match get_progress(pool, user_id, video_id).await? {
        Some(progress) => Ok(progress),
        None => Err(AppError::Internal(
            "Progress row missing after upsert".to_string(),
        )),
    }
}
