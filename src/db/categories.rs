use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

use crate::error::AppError;
use crate::models::VideoCategory;

#[instrument(skip(pool))]
pub async fn list_categories(pool: &Pool<Sqlite>) -> Result<Vec<VideoCategory>, AppError> {
    info!("Listing video categories");

    let categories = sqlx::query_as::<_, VideoCategory>(
        "SELECT id, name, description FROM video_categories ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(categories)
}

#[instrument(skip(pool))]
pub async fn get_category(pool: &Pool<Sqlite>, id: i64) -> Result<VideoCategory, AppError> {
    info!("Getting video category");

    let row = sqlx::query_as::<_, VideoCategory>(
        "SELECT id, name, description FROM video_categories WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(category) => Ok(category),
        _ => Err(AppError::NotFound("Category not found".to_string())),
    }
}

async fn ensure_name_free(pool: &Pool<Sqlite>, name: &str, exclude_id: i64) -> Result<(), AppError> {
    let taken: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM video_categories WHERE name = ? AND id != ?")
            .bind(name)
            .bind(exclude_id)
            .fetch_optional(pool)
            .await?;

    if taken.is_some() {
        return Err(AppError::Validation(
            "Category with this name already exists".to_string(),
        ));
    }
    Ok(())
}

#[instrument(skip(pool))]
pub async fn create_category(
    pool: &Pool<Sqlite>,
    name: &str,
    description: Option<&str>,
) -> Result<VideoCategory, AppError> {
    info!("Creating video category");

    ensure_name_free(pool, name, -1).await?;

    let res = sqlx::query("INSERT INTO video_categories (name, description) VALUES (?, ?)")
        .bind(name)
        .bind(description)
        .execute(pool)
        .await?;

    get_category(pool, res.last_insert_rowid()).await
}

#[instrument(skip(pool))]
pub async fn update_category(
    pool: &Pool<Sqlite>,
    id: i64,
    name: &str,
    description: Option<&str>,
) -> Result<VideoCategory, AppError> {
    info!("Updating video category");

    get_category(pool, id).await?;
    ensure_name_free(pool, name, id).await?;

    sqlx::query("UPDATE video_categories SET name = ?, description = ? WHERE id = ?")
        .bind(name)
        .bind(description)
        .bind(id)
        .execute(pool)
        .await?;

    get_category(pool, id).await
}

/// Videos in the category keep existing with no category.
#[instrument(skip(pool))]
pub async fn delete_category(pool: &Pool<Sqlite>, id: i64) -> Result<(), AppError> {
    info!("Deleting video category");

    get_category(pool, id).await?;

    sqlx::query("UPDATE video_tutorials SET category_id = NULL WHERE category_id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    sqlx::query("DELETE FROM video_categories WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}
