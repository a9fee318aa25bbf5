use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

use crate::error::AppError;
use crate::models::Creator;

const CREATOR_COLUMNS: &str = "id, name, description, website";

#[derive(Debug, Clone)]
pub struct CreatorFields {
    pub name: String,
    pub description: Option<String>,
    pub website: Option<String>,
}

#[instrument(skip(pool))]
pub async fn list_creators(pool: &Pool<Sqlite>, skip: i64, limit: i64) -> Result<Vec<Creator>, AppError> {
    info!("Listing creators");

    let creators = sqlx::query_as::<_, Creator>(&format!(
        "SELECT {} FROM creators ORDER BY id LIMIT ? OFFSET ?",
        CREATOR_COLUMNS
    ))
    .bind(limit)
    .bind(skip)
    .fetch_all(pool)
    .await?;

    Ok(creators)
}

#[instrument(skip(pool))]
pub async fn get_creator(pool: &Pool<Sqlite>, id: i64) -> Result<Creator, AppError> {
    info!("Getting creator");

    let row = sqlx::query_as::<_, Creator>(&format!(
        "SELECT {} FROM creators WHERE id = ?",
        CREATOR_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(creator) => Ok(creator),
        _ => Err(AppError::NotFound("Creator not found".to_string())),
    }
}

#[instrument(skip(pool))]
pub async fn find_creator_by_name(
    pool: &Pool<Sqlite>,
    name: &str,
) -> Result<Option<Creator>, AppError> {
    let creator = sqlx::query_as::<_, Creator>(&format!(
        "SELECT {} FROM creators WHERE name = ?",
        CREATOR_COLUMNS
    ))
    .bind(name)
    .fetch_optional(pool)
    .await?;

    Ok(creator)
}

#[instrument(skip(pool, fields), fields(name = %fields.name))]
pub async fn create_creator(pool: &Pool<Sqlite>, fields: CreatorFields) -> Result<Creator, AppError> {
    info!("Creating creator");

    if find_creator_by_name(pool, &fields.name).await?.is_some() {
        return Err(AppError::Validation(
            "Creator with this name already exists".to_string(),
        ));
    }

    let res = sqlx::query("INSERT INTO creators (name, description, website) VALUES (?, ?, ?)")
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(&fields.website)
        .execute(pool)
        .await?;

    get_creator(pool, res.last_insert_rowid()).await
}

/// A rename is copied into the free-text creator field of every linked video.
#[instrument(skip(pool, fields))]
pub async fn update_creator(
    pool: &Pool<Sqlite>,
    id: i64,
    fields: CreatorFields,
) -> Result<Creator, AppError> {
    info!("Updating creator");

    let current = get_creator(pool, id).await?;

    if let Some(other) = find_creator_by_name(pool, &fields.name).await? {
        if other.id != id {
            return Err(AppError::Validation(
                "Creator with this name already exists".to_string(),
            ));
        }
    }

    let mut tx = pool.begin().await?;

    sqlx::query("UPDATE creators SET name = ?, description = ?, website = ? WHERE id = ?")
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(&fields.website)
        .bind(id)
        .execute(&mut *tx)
        .await?;

    if current.name != fields.name {
        let res = sqlx::query("UPDATE video_tutorials SET creator = ? WHERE creator_relation_id = ?")
            .bind(&fields.name)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        info!(videos = res.rows_affected(), "Renamed creator on linked videos");
    }

    tx.commit().await?;

    get_creator(pool, id).await
}

#[instrument(skip(pool))]
pub async fn delete_creator(pool: &Pool<Sqlite>, id: i64) -> Result<(), AppError> {
    info!("Deleting creator");

    get_creator(pool, id).await?;

    let (linked,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM video_tutorials WHERE creator_relation_id = ?")
            .bind(id)
            .fetch_one(pool)
            .await?;

    if linked > 0 {
        return Err(AppError::Validation(format!(
            "Cannot delete creator: used in {} videos",
            linked
        )));
    }

    sqlx::query("DELETE FROM creators WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}
