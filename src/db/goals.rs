use chrono::Utc;
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

use crate::error::AppError;
use crate::models::{DbGoal, Goal, GoalStatus};

const GOAL_COLUMNS: &str = "id, title, description, status, created_at, updated_at, user_id";

#[derive(Debug, Clone)]
pub struct GoalFields {
    pub title: String,
    pub description: Option<String>,
    pub status: GoalStatus,
}

#[instrument(skip(pool, fields))]
pub async fn create_goal(
    pool: &Pool<Sqlite>,
    user_id: i64,
    fields: GoalFields,
) -> Result<Goal, AppError> {
    info!("Creating goal");

    let now = Utc::now().naive_utc();
    let res = sqlx::query(
        "INSERT INTO goals (title, description, status, created_at, updated_at, user_id)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&fields.title)
    .bind(&fields.description)
    .bind(fields.status.as_str())
    .bind(now)
    .bind(now)
    .bind(user_id)
    .execute(pool)
    .await?;

    get_goal(pool, user_id, res.last_insert_rowid()).await
}

#[instrument(skip(pool))]
pub async fn list_goals(
    pool: &Pool<Sqlite>,
    user_id: i64,
    status: Option<GoalStatus>,
) -> Result<Vec<Goal>, AppError> {
    info!("Listing goals");

    let rows = sqlx::query_as::<_, DbGoal>(&format!(
        "SELECT {} FROM goals
         WHERE user_id = ? AND (? IS NULL OR status = ?)
         ORDER BY created_at DESC, id DESC",
        GOAL_COLUMNS
    ))
    .bind(user_id)
    .bind(status.map(|s| s.as_str()))
    .bind(status.map(|s| s.as_str()))
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Goal::from).collect())
}

/// Only goals owned by `user_id` are visible.
#[instrument(skip(pool))]
pub async fn get_goal(pool: &Pool<Sqlite>, user_id: i64, goal_id: i64) -> Result<Goal, AppError> {
    info!("Getting goal");

    let row = sqlx::query_as::<_, DbGoal>(&format!(
        "SELECT {} FROM goals WHERE id = ? AND user_id = ?",
        GOAL_COLUMNS
    ))
    .bind(goal_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(goal) => Ok(Goal::from(goal)),
        _ => Err(AppError::NotFound("Goal not found".to_string())),
    }
}

#[instrument(skip(pool, fields))]
pub async fn update_goal(
    pool: &Pool<Sqlite>,
    user_id: i64,
    goal_id: i64,
    fields: GoalFields,
) -> Result<Goal, AppError> {
    info!("Updating goal");

    let res = sqlx::query(
        "UPDATE goals SET title = ?, description = ?, status = ?, updated_at = ?
         WHERE id = ? AND user_id = ?",
    )
    .bind(&fields.title)
    .bind(&fields.description)
    .bind(fields.status.as_str())
    .bind(Utc::now().naive_utc())
    .bind(goal_id)
    .bind(user_id)
    .execute(pool)
    .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::NotFound("Goal not found".to_string()));
    }

    get_goal(pool, user_id, goal_id).await
}

#[instrument(skip(pool))]
pub async fn set_goal_status(
    pool: &Pool<Sqlite>,
    user_id: i64,
    goal_id: i64,
    status: GoalStatus,
) -> Result<Goal, AppError> {
    info!("Setting goal status");

    let res = sqlx::query(
        "UPDATE goals SET status = ?, updated_at = ? WHERE id = ? AND user_id = ?",
    )
    .bind(status.as_str())
    .bind(Utc::now().naive_utc())
    .bind(goal_id)
    .bind(user_id)
    .execute(pool)
    .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::NotFound("Goal not found".to_string()));
    }

    get_goal(pool, user_id, goal_id).await
}

#[instrument(skip(pool))]
pub async fn delete_goal(pool: &Pool<Sqlite>, user_id: i64, goal_id: i64) -> Result<(), AppError> {
    info!("Deleting goal");

    let res = sqlx::query("DELETE FROM goals WHERE id = ? AND user_id = ?")
        .bind(goal_id)
        .bind(user_id)
        .execute(pool)
        .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::NotFound("Goal not found".to_string()));
    }

    Ok(())
}

/// Ids from `goal_ids` that are not goals owned by `user_id`.
#[instrument(skip(pool))]
pub async fn foreign_goal_ids(
    pool: &Pool<Sqlite>,
    user_id: i64,
    goal_ids: &[i64],
) -> Result<Vec<i64>, AppError> {
    let mut missing = Vec::new();

    for goal_id in goal_ids {
        let owned: Option<(i64,)> = sqlx::query_as("SELECT id FROM goals WHERE id = ? AND user_id = ?")
            .bind(goal_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

        if owned.is_none() && !missing.contains(goal_id) {
            missing.push(*goal_id);
        }
    }

    Ok(missing)
}
