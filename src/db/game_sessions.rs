use chrono::{NaiveDateTime, Utc};
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument, warn};

use super::goals::foreign_goal_ids;
use crate::error::AppError;
use crate::models::{DbGameSession, GameSession, GoalProgressEntry};

const SESSION_COLUMNS: &str = "id, date, player_character, enemy_character, result, mood_rating, goal_progress, notes, user_id";

#[derive(Debug, Clone)]
pub struct GameSessionFields {
    pub date: Option<NaiveDateTime>,
    pub player_character: String,
    pub enemy_character: String,
    pub result: String,
    pub mood_rating: i64,
    pub goal_progress: Vec<GoalProgressEntry>,
    pub notes: Option<String>,
}

async fn check_goal_ownership(
    pool: &Pool<Sqlite>,
    user_id: i64,
    goal_progress: &[GoalProgressEntry],
) -> Result<(), AppError> {
    let ids: Vec<i64> = goal_progress.iter().map(|entry| entry.goal_id).collect();
    let foreign = foreign_goal_ids(pool, user_id, &ids).await?;

    if !foreign.is_empty() {
        warn!(goal_ids = ?foreign, "goal_progress references goals outside the user's set");
        return Err(AppError::Validation(
            "One or more goals in goal_progress do not belong to the user".to_string(),
        ));
    }

    Ok(())
}

#[instrument(skip(pool, fields))]
pub async fn create_game_session(
    pool: &Pool<Sqlite>,
    user_id: i64,
    fields: GameSessionFields,
) -> Result<GameSession, AppError> {
    info!("Creating game session");

    check_goal_ownership(pool, user_id, &fields.goal_progress).await?;

    let res = sqlx::query(
        "INSERT INTO game_sessions
            (date, player_character, enemy_character, result, mood_rating, goal_progress, notes, user_id)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(fields.date.unwrap_or_else(|| Utc::now().naive_utc()))
    .bind(&fields.player_character)
    .bind(&fields.enemy_character)
    .bind(&fields.result)
    .bind(fields.mood_rating)
    .bind(serde_json::to_string(&fields.goal_progress)?)
    .bind(&fields.notes)
    .bind(user_id)
    .execute(pool)
    .await?;

    get_game_session(pool, user_id, res.last_insert_rowid()).await
}

#[instrument(skip(pool))]
pub async fn list_game_sessions(
    pool: &Pool<Sqlite>,
    user_id: i64,
    skip: i64,
    limit: i64,
) -> Result<Vec<GameSession>, AppError> {
    info!("Listing game sessions");

    let rows = sqlx::query_as::<_, DbGameSession>(&format!(
        "SELECT {} FROM game_sessions WHERE user_id = ? ORDER BY date DESC, id DESC LIMIT ? OFFSET ?",
        SESSION_COLUMNS
    ))
    .bind(user_id)
    .bind(limit)
    .bind(skip)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(GameSession::from).collect())
}

#[instrument(skip(pool))]
pub async fn get_game_session(
    pool: &Pool<Sqlite>,
    user_id: i64,
    session_id: i64,
) -> Result<GameSession, AppError> {
    info!("Getting game session");

    let row = sqlx::query_as::<_, DbGameSession>(&format!(
        "SELECT {} FROM game_sessions WHERE id = ? AND user_id = ?",
        SESSION_COLUMNS
    ))
    .bind(session_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(session) => Ok(GameSession::from(session)),
        _ => Err(AppError::NotFound("Game session not found".to_string())),
    }
}

/// Replaces the editable fields. A missing date keeps the stored one.
#[instrument(skip(pool, fields))]
pub async fn update_game_session(
    pool: &Pool<Sqlite>,
    user_id: i64,
    session_id: i64,
    fields: GameSessionFields,
) -> Result<GameSession, AppError> {
    info!("Updating game session");

    get_game_session(pool, user_id, session_id).await?;
    check_goal_ownership(pool, user_id, &fields.goal_progress).await?;

    sqlx::query(
        "UPDATE game_sessions SET
            date = COALESCE(?, date),
            player_character = ?,
            enemy_character = ?,
            result = ?,
            mood_rating = ?,
            goal_progress = ?,
            notes = ?
         WHERE id = ? AND user_id = ?",
    )
    .bind(fields.date)
    .bind(&fields.player_character)
    .bind(&fields.enemy_character)
    .bind(&fields.result)
    .bind(fields.mood_rating)
    .bind(serde_json::to_string(&fields.goal_progress)?)
    .bind(&fields.notes)
    .bind(session_id)
    .bind(user_id)
    .execute(pool)
    .await?;

    get_game_session(pool, user_id, session_id).await
}

#[instrument(skip(pool))]
pub async fn delete_game_session(
    pool: &Pool<Sqlite>,
    user_id: i64,
    session_id: i64,
) -> Result<(), AppError> {
    info!("Deleting game session");

    let res = sqlx::query("DELETE FROM game_sessions WHERE id = ? AND user_id = ?")
        .bind(session_id)
        .bind(user_id)
        .execute(pool)
        .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::NotFound("Game session not found".to_string()));
    }

    Ok(())
}
