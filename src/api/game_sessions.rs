use rocket::State;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use serde::Deserialize;
use sqlx::{Pool, Sqlite};
use validator::Validate;

use crate::auth::{Permission, User};
use crate::db::{
    GameSessionFields, create_game_session, delete_game_session, get_game_session,
    list_game_sessions, update_game_session,
};
use crate::error::AppError;
use crate::import::normalize::parse_remote_timestamp;
use crate::models::{GameSession, GoalProgressEntry};

#[derive(Deserialize, Validate)]
pub struct GameSessionRequest {
    pub date: Option<String>,
    #[validate(length(min = 1, message = "Player character is required"))]
    pub player_character: String,
    #[validate(length(min = 1, message = "Enemy character is required"))]
    pub enemy_character: String,
    #[validate(length(min = 1, message = "Result is required"))]
    pub result: String,
    #[validate(range(min = 1, max = 5, message = "Mood rating must be between 1 and 5"))]
    pub mood_rating: i64,
    #[serde(default)]
    pub goal_progress: Option<Vec<GoalProgressEntry>>,
    pub notes: Option<String>,
}

impl GameSessionRequest {
    fn into_fields(self) -> Result<GameSessionFields, AppError> {
        let date = match self.date.as_deref() {
            Some(raw) => Some(parse_remote_timestamp(raw).ok_or_else(|| {
                AppError::Validation(format!("Unrecognised date '{}'", raw))
            })?),
            None => None,
        };

        let goal_progress = self.goal_progress.unwrap_or_default();
        if let Some(entry) = goal_progress
            .iter()
            .find(|entry| !(1..=5).contains(&entry.progress_rating))
        {
            return Err(AppError::Validation(format!(
                "progress_rating for goal {} must be between 1 and 5",
                entry.goal_id
            )));
        }

        Ok(GameSessionFields {
            date,
            player_character: self.player_character,
            enemy_character: self.enemy_character,
            result: self.result,
            mood_rating: self.mood_rating,
            goal_progress,
            notes: self.notes,
        })
    }
}

#[post("/game-sessions", data = "<body>")]
pub async fn api_create_game_session(
    body: Json<GameSessionRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Custom<Json<GameSession>>, AppError> {
    user.require_permission(Permission::TrackGameSessions)?;
    body.validate()?;

    let session = create_game_session(db, user.id, body.into_inner().into_fields()?).await?;

    Ok(Custom(Status::Created, Json(session)))
}

#[get("/game-sessions?<skip>&<limit>")]
pub async fn api_get_game_sessions(
    skip: Option<i64>,
    limit: Option<i64>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<GameSession>>, AppError> {
    user.require_permission(Permission::TrackGameSessions)?;

    let sessions =
        list_game_sessions(db, user.id, skip.unwrap_or(0), limit.unwrap_or(100)).await?;

    Ok(Json(sessions))
}

#[get("/game-sessions/<id>")]
pub async fn api_get_game_session(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<GameSession>, AppError> {
    user.require_permission(Permission::TrackGameSessions)?;

    Ok(Json(get_game_session(db, user.id, id).await?))
}

#[put("/game-sessions/<id>", data = "<body>")]
pub async fn api_update_game_session(
    id: i64,
    body: Json<GameSessionRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<GameSession>, AppError> {
    user.require_permission(Permission::TrackGameSessions)?;
    body.validate()?;

    let session = update_game_session(db, user.id, id, body.into_inner().into_fields()?).await?;

    Ok(Json(session))
}

#[delete("/game-sessions/<id>")]
pub async fn api_delete_game_session(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, AppError> {
    user.require_permission(Permission::TrackGameSessions)?;

    delete_game_session(db, user.id, id).await?;

    Ok(Status::NoContent)
}
