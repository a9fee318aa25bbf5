use rocket::State;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use serde::Deserialize;
use sqlx::{Pool, Sqlite};
use validator::Validate;

use crate::auth::{Permission, User};
use crate::db::{
    GoalFields, create_goal, delete_goal, get_goal, list_goals, set_goal_status, update_goal,
};
use crate::error::AppError;
use crate::models::{Goal, GoalStatus};

#[derive(Deserialize, Validate)]
pub struct GoalRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: String,
    pub description: Option<String>,
    #[serde(default = "default_status")]
    pub status: GoalStatus,
}

fn default_status() -> GoalStatus {
    GoalStatus::Active
}

impl From<GoalRequest> for GoalFields {
    fn from(request: GoalRequest) -> Self {
        Self {
            title: request.title,
            description: request.description,
            status: request.status,
        }
    }
}

#[derive(Deserialize)]
pub struct GoalStatusRequest {
    pub status: GoalStatus,
}

#[post("/goals", data = "<body>")]
pub async fn api_create_goal(
    body: Json<GoalRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Custom<Json<Goal>>, AppError> {
    user.require_permission(Permission::ManageGoals)?;
    body.validate()?;

    let goal = create_goal(db, user.id, body.into_inner().into()).await?;

    Ok(Custom(Status::Created, Json(goal)))
}

#[get("/goals?<status>")]
pub async fn api_get_goals(
    status: Option<&str>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<Goal>>, AppError> {
    user.require_permission(Permission::ManageGoals)?;

    let status = match status {
        Some(raw) => Some(
            GoalStatus::parse(raw)
                .ok_or_else(|| AppError::Validation(format!("Unknown goal status '{}'", raw)))?,
        ),
        None => None,
    };

    Ok(Json(list_goals(db, user.id, status).await?))
}

#[get("/goals/<id>")]
pub async fn api_get_goal(id: i64, user: User, db: &State<Pool<Sqlite>>) -> Result<Json<Goal>, AppError> {
    user.require_permission(Permission::ManageGoals)?;

    Ok(Json(get_goal(db, user.id, id).await?))
}

#[put("/goals/<id>", data = "<body>")]
pub async fn api_update_goal(
    id: i64,
    body: Json<GoalRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Goal>, AppError> {
    user.require_permission(Permission::ManageGoals)?;
    body.validate()?;

    Ok(Json(update_goal(db, user.id, id, body.into_inner().into()).await?))
}

#[patch("/goals/<id>/status", data = "<body>")]
pub async fn api_update_goal_status(
    id: i64,
    body: Json<GoalStatusRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Goal>, AppError> {
    user.require_permission(Permission::ManageGoals)?;

    Ok(Json(set_goal_status(db, user.id, id, body.status).await?))
}

#[delete("/goals/<id>")]
pub async fn api_delete_goal(id: i64, user: User, db: &State<Pool<Sqlite>>) -> Result<Status, AppError> {
    user.require_permission(Permission::ManageGoals)?;

    delete_goal(db, user.id, id).await?;

    Ok(Status::NoContent)
}
