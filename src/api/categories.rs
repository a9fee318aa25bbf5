use rocket::State;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use serde::Deserialize;
use sqlx::{Pool, Sqlite};
use validator::Validate;

use crate::auth::{Permission, User};
use crate::db::{create_category, delete_category, get_category, list_categories, update_category};
use crate::error::AppError;
use crate::models::VideoCategory;

#[derive(Deserialize, Validate)]
pub struct CategoryRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,
    pub description: Option<String>,
}

#[post("/videos/categories", data = "<body>")]
pub async fn api_create_category(
    body: Json<CategoryRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Custom<Json<VideoCategory>>, AppError> {
    user.require_permission(Permission::EditVideoLibrary)?;
    body.validate()?;

    let category = create_category(db, &body.name, body.description.as_deref()).await?;

    Ok(Custom(Status::Created, Json(category)))
}

#[get("/videos/categories")]
pub async fn api_get_categories(
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<VideoCategory>>, AppError> {
    user.require_permission(Permission::BrowseVideos)?;

    Ok(Json(list_categories(db).await?))
}

#[get("/videos/categories/<id>")]
pub async fn api_get_category(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<VideoCategory>, AppError> {
    user.require_permission(Permission::BrowseVideos)?;

    Ok(Json(get_category(db, id).await?))
}

#[put("/videos/categories/<id>", data = "<body>")]
pub async fn api_update_category(
    id: i64,
    body: Json<CategoryRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<VideoCategory>, AppError> {
    user.require_permission(Permission::EditVideoLibrary)?;
    body.validate()?;

    let category = update_category(db, id, &body.name, body.description.as_deref()).await?;

    Ok(Json(category))
}

#[delete("/videos/categories/<id>")]
pub async fn api_delete_category(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, AppError> {
    user.require_permission(Permission::EditVideoLibrary)?;

    delete_category(db, id).await?;

    Ok(Status::NoContent)
}
