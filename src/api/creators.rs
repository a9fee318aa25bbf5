use rocket::State;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use serde::Deserialize;
use sqlx::{Pool, Sqlite};
use validator::Validate;

use crate::auth::{Permission, User};
use crate::db::{
    CreatorFields, VideoQuery, create_creator, delete_creator, get_creator, list_creators,
    search_videos, update_creator,
};
use crate::error::AppError;
use crate::import::backfill_creators;
use crate::models::{Creator, Video};

#[derive(Deserialize, Validate)]
pub struct CreatorRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(url(message = "Website must be a valid URL"))]
    pub website: Option<String>,
}

impl From<CreatorRequest> for CreatorFields {
    fn from(request: CreatorRequest) -> Self {
        Self {
            name: request.name,
            description: request.description,
            website: request.website,
        }
    }
}

#[post("/videos/creators", data = "<body>")]
pub async fn api_create_creator(
    body: Json<CreatorRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Custom<Json<Creator>>, AppError> {
    user.require_permission(Permission::EditVideoLibrary)?;
    body.validate()?;

    let creator = create_creator(db, body.into_inner().into()).await?;

    Ok(Custom(Status::Created, Json(creator)))
}

#[get("/videos/creators?<skip>&<limit>")]
pub async fn api_get_creators(
    skip: Option<i64>,
    limit: Option<i64>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<Creator>>, AppError> {
    user.require_permission(Permission::BrowseVideos)?;

    let creators = list_creators(db, skip.unwrap_or(0), limit.unwrap_or(100)).await?;

    Ok(Json(creators))
}

#[get("/videos/creators/<id>")]
pub async fn api_get_creator(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Creator>, AppError> {
    user.require_permission(Permission::BrowseVideos)?;

    Ok(Json(get_creator(db, id).await?))
}

#[put("/videos/creators/<id>", data = "<body>")]
pub async fn api_update_creator(
    id: i64,
    body: Json<CreatorRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Creator>, AppError> {
    user.require_permission(Permission::EditVideoLibrary)?;
    body.validate()?;

    Ok(Json(update_creator(db, id, body.into_inner().into()).await?))
}

#[delete("/videos/creators/<id>")]
pub async fn api_delete_creator(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, AppError> {
    user.require_permission(Permission::EditVideoLibrary)?;

    delete_creator(db, id).await?;

    Ok(Status::NoContent)
}

#[get("/videos/creators/<id>/videos?<skip>&<limit>")]
pub async fn api_get_creator_videos(
    id: i64,
    skip: Option<i64>,
    limit: Option<i64>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<Video>>, AppError> {
    user.require_permission(Permission::BrowseVideos)?;

    get_creator(db, id).await?;

    let query = VideoQuery {
        creator_relation_id: Some(id),
        skip: skip.unwrap_or(0),
        limit: limit.unwrap_or(100),
        ..Default::default()
    };

    Ok(Json(search_videos(db, user.id, &query).await?))
}

#[post("/videos/creators/migrate-from-videos")]
pub async fn api_migrate_creators(
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<Creator>>, AppError> {
    user.require_permission(Permission::RunLibraryMaintenance)?;

    Ok(Json(backfill_creators(db).await?))
}
