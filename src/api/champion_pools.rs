use rocket::State;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use serde::Deserialize;
use sqlx::{Pool, Sqlite};
use validator::Validate;

use crate::auth::{Permission, User};
use crate::db::{
    ChampionFields, ChampionPoolChanges, NewChampionPool, add_champion, create_champion_pool,
    delete_champion_pool, get_champion_pool, list_champion_pools, list_pooled_champions,
    remove_champion, update_champion_pool,
};
use crate::error::AppError;
use crate::models::{ChampionPool, ChampionPoolEntry};

#[derive(Deserialize, Validate)]
pub struct ChampionRequest {
    #[validate(length(min = 1, message = "Champion id is required"))]
    pub champion_id: String,
    #[validate(length(min = 1, message = "Champion name is required"))]
    pub champion_name: String,
    pub notes: Option<String>,
    pub category: Option<String>,
}

impl From<ChampionRequest> for ChampionFields {
    fn from(request: ChampionRequest) -> Self {
        Self {
            champion_id: request.champion_id,
            champion_name: request.champion_name,
            notes: request.notes,
            category: request.category,
        }
    }
}

#[derive(Deserialize, Validate)]
pub struct CreateChampionPoolRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    #[validate(nested)]
    pub champions: Vec<ChampionRequest>,
}

#[derive(Deserialize, Validate)]
pub struct UpdateChampionPoolRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    #[validate(nested)]
    pub champions: Option<Vec<ChampionRequest>>,
}

#[post("/champion-pools", data = "<body>")]
pub async fn api_create_champion_pool(
    body: Json<CreateChampionPoolRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Custom<Json<ChampionPool>>, AppError> {
    user.require_permission(Permission::ManageChampionPools)?;
    body.validate()?;

    let body = body.into_inner();
    let created = create_champion_pool(
        db,
        user.id,
        NewChampionPool {
            name: body.name,
            description: body.description,
            category: body.category,
            champions: body.champions.into_iter().map(ChampionFields::from).collect(),
        },
    )
    .await?;

    Ok(Custom(Status::Created, Json(created)))
}

#[get("/champion-pools?<category>")]
pub async fn api_get_champion_pools(
    category: Option<&str>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<ChampionPool>>, AppError> {
    user.require_permission(Permission::ManageChampionPools)?;

    Ok(Json(list_champion_pools(db, user.id, category).await?))
}

#[get("/champion-pools/champions/all")]
pub async fn api_get_all_champions(
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<ChampionPoolEntry>>, AppError> {
    user.require_permission(Permission::ManageChampionPools)?;

    Ok(Json(list_pooled_champions(db, user.id, None).await?))
}

#[get("/champion-pools/champions/category/<category>")]
pub async fn api_get_champions_by_category(
    category: &str,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<ChampionPoolEntry>>, AppError> {
    user.require_permission(Permission::ManageChampionPools)?;

    Ok(Json(list_pooled_champions(db, user.id, Some(category)).await?))
}

#[get("/champion-pools/<id>")]
pub async fn api_get_champion_pool(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<ChampionPool>, AppError> {
    user.require_permission(Permission::ManageChampionPools)?;

    Ok(Json(get_champion_pool(db, user.id, id).await?))
}

#[put("/champion-pools/<id>", data = "<body>")]
pub async fn api_update_champion_pool(
    id: i64,
    body: Json<UpdateChampionPoolRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<ChampionPool>, AppError> {
    user.require_permission(Permission::ManageChampionPools)?;
    body.validate()?;

    let body = body.into_inner();
    let updated = update_champion_pool(
        db,
        user.id,
        id,
        ChampionPoolChanges {
            name: body.name,
            description: body.description,
            category: body.category,
            champions: body
                .champions
                .map(|champions| champions.into_iter().map(ChampionFields::from).collect()),
        },
    )
    .await?;

    Ok(Json(updated))
}

#[delete("/champion-pools/<id>")]
pub async fn api_delete_champion_pool(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, AppError> {
    user.require_permission(Permission::ManageChampionPools)?;

    delete_champion_pool(db, user.id, id).await?;

    Ok(Status::NoContent)
}

#[post("/champion-pools/<id>/champions", data = "<body>")]
pub async fn api_add_champion(
    id: i64,
    body: Json<ChampionRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Custom<Json<ChampionPoolEntry>>, AppError> {
    user.require_permission(Permission::ManageChampionPools)?;
    body.validate()?;

    let entry = add_champion(db, user.id, id, body.into_inner().into()).await?;

    Ok(Custom(Status::Created, Json(entry)))
}

#[delete("/champion-pools/<id>/champions/<champion_id>")]
pub async fn api_remove_champion(
    id: i64,
    champion_id: &str,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, AppError> {
    user.require_permission(Permission::ManageChampionPools)?;

    remove_champion(db, user.id, id, champion_id).await?;

    Ok(Status::NoContent)
}
