use indexmap::IndexMap;
use rocket::State;
use rocket::serde::json::Json;
use serde::Deserialize;
use sqlx::{Pool, Sqlite};
use validator::Validate;

use crate::auth::{Permission, User};
use crate::error::AppError;
use crate::import::{
    CategoryTable, ContentSourceHandle, DEFAULT_SERVICE, ImportReport, Importer, NormalizedVideo,
    RecategorizeReport, recategorize_uncategorized,
};

fn default_service() -> String {
    DEFAULT_SERVICE.to_string()
}

#[derive(Deserialize, Validate)]
pub struct KemonoImportRequest {
    #[validate(length(min = 1, message = "creator_id is required"))]
    pub creator_id: String,
    #[serde(default = "default_service")]
    pub service: String,
    /// Title pattern -> category id, checked in the order given.
    pub category_mapping: Option<IndexMap<String, i64>>,
}

#[post("/videos/kemono/import", data = "<body>")]
pub async fn api_kemono_import(
    body: Json<KemonoImportRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
    source: &State<ContentSourceHandle>,
    table: &State<CategoryTable>,
) -> Result<Json<ImportReport>, AppError> {
    user.require_permission(Permission::ImportVideos)?;
    body.validate()?;

    let importer = Importer::new(db.inner(), source.inner().as_ref(), table.inner());
    let report = importer
        .run(
            &body.creator_id,
            &body.service,
            body.category_mapping.as_ref(),
            true,
        )
        .await?;

    Ok(Json(report))
}

#[get("/videos/kemono/preview/<creator_id>?<service>")]
pub async fn api_kemono_preview(
    creator_id: &str,
    service: Option<&str>,
    user: User,
    db: &State<Pool<Sqlite>>,
    source: &State<ContentSourceHandle>,
    table: &State<CategoryTable>,
) -> Result<Json<IndexMap<String, Vec<NormalizedVideo>>>, AppError> {
    user.require_permission(Permission::ImportVideos)?;

    let importer = Importer::new(db.inner(), source.inner().as_ref(), table.inner());
    let preview = importer
        .preview(creator_id, service.unwrap_or(DEFAULT_SERVICE))
        .await;

    Ok(Json(preview))
}

#[post("/videos/update-categories")]
pub async fn api_update_categories(
    user: User,
    db: &State<Pool<Sqlite>>,
    table: &State<CategoryTable>,
) -> Result<Json<RecategorizeReport>, AppError> {
    user.require_permission(Permission::RunLibraryMaintenance)?;

    Ok(Json(recategorize_uncategorized(db, table).await?))
}
