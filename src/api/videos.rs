use chrono::{NaiveDateTime, Utc};
use rocket::FromForm;
use rocket::State;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use serde::Deserialize;
use sqlx::{Pool, Sqlite};
use validator::Validate;

use super::users::MessageResponse;
use crate::auth::{Permission, User};
use crate::db::{
    Expand, NewVideo, ProgressChanges, SortField, VideoChanges, VideoQuery, attach_details,
    create_video, delete_video, get_progress, get_video, list_watched_videos, search_videos,
    set_video_creator, update_video, upsert_progress,
};
use crate::error::AppError;
use crate::import::normalize::parse_remote_timestamp;
use crate::models::{ProgressView, Video, VideoDetail};

const DEFAULT_VIDEO_TYPE: &str = "YouTube";

fn default_video_type() -> String {
    DEFAULT_VIDEO_TYPE.to_string()
}

fn parse_date(field: &str, raw: Option<&str>) -> Result<Option<NaiveDateTime>, AppError> {
    match raw {
        Some(raw) => parse_remote_timestamp(raw)
            .map(Some)
            .ok_or_else(|| AppError::Validation(format!("Unrecognised {} '{}'", field, raw))),
        None => Ok(None),
    }
}

fn is_ascending(sort_order: Option<&str>) -> bool {
    matches!(sort_order, Some(order) if order.eq_ignore_ascii_case("asc"))
}

#[derive(Deserialize, Validate)]
pub struct CreateVideoRequest {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    pub creator: Option<String>,
    #[validate(length(min = 1, message = "URL is required"))]
    pub url: String,
    pub description: Option<String>,
    #[serde(default = "default_video_type")]
    pub video_type: String,
    pub key_points: Option<String>,
    pub category_id: Option<i64>,
    pub creator_relation_id: Option<i64>,
    pub upload_date: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl CreateVideoRequest {
    fn into_new_video(self) -> Result<NewVideo, AppError> {
        let upload_date = parse_date("upload_date", self.upload_date.as_deref())?;

        Ok(NewVideo {
            title: self.title,
            creator: self.creator,
            url: self.url,
            description: self.description,
            video_type: self.video_type,
            key_points: self.key_points,
            category_id: self.category_id,
            creator_relation_id: self.creator_relation_id,
            upload_date,
            added_date: Some(Utc::now().naive_utc()),
            published_date: upload_date,
            tags: self.tags,
            ..Default::default()
        })
    }
}

/// One row of the bulk JSON import. Unknown keys are ignored.
#[derive(Deserialize)]
pub struct BulkVideoRequest {
    pub title: String,
    pub creator: Option<String>,
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_video_type")]
    pub video_type: String,
    pub upload_date: Option<String>,
}

#[derive(Deserialize, Validate)]
pub struct UpdateVideoRequest {
    #[validate(length(min = 1, message = "Title cannot be empty"))]
    pub title: Option<String>,
    pub creator: Option<String>,
    #[validate(length(min = 1, message = "URL cannot be empty"))]
    pub url: Option<String>,
    pub description: Option<String>,
    pub video_type: Option<String>,
    pub key_points: Option<String>,
    pub category_id: Option<i64>,
    pub creator_relation_id: Option<i64>,
    pub upload_date: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Progress as posted by either client generation. The frontend names win
/// when both are present.
#[derive(Deserialize, Default)]
pub struct ProgressRequest {
    pub is_watched: Option<bool>,
    pub watch_progress: Option<f64>,
    pub personal_notes: Option<String>,
    pub is_bookmarked: Option<bool>,
    pub notes: Option<String>,
    pub position_seconds: Option<f64>,
    pub is_completed: Option<bool>,
}

impl From<ProgressRequest> for ProgressChanges {
    fn from(request: ProgressRequest) -> Self {
        Self {
            is_watched: request.is_completed.or(request.is_watched),
            watch_progress: request.position_seconds.or(request.watch_progress),
            personal_notes: request.notes.or(request.personal_notes),
            is_bookmarked: request.is_bookmarked,
        }
    }
}

#[derive(FromForm, Default)]
pub struct VideoListParams {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub creator: Option<String>,
    pub category_id: Option<i64>,
    pub title: Option<String>,
    pub tag: Option<String>,
    pub creator_name: Option<String>,
    pub expand: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

#[derive(FromForm, Default)]
pub struct VideoSearchParams {
    pub q: Option<String>,
    pub creator_id: Option<i64>,
    pub category_id: Option<i64>,
    pub tags: Vec<String>,
    pub min_published_date: Option<String>,
    pub max_published_date: Option<String>,
    pub watched: Option<bool>,
    pub bookmarked: Option<bool>,
    pub expand: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl VideoSearchParams {
    fn to_query(&self) -> Result<VideoQuery, AppError> {
        Ok(VideoQuery {
            text: self.q.clone().filter(|q| !q.is_empty()),
            creator_relation_id: self.creator_id,
            category_id: self.category_id,
            tags: self.tags.clone(),
            min_published_date: parse_date(
                "min_published_date",
                self.min_published_date.as_deref(),
            )?,
            max_published_date: parse_date(
                "max_published_date",
                self.max_published_date.as_deref(),
            )?,
            watched: self.watched,
            bookmarked: self.bookmarked,
            sort_by: self
                .sort_by
                .as_deref()
                .map(SortField::parse)
                .unwrap_or_default(),
            ascending: is_ascending(self.sort_order.as_deref()),
            skip: self.skip.unwrap_or(0),
            limit: self.limit.unwrap_or(50),
            ..Default::default()
        })
    }
}

impl From<&VideoListParams> for VideoQuery {
    fn from(params: &VideoListParams) -> Self {
        Self {
            title: params.title.clone(),
            creator: params.creator.clone(),
            creator_name: params.creator_name.clone(),
            category_id: params.category_id,
            tags: params.tag.clone().into_iter().collect(),
            sort_by: params
                .sort_by
                .as_deref()
                .map(SortField::parse)
                .unwrap_or_default(),
            ascending: is_ascending(params.sort_order.as_deref()),
            skip: params.skip.unwrap_or(0),
            limit: params.limit.unwrap_or(100),
            ..Default::default()
        }
    }
}

#[post("/videos", data = "<body>")]
pub async fn api_create_video(
    body: Json<CreateVideoRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Custom<Json<Video>>, AppError> {
    user.require_permission(Permission::EditVideoLibrary)?;
    body.validate()?;

    let video = create_video(db, body.into_inner().into_new_video()?).await?;

    Ok(Custom(Status::Created, Json(video)))
}

#[post("/videos/import", data = "<body>")]
pub async fn api_bulk_import_videos(
    body: Json<Vec<BulkVideoRequest>>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Custom<Json<MessageResponse>>, AppError> {
    user.require_permission(Permission::ImportVideos)?;

    let mut imported = 0;
    for row in body.into_inner() {
        let upload_date = parse_date("upload_date", row.upload_date.as_deref())?;
        create_video(
            db,
            NewVideo {
                title: row.title,
                creator: row.creator,
                url: row.url,
                description: row.description,
                video_type: row.video_type,
                upload_date,
                added_date: Some(Utc::now().naive_utc()),
                published_date: upload_date,
                ..Default::default()
            },
        )
        .await?;
        imported += 1;
    }

    Ok(Custom(
        Status::Created,
        Json(MessageResponse {
            message: format!("Successfully imported {} videos", imported),
        }),
    ))
}

#[get("/videos?<params..>")]
pub async fn api_get_videos(
    params: VideoListParams,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<VideoDetail>>, AppError> {
    user.require_permission(Permission::BrowseVideos)?;

    let videos = search_videos(db, user.id, &VideoQuery::from(&params)).await?;
    let expand = Expand::parse(params.expand.as_deref());

    Ok(Json(attach_details(db, user.id, videos, expand).await?))
}

#[get("/videos/search?<params..>")]
pub async fn api_search_videos(
    params: VideoSearchParams,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<VideoDetail>>, AppError> {
    user.require_permission(Permission::BrowseVideos)?;

    let videos = search_videos(db, user.id, &params.to_query()?).await?;
    let expand = Expand::parse(params.expand.as_deref());

    Ok(Json(attach_details(db, user.id, videos, expand).await?))
}

#[get("/videos/recently-watched?<skip>&<limit>")]
pub async fn api_get_recently_watched(
    skip: Option<i64>,
    limit: Option<i64>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<VideoDetail>>, AppError> {
    user.require_permission(Permission::BrowseVideos)?;

    let videos =
        list_watched_videos(db, user.id, false, skip.unwrap_or(0), limit.unwrap_or(10)).await?;

    Ok(Json(attach_details(db, user.id, videos, Expand::parse(None)).await?))
}

#[get("/videos/bookmarked?<skip>&<limit>")]
pub async fn api_get_bookmarked(
    skip: Option<i64>,
    limit: Option<i64>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<VideoDetail>>, AppError> {
    user.require_permission(Permission::BrowseVideos)?;

    let videos =
        list_watched_videos(db, user.id, true, skip.unwrap_or(0), limit.unwrap_or(50)).await?;

    Ok(Json(attach_details(db, user.id, videos, Expand::parse(None)).await?))
}

#[get("/videos/<id>")]
pub async fn api_get_video(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<VideoDetail>, AppError> {
    user.require_permission(Permission::BrowseVideos)?;

    let video = get_video(db, id).await?;
    let mut details = attach_details(db, user.id, vec![video], Expand::parse(None)).await?;

    details
        .pop()
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Video not found".to_string()))
}

#[put("/videos/<id>", data = "<body>")]
pub async fn api_update_video(
    id: i64,
    body: Json<UpdateVideoRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Video>, AppError> {
    user.require_permission(Permission::EditVideoLibrary)?;
    body.validate()?;

    let body = body.into_inner();
    let changes = VideoChanges {
        upload_date: parse_date("upload_date", body.upload_date.as_deref())?,
        title: body.title,
        creator: body.creator,
        url: body.url,
        description: body.description,
        video_type: body.video_type,
        key_points: body.key_points,
        category_id: body.category_id,
        creator_relation_id: body.creator_relation_id,
        tags: body.tags,
    };

    Ok(Json(update_video(db, id, changes).await?))
}

#[delete("/videos/<id>")]
pub async fn api_delete_video(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Status, AppError> {
    user.require_permission(Permission::EditVideoLibrary)?;

    delete_video(db, id).await?;

    Ok(Status::NoContent)
}

#[post("/videos/<id>/progress", data = "<body>")]
pub async fn api_update_progress(
    id: i64,
    body: Json<ProgressRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<ProgressView>, AppError> {
    user.require_permission(Permission::BrowseVideos)?;

    let progress = upsert_progress(db, user.id, id, body.into_inner().into()).await?;

    Ok(Json(ProgressView::from(progress)))
}

#[get("/videos/progress/<video_id>")]
pub async fn api_get_progress(
    video_id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<ProgressView>, AppError> {
    user.require_permission(Permission::BrowseVideos)?;

    match get_progress(db, user.id, video_id).await? {
        Some(progress) => Ok(Json(ProgressView::from(progress))),
        None => Err(AppError::NotFound("Video progress not found".to_string())),
    }
}

#[put("/videos/<video_id>/set-creator/<creator_id>")]
pub async fn api_set_video_creator(
    video_id: i64,
    creator_id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Video>, AppError> {
    user.require_permission(Permission::EditVideoLibrary)?;

    Ok(Json(set_video_creator(db, video_id, creator_id).await?))
}
