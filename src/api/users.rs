use chrono::{Duration, Utc};
use rocket::State;
use rocket::FromForm;
use rocket::form::Form;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};
use validator::Validate;

use crate::auth::{BearerToken, Permission, Role, User, UserSession};
use crate::db::{
    ProfileChanges, authenticate_user, create_user, create_user_session, get_user,
    invalidate_session, list_users, update_profile,
};
use crate::env::AppConfig;
use crate::error::AppError;

#[derive(FromForm)]
pub struct TokenForm {
    username: String,
    password: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 3, max = 50, message = "Username must be between 3 and 50 characters"))]
    pub username: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[serde(default)]
    pub is_admin: bool,
}

#[derive(Deserialize, Validate)]
pub struct UpdateMeRequest {
    #[validate(length(min = 3, max = 50, message = "Username must be between 3 and 50 characters"))]
    pub username: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    pub current_password: Option<String>,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub new_password: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct UserData {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: String,
    pub is_active: bool,
    pub is_admin: bool,
}

impl From<User> for UserData {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            is_admin: user.role == Role::Admin,
            role: user.role.to_string(),
            username: user.username,
            email: user.email,
            is_active: user.is_active,
        }
    }
}

#[post("/token", data = "<form>")]
pub async fn api_login(
    form: Form<TokenForm>,
    db: &State<Pool<Sqlite>>,
    config: &State<AppConfig>,
) -> Result<Json<TokenResponse>, AppError> {
    let Some(user) = authenticate_user(db, &form.username, &form.password).await? else {
        return Err(AppError::Authentication(
            "Incorrect username or password".to_string(),
        ));
    };

    let token = UserSession::generate_token();
    let expires_at = Utc::now() + Duration::minutes(config.token_ttl_minutes);

    create_user_session(db, user.id, &token, expires_at.naive_utc()).await?;

    Ok(Json(TokenResponse {
        access_token: token,
        token_type: "bearer".to_string(),
    }))
}

#[post("/logout")]
pub async fn api_logout(
    token: BearerToken,
    _user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<MessageResponse>, AppError> {
    invalidate_session(db, &token.0).await?;

    Ok(Json(MessageResponse {
        message: "Logged out".to_string(),
    }))
}

#[post("/users", data = "<body>")]
pub async fn api_register_user(
    body: Json<CreateUserRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Custom<Json<UserData>>, AppError> {
    user.require_permission(Permission::ManageUsers)?;
    body.validate()?;

    let role = if body.is_admin { Role::Admin } else { Role::Player };
    let id = create_user(db, &body.username, &body.email, &body.password, role).await?;
    let created = get_user(db, id).await?;

    Ok(Custom(Status::Created, Json(UserData::from(created))))
}

#[get("/users?<skip>&<limit>")]
pub async fn api_get_users(
    skip: Option<i64>,
    limit: Option<i64>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<UserData>>, AppError> {
    user.require_permission(Permission::ManageUsers)?;

    let users = list_users(db, skip.unwrap_or(0), limit.unwrap_or(100)).await?;

    Ok(Json(users.into_iter().map(UserData::from).collect()))
}

#[get("/users/me")]
pub async fn api_me(user: User) -> Json<UserData> {
    Json(UserData::from(user))
}

#[put("/users/me", data = "<body>")]
pub async fn api_update_me(
    body: Json<UpdateMeRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<UserData>, AppError> {
    user.require_permission(Permission::EditOwnProfile)?;
    body.validate()?;

    let body = body.into_inner();
    let updated = update_profile(
        db,
        user.id,
        ProfileChanges {
            username: body.username,
            email: body.email,
            password: body.new_password,
            current_password: body.current_password,
        },
    )
    .await?;

    Ok(Json(UserData::from(updated)))
}

#[get("/users/<id>")]
pub async fn api_get_user(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<UserData>, AppError> {
    if user.id != id {
        user.require_permission(Permission::ManageUsers)?;
    }

    Ok(Json(UserData::from(get_user(db, id).await?)))
}
