use sqlx::{Pool, Sqlite};
use tracing::{info, instrument, warn};

use crate::auth::{DbUser, Role, User};
use crate::error::AppError;

const USER_COLUMNS: &str = "id, username, email, role, is_active";

#[instrument(skip(pool))]
pub async fn get_user(pool: &Pool<Sqlite>, id: i64) -> Result<User, AppError> {
    info!("Getting user by id");
    let row = sqlx::query_as::<_, DbUser>(&format!(
        "SELECT {} FROM users WHERE id = ?",
        USER_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(user) => Ok(User::from(user)),
        _ => Err(AppError::NotFound(format!("User with id {} not found", id))),
    }
}

#[instrument(skip(pool))]
pub async fn get_user_by_username(pool: &Pool<Sqlite>, username: &str) -> Result<User, AppError> {
    info!("Getting user by username");
    let row = sqlx::query_as::<_, DbUser>(&format!(
        "SELECT {} FROM users WHERE username = ?",
        USER_COLUMNS
    ))
    .bind(username)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(user) => Ok(User::from(user)),
        _ => Err(AppError::NotFound(format!("User '{}' not found", username))),
    }
}

#[instrument(skip(pool))]
pub async fn list_users(pool: &Pool<Sqlite>, skip: i64, limit: i64) -> Result<Vec<User>, AppError> {
    info!("Listing users");
    let rows = sqlx::query_as::<_, DbUser>(&format!(
        "SELECT {} FROM users ORDER BY id LIMIT ? OFFSET ?",
        USER_COLUMNS
    ))
    .bind(limit)
    .bind(skip)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(User::from).collect())
}

async fn ensure_unique_identity(
    pool: &Pool<Sqlite>,
    username: Option<&str>,
    email: Option<&str>,
    exclude_id: Option<i64>,
) -> Result<(), AppError> {
    let exclude_id = exclude_id.unwrap_or(-1);

    if let Some(email) = email {
        let taken: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM users WHERE email = ? AND id != ?")
                .bind(email)
                .bind(exclude_id)
                .fetch_optional(pool)
                .await?;
        if taken.is_some() {
            return Err(AppError::Validation("Email already registered".to_string()));
        }
    }

    if let Some(username) = username {
        let taken: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM users WHERE username = ? AND id != ?")
                .bind(username)
                .bind(exclude_id)
                .fetch_optional(pool)
                .await?;
        if taken.is_some() {
            return Err(AppError::Validation("Username already taken".to_string()));
        }
    }

    Ok(())
}

#[instrument(skip(pool, password))]
pub async fn create_user(
    pool: &Pool<Sqlite>,
    username: &str,
    email: &str,
    password: &str,
    role: Role,
) -> Result<i64, AppError> {
    info!("Creating new user");

    ensure_unique_identity(pool, Some(username), Some(email), None).await?;

    let hashed_password = bcrypt::hash(password, bcrypt::DEFAULT_COST)?;

    let res = sqlx::query(
        "INSERT INTO users (username, email, hashed_password, role) VALUES (?, ?, ?, ?)",
    )
    .bind(username)
    .bind(email)
    .bind(hashed_password)
    .bind(role.as_str())
    .execute(pool)
    .await?;

    Ok(res.last_insert_rowid())
}

/// Returns the user when the credentials match an active account.
#[instrument(skip(pool, password))]
pub async fn authenticate_user(
    pool: &Pool<Sqlite>,
    username: &str,
    password: &str,
) -> Result<Option<User>, AppError> {
    info!("Authenticating user");

    let row: Option<(i64, String, bool)> =
        sqlx::query_as("SELECT id, hashed_password, is_active FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(pool)
            .await?;

    let Some((id, hashed_password, is_active)) = row else {
        return Ok(None);
    };

    if !bcrypt::verify(password, &hashed_password).unwrap_or(false) {
        warn!("Password mismatch");
        return Ok(None);
    }

    if !is_active {
        warn!("Login attempt for inactive user");
        return Ok(None);
    }

    get_user(pool, id).await.map(Some)
}

/// Fields a user may change on their own account.
#[derive(Debug, Default, Clone)]
pub struct ProfileChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub current_password: Option<String>,
}

#[instrument(skip(pool, changes), fields(user_id))]
pub async fn update_profile(
    pool: &Pool<Sqlite>,
    user_id: i64,
    changes: ProfileChanges,
) -> Result<User, AppError> {
    info!("Updating user profile");

    ensure_unique_identity(
        pool,
        changes.username.as_deref(),
        changes.email.as_deref(),
        Some(user_id),
    )
    .await?;

    let new_hash = match changes.password.as_deref() {
        Some(password) => {
            let Some(current) = changes.current_password.as_deref() else {
                return Err(AppError::Validation(
                    "Current password is required to set a new password".to_string(),
                ));
            };

            let (stored,): (String,) =
                sqlx::query_as("SELECT hashed_password FROM users WHERE id = ?")
                    .bind(user_id)
                    .fetch_one(pool)
                    .await?;

            if !bcrypt::verify(current, &stored).unwrap_or(false) {
                return Err(AppError::Validation(
                    "Current password is incorrect".to_string(),
                ));
            }

            Some(bcrypt::hash(password, bcrypt::DEFAULT_COST)?)
        }
        None => None,
    };

    sqlx::query(
        "UPDATE users SET
            username = COALESCE(?, username),
            email = COALESCE(?, email),
            hashed_password = COALESCE(?, hashed_password)
         WHERE id = ?",
    )
    .bind(changes.username)
    .bind(changes.email)
    .bind(new_hash)
    .bind(user_id)
    .execute(pool)
    .await?;

    get_user(pool, user_id).await
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminProvision {
    Created(i64),
    Promoted(i64),
    Unchanged(i64),
}

/// Makes sure an active admin named `username` exists. Existing accounts keep
/// their password; only role and active flag are corrected.
#[instrument(skip(pool, password))]
pub async fn provision_admin(
    pool: &Pool<Sqlite>,
    username: &str,
    email: &str,
    password: &str,
) -> Result<AdminProvision, AppError> {
    info!("Provisioning admin account");

    match get_user_by_username(pool, username).await {
        Ok(user) if user.role == Role::Admin && user.is_active => {
            Ok(AdminProvision::Unchanged(user.id))
        }
        Ok(user) => {
            sqlx::query("UPDATE users SET role = ?, is_active = TRUE WHERE id = ?")
                .bind(Role::Admin.as_str())
                .bind(user.id)
                .execute(pool)
                .await?;
            Ok(AdminProvision::Promoted(user.id))
        }
        Err(AppError::NotFound(_)) => {
            let id = create_user(pool, username, email, password, Role::Admin).await?;
            Ok(AdminProvision::Created(id))
        }
        Err(err) => Err(err),
    }
}
