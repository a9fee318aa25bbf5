use chrono::Utc;
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

use crate::error::AppError;
use crate::models::{ChampionPool, ChampionPoolEntry, DbChampionPool};

const POOL_COLUMNS: &str = "id, name, description, category, user_id, created_at, updated_at";
const ENTRY_COLUMNS: &str = "id, pool_id, champion_id, champion_name, notes, category";
const DEFAULT_ENTRY_CATEGORY: &str = "blind";

#[derive(Debug, Clone)]
pub struct ChampionFields {
    pub champion_id: String,
    pub champion_name: String,
    pub notes: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewChampionPool {
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub champions: Vec<ChampionFields>,
}

/// Partial update; `champions`, when present, replaces the whole roster.
#[derive(Debug, Clone, Default)]
pub struct ChampionPoolChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub champions: Option<Vec<ChampionFields>>,
}

fn reject_duplicate_champions(champions: &[ChampionFields]) -> Result<(), AppError> {
    for (index, champion) in champions.iter().enumerate() {
        if champions[..index]
            .iter()
            .any(|earlier| earlier.champion_id == champion.champion_id)
        {
            return Err(AppError::Validation(format!(
                "Champion {} is listed more than once",
                champion.champion_id
            )));
        }
    }
    Ok(())
}

async fn insert_entries(
    conn: &mut sqlx::SqliteConnection,
    pool_id: i64,
    champions: &[ChampionFields],
) -> Result<(), AppError> {
    for champion in champions {
        sqlx::query(
            "INSERT INTO champion_pool_entries (pool_id, champion_id, champion_name, notes, category)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(pool_id)
        .bind(&champion.champion_id)
        .bind(&champion.champion_name)
        .bind(&champion.notes)
        .bind(
            champion
                .category
                .as_deref()
                .filter(|c| !c.is_empty())
                .unwrap_or(DEFAULT_ENTRY_CATEGORY),
        )
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn entries_for(pool: &Pool<Sqlite>, pool_id: i64) -> Result<Vec<ChampionPoolEntry>, AppError> {
    let entries = sqlx::query_as::<_, ChampionPoolEntry>(&format!(
        "SELECT {} FROM champion_pool_entries WHERE pool_id = ? ORDER BY id",
        ENTRY_COLUMNS
    ))
    .bind(pool_id)
    .fetch_all(pool)
    .await?;

    Ok(entries)
}

#[instrument(skip(pool, new_pool))]
pub async fn create_champion_pool(
    pool: &Pool<Sqlite>,
    user_id: i64,
    new_pool: NewChampionPool,
) -> Result<ChampionPool, AppError> {
    info!("Creating champion pool");

    reject_duplicate_champions(&new_pool.champions)?;

    let now = Utc::now().naive_utc();
    let mut tx = pool.begin().await?;

    let res = sqlx::query(
        "INSERT INTO champion_pools (name, description, category, user_id, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&new_pool.name)
    .bind(&new_pool.description)
    .bind(&new_pool.category)
    .bind(user_id)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    let pool_id = res.last_insert_rowid();
    insert_entries(&mut tx, pool_id, &new_pool.champions).await?;
    tx.commit().await?;

    get_champion_pool(pool, user_id, pool_id).await
}

#[instrument(skip(pool))]
pub async fn list_champion_pools(
    pool: &Pool<Sqlite>,
    user_id: i64,
    category: Option<&str>,
) -> Result<Vec<ChampionPool>, AppError> {
    info!("Listing champion pools");

    let rows = sqlx::query_as::<_, DbChampionPool>(&format!(
        "SELECT {} FROM champion_pools WHERE user_id = ? AND (? IS NULL OR category = ?) ORDER BY id",
        POOL_COLUMNS
    ))
    .bind(user_id)
    .bind(category)
    .bind(category)
    .fetch_all(pool)
    .await?;

    let mut pools = Vec::with_capacity(rows.len());
    for row in rows {
        let champions = entries_for(pool, row.id.unwrap_or_default()).await?;
        pools.push(row.with_champions(champions));
    }

    Ok(pools)
}

#[instrument(skip(pool))]
pub async fn get_champion_pool(
    pool: &Pool<Sqlite>,
    user_id: i64,
    pool_id: i64,
) -> Result<ChampionPool, AppError> {
    info!("Getting champion pool");

    let row = sqlx::query_as::<_, DbChampionPool>(&format!(
        "SELECT {} FROM champion_pools WHERE id = ? AND user_id = ?",
        POOL_COLUMNS
    ))
    .bind(pool_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let champions = entries_for(pool, pool_id).await?;
            Ok(row.with_champions(champions))
        }
        _ => Err(AppError::NotFound("Champion pool not found".to_string())),
    }
}

#[instrument(skip(pool, changes))]
pub async fn update_champion_pool(
    pool: &Pool<Sqlite>,
    user_id: i64,
    pool_id: i64,
    changes: ChampionPoolChanges,
) -> Result<ChampionPool, AppError> {
    info!("Updating champion pool");

    get_champion_pool(pool, user_id, pool_id).await?;

    if let Some(champions) = &changes.champions {
        reject_duplicate_champions(champions)?;
    }

    let mut tx = pool.begin().await?;

    sqlx::query(
        "UPDATE champion_pools SET
            name = COALESCE(?, name),
            description = COALESCE(?, description),
            category = COALESCE(?, category),
            updated_at = ?
         WHERE id = ? AND user_id = ?",
    )
    .bind(&changes.name)
    .bind(&changes.description)
    .bind(&changes.category)
    .bind(Utc::now().naive_utc())
    .bind(pool_id)
    .bind(user_id)
    .execute(&mut *tx)
    .await?;

    if let Some(champions) = &changes.champions {
        sqlx::query("DELETE FROM champion_pool_entries WHERE pool_id = ?")
            .bind(pool_id)
            .execute(&mut *tx)
            .await?;
        insert_entries(&mut tx, pool_id, champions).await?;
    }

    tx.commit().await?;

    get_champion_pool(pool, user_id, pool_id).await
}

#[instrument(skip(pool))]
pub async fn delete_champion_pool(
    pool: &Pool<Sqlite>,
    user_id: i64,
    pool_id: i64,
) -> Result<(), AppError> {
    info!("Deleting champion pool");

    get_champion_pool(pool, user_id, pool_id).await?;

    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM champion_pool_entries WHERE pool_id = ?")
        .bind(pool_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM champion_pools WHERE id = ?")
        .bind(pool_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(())
}

#[instrument(skip(pool, champion))]
pub async fn add_champion(
    pool: &Pool<Sqlite>,
    user_id: i64,
    pool_id: i64,
    champion: ChampionFields,
) -> Result<ChampionPoolEntry, AppError> {
    info!("Adding champion to pool");

    get_champion_pool(pool, user_id, pool_id).await?;

    let existing: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM champion_pool_entries WHERE pool_id = ? AND champion_id = ?")
            .bind(pool_id)
            .bind(&champion.champion_id)
            .fetch_optional(pool)
            .await?;

    if existing.is_some() {
        return Err(AppError::Validation(format!(
            "Champion {} is already in this pool",
            champion.champion_name
        )));
    }

    let mut conn = pool.acquire().await?;
    insert_entries(&mut conn, pool_id, std::slice::from_ref(&champion)).await?;
    drop(conn);

    let entry = sqlx::query_as::<_, ChampionPoolEntry>(&format!(
        "SELECT {} FROM champion_pool_entries WHERE pool_id = ? AND champion_id = ?",
        ENTRY_COLUMNS
    ))
    .bind(pool_id)
    .bind(&champion.champion_id)
    .fetch_one(pool)
    .await?;

    Ok(entry)
}

#[instrument(skip(pool))]
pub async fn remove_champion(
    pool: &Pool<Sqlite>,
    user_id: i64,
    pool_id: i64,
    champion_id: &str,
) -> Result<(), AppError> {
    info!("Removing champion from pool");

    get_champion_pool(pool, user_id, pool_id).await?;

    let res = sqlx::query("DELETE FROM champion_pool_entries WHERE pool_id = ? AND champion_id = ?")
        .bind(pool_id)
        .bind(champion_id)
        .execute(pool)
        .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::NotFound("Champion not found in pool".to_string()));
    }

    Ok(())
}

/// Every entry across the user's pools, optionally only pools of `category`.
#[instrument(skip(pool))]
pub async fn list_pooled_champions(
    pool: &Pool<Sqlite>,
    user_id: i64,
    category: Option<&str>,
) -> Result<Vec<ChampionPoolEntry>, AppError> {
    info!("Listing pooled champions");

    let entries = sqlx::query_as::<_, ChampionPoolEntry>(
        "SELECT e.id, e.pool_id, e.champion_id, e.champion_name, e.notes, e.category
         FROM champion_pool_entries e
         JOIN champion_pools p ON p.id = e.pool_id
         WHERE p.user_id = ? AND (? IS NULL OR p.category = ?)
         ORDER BY e.pool_id, e.id",
    )
    .bind(user_id)
    .bind(category)
    .bind(category)
    .fetch_all(pool)
    .await?;

    Ok(entries)
}
