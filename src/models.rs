use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::import::normalize::decode_stored_tags;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalStatus {
    Active,
    Completed,
    Archived,
}

impl GoalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalStatus::Active => "active",
            GoalStatus::Completed => "completed",
            GoalStatus::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(GoalStatus::Active),
            "completed" => Some(GoalStatus::Completed),
            "archived" => Some(GoalStatus::Archived),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Goal {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: GoalStatus,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
    pub user_id: i64,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbGoal {
    pub id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
    pub user_id: Option<i64>,
}

impl From<DbGoal> for Goal {
    fn from(goal: DbGoal) -> Self {
        Self {
            id: goal.id.unwrap_or_default(),
            title: goal.title.unwrap_or_default(),
            description: goal.description,
            status: goal
                .status
                .as_deref()
                .and_then(GoalStatus::parse)
                .unwrap_or(GoalStatus::Active),
            created_at: goal.created_at,
            updated_at: goal.updated_at,
            user_id: goal.user_id.unwrap_or_default(),
        }
    }
}

/// One goal's rating inside a game session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalProgressEntry {
    pub goal_id: i64,
    pub title: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub progress_rating: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GameSession {
    pub id: i64,
    pub date: Option<NaiveDateTime>,
    pub player_character: String,
    pub enemy_character: String,
    pub result: String,
    pub mood_rating: i64,
    pub goal_progress: Vec<GoalProgressEntry>,
    pub notes: Option<String>,
    pub user_id: i64,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbGameSession {
    pub id: Option<i64>,
    pub date: Option<NaiveDateTime>,
    pub player_character: Option<String>,
    pub enemy_character: Option<String>,
    pub result: Option<String>,
    pub mood_rating: Option<i64>,
    pub goal_progress: Option<String>,
    pub notes: Option<String>,
    pub user_id: Option<i64>,
}

impl From<DbGameSession> for GameSession {
    fn from(session: DbGameSession) -> Self {
        let goal_progress = session
            .goal_progress
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default();

        Self {
            id: session.id.unwrap_or_default(),
            date: session.date,
            player_character: session.player_character.unwrap_or_default(),
            enemy_character: session.enemy_character.unwrap_or_default(),
            result: session.result.unwrap_or_default(),
            mood_rating: session.mood_rating.unwrap_or_default(),
            goal_progress,
            notes: session.notes,
            user_id: session.user_id.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ChampionPoolEntry {
    pub id: i64,
    pub pool_id: i64,
    pub champion_id: String,
    pub champion_name: String,
    pub notes: Option<String>,
    pub category: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChampionPool {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub user_id: i64,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
    pub champions: Vec<ChampionPoolEntry>,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbChampionPool {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub user_id: Option<i64>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl DbChampionPool {
    pub fn with_champions(self, champions: Vec<ChampionPoolEntry>) -> ChampionPool {
        ChampionPool {
            id: self.id.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            description: self.description,
            category: self.category,
            user_id: self.user_id.unwrap_or_default(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            champions,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct VideoCategory {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Creator {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub website: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Video {
    pub id: i64,
    pub title: String,
    pub creator: Option<String>,
    pub creator_relation_id: Option<i64>,
    pub url: String,
    pub description: Option<String>,
    pub upload_date: Option<NaiveDateTime>,
    pub video_type: String,
    pub key_points: Option<String>,
    pub kemono_id: Option<String>,
    pub service: Option<String>,
    pub creator_id: Option<String>,
    pub added_date: Option<NaiveDateTime>,
    pub published_date: Option<NaiveDateTime>,
    pub tags: Vec<String>,
    pub category_id: Option<i64>,
}

#[derive(sqlx::FromRow, Clone, Default)]
pub struct DbVideo {
    pub id: Option<i64>,
    pub title: Option<String>,
    pub creator: Option<String>,
    pub creator_relation_id: Option<i64>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub upload_date: Option<NaiveDateTime>,
    pub video_type: Option<String>,
    pub key_points: Option<String>,
    pub kemono_id: Option<String>,
    pub service: Option<String>,
    pub creator_id: Option<String>,
    pub added_date: Option<NaiveDateTime>,
    pub published_date: Option<NaiveDateTime>,
    pub tags: Option<String>,
    pub category_id: Option<i64>,
}

impl From<DbVideo> for Video {
    fn from(video: DbVideo) -> Self {
        Self {
            id: video.id.unwrap_or_default(),
            title: video.title.unwrap_or_default(),
            creator: video.creator,
            creator_relation_id: video.creator_relation_id,
            url: video.url.unwrap_or_default(),
            description: video.description,
            upload_date: video.upload_date,
            video_type: video.video_type.unwrap_or_default(),
            key_points: video.key_points,
            kemono_id: video.kemono_id,
            service: video.service,
            creator_id: video.creator_id,
            added_date: video.added_date,
            published_date: video.published_date,
            tags: decode_stored_tags(video.tags.as_deref()),
            category_id: video.category_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct VideoProgress {
    pub id: i64,
    pub user_id: i64,
    pub video_id: i64,
    pub is_watched: bool,
    pub watch_progress: f64,
    pub personal_notes: Option<String>,
    pub is_bookmarked: bool,
    pub last_watched: Option<NaiveDateTime>,
}

/// Progress as sent to clients: stored names plus the aliases the frontend
/// writes with (`notes`, `position_seconds`, `is_completed`).
#[derive(Debug, Clone, Serialize)]
pub struct ProgressView {
    pub id: i64,
    pub user_id: i64,
    pub video_id: i64,
    pub is_watched: bool,
    pub watch_progress: f64,
    pub personal_notes: Option<String>,
    pub is_bookmarked: bool,
    pub last_watched: Option<NaiveDateTime>,
    pub notes: Option<String>,
    pub position_seconds: f64,
    pub is_completed: bool,
}

impl From<VideoProgress> for ProgressView {
    fn from(progress: VideoProgress) -> Self {
        Self {
            id: progress.id,
            user_id: progress.user_id,
            video_id: progress.video_id,
            is_watched: progress.is_watched,
            watch_progress: progress.watch_progress,
            notes: progress.personal_notes.clone(),
            personal_notes: progress.personal_notes,
            is_bookmarked: progress.is_bookmarked,
            last_watched: progress.last_watched,
            position_seconds: progress.watch_progress,
            is_completed: progress.is_watched,
        }
    }
}

/// A video with its related rows attached.
#[derive(Debug, Clone, Serialize)]
pub struct VideoDetail {
    #[serde(flatten)]
    pub video: Video,
    pub category: Option<VideoCategory>,
    pub creator_obj: Option<Creator>,
    pub progress_data: Option<ProgressView>,
}
