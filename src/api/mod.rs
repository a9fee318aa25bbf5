use rocket::Route;
use rocket::serde::json::Json;
use serde::Serialize;

pub mod categories;
pub mod champion_pools;
pub mod creators;
pub mod game_sessions;
pub mod goals;
pub mod kemono;
pub mod users;
pub mod videos;

use categories::*;
use champion_pools::*;
use creators::*;
use game_sessions::*;
use goals::*;
use kemono::*;
use users::*;
use videos::*;

#[derive(Serialize)]
pub struct IndexResponse {
    pub message: &'static str,
}

#[get("/")]
pub fn index() -> Json<IndexResponse> {
    Json(IndexResponse {
        message: "Welcome to the LoL Improve API",
    })
}

#[get("/health")]
pub fn health() -> &'static str {
    "OK"
}

pub fn routes() -> Vec<Route> {
    routes![
        index,
        health,
        // users
        api_login,
        api_logout,
        api_register_user,
        api_get_users,
        api_me,
        api_update_me,
        api_get_user,
        // game sessions
        api_create_game_session,
        api_get_game_sessions,
        api_get_game_session,
        api_update_game_session,
        api_delete_game_session,
        // goals
        api_create_goal,
        api_get_goals,
        api_get_goal,
        api_update_goal,
        api_update_goal_status,
        api_delete_goal,
        // champion pools
        api_create_champion_pool,
        api_get_champion_pools,
        api_get_all_champions,
        api_get_champions_by_category,
        api_get_champion_pool,
        api_update_champion_pool,
        api_delete_champion_pool,
        api_add_champion,
        api_remove_champion,
        // video library
        api_create_category,
        api_get_categories,
        api_get_category,
        api_update_category,
        api_delete_category,
        api_create_creator,
        api_get_creators,
        api_get_creator,
        api_update_creator,
        api_delete_creator,
        api_get_creator_videos,
        api_migrate_creators,
        api_create_video,
        api_bulk_import_videos,
        api_get_videos,
        api_search_videos,
        api_get_recently_watched,
        api_get_bookmarked,
        api_get_video,
        api_update_video,
        api_delete_video,
        api_update_progress,
        api_get_progress,
        api_set_video_creator,
        // kemono
        api_kemono_import,
        api_kemono_preview,
        api_update_categories,
    ]
}
