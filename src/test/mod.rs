mod api;
mod client;
mod config;
mod sessions;
mod utils;

pub use utils::{test_db, test_utils};
