//! The kemono import pipeline: fetch, normalize, dedupe, categorize, persist,
//! then derive creators from what was stored.

pub mod backfill;
pub mod categories;
pub mod client;
pub mod normalize;
pub mod orchestrator;

pub use backfill::backfill_creators;
pub use categories::{CategoryResolver, CategoryTable, CategoryTableError};
pub use client::{ContentSource, ContentSourceHandle, KemonoClient, collect_pages};
pub use normalize::{KemonoPost, NormalizedVideo, VideoType, normalize};
pub use orchestrator::{
    DEFAULT_SERVICE, ImportOutcome, ImportReport, Importer, RecategorizeReport,
    recategorize_uncategorized,
};
