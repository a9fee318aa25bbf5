use std::collections::BTreeSet;

use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

use crate::db::{
    CreatorFields, all_video_creators, create_creator, find_creator_by_name, link_video_creator,
    unlinked_video_creators,
};
use crate::error::AppError;
use crate::models::Creator;

/// Derives Creator rows from the free-text creator field of every video and
/// links videos that have no creator yet. Safe to run repeatedly.
#[instrument(skip(pool))]
pub async fn backfill_creators(pool: &Pool<Sqlite>) -> Result<Vec<Creator>, AppError> {
    let names: BTreeSet<String> = all_video_creators(pool)
        .await?
        .iter()
        .map(|creator| creator.trim())
        .filter(|creator| !creator.is_empty())
        .map(str::to_string)
        .collect();

    info!(count = names.len(), "Backfilling creators");

    let unlinked = unlinked_video_creators(pool).await?;
    let mut processed = Vec::with_capacity(names.len());
    let mut created = 0;
    let mut linked = 0;

    for name in names {
        let creator = match find_creator_by_name(pool, &name).await? {
            Some(existing) => existing,
            None => {
                created += 1;
                create_creator(
                    pool,
                    CreatorFields {
                        name: name.clone(),
                        description: None,
                        website: None,
                    },
                )
                .await?
            }
        };

        for (video_id, _) in unlinked.iter().filter(|(_, raw)| raw.trim() == name) {
            if link_video_creator(pool, *video_id, creator.id).await? {
                linked += 1;
            }
        }

        processed.push(creator);
    }

    info!(created, linked, "Creator backfill finished");

    Ok(processed)
}
