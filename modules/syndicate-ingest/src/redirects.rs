use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::info;

use syndicate_common::{Redirect, Result, Source};

use crate::store::IngestStore;

/// Minimum re-fetch window after a redirect is removed. The window grows
/// with the source's age so history split across both paths gets rebuilt.
const BACKFILL_BASE_DAYS: i64 = 730;

/// Outcome of removing a redirect: how many consolidated rows were purged
/// and how far back the next analytics fetch must reach.
#[derive(Debug, Clone, Copy)]
pub struct RedirectRemoval {
    pub purged: u64,
    pub backfill_days: i64,
}

/// Fold historical page stats from the redirect's old path into its new one.
///
/// For each date where both paths have a row, views are summed into the new
/// path's row and the old row is deleted; dates where only the old path has
/// a row are renamed in place. Runs once when the redirect is created;
/// future ingests report under the new path already.
pub async fn consolidate(store: &dyn IngestStore, redirect: &Redirect) -> Result<()> {
    let stats = store.page_stats_for_source(redirect.source_id).await?;

    let mut by_date = HashMap::new();
    for stat in &stats {
        if stat.path == redirect.to_path {
            by_date.insert(stat.date, stat.id);
        }
    }

    let mut merged = 0u64;
    let mut renamed = 0u64;
    for stat in &stats {
        if stat.path != redirect.from_path {
            continue;
        }
        match by_date.get(&stat.date) {
            Some(&target_id) => {
                store.merge_page_stat_into(stat.id, target_id).await?;
                merged += 1;
            }
            None => {
                store.rename_page_stat_path(stat.id, &redirect.to_path).await?;
                renamed += 1;
            }
        }
    }

    info!(
        source_id = %redirect.source_id,
        from = %redirect.from_path,
        to = %redirect.to_path,
        merged,
        renamed,
        "Consolidated page stats across redirect"
    );
    Ok(())
}

/// Undo a redirect's consolidation. Merged rows cannot be split apart again,
/// so history on both paths is purged and the caller re-fetches a window
/// deep enough to cover the source's whole lifetime.
pub async fn remove(
    store: &dyn IngestStore,
    redirect: &Redirect,
    source: &Source,
) -> Result<RedirectRemoval> {
    let mut purged = store
        .delete_page_stats_by_path(redirect.source_id, &redirect.from_path)
        .await?;
    purged += store
        .delete_page_stats_by_path(redirect.source_id, &redirect.to_path)
        .await?;

    let backfill_days = backfill_window_days(source.created_at, Utc::now());

    info!(
        source_id = %redirect.source_id,
        from = %redirect.from_path,
        to = %redirect.to_path,
        purged,
        backfill_days,
        "Removed redirect and purged consolidated history"
    );

    Ok(RedirectRemoval {
        purged,
        backfill_days,
    })
}

fn backfill_window_days(source_created_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let age_days = (now - source_created_at).num_days().max(0);
    BACKFILL_BASE_DAYS + age_days
}
