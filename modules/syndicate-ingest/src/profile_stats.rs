use chrono::Utc;
use uuid::Uuid;

use syndicate_common::{ProfileStats, Result};

use crate::store::IngestStore;

/// Upsert today's profile-stat snapshot for a source.
///
/// Post count and per-post averages are computed from the canonical post
/// history so they stay consistent with what was actually ingested. Fields
/// the platform reported directly (followers, or its own averages) win over
/// the computed values.
pub async fn record(
    store: &dyn IngestStore,
    source_id: Uuid,
    reported: ProfileStats,
) -> Result<()> {
    let totals = store.source_totals(source_id).await?;

    let avg = |total: i64| {
        if totals.total_posts > 0 {
            Some(total as f64 / totals.total_posts as f64)
        } else {
            None
        }
    };

    let stats = ProfileStats {
        posts_count: reported.posts_count.or(Some(totals.total_posts)),
        avg_likes: reported.avg_likes.or_else(|| avg(totals.total_likes)),
        avg_reposts: reported.avg_reposts.or_else(|| avg(totals.total_reposts)),
        avg_views: reported.avg_views.or_else(|| avg(totals.total_views)),
        ..reported
    };

    store
        .upsert_source_stat(source_id, Utc::now().date_naive(), &stats)
        .await
}
