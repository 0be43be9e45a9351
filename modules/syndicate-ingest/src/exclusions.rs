use tracing::info;
use uuid::Uuid;

use syndicate_common::Result;

use crate::store::IngestStore;

/// Permanently exclude one platform identity for a source and purge its
/// history. The exclusion row is written first so a fetch racing this call
/// cannot resurrect the post after the purge. Returns how many posts were
/// removed (0 or 1 in practice).
pub async fn exclude(
    store: &dyn IngestStore,
    source_id: Uuid,
    platform_internal_id: &str,
) -> Result<u64> {
    store.add_exclusion(source_id, platform_internal_id).await?;
    let purged = store
        .delete_post_by_identity(source_id, platform_internal_id)
        .await?;

    info!(
        %source_id,
        internal_id = platform_internal_id,
        purged,
        "Excluded platform identity"
    );
    Ok(purged)
}
