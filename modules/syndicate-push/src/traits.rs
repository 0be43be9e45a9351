use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use syndicate_common::{
    EntityKind, EntityMapping, PageStatSnapshot, Result, SiteStatSnapshot, Source,
    SourceStatSnapshot,
};
use syndicate_store::{PostWithMetrics, SyncStore};

/// One local row ready for transmission. `natural_key` round-trips through
/// the remote row so create responses can be matched back to locals even
/// when the remote reorders the batch.
#[derive(Debug, Clone)]
pub struct OutgoingRecord {
    pub local_id: Uuid,
    pub natural_key: String,
    pub fields: Value,
}

/// A remote row the target reports as created, in no particular order.
#[derive(Debug, Clone)]
pub struct RemoteCreated {
    pub remote_id: String,
    pub natural_key: String,
}

/// Batched write surface of one external target. A non-success return means
/// the target applied nothing from that batch.
#[async_trait]
pub trait TargetAdapter: Send + Sync {
    async fn create_batch(
        &self,
        kind: EntityKind,
        records: &[OutgoingRecord],
    ) -> Result<Vec<RemoteCreated>>;

    async fn update_batch(&self, kind: EntityKind, records: &[(String, Value)]) -> Result<()>;

    async fn delete_batch(&self, kind: EntityKind, remote_ids: &[String]) -> Result<()>;

    /// Attach freshly created child rows to their owning source's remote row.
    async fn link_children(
        &self,
        parent_remote_id: &str,
        child_kind: EntityKind,
        child_remote_ids: &[String],
    ) -> Result<()>;
}

/// The reconciler's durable memory of what it has pushed where.
#[async_trait]
pub trait MappingStore: Send + Sync {
    async fn mappings_for(&self, kind: EntityKind, target_id: Uuid) -> Result<Vec<EntityMapping>>;

    async fn add_mapping(
        &self,
        kind: EntityKind,
        target_id: Uuid,
        local_id: Uuid,
        target_record_id: &str,
    ) -> Result<()>;

    async fn touch_mapping(&self, id: Uuid) -> Result<()>;

    async fn remove_mapping(&self, id: Uuid) -> Result<()>;

    async fn child_mappings_for_source(
        &self,
        kind: EntityKind,
        target_id: Uuid,
        source_id: Uuid,
    ) -> Result<Vec<EntityMapping>>;
}

/// Read surface over the canonical history the reconciler diffs against.
#[async_trait]
pub trait LocalSnapshot: Send + Sync {
    async fn sources(&self, owner_id: Uuid) -> Result<Vec<Source>>;

    async fn posts(&self, owner_id: Uuid) -> Result<Vec<PostWithMetrics>>;

    async fn site_stats(&self, source_id: Uuid) -> Result<Vec<SiteStatSnapshot>>;

    async fn page_stats(&self, source_id: Uuid) -> Result<Vec<PageStatSnapshot>>;

    async fn source_stats(&self, source_id: Uuid) -> Result<Vec<SourceStatSnapshot>>;
}

#[async_trait]
impl MappingStore for SyncStore {
    async fn mappings_for(&self, kind: EntityKind, target_id: Uuid) -> Result<Vec<EntityMapping>> {
        SyncStore::mappings_for(self, kind, target_id).await
    }

    async fn add_mapping(
        &self,
        kind: EntityKind,
        target_id: Uuid,
        local_id: Uuid,
        target_record_id: &str,
    ) -> Result<()> {
        SyncStore::add_mapping(self, kind, target_id, local_id, target_record_id).await
    }

    async fn touch_mapping(&self, id: Uuid) -> Result<()> {
        SyncStore::touch_mapping(self, id).await
    }

    async fn remove_mapping(&self, id: Uuid) -> Result<()> {
        SyncStore::remove_mapping(self, id).await
    }

    async fn child_mappings_for_source(
        &self,
        kind: EntityKind,
        target_id: Uuid,
        source_id: Uuid,
    ) -> Result<Vec<EntityMapping>> {
        SyncStore::child_mappings_for_source(self, kind, target_id, source_id).await
    }
}

#[async_trait]
impl LocalSnapshot for SyncStore {
    async fn sources(&self, owner_id: Uuid) -> Result<Vec<Source>> {
        self.sources_for_owner(owner_id).await
    }

    async fn posts(&self, owner_id: Uuid) -> Result<Vec<PostWithMetrics>> {
        self.posts_with_metrics_for_owner(owner_id).await
    }

    async fn site_stats(&self, source_id: Uuid) -> Result<Vec<SiteStatSnapshot>> {
        self.site_stats_for_source(source_id).await
    }

    async fn page_stats(&self, source_id: Uuid) -> Result<Vec<PageStatSnapshot>> {
        self.page_stats_for_source(source_id).await
    }

    async fn source_stats(&self, source_id: Uuid) -> Result<Vec<SourceStatSnapshot>> {
        self.source_stats_for_source(source_id).await
    }
}
