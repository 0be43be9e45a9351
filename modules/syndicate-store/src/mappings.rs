use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use syndicate_common::{EntityKind, EntityMapping, Result};

use crate::SyncStore;

#[derive(Debug, FromRow)]
struct MappingRow {
    id: Uuid,
    entity_kind: String,
    target_id: Uuid,
    local_id: Option<Uuid>,
    target_record_id: String,
    synced_at: DateTime<Utc>,
}

impl TryFrom<MappingRow> for EntityMapping {
    type Error = syndicate_common::SyncError;

    fn try_from(r: MappingRow) -> Result<Self> {
        Ok(EntityMapping {
            id: r.id,
            entity_kind: r.entity_kind.parse()?,
            target_id: r.target_id,
            local_id: r.local_id,
            target_record_id: r.target_record_id,
            synced_at: r.synced_at,
        })
    }
}

impl SyncStore {
    pub async fn mappings_for(&self, kind: EntityKind, target_id: Uuid) -> Result<Vec<EntityMapping>> {
        let rows = sqlx::query_as::<_, MappingRow>(
            "SELECT * FROM entity_mappings WHERE entity_kind = $1 AND target_id = $2",
        )
        .bind(kind.as_str())
        .bind(target_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Record a freshly created remote row. At most one mapping per
    /// `(kind, target, local)`: a re-push of the same local row is a bug in
    /// the partitioning, so the unique constraint is allowed to surface it.
    pub async fn add_mapping(
        &self,
        kind: EntityKind,
        target_id: Uuid,
        local_id: Uuid,
        target_record_id: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO entity_mappings (id, entity_kind, target_id, local_id, target_record_id, synced_at)
            VALUES ($1, $2, $3, $4, $5, now())
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(kind.as_str())
        .bind(target_id)
        .bind(local_id)
        .bind(target_record_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Advance a mapping's synced_at after a successful remote update.
    pub async fn touch_mapping(&self, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE entity_mappings SET synced_at = now() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Remove a mapping row. Only called after the remote delete for
    /// its batch succeeded.
    pub async fn remove_mapping(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM entity_mappings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Mapping rows of one source's child rows on a target, used by the
    /// detach cascade.
    pub async fn child_mappings_for_source(
        &self,
        kind: EntityKind,
        target_id: Uuid,
        source_id: Uuid,
    ) -> Result<Vec<EntityMapping>> {
        let sql = match kind {
            EntityKind::Post => {
                r#"
                SELECT m.* FROM entity_mappings m
                JOIN posts p ON p.id = m.local_id
                WHERE m.entity_kind = $1 AND m.target_id = $2 AND p.source_id = $3
                "#
            }
            EntityKind::SiteStat => {
                r#"
                SELECT m.* FROM entity_mappings m
                JOIN site_stats t ON t.id = m.local_id
                WHERE m.entity_kind = $1 AND m.target_id = $2 AND t.source_id = $3
                "#
            }
            EntityKind::PageStat => {
                r#"
                SELECT m.* FROM entity_mappings m
                JOIN page_stats t ON t.id = m.local_id
                WHERE m.entity_kind = $1 AND m.target_id = $2 AND t.source_id = $3
                "#
            }
            EntityKind::SourceStat => {
                r#"
                SELECT m.* FROM entity_mappings m
                JOIN source_stats t ON t.id = m.local_id
                WHERE m.entity_kind = $1 AND m.target_id = $2 AND t.source_id = $3
                "#
            }
            EntityKind::Source => {
                r#"
                SELECT m.* FROM entity_mappings m
                WHERE m.entity_kind = $1 AND m.target_id = $2 AND m.local_id = $3
                "#
            }
        };

        let rows = sqlx::query_as::<_, MappingRow>(sql)
            .bind(kind.as_str())
            .bind(target_id)
            .bind(source_id)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }
}
