use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use syndicate_common::{Result, Source, SyncState, SyncStatus, Target, TargetKind};

use crate::SyncStore;

#[derive(Debug, FromRow)]
struct SourceRow {
    id: Uuid,
    owner_id: Uuid,
    platform: String,
    handle: String,
    active: bool,
    sync_state: String,
    status_reason: Option<String>,
    last_synced_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<SourceRow> for Source {
    type Error = syndicate_common::SyncError;

    fn try_from(r: SourceRow) -> Result<Self> {
        Ok(Source {
            id: r.id,
            owner_id: r.owner_id,
            platform: r.platform,
            handle: r.handle,
            active: r.active,
            sync_state: r.sync_state.parse()?,
            status_reason: r.status_reason,
            last_synced_at: r.last_synced_at,
            created_at: r.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct TargetRow {
    id: Uuid,
    owner_id: Uuid,
    kind: String,
    host_url: Option<String>,
    base_id: Option<String>,
    active: bool,
    sync_state: String,
    status_reason: Option<String>,
    last_synced_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<TargetRow> for Target {
    type Error = syndicate_common::SyncError;

    fn try_from(r: TargetRow) -> Result<Self> {
        Ok(Target {
            id: r.id,
            owner_id: r.owner_id,
            kind: r.kind.parse()?,
            host_url: r.host_url,
            base_id: r.base_id,
            active: r.active,
            sync_state: r.sync_state.parse()?,
            status_reason: r.status_reason,
            last_synced_at: r.last_synced_at,
            created_at: r.created_at,
        })
    }
}

impl SyncStore {
    pub async fn create_source(
        &self,
        owner_id: Uuid,
        platform: &str,
        handle: &str,
    ) -> Result<Source> {
        let row = sqlx::query_as::<_, SourceRow>(
            r#"
            INSERT INTO sources (id, owner_id, platform, handle)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(platform)
        .bind(handle)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    pub async fn source_by_id(&self, id: Uuid) -> Result<Source> {
        let row = sqlx::query_as::<_, SourceRow>("SELECT * FROM sources WHERE id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        row.try_into()
    }

    /// Sources eligible for a scheduled pass.
    pub async fn active_sources(&self) -> Result<Vec<Source>> {
        let rows = sqlx::query_as::<_, SourceRow>(
            "SELECT * FROM sources WHERE active AND sync_state <> 'deactivated' ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    pub async fn sources_for_owner(&self, owner_id: Uuid) -> Result<Vec<Source>> {
        let rows = sqlx::query_as::<_, SourceRow>(
            "SELECT * FROM sources WHERE owner_id = $1 ORDER BY created_at",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Transition a source's sync state. `last_synced_at` is touched only on
    /// terminal transitions (Synced/Failed), per the status machine.
    pub async fn set_source_state(
        &self,
        id: Uuid,
        state: SyncState,
        reason: Option<&str>,
    ) -> Result<()> {
        let terminal = matches!(state, SyncState::Synced | SyncState::Failed);
        sqlx::query(
            r#"
            UPDATE sources
            SET sync_state = $2,
                status_reason = $3,
                last_synced_at = CASE WHEN $4 THEN now() ELSE last_synced_at END
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(state.as_str())
        .bind(reason)
        .bind(terminal)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn deactivate_source(&self, id: Uuid) -> Result<()> {
        sqlx::query(
            "UPDATE sources SET active = FALSE, sync_state = 'deactivated', status_reason = NULL WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Reactivation returns the source to Initialized, not straight to Syncing.
    pub async fn reactivate_source(&self, id: Uuid) -> Result<()> {
        sqlx::query(
            "UPDATE sources SET active = TRUE, sync_state = 'initialized', status_reason = NULL WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn source_status(&self, id: Uuid) -> Result<SyncStatus> {
        let source = self.source_by_id(id).await?;
        Ok(SyncStatus {
            state: source.sync_state,
            reason: source.status_reason,
            last_synced_at: source.last_synced_at,
        })
    }

    pub async fn create_target(
        &self,
        owner_id: Uuid,
        kind: TargetKind,
        host_url: Option<&str>,
        base_id: Option<&str>,
    ) -> Result<Target> {
        let row = sqlx::query_as::<_, TargetRow>(
            r#"
            INSERT INTO targets (id, owner_id, kind, host_url, base_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(kind.as_str())
        .bind(host_url)
        .bind(base_id)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    pub async fn target_by_id(&self, id: Uuid) -> Result<Target> {
        let row = sqlx::query_as::<_, TargetRow>("SELECT * FROM targets WHERE id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        row.try_into()
    }

    pub async fn active_targets(&self) -> Result<Vec<Target>> {
        let rows = sqlx::query_as::<_, TargetRow>(
            "SELECT * FROM targets WHERE active AND sync_state <> 'deactivated' ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    pub async fn set_target_state(
        &self,
        id: Uuid,
        state: SyncState,
        reason: Option<&str>,
    ) -> Result<()> {
        let terminal = matches!(state, SyncState::Synced | SyncState::Failed);
        sqlx::query(
            r#"
            UPDATE targets
            SET sync_state = $2,
                status_reason = $3,
                last_synced_at = CASE WHEN $4 THEN now() ELSE last_synced_at END
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(state.as_str())
        .bind(reason)
        .bind(terminal)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn target_status(&self, id: Uuid) -> Result<SyncStatus> {
        let target = self.target_by_id(id).await?;
        Ok(SyncStatus {
            state: target.sync_state,
            reason: target.status_reason,
            last_synced_at: target.last_synced_at,
        })
    }
}
