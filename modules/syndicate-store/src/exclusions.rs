use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use syndicate_common::{Exclusion, Redirect, Result};

use crate::SyncStore;

#[derive(Debug, FromRow)]
struct ExclusionRow {
    id: Uuid,
    source_id: Uuid,
    platform_internal_id: String,
    created_at: DateTime<Utc>,
}

impl From<ExclusionRow> for Exclusion {
    fn from(r: ExclusionRow) -> Self {
        Exclusion {
            id: r.id,
            source_id: r.source_id,
            platform_internal_id: r.platform_internal_id,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct RedirectRow {
    id: Uuid,
    source_id: Uuid,
    from_path: String,
    to_path: String,
    created_at: DateTime<Utc>,
}

impl From<RedirectRow> for Redirect {
    fn from(r: RedirectRow) -> Self {
        Redirect {
            id: r.id,
            source_id: r.source_id,
            from_path: r.from_path,
            to_path: r.to_path,
            created_at: r.created_at,
        }
    }
}

impl SyncStore {
    pub async fn add_exclusion(&self, source_id: Uuid, platform_internal_id: &str) -> Result<Exclusion> {
        let row = sqlx::query_as::<_, ExclusionRow>(
            r#"
            INSERT INTO exclusions (id, source_id, platform_internal_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (source_id, platform_internal_id) DO UPDATE
            SET platform_internal_id = EXCLUDED.platform_internal_id
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(source_id)
        .bind(platform_internal_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    pub async fn remove_exclusion(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM exclusions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// The identities ingestion must silently skip for this source.
    pub async fn excluded_ids_for_source(&self, source_id: Uuid) -> Result<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT platform_internal_id FROM exclusions WHERE source_id = $1",
        )
        .bind(source_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    pub async fn create_redirect(
        &self,
        source_id: Uuid,
        from_path: &str,
        to_path: &str,
    ) -> Result<Redirect> {
        let row = sqlx::query_as::<_, RedirectRow>(
            r#"
            INSERT INTO redirects (id, source_id, from_path, to_path)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(source_id)
        .bind(from_path)
        .bind(to_path)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    pub async fn redirect_by_id(&self, id: Uuid) -> Result<Redirect> {
        let row = sqlx::query_as::<_, RedirectRow>("SELECT * FROM redirects WHERE id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    pub async fn redirects_for_source(&self, source_id: Uuid) -> Result<Vec<Redirect>> {
        let rows = sqlx::query_as::<_, RedirectRow>(
            "SELECT * FROM redirects WHERE source_id = $1 ORDER BY created_at",
        )
        .bind(source_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn delete_redirect(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM redirects WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
