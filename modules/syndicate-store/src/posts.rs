use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use syndicate_common::{Post, Result};

use crate::SyncStore;

#[derive(Debug, FromRow)]
struct PostRow {
    id: Uuid,
    source_id: Uuid,
    platform: String,
    platform_internal_id: String,
    created_at: DateTime<Utc>,
    last_synced_at: DateTime<Utc>,
    archived: bool,
    author: String,
    post_type: String,
    content: Option<String>,
    media: serde_json::Value,
}

impl From<PostRow> for Post {
    fn from(r: PostRow) -> Self {
        Post {
            id: r.id,
            source_id: r.source_id,
            platform: r.platform,
            platform_internal_id: r.platform_internal_id,
            created_at: r.created_at,
            last_synced_at: r.last_synced_at,
            archived: r.archived,
            author: r.author,
            post_type: r.post_type,
            content: r.content,
            media: serde_json::from_value(r.media).unwrap_or_default(),
        }
    }
}

/// A post joined with its most recent reaction snapshot, the row shape the
/// reconciler and the flat-file exporter both consume.
#[derive(Debug, Clone, FromRow)]
pub struct PostWithMetrics {
    pub id: Uuid,
    pub source_id: Uuid,
    pub platform: String,
    pub platform_internal_id: String,
    pub created_at: DateTime<Utc>,
    pub last_synced_at: DateTime<Utc>,
    pub archived: bool,
    pub author: String,
    pub post_type: String,
    pub content: Option<String>,
    pub reactions_synced_at: Option<DateTime<Utc>>,
    pub likes: Option<i32>,
    pub reposts: Option<i32>,
    pub views: Option<i32>,
}

/// All-time engagement totals over a source's latest snapshots.
#[derive(Debug, Clone, Copy, Default, FromRow)]
pub struct SourceTotals {
    pub total_posts: i64,
    pub total_likes: i64,
    pub total_reposts: i64,
    pub total_views: i64,
}

impl SyncStore {
    /// Natural-identity lookup: the dedup key across runs.
    pub async fn post_by_identity(
        &self,
        platform: &str,
        platform_internal_id: &str,
    ) -> Result<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>(
            "SELECT * FROM posts WHERE platform = $1 AND platform_internal_id = $2",
        )
        .bind(platform)
        .bind(platform_internal_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// First sighting of an identity. `created_at` is the platform-reported
    /// time and never changes afterwards.
    #[allow(clippy::too_many_arguments)]
    pub async fn insert_post(
        &self,
        source_id: Uuid,
        platform: &str,
        platform_internal_id: &str,
        created_at: DateTime<Utc>,
        author: &str,
        post_type: &str,
        content: Option<&str>,
        media: &[String],
    ) -> Result<Uuid> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO posts
                (id, source_id, platform, platform_internal_id, created_at,
                 last_synced_at, archived, author, post_type, content, media)
            VALUES ($1, $2, $3, $4, $5, now(), FALSE, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(source_id)
        .bind(platform)
        .bind(platform_internal_id)
        .bind(created_at)
        .bind(author)
        .bind(post_type)
        .bind(content)
        .bind(serde_json::json!(media))
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    /// Later sighting of a known identity: refresh mutable fields, clear the
    /// archived flag, advance `last_synced_at`. Identity and `created_at`
    /// are preserved.
    pub async fn update_post(
        &self,
        id: Uuid,
        author: &str,
        post_type: &str,
        content: Option<&str>,
        media: &[String],
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE posts
            SET author = $2, post_type = $3, content = $4, media = $5,
                archived = FALSE, last_synced_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(author)
        .bind(post_type)
        .bind(content)
        .bind(serde_json::json!(media))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Hard delete (exclusion purge only). Mapping rows keep their remote id
    /// with a nulled local_id so the reconciler deletes the remote copy on
    /// its next pass.
    pub async fn delete_post_by_identity(
        &self,
        source_id: Uuid,
        platform_internal_id: &str,
    ) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        let ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT id FROM posts WHERE source_id = $1 AND platform_internal_id = $2",
        )
        .bind(source_id)
        .bind(platform_internal_id)
        .fetch_all(&mut *tx)
        .await?;

        for id in &ids {
            sqlx::query(
                "UPDATE entity_mappings SET local_id = NULL WHERE entity_kind = 'post' AND local_id = $1",
            )
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }

        let deleted = sqlx::query("DELETE FROM posts WHERE source_id = $1 AND platform_internal_id = $2")
            .bind(source_id)
            .bind(platform_internal_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(deleted)
    }

    /// Append one engagement snapshot. Always an insert: time-series, not
    /// current-state.
    pub async fn add_reaction(
        &self,
        post_id: Uuid,
        likes: Option<i32>,
        reposts: Option<i32>,
        views: Option<i32>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reaction_snapshots (id, post_id, synced_at, likes, reposts, views)
            VALUES ($1, $2, now(), $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(post_id)
        .bind(likes)
        .bind(reposts)
        .bind(views)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Every post of an owner with its latest snapshot metrics.
    pub async fn posts_with_metrics_for_owner(&self, owner_id: Uuid) -> Result<Vec<PostWithMetrics>> {
        let rows = sqlx::query_as::<_, PostWithMetrics>(
            r#"
            SELECT p.id, p.source_id, p.platform, p.platform_internal_id,
                   p.created_at, p.last_synced_at, p.archived, p.author,
                   p.post_type, p.content,
                   r.synced_at AS reactions_synced_at, r.likes, r.reposts, r.views
            FROM posts p
            JOIN sources s ON s.id = p.source_id
            LEFT JOIN LATERAL (
                SELECT synced_at, likes, reposts, views
                FROM reaction_snapshots
                WHERE post_id = p.id
                ORDER BY synced_at DESC
                LIMIT 1
            ) r ON TRUE
            WHERE s.owner_id = $1
            ORDER BY p.created_at
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Posts the platform stopped reporting: not sighted since the cutoff.
    /// Flagged archived, never removed.
    pub async fn archive_unseen(&self, source_id: Uuid, cutoff: DateTime<Utc>) -> Result<u64> {
        let archived = sqlx::query(
            r#"
            UPDATE posts
            SET archived = TRUE
            WHERE source_id = $1 AND last_synced_at < $2 AND NOT archived
            "#,
        )
        .bind(source_id)
        .bind(cutoff)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(archived)
    }

    /// Engagement totals across a source's latest snapshots, for the all-time
    /// profile averages.
    pub async fn source_totals(&self, source_id: Uuid) -> Result<SourceTotals> {
        let totals = sqlx::query_as::<_, SourceTotals>(
            r#"
            SELECT COUNT(p.id)                          AS total_posts,
                   COALESCE(SUM(r.likes), 0)::BIGINT    AS total_likes,
                   COALESCE(SUM(r.reposts), 0)::BIGINT  AS total_reposts,
                   COALESCE(SUM(r.views), 0)::BIGINT    AS total_views
            FROM posts p
            LEFT JOIN LATERAL (
                SELECT likes, reposts, views
                FROM reaction_snapshots
                WHERE post_id = p.id
                ORDER BY synced_at DESC
                LIMIT 1
            ) r ON TRUE
            WHERE p.source_id = $1
            "#,
        )
        .bind(source_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(totals)
    }
}
