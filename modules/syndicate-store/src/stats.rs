use chrono::NaiveDate;
use sqlx::FromRow;
use uuid::Uuid;

use syndicate_common::{
    clamp_opt, PageStatSnapshot, ProfileStats, Result, SiteStatSnapshot, SourceStatSnapshot,
};

use crate::SyncStore;

#[derive(Debug, FromRow)]
struct SourceStatRow {
    id: Uuid,
    source_id: Uuid,
    date: NaiveDate,
    followers: Option<i32>,
    following: Option<i32>,
    posts_count: Option<i32>,
    avg_likes: Option<f64>,
    avg_reposts: Option<f64>,
    avg_views: Option<f64>,
}

impl From<SourceStatRow> for SourceStatSnapshot {
    fn from(r: SourceStatRow) -> Self {
        SourceStatSnapshot {
            id: r.id,
            source_id: r.source_id,
            date: r.date,
            followers: r.followers,
            following: r.following,
            posts_count: r.posts_count,
            avg_likes: r.avg_likes,
            avg_reposts: r.avg_reposts,
            avg_views: r.avg_views,
        }
    }
}

#[derive(Debug, FromRow)]
struct SiteStatRow {
    id: Uuid,
    source_id: Uuid,
    date: NaiveDate,
    visitors: i32,
    avg_session_duration: f64,
}

impl From<SiteStatRow> for SiteStatSnapshot {
    fn from(r: SiteStatRow) -> Self {
        SiteStatSnapshot {
            id: r.id,
            source_id: r.source_id,
            date: r.date,
            visitors: r.visitors,
            avg_session_duration: r.avg_session_duration,
        }
    }
}

#[derive(Debug, FromRow)]
struct PageStatRow {
    id: Uuid,
    source_id: Uuid,
    date: NaiveDate,
    path: String,
    views: i32,
}

impl From<PageStatRow> for PageStatSnapshot {
    fn from(r: PageStatRow) -> Self {
        PageStatSnapshot {
            id: r.id,
            source_id: r.source_id,
            date: r.date,
            path: r.path,
            views: r.views,
        }
    }
}

impl SyncStore {
    /// Upsert the per-day profile snapshot. A second write on the same
    /// calendar day updates the existing row, never inserting a duplicate.
    pub async fn upsert_source_stat(
        &self,
        source_id: Uuid,
        date: NaiveDate,
        stats: &ProfileStats,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO source_stats
                (id, source_id, date, followers, following, posts_count,
                 avg_likes, avg_reposts, avg_views)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (source_id, date) DO UPDATE
            SET followers = EXCLUDED.followers,
                following = EXCLUDED.following,
                posts_count = EXCLUDED.posts_count,
                avg_likes = EXCLUDED.avg_likes,
                avg_reposts = EXCLUDED.avg_reposts,
                avg_views = EXCLUDED.avg_views
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(source_id)
        .bind(date)
        .bind(clamp_opt(stats.followers))
        .bind(clamp_opt(stats.following))
        .bind(clamp_opt(stats.posts_count))
        .bind(stats.avg_likes)
        .bind(stats.avg_reposts)
        .bind(stats.avg_views)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn source_stats_for_source(&self, source_id: Uuid) -> Result<Vec<SourceStatSnapshot>> {
        let rows = sqlx::query_as::<_, SourceStatRow>(
            "SELECT * FROM source_stats WHERE source_id = $1 ORDER BY date",
        )
        .bind(source_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn upsert_site_stat(
        &self,
        source_id: Uuid,
        date: NaiveDate,
        visitors: i32,
        avg_session_duration: f64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO site_stats (id, source_id, date, visitors, avg_session_duration)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (source_id, date) DO UPDATE
            SET visitors = EXCLUDED.visitors,
                avg_session_duration = EXCLUDED.avg_session_duration
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(source_id)
        .bind(date)
        .bind(visitors)
        .bind(avg_session_duration)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn site_stats_for_source(&self, source_id: Uuid) -> Result<Vec<SiteStatSnapshot>> {
        let rows = sqlx::query_as::<_, SiteStatRow>(
            "SELECT * FROM site_stats WHERE source_id = $1 ORDER BY date",
        )
        .bind(source_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn upsert_page_stat(
        &self,
        source_id: Uuid,
        date: NaiveDate,
        path: &str,
        views: i32,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO page_stats (id, source_id, date, path, views)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (source_id, date, path) DO UPDATE
            SET views = EXCLUDED.views
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(source_id)
        .bind(date)
        .bind(path)
        .bind(views)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn page_stats_for_source(&self, source_id: Uuid) -> Result<Vec<PageStatSnapshot>> {
        let rows = sqlx::query_as::<_, PageStatRow>(
            "SELECT * FROM page_stats WHERE source_id = $1 ORDER BY date, path",
        )
        .bind(source_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Fold one page-stat row's views into another path on the same date,
    /// then drop the original (redirect consolidation).
    pub async fn merge_page_stat_into(
        &self,
        stat_id: Uuid,
        target_stat_id: Uuid,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE page_stats
            SET views = views + (SELECT views FROM page_stats WHERE id = $1)
            WHERE id = $2
            "#,
        )
        .bind(stat_id)
        .bind(target_stat_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE entity_mappings SET local_id = NULL WHERE entity_kind = 'page_stat' AND local_id = $1",
        )
        .bind(stat_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM page_stats WHERE id = $1")
            .bind(stat_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Rename a page-stat row's path in place (redirect consolidation when
    /// the new path has no row for that date yet).
    pub async fn rename_page_stat_path(&self, stat_id: Uuid, path: &str) -> Result<()> {
        sqlx::query("UPDATE page_stats SET path = $2 WHERE id = $1")
            .bind(stat_id)
            .bind(path)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Remove every page-stat row for a path, nulling mapping rows so remote
    /// copies get deleted next pass (redirect restore).
    pub async fn delete_page_stats_by_path(&self, source_id: Uuid, path: &str) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        let ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT id FROM page_stats WHERE source_id = $1 AND path = $2")
                .bind(source_id)
                .bind(path)
                .fetch_all(&mut *tx)
                .await?;

        for id in &ids {
            sqlx::query(
                "UPDATE entity_mappings SET local_id = NULL WHERE entity_kind = 'page_stat' AND local_id = $1",
            )
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }

        let deleted = sqlx::query("DELETE FROM page_stats WHERE source_id = $1 AND path = $2")
            .bind(source_id)
            .bind(path)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(deleted)
    }

    /// Whether a source has any site stats yet; the first analytics fetch uses a
    /// deep backfill window, later ones a short trailing window.
    pub async fn has_site_stats(&self, source_id: Uuid) -> Result<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM site_stats WHERE source_id = $1")
                .bind(source_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count > 0)
    }
}
