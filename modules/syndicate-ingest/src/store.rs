// Trait abstraction over the canonical store: all ingest-side persistence
// behind one seam, so ingestion logic tests against an in-memory mock with no
// database.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use syndicate_common::{PageStatSnapshot, Post, ProfileStats, Result};
use syndicate_store::{SourceTotals, SyncStore};

/// One new post as handed over for insertion.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub source_id: Uuid,
    pub platform: String,
    pub platform_internal_id: String,
    pub created_at: DateTime<Utc>,
    pub author: String,
    pub post_type: String,
    pub content: Option<String>,
    pub media: Vec<String>,
}

#[async_trait]
pub trait IngestStore: Send + Sync {
    async fn post_by_identity(&self, platform: &str, internal_id: &str) -> Result<Option<Post>>;

    async fn insert_post(&self, post: NewPost) -> Result<Uuid>;

    async fn update_post(
        &self,
        id: Uuid,
        author: &str,
        post_type: &str,
        content: Option<&str>,
        media: &[String],
    ) -> Result<()>;

    async fn delete_post_by_identity(&self, source_id: Uuid, internal_id: &str) -> Result<u64>;

    async fn add_reaction(
        &self,
        post_id: Uuid,
        likes: Option<i32>,
        reposts: Option<i32>,
        views: Option<i32>,
    ) -> Result<()>;

    async fn excluded_ids(&self, source_id: Uuid) -> Result<Vec<String>>;

    async fn add_exclusion(&self, source_id: Uuid, internal_id: &str) -> Result<()>;

    async fn archive_unseen(&self, source_id: Uuid, cutoff: DateTime<Utc>) -> Result<u64>;

    async fn source_totals(&self, source_id: Uuid) -> Result<SourceTotals>;

    async fn upsert_source_stat(
        &self,
        source_id: Uuid,
        date: NaiveDate,
        stats: &ProfileStats,
    ) -> Result<()>;

    async fn upsert_site_stat(
        &self,
        source_id: Uuid,
        date: NaiveDate,
        visitors: i32,
        avg_session_duration: f64,
    ) -> Result<()>;

    async fn upsert_page_stat(
        &self,
        source_id: Uuid,
        date: NaiveDate,
        path: &str,
        views: i32,
    ) -> Result<()>;

    /// Whether any site-stat history exists yet. Analytics adapters use this
    /// to pick between an incremental fetch and a first-time deep backfill.
    async fn has_site_stats(&self, source_id: Uuid) -> Result<bool>;

    async fn page_stats_for_source(&self, source_id: Uuid) -> Result<Vec<PageStatSnapshot>>;

    async fn merge_page_stat_into(&self, stat_id: Uuid, target_stat_id: Uuid) -> Result<()>;

    async fn rename_page_stat_path(&self, stat_id: Uuid, path: &str) -> Result<()>;

    async fn delete_page_stats_by_path(&self, source_id: Uuid, path: &str) -> Result<u64>;
}

#[async_trait]
impl IngestStore for SyncStore {
    async fn post_by_identity(&self, platform: &str, internal_id: &str) -> Result<Option<Post>> {
        SyncStore::post_by_identity(self, platform, internal_id).await
    }

    async fn insert_post(&self, post: NewPost) -> Result<Uuid> {
        SyncStore::insert_post(
            self,
            post.source_id,
            &post.platform,
            &post.platform_internal_id,
            post.created_at,
            &post.author,
            &post.post_type,
            post.content.as_deref(),
            &post.media,
        )
        .await
    }

    async fn update_post(
        &self,
        id: Uuid,
        author: &str,
        post_type: &str,
        content: Option<&str>,
        media: &[String],
    ) -> Result<()> {
        SyncStore::update_post(self, id, author, post_type, content, media).await
    }

    async fn delete_post_by_identity(&self, source_id: Uuid, internal_id: &str) -> Result<u64> {
        SyncStore::delete_post_by_identity(self, source_id, internal_id).await
    }

    async fn add_reaction(
        &self,
        post_id: Uuid,
        likes: Option<i32>,
        reposts: Option<i32>,
        views: Option<i32>,
    ) -> Result<()> {
        SyncStore::add_reaction(self, post_id, likes, reposts, views).await
    }

    async fn excluded_ids(&self, source_id: Uuid) -> Result<Vec<String>> {
        SyncStore::excluded_ids_for_source(self, source_id).await
    }

    async fn add_exclusion(&self, source_id: Uuid, internal_id: &str) -> Result<()> {
        SyncStore::add_exclusion(self, source_id, internal_id).await?;
        Ok(())
    }

    async fn archive_unseen(&self, source_id: Uuid, cutoff: DateTime<Utc>) -> Result<u64> {
        SyncStore::archive_unseen(self, source_id, cutoff).await
    }

    async fn source_totals(&self, source_id: Uuid) -> Result<SourceTotals> {
        SyncStore::source_totals(self, source_id).await
    }

    async fn upsert_source_stat(
        &self,
        source_id: Uuid,
        date: NaiveDate,
        stats: &ProfileStats,
    ) -> Result<()> {
        SyncStore::upsert_source_stat(self, source_id, date, stats).await
    }

    async fn upsert_site_stat(
        &self,
        source_id: Uuid,
        date: NaiveDate,
        visitors: i32,
        avg_session_duration: f64,
    ) -> Result<()> {
        SyncStore::upsert_site_stat(self, source_id, date, visitors, avg_session_duration).await
    }

    async fn upsert_page_stat(
        &self,
        source_id: Uuid,
        date: NaiveDate,
        path: &str,
        views: i32,
    ) -> Result<()> {
        SyncStore::upsert_page_stat(self, source_id, date, path, views).await
    }

    async fn has_site_stats(&self, source_id: Uuid) -> Result<bool> {
        SyncStore::has_site_stats(self, source_id).await
    }

    async fn page_stats_for_source(&self, source_id: Uuid) -> Result<Vec<PageStatSnapshot>> {
        SyncStore::page_stats_for_source(self, source_id).await
    }

    async fn merge_page_stat_into(&self, stat_id: Uuid, target_stat_id: Uuid) -> Result<()> {
        SyncStore::merge_page_stat_into(self, stat_id, target_stat_id).await
    }

    async fn rename_page_stat_path(&self, stat_id: Uuid, path: &str) -> Result<()> {
        SyncStore::rename_page_stat_path(self, stat_id, path).await
    }

    async fn delete_page_stats_by_path(&self, source_id: Uuid, path: &str) -> Result<u64> {
        SyncStore::delete_page_stats_by_path(self, source_id, path).await
    }
}
