//! In-memory stand-ins for the canonical store, used by unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use uuid::Uuid;

use syndicate_common::{
    PageStatSnapshot, Post, ProfileStats, ReactionSnapshot, Result, SiteStatSnapshot, Source,
    SyncState,
};
use syndicate_store::SourceTotals;

use crate::store::{IngestStore, NewPost};

pub fn ts(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn source_fixture(platform: &str) -> Source {
    Source {
        id: Uuid::new_v4(),
        owner_id: Uuid::new_v4(),
        platform: platform.to_string(),
        handle: "ferret.example".to_string(),
        active: true,
        sync_state: SyncState::Initialized,
        status_reason: None,
        last_synced_at: None,
        created_at: Utc::now(),
    }
}

#[derive(Default)]
struct Inner {
    posts: Vec<Post>,
    reactions: Vec<ReactionSnapshot>,
    exclusions: HashMap<Uuid, Vec<String>>,
    source_stats: HashMap<(Uuid, NaiveDate), ProfileStats>,
    site_stats: Vec<SiteStatSnapshot>,
    page_stats: Vec<PageStatSnapshot>,
}

/// MOCK: canonical store backed by vectors, matching the real store's
/// upsert and purge semantics closely enough for run-level tests.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    upsert_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn posts(&self) -> Vec<Post> {
        self.inner.lock().unwrap().posts.clone()
    }

    pub fn reactions(&self) -> Vec<ReactionSnapshot> {
        self.inner.lock().unwrap().reactions.clone()
    }

    pub fn source_stats(&self) -> Vec<ProfileStats> {
        self.inner.lock().unwrap().source_stats.values().cloned().collect()
    }

    pub fn site_stats(&self) -> Vec<SiteStatSnapshot> {
        self.inner.lock().unwrap().site_stats.clone()
    }

    /// How many insert or update calls reached the store.
    pub fn upsert_calls(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }

    pub fn add_exclusion_sync(&self, source_id: Uuid, internal_id: &str) {
        self.inner
            .lock()
            .unwrap()
            .exclusions
            .entry(source_id)
            .or_default()
            .push(internal_id.to_string());
    }
}

#[async_trait]
impl IngestStore for MemoryStore {
    async fn post_by_identity(&self, platform: &str, internal_id: &str) -> Result<Option<Post>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .posts
            .iter()
            .find(|p| p.platform == platform && p.platform_internal_id == internal_id)
            .cloned())
    }

    async fn insert_post(&self, post: NewPost) -> Result<Uuid> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        let id = Uuid::new_v4();
        self.inner.lock().unwrap().posts.push(Post {
            id,
            source_id: post.source_id,
            platform: post.platform,
            platform_internal_id: post.platform_internal_id,
            created_at: post.created_at,
            last_synced_at: Utc::now(),
            archived: false,
            author: post.author,
            post_type: post.post_type,
            content: post.content,
            media: post.media,
        });
        Ok(id)
    }

    async fn update_post(
        &self,
        id: Uuid,
        author: &str,
        post_type: &str,
        content: Option<&str>,
        media: &[String],
    ) -> Result<()> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        let mut inner = self.inner.lock().unwrap();
        if let Some(post) = inner.posts.iter_mut().find(|p| p.id == id) {
            post.author = author.to_string();
            post.post_type = post_type.to_string();
            post.content = content.map(str::to_string);
            post.media = media.to_vec();
            post.archived = false;
            post.last_synced_at = Utc::now();
        }
        Ok(())
    }

    async fn delete_post_by_identity(&self, source_id: Uuid, internal_id: &str) -> Result<u64> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.posts.len();
        let removed: Vec<Uuid> = inner
            .posts
            .iter()
            .filter(|p| p.source_id == source_id && p.platform_internal_id == internal_id)
            .map(|p| p.id)
            .collect();
        inner
            .posts
            .retain(|p| !(p.source_id == source_id && p.platform_internal_id == internal_id));
        inner.reactions.retain(|r| !removed.contains(&r.post_id));
        Ok((before - inner.posts.len()) as u64)
    }

    async fn add_reaction(
        &self,
        post_id: Uuid,
        likes: Option<i32>,
        reposts: Option<i32>,
        views: Option<i32>,
    ) -> Result<()> {
        self.inner.lock().unwrap().reactions.push(ReactionSnapshot {
            id: Uuid::new_v4(),
            post_id,
            synced_at: Utc::now(),
            likes,
            reposts,
            views,
        });
        Ok(())
    }

    async fn excluded_ids(&self, source_id: Uuid) -> Result<Vec<String>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.exclusions.get(&source_id).cloned().unwrap_or_default())
    }

    async fn add_exclusion(&self, source_id: Uuid, internal_id: &str) -> Result<()> {
        self.add_exclusion_sync(source_id, internal_id);
        Ok(())
    }

    async fn archive_unseen(&self, source_id: Uuid, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut inner = self.inner.lock().unwrap();
        let mut archived = 0;
        for post in inner.posts.iter_mut() {
            if post.source_id == source_id && !post.archived && post.last_synced_at < cutoff {
                post.archived = true;
                archived += 1;
            }
        }
        Ok(archived)
    }

    async fn source_totals(&self, source_id: Uuid) -> Result<SourceTotals> {
        let inner = self.inner.lock().unwrap();
        let mut totals = SourceTotals::default();
        for post in inner.posts.iter().filter(|p| p.source_id == source_id) {
            totals.total_posts += 1;
            // Latest snapshot per post, matching the lateral join in SQL.
            if let Some(latest) = inner
                .reactions
                .iter()
                .filter(|r| r.post_id == post.id)
                .max_by_key(|r| r.synced_at)
            {
                totals.total_likes += latest.likes.unwrap_or(0) as i64;
                totals.total_reposts += latest.reposts.unwrap_or(0) as i64;
                totals.total_views += latest.views.unwrap_or(0) as i64;
            }
        }
        Ok(totals)
    }

    async fn upsert_source_stat(
        &self,
        source_id: Uuid,
        date: NaiveDate,
        stats: &ProfileStats,
    ) -> Result<()> {
        self.inner
            .lock()
            .unwrap()
            .source_stats
            .insert((source_id, date), stats.clone());
        Ok(())
    }

    async fn upsert_site_stat(
        &self,
        source_id: Uuid,
        date: NaiveDate,
        visitors: i32,
        avg_session_duration: f64,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(stat) = inner
            .site_stats
            .iter_mut()
            .find(|s| s.source_id == source_id && s.date == date)
        {
            stat.visitors = visitors;
            stat.avg_session_duration = avg_session_duration;
        } else {
            inner.site_stats.push(SiteStatSnapshot {
                id: Uuid::new_v4(),
                source_id,
                date,
                visitors,
                avg_session_duration,
            });
        }
        Ok(())
    }

    async fn upsert_page_stat(
        &self,
        source_id: Uuid,
        date: NaiveDate,
        path: &str,
        views: i32,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(stat) = inner
            .page_stats
            .iter_mut()
            .find(|s| s.source_id == source_id && s.date == date && s.path == path)
        {
            stat.views = views;
        } else {
            inner.page_stats.push(PageStatSnapshot {
                id: Uuid::new_v4(),
                source_id,
                date,
                path: path.to_string(),
                views,
            });
        }
        Ok(())
    }

    async fn has_site_stats(&self, source_id: Uuid) -> Result<bool> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.site_stats.iter().any(|s| s.source_id == source_id))
    }

    async fn page_stats_for_source(&self, source_id: Uuid) -> Result<Vec<PageStatSnapshot>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .page_stats
            .iter()
            .filter(|s| s.source_id == source_id)
            .cloned()
            .collect())
    }

    async fn merge_page_stat_into(&self, stat_id: Uuid, target_stat_id: Uuid) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let views = inner
            .page_stats
            .iter()
            .find(|s| s.id == stat_id)
            .map(|s| s.views)
            .unwrap_or(0);
        if let Some(target) = inner.page_stats.iter_mut().find(|s| s.id == target_stat_id) {
            target.views += views;
        }
        inner.page_stats.retain(|s| s.id != stat_id);
        Ok(())
    }

    async fn rename_page_stat_path(&self, stat_id: Uuid, path: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(stat) = inner.page_stats.iter_mut().find(|s| s.id == stat_id) {
            stat.path = path.to_string();
        }
        Ok(())
    }

    async fn delete_page_stats_by_path(&self, source_id: Uuid, path: &str) -> Result<u64> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.page_stats.len();
        inner
            .page_stats
            .retain(|s| !(s.source_id == source_id && s.path == path));
        Ok((before - inner.page_stats.len()) as u64)
    }
}
