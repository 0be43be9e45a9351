use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use syndicate_common::{clamp_opt, ProfileStats, Result, Source};

use crate::profile_stats;
use crate::store::{IngestStore, NewPost};

/// Posts the platform stopped reporting get archived once they haven't been
/// sighted for this long.
const ARCHIVE_AFTER_HOURS: i64 = 36;

/// One post as a source adapter hands it over, before dedup and exclusion
/// filtering.
#[derive(Debug, Clone)]
pub struct ScrapedPost {
    pub platform_internal_id: String,
    pub created_at: DateTime<Utc>,
    pub author: String,
    pub post_type: String,
    pub content: Option<String>,
    pub media: Vec<String>,
    pub likes: Option<i64>,
    pub reposts: Option<i64>,
    pub views: Option<i64>,
}

/// Per-source ingest context for one run. Owns the seen-set (paginated feeds
/// repeat identities) and the preloaded exclusion set; both filters apply
/// before any upsert is attempted.
pub struct IngestRun {
    store: Arc<dyn IngestStore>,
    source: Source,
    started_at: DateTime<Utc>,
    seen: HashSet<String>,
    excluded: HashSet<String>,
}

impl IngestRun {
    pub async fn begin(store: Arc<dyn IngestStore>, source: Source) -> Result<Self> {
        let excluded = store
            .excluded_ids(source.id)
            .await?
            .into_iter()
            .collect::<HashSet<_>>();

        Ok(Self {
            store,
            source,
            started_at: Utc::now(),
            seen: HashSet::new(),
            excluded,
        })
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    /// Upsert one sighted post and append its reaction snapshot. Returns
    /// `None` when the identity was skipped (already seen this run, or
    /// excluded). Re-walking a feed within or across runs yields at most one
    /// logical post per platform identity.
    pub async fn process_post(&mut self, post: ScrapedPost) -> Result<Option<Uuid>> {
        if self.excluded.contains(&post.platform_internal_id) {
            debug!(
                source_id = %self.source.id,
                internal_id = %post.platform_internal_id,
                "Skipping excluded identity"
            );
            return Ok(None);
        }
        if !self.seen.insert(post.platform_internal_id.clone()) {
            return Ok(None);
        }

        let post_id = self.upsert_post(&post).await?;

        self.store
            .add_reaction(
                post_id,
                clamp_opt(post.likes),
                clamp_opt(post.reposts),
                clamp_opt(post.views),
            )
            .await?;

        Ok(Some(post_id))
    }

    /// Idempotent upsert by natural identity: insert on first sighting,
    /// refresh on every later one. Identity and platform-reported creation
    /// time never change after the first insert.
    async fn upsert_post(&self, post: &ScrapedPost) -> Result<Uuid> {
        let existing = self
            .store
            .post_by_identity(&self.source.platform, &post.platform_internal_id)
            .await?;

        match existing {
            Some(current) => {
                self.store
                    .update_post(
                        current.id,
                        &post.author,
                        &post.post_type,
                        post.content.as_deref(),
                        &post.media,
                    )
                    .await?;
                Ok(current.id)
            }
            None => {
                self.store
                    .insert_post(NewPost {
                        source_id: self.source.id,
                        platform: self.source.platform.clone(),
                        platform_internal_id: post.platform_internal_id.clone(),
                        created_at: post.created_at,
                        author: post.author.clone(),
                        post_type: post.post_type.clone(),
                        content: post.content.clone(),
                        media: post.media.clone(),
                    })
                    .await
            }
        }
    }

    /// Upsert today's profile-stat snapshot: all-time averages computed from
    /// the canonical history, overlaid with whatever aggregate numbers the
    /// platform reported.
    pub async fn record_profile_stats(&self, reported: ProfileStats) -> Result<()> {
        profile_stats::record(self.store.as_ref(), self.source.id, reported).await
    }

    pub async fn record_site_stat(
        &self,
        date: NaiveDate,
        visitors: i32,
        avg_session_duration: f64,
    ) -> Result<()> {
        self.store
            .upsert_site_stat(self.source.id, date, visitors, avg_session_duration)
            .await
    }

    pub async fn record_page_stat(&self, date: NaiveDate, path: &str, views: i32) -> Result<()> {
        self.store
            .upsert_page_stat(self.source.id, date, path, views)
            .await
    }

    /// True once any site-stat history exists. Analytics adapters fetch a
    /// deep window on the first sync and a short trailing window after.
    pub async fn has_site_stats(&self) -> Result<bool> {
        self.store.has_site_stats(self.source.id).await
    }

    /// End-of-run sweep after a successful fetch: posts not sighted within
    /// the archive window are flagged archived, never deleted.
    pub async fn finish(self) -> Result<u64> {
        let cutoff = self.started_at - Duration::hours(ARCHIVE_AFTER_HOURS);
        let archived = self.store.archive_unseen(self.source.id, cutoff).await?;
        if archived > 0 {
            info!(
                source_id = %self.source.id,
                archived,
                "Archived posts the platform stopped reporting"
            );
        }
        Ok(archived)
    }
}
