use async_trait::async_trait;
use uuid::Uuid;

use syndicate_common::Result;

use crate::run::IngestRun;

/// A platform-specific fetcher. Implementations walk the platform's feed and
/// analytics endpoints, feeding everything they sight into the run; they do
/// not touch storage directly.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Platform identifier this adapter serves, e.g. `"bluesky"`.
    fn platform(&self) -> &'static str;

    /// One full fetch pass for the run's source.
    async fn fetch(&self, run: &mut IngestRun) -> Result<()>;

    /// Re-fetch a deep window of history, in days. Platforms whose feed
    /// endpoints always return full history can fall back to a plain fetch.
    async fn backfill(&self, run: &mut IngestRun, _days: i64) -> Result<()> {
        self.fetch(run).await
    }
}

/// Lookup of per-source credentials (API tokens, session cookies) kept
/// outside the canonical store.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn credentials(&self, source_id: Uuid) -> Result<String>;
}

/// Hard ceiling on pages walked in one fetch, regardless of what the cursor
/// claims. Feeds with buggy pagination can loop forever otherwise.
const MAX_PAGES: usize = 500;

/// Pagination budget for cursor-walked feeds. Adapters call [`PageBudget::spend`]
/// once per page and stop when it returns `false`.
#[derive(Debug)]
pub struct PageBudget {
    pages: usize,
    empty_streak: usize,
    max_empty: usize,
}

impl PageBudget {
    /// `max_empty` is how many consecutive pages yielding no new posts the
    /// adapter tolerates before giving up on the cursor.
    pub fn new(max_empty: usize) -> Self {
        Self {
            pages: 0,
            empty_streak: 0,
            max_empty,
        }
    }

    /// Account for one fetched page. `new_posts` is how many posts on it were
    /// new to this run.
    pub fn spend(&mut self, new_posts: usize) -> bool {
        self.pages += 1;
        if new_posts == 0 {
            self.empty_streak += 1;
        } else {
            self.empty_streak = 0;
        }
        self.pages < MAX_PAGES && self.empty_streak < self.max_empty
    }

    pub fn pages(&self) -> usize {
        self.pages
    }
}
