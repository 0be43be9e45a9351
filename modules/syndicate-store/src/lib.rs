//! Postgres persistence for the canonical history and sync bookkeeping.

mod exclusions;
mod exports;
mod mappings;
mod posts;
mod sources;
mod stats;

#[cfg(feature = "test-utils")]
pub mod testutil;

pub use posts::{PostWithMetrics, SourceTotals};

use sqlx::PgPool;
use syndicate_common::{Result, SyncError};

#[derive(Clone)]
pub struct SyncStore {
    pool: PgPool,
}

impl SyncStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| SyncError::Database(e.into()))?;
        Ok(())
    }

    /// Lightweight health check; the only operation with an explicit deadline.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }
}
