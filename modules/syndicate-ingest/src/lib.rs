//! Ingestion: the idempotent-upsert path from source adapters into the
//! canonical history.

pub mod adapter;
pub mod exclusions;
pub mod profile_stats;
pub mod redirects;
pub mod run;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use adapter::{PageBudget, SecretStore, SourceAdapter};
pub use run::{IngestRun, ScrapedPost};
pub use store::IngestStore;
