use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- Enums ---

/// Per-source / per-target sync lifecycle. Transitions are owned by the
/// scheduler; adapters never touch status directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Initialized,
    Syncing,
    Synced,
    Failed,
    Deactivated,
}

impl SyncState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncState::Initialized => "initialized",
            SyncState::Syncing => "syncing",
            SyncState::Synced => "synced",
            SyncState::Failed => "failed",
            SyncState::Deactivated => "deactivated",
        }
    }
}

impl std::str::FromStr for SyncState {
    type Err = crate::error::SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initialized" => Ok(SyncState::Initialized),
            "syncing" => Ok(SyncState::Syncing),
            "synced" => Ok(SyncState::Synced),
            "failed" => Ok(SyncState::Failed),
            "deactivated" => Ok(SyncState::Deactivated),
            other => Err(crate::error::SyncError::NotFound(format!(
                "unknown sync state: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The five entity types the reconciler pushes, in dependency order.
/// Sources go first: child rows link to an existing remote source row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Source,
    Post,
    SiteStat,
    PageStat,
    SourceStat,
}

impl EntityKind {
    /// Fixed reconciliation order for a pass.
    pub const PUSH_ORDER: [EntityKind; 5] = [
        EntityKind::Source,
        EntityKind::Post,
        EntityKind::SiteStat,
        EntityKind::PageStat,
        EntityKind::SourceStat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Source => "source",
            EntityKind::Post => "post",
            EntityKind::SiteStat => "site_stat",
            EntityKind::PageStat => "page_stat",
            EntityKind::SourceStat => "source_stat",
        }
    }

    /// Remote table name for this entity type.
    pub fn table_name(&self) -> &'static str {
        match self {
            EntityKind::Source => "sources",
            EntityKind::Post => "posts",
            EntityKind::SiteStat => "site_stats",
            EntityKind::PageStat => "page_stats",
            EntityKind::SourceStat => "source_stats",
        }
    }
}

impl std::str::FromStr for EntityKind {
    type Err = crate::error::SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "source" => Ok(EntityKind::Source),
            "post" => Ok(EntityKind::Post),
            "site_stat" => Ok(EntityKind::SiteStat),
            "page_stat" => Ok(EntityKind::PageStat),
            "source_stat" => Ok(EntityKind::SourceStat),
            other => Err(crate::error::SyncError::NotFound(format!(
                "unknown entity kind: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    NocoDb,
    Csv,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::NocoDb => "nocodb",
            TargetKind::Csv => "csv",
        }
    }
}

impl std::str::FromStr for TargetKind {
    type Err = crate::error::SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nocodb" => Ok(TargetKind::NocoDb),
            "csv" => Ok(TargetKind::Csv),
            other => Err(crate::error::SyncError::NotFound(format!(
                "unknown target kind: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportStatus {
    Requested,
    Completed,
    Failed,
}

impl ExportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportStatus::Requested => "requested",
            ExportStatus::Completed => "completed",
            ExportStatus::Failed => "failed",
        }
    }
}

// --- Canonical records ---

/// A configured external platform account to ingest from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub platform: String,
    pub handle: String,
    pub active: bool,
    pub sync_state: SyncState,
    pub status_reason: Option<String>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A configured external system to push normalized data into.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub kind: TargetKind,
    pub host_url: Option<String>,
    pub base_id: Option<String>,
    pub active: bool,
    pub sync_state: SyncState,
    pub status_reason: Option<String>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// One ingested post. Identity is `(platform, platform_internal_id)`, the
/// dedup key across runs, never the row id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
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
    pub media: Vec<String>,
}

impl Post {
    pub fn natural_key(&self) -> (&str, &str) {
        (&self.platform, &self.platform_internal_id)
    }
}

/// Append-only engagement snapshot. Never mutated; pruning may leave gaps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionSnapshot {
    pub id: Uuid,
    pub post_id: Uuid,
    pub synced_at: DateTime<Utc>,
    pub likes: Option<i32>,
    pub reposts: Option<i32>,
    pub views: Option<i32>,
}

/// One profile-stat row per source per calendar day. A second write on the
/// same day updates in place; the averages are all-time, not day-scoped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceStatSnapshot {
    pub id: Uuid,
    pub source_id: Uuid,
    pub date: NaiveDate,
    pub followers: Option<i32>,
    pub following: Option<i32>,
    pub posts_count: Option<i32>,
    pub avg_likes: Option<f64>,
    pub avg_reposts: Option<f64>,
    pub avg_views: Option<f64>,
}

/// Daily site-wide analytics for an analytics source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteStatSnapshot {
    pub id: Uuid,
    pub source_id: Uuid,
    pub date: NaiveDate,
    pub visitors: i32,
    pub avg_session_duration: f64,
}

/// Daily per-path page views for an analytics source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageStatSnapshot {
    pub id: Uuid,
    pub source_id: Uuid,
    pub date: NaiveDate,
    pub path: String,
    pub views: i32,
}

/// User-declared, permanent skip of one platform identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exclusion {
    pub id: Uuid,
    pub source_id: Uuid,
    pub platform_internal_id: String,
    pub created_at: DateTime<Utc>,
}

/// Consolidates analytics page stats from an old path into a new one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Redirect {
    pub id: Uuid,
    pub source_id: Uuid,
    pub from_path: String,
    pub to_path: String,
    pub created_at: DateTime<Utc>,
}

/// Durable local↔remote link: the reconciler's only memory of what has been
/// pushed. At most one row per `(entity_kind, target_id, local_id)`. A row
/// with no `local_id` marks a remote record due for deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityMapping {
    pub id: Uuid,
    pub entity_kind: EntityKind,
    pub target_id: Uuid,
    pub local_id: Option<Uuid>,
    pub target_record_id: String,
    pub synced_at: DateTime<Utc>,
}

/// Read surface for a source's or target's sync status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncStatus {
    pub state: SyncState,
    pub reason: Option<String>,
    pub last_synced_at: Option<DateTime<Utc>>,
}

/// Append-only record of one push's outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportRun {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub target_id: Option<Uuid>,
    pub method: String,
    pub status: ExportStatus,
    pub reason: Option<String>,
    pub artifact_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Aggregate profile numbers a source adapter reports after a run.
/// Every field optional: platforms expose different subsets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileStats {
    pub followers: Option<i64>,
    pub following: Option<i64>,
    pub posts_count: Option<i64>,
    pub avg_likes: Option<f64>,
    pub avg_reposts: Option<f64>,
    pub avg_views: Option<f64>,
}
