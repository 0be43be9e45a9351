//! Mock target adapter and in-memory seams for reconciler tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::Value;
use uuid::Uuid;

use syndicate_common::{
    EntityKind, EntityMapping, PageStatSnapshot, Result, SiteStatSnapshot, Source,
    SourceStatSnapshot, SyncError, SyncState, Target, TargetKind,
};
use syndicate_store::PostWithMetrics;

use crate::traits::{
    LocalSnapshot, MappingStore, OutgoingRecord, RemoteCreated, TargetAdapter,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Create(EntityKind, usize),
    Update(EntityKind, usize),
    Delete(EntityKind, Vec<String>),
    Link(EntityKind, String, usize),
}

/// MOCK: records every batch call and hands out remote ids from a counter
/// that never repeats, so id-reuse bugs show up as test failures.
#[derive(Default)]
pub struct MockAdapter {
    calls: Mutex<Vec<Call>>,
    next_id: AtomicI64,
    fail_create: Mutex<HashSet<EntityKind>>,
}

impl MockAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_creates_for(&self, kind: EntityKind) {
        self.fail_create.lock().unwrap().insert(kind);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, kind: EntityKind) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| match c {
                Call::Create(k, _) | Call::Update(k, _) | Call::Link(k, _, _) => *k == kind,
                Call::Delete(k, _) => *k == kind,
            })
            .collect()
    }
}

#[async_trait]
impl TargetAdapter for MockAdapter {
    async fn create_batch(
        &self,
        kind: EntityKind,
        records: &[OutgoingRecord],
    ) -> Result<Vec<RemoteCreated>> {
        if self.fail_create.lock().unwrap().contains(&kind) {
            return Err(SyncError::Target {
                status: 502,
                message: "simulated outage".to_string(),
            });
        }
        self.calls
            .lock()
            .unwrap()
            .push(Call::Create(kind, records.len()));

        // Reverse the batch: callers must match by natural key, not order.
        Ok(records
            .iter()
            .rev()
            .map(|r| RemoteCreated {
                remote_id: self.next_id.fetch_add(1, Ordering::SeqCst).to_string(),
                natural_key: r.natural_key.clone(),
            })
            .collect())
    }

    async fn update_batch(&self, kind: EntityKind, records: &[(String, Value)]) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Update(kind, records.len()));
        Ok(())
    }

    async fn delete_batch(&self, kind: EntityKind, remote_ids: &[String]) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Delete(kind, remote_ids.to_vec()));
        Ok(())
    }

    async fn link_children(
        &self,
        parent_remote_id: &str,
        child_kind: EntityKind,
        child_remote_ids: &[String],
    ) -> Result<()> {
        self.calls.lock().unwrap().push(Call::Link(
            child_kind,
            parent_remote_id.to_string(),
            child_remote_ids.len(),
        ));
        Ok(())
    }
}

/// MOCK: mapping table over a vector, honoring the NULL-local_id convention.
#[derive(Default)]
pub struct MemoryMappings {
    rows: Mutex<Vec<EntityMapping>>,
}

impl MemoryMappings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<EntityMapping> {
        self.rows.lock().unwrap().clone()
    }

    /// Simulates a local purge clearing the mapping's local side.
    pub fn null_local(&self, local_id: Uuid) {
        for row in self.rows.lock().unwrap().iter_mut() {
            if row.local_id == Some(local_id) {
                row.local_id = None;
            }
        }
    }
}

#[async_trait]
impl MappingStore for MemoryMappings {
    async fn mappings_for(&self, kind: EntityKind, target_id: Uuid) -> Result<Vec<EntityMapping>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.entity_kind == kind && m.target_id == target_id)
            .cloned()
            .collect())
    }

    async fn add_mapping(
        &self,
        kind: EntityKind,
        target_id: Uuid,
        local_id: Uuid,
        target_record_id: &str,
    ) -> Result<()> {
        self.rows.lock().unwrap().push(EntityMapping {
            id: Uuid::new_v4(),
            entity_kind: kind,
            target_id,
            local_id: Some(local_id),
            target_record_id: target_record_id.to_string(),
            synced_at: Utc::now(),
        });
        Ok(())
    }

    async fn touch_mapping(&self, id: Uuid) -> Result<()> {
        for row in self.rows.lock().unwrap().iter_mut() {
            if row.id == id {
                row.synced_at = Utc::now();
            }
        }
        Ok(())
    }

    async fn remove_mapping(&self, id: Uuid) -> Result<()> {
        self.rows.lock().unwrap().retain(|m| m.id != id);
        Ok(())
    }

    async fn child_mappings_for_source(
        &self,
        kind: EntityKind,
        target_id: Uuid,
        _source_id: Uuid,
    ) -> Result<Vec<EntityMapping>> {
        // Single-source fixtures: every child mapping belongs to the source.
        self.mappings_for(kind, target_id).await
    }
}

/// MOCK: fixed local corpus.
#[derive(Default)]
pub struct StaticSnapshot {
    pub sources: Mutex<Vec<Source>>,
    pub posts: Mutex<Vec<PostWithMetrics>>,
    pub site_stats: Mutex<Vec<SiteStatSnapshot>>,
    pub page_stats: Mutex<Vec<PageStatSnapshot>>,
    pub source_stats: Mutex<Vec<SourceStatSnapshot>>,
}

#[async_trait]
impl LocalSnapshot for StaticSnapshot {
    async fn sources(&self, owner_id: Uuid) -> Result<Vec<Source>> {
        Ok(self
            .sources
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn posts(&self, _owner_id: Uuid) -> Result<Vec<PostWithMetrics>> {
        Ok(self.posts.lock().unwrap().clone())
    }

    async fn site_stats(&self, source_id: Uuid) -> Result<Vec<SiteStatSnapshot>> {
        Ok(self
            .site_stats
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.source_id == source_id)
            .cloned()
            .collect())
    }

    async fn page_stats(&self, source_id: Uuid) -> Result<Vec<PageStatSnapshot>> {
        Ok(self
            .page_stats
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.source_id == source_id)
            .cloned()
            .collect())
    }

    async fn source_stats(&self, source_id: Uuid) -> Result<Vec<SourceStatSnapshot>> {
        Ok(self
            .source_stats
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.source_id == source_id)
            .cloned()
            .collect())
    }
}

pub fn target_fixture(owner_id: Uuid) -> Target {
    Target {
        id: Uuid::new_v4(),
        owner_id,
        kind: TargetKind::NocoDb,
        host_url: Some("https://noco.example".to_string()),
        base_id: Some("base1".to_string()),
        active: true,
        sync_state: SyncState::Initialized,
        status_reason: None,
        last_synced_at: None,
        created_at: Utc::now(),
    }
}

pub fn source_fixture(owner_id: Uuid) -> Source {
    Source {
        id: Uuid::new_v4(),
        owner_id,
        platform: "bluesky".to_string(),
        handle: "ferret.example".to_string(),
        active: true,
        sync_state: SyncState::Synced,
        status_reason: None,
        last_synced_at: None,
        created_at: Utc::now(),
    }
}

pub fn post_fixture(source_id: Uuid, n: usize) -> PostWithMetrics {
    let created = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    PostWithMetrics {
        id: Uuid::new_v4(),
        source_id,
        platform: "bluesky".to_string(),
        platform_internal_id: format!("post-{n}"),
        created_at: created,
        last_synced_at: created,
        archived: false,
        author: "ferret".to_string(),
        post_type: "post".to_string(),
        content: Some(format!("post number {n}")),
        reactions_synced_at: Some(created),
        likes: Some(n as i32),
        reposts: Some(0),
        views: Some(10 * n as i32),
    }
}
