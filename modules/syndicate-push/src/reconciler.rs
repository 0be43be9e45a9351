use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use nocodb_client::MAX_BATCH;
use syndicate_common::{EntityKind, EntityMapping, Result, Target};

use crate::mapper::{self, LocalRow};
use crate::partition::{partition, Partition};
use crate::traits::{LocalSnapshot, MappingStore, OutgoingRecord, TargetAdapter};

/// Counts for one full push of one target.
#[derive(Debug, Default, Clone)]
pub struct PushReport {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    /// Kinds whose batch work failed this pass. Their diff is recomputed and
    /// retried wholesale next pass; nothing is half-applied.
    pub failed_kinds: Vec<EntityKind>,
}

impl PushReport {
    pub fn is_clean(&self) -> bool {
        self.failed_kinds.is_empty()
    }
}

/// Drives one target towards the canonical history: per entity kind, diff
/// local rows against the mapping table, then create, link, update and
/// delete in bounded batches.
#[derive(Clone)]
pub struct Reconciler {
    snapshot: Arc<dyn LocalSnapshot>,
    mappings: Arc<dyn MappingStore>,
}

impl Reconciler {
    pub fn new(snapshot: Arc<dyn LocalSnapshot>, mappings: Arc<dyn MappingStore>) -> Self {
        Self { snapshot, mappings }
    }

    pub async fn push(&self, target: &Target, adapter: &dyn TargetAdapter) -> Result<PushReport> {
        let mut report = PushReport::default();

        for kind in EntityKind::PUSH_ORDER {
            if let Err(err) = self.push_kind(target, adapter, kind, &mut report).await {
                warn!(
                    target_id = %target.id,
                    kind = kind.as_str(),
                    error = %err,
                    "Entity kind failed, continuing with the rest"
                );
                report.failed_kinds.push(kind);
            }
        }

        info!(
            target_id = %target.id,
            created = report.created,
            updated = report.updated,
            deleted = report.deleted,
            failed_kinds = report.failed_kinds.len(),
            "Push pass finished"
        );
        Ok(report)
    }

    async fn push_kind(
        &self,
        target: &Target,
        adapter: &dyn TargetAdapter,
        kind: EntityKind,
        report: &mut PushReport,
    ) -> Result<()> {
        let locals = self.locals_for(target, kind).await?;
        let mappings = self.mappings.mappings_for(kind, target.id).await?;
        let Partition {
            to_create,
            to_update,
            to_delete,
        } = partition(locals, mappings);

        // Remote ids of already-pushed sources, for linking fresh children.
        let parent_ids: HashMap<Uuid, String> = if kind == EntityKind::Source {
            HashMap::new()
        } else {
            self.mappings
                .mappings_for(EntityKind::Source, target.id)
                .await?
                .into_iter()
                .filter_map(|m| m.local_id.map(|id| (id, m.target_record_id)))
                .collect()
        };

        for batch in to_create.chunks(MAX_BATCH) {
            let records: Vec<OutgoingRecord> = batch.iter().map(|r| r.record.clone()).collect();
            let created = adapter.create_batch(kind, &records).await?;

            let by_key: HashMap<&str, &LocalRow> = batch
                .iter()
                .map(|row| (row.record.natural_key.as_str(), row))
                .collect();

            let mut children_by_parent: HashMap<Uuid, Vec<String>> = HashMap::new();
            for remote in &created {
                let Some(row) = by_key.get(remote.natural_key.as_str()) else {
                    warn!(
                        kind = kind.as_str(),
                        natural_key = %remote.natural_key,
                        "Create response carried an unknown natural key"
                    );
                    continue;
                };
                self.mappings
                    .add_mapping(kind, target.id, row.record.local_id, &remote.remote_id)
                    .await?;
                report.created += 1;

                if let Some(source_id) = row.source_id {
                    children_by_parent
                        .entry(source_id)
                        .or_default()
                        .push(remote.remote_id.clone());
                }
            }

            for (source_id, child_ids) in children_by_parent {
                let Some(parent_remote) = parent_ids.get(&source_id) else {
                    warn!(
                        kind = kind.as_str(),
                        %source_id,
                        "No remote row for owning source, children left unlinked"
                    );
                    continue;
                };
                // Best effort: a missed link is cosmetic, the rows exist.
                if let Err(err) = adapter
                    .link_children(parent_remote, kind, &child_ids)
                    .await
                {
                    warn!(
                        kind = kind.as_str(),
                        %source_id,
                        error = %err,
                        "Linking children to their source failed"
                    );
                }
            }
        }

        for batch in to_update.chunks(MAX_BATCH) {
            let records: Vec<(String, serde_json::Value)> = batch
                .iter()
                .map(|(m, r)| (m.target_record_id.clone(), r.fields.clone()))
                .collect();
            adapter.update_batch(kind, &records).await?;
            for (mapping, _) in batch {
                self.mappings.touch_mapping(mapping.id).await?;
                report.updated += 1;
            }
        }

        self.delete_mapped(adapter, kind, &to_delete, report).await
    }

    /// Remote delete then mapping removal, batch by batch. A mapping only
    /// disappears once its remote row is confirmed gone.
    async fn delete_mapped(
        &self,
        adapter: &dyn TargetAdapter,
        kind: EntityKind,
        mappings: &[EntityMapping],
        report: &mut PushReport,
    ) -> Result<()> {
        for batch in mappings.chunks(MAX_BATCH) {
            let remote_ids: Vec<String> =
                batch.iter().map(|m| m.target_record_id.clone()).collect();
            adapter.delete_batch(kind, &remote_ids).await?;
            for mapping in batch {
                self.mappings.remove_mapping(mapping.id).await?;
                report.deleted += 1;
            }
        }
        Ok(())
    }

    /// Remove one source and everything under it from a target: the source's
    /// remote row first, then each child kind under the same batched
    /// discipline.
    pub async fn detach_source(
        &self,
        target: &Target,
        adapter: &dyn TargetAdapter,
        source_id: Uuid,
    ) -> Result<PushReport> {
        let mut report = PushReport::default();

        let source_mappings: Vec<EntityMapping> = self
            .mappings
            .mappings_for(EntityKind::Source, target.id)
            .await?
            .into_iter()
            .filter(|m| m.local_id == Some(source_id))
            .collect();
        self.delete_mapped(adapter, EntityKind::Source, &source_mappings, &mut report)
            .await?;

        for kind in EntityKind::PUSH_ORDER {
            if kind == EntityKind::Source {
                continue;
            }
            let children = self
                .mappings
                .child_mappings_for_source(kind, target.id, source_id)
                .await?;
            self.delete_mapped(adapter, kind, &children, &mut report)
                .await?;
        }

        info!(
            target_id = %target.id,
            %source_id,
            deleted = report.deleted,
            "Detached source from target"
        );
        Ok(report)
    }

    async fn locals_for(&self, target: &Target, kind: EntityKind) -> Result<Vec<LocalRow>> {
        let today = Utc::now().date_naive();
        let rows = match kind {
            EntityKind::Source => self
                .snapshot
                .sources(target.owner_id)
                .await?
                .iter()
                .map(mapper::map_source)
                .collect(),
            EntityKind::Post => self
                .snapshot
                .posts(target.owner_id)
                .await?
                .iter()
                .map(mapper::map_post)
                .collect(),
            EntityKind::SiteStat => {
                let mut rows = Vec::new();
                for source in self.snapshot.sources(target.owner_id).await? {
                    rows.extend(
                        self.snapshot
                            .site_stats(source.id)
                            .await?
                            .iter()
                            .map(|s| mapper::map_site_stat(s, today)),
                    );
                }
                rows
            }
            EntityKind::PageStat => {
                let mut rows = Vec::new();
                for source in self.snapshot.sources(target.owner_id).await? {
                    rows.extend(
                        self.snapshot
                            .page_stats(source.id)
                            .await?
                            .iter()
                            .map(|s| mapper::map_page_stat(s, today)),
                    );
                }
                rows
            }
            EntityKind::SourceStat => {
                let mut rows = Vec::new();
                for source in self.snapshot.sources(target.owner_id).await? {
                    rows.extend(
                        self.snapshot
                            .source_stats(source.id)
                            .await?
                            .iter()
                            .map(|s| mapper::map_source_stat(s, today)),
                    );
                }
                rows
            }
        };
        Ok(rows)
    }
}
