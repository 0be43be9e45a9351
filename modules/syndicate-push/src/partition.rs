use std::collections::HashMap;

use uuid::Uuid;

use syndicate_common::EntityMapping;

use crate::mapper::LocalRow;
use crate::traits::OutgoingRecord;

/// The three-way diff between local rows and mapping rows for one entity
/// kind on one target. Pure; no clocks, no IO.
#[derive(Debug, Default)]
pub struct Partition {
    pub to_create: Vec<LocalRow>,
    pub to_update: Vec<(EntityMapping, OutgoingRecord)>,
    pub to_delete: Vec<EntityMapping>,
}

/// Partition rules:
/// - a local row with no mapping is created;
/// - a mapped local row is updated only while update-eligible, and for rows
///   carrying a modification time only when that time is newer than the
///   mapping's `synced_at` (an unchanged corpus re-sends nothing);
/// - a mapping whose local row is gone, including the NULL-`local_id` rows a
///   local purge leaves behind, is deleted remotely.
pub fn partition(locals: Vec<LocalRow>, mappings: Vec<EntityMapping>) -> Partition {
    let mut out = Partition::default();

    let mut by_local: HashMap<Uuid, EntityMapping> = HashMap::new();
    for m in mappings {
        match m.local_id {
            Some(id) => {
                by_local.insert(id, m);
            }
            // A local purge already cleared this mapping's local_id.
            None => out.to_delete.push(m),
        }
    }

    for row in locals {
        match by_local.remove(&row.record.local_id) {
            None => out.to_create.push(row),
            Some(mapping) => {
                let changed = row
                    .modified_at
                    .map_or(true, |modified| modified > mapping.synced_at);
                if row.window_eligible && changed {
                    out.to_update.push((mapping, row.record));
                }
            }
        }
    }

    out.to_delete.extend(by_local.into_values());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use serde_json::json;
    use syndicate_common::EntityKind;

    fn local(id: Uuid) -> LocalRow {
        LocalRow {
            record: OutgoingRecord {
                local_id: id,
                natural_key: id.to_string(),
                fields: json!({}),
            },
            source_id: None,
            modified_at: None,
            window_eligible: true,
        }
    }

    fn mapping(local_id: Option<Uuid>) -> EntityMapping {
        EntityMapping {
            id: Uuid::new_v4(),
            entity_kind: EntityKind::Post,
            target_id: Uuid::new_v4(),
            local_id,
            target_record_id: "7".to_string(),
            synced_at: Utc::now(),
        }
    }

    #[test]
    fn unmapped_locals_create_and_orphan_mappings_delete() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let out = partition(vec![local(a)], vec![mapping(Some(b)), mapping(None)]);

        assert_eq!(out.to_create.len(), 1);
        assert_eq!(out.to_create[0].record.local_id, a);
        assert!(out.to_update.is_empty());
        assert_eq!(out.to_delete.len(), 2, "gone local and NULL local both delete");
    }

    #[test]
    fn mapped_row_updates_only_when_modified_since_sync() {
        let id = Uuid::new_v4();
        let m = mapping(Some(id));

        let mut stale = local(id);
        stale.modified_at = Some(m.synced_at - Duration::hours(1));
        let out = partition(vec![stale], vec![m.clone()]);
        assert!(out.to_update.is_empty(), "unchanged row is not re-sent");
        assert!(out.to_create.is_empty() && out.to_delete.is_empty());

        let mut fresh = local(id);
        fresh.modified_at = Some(m.synced_at + Duration::hours(1));
        let out = partition(vec![fresh], vec![m]);
        assert_eq!(out.to_update.len(), 1);
    }

    #[test]
    fn a_closed_window_suppresses_updates_but_not_deletes() {
        let id = Uuid::new_v4();
        let m = mapping(Some(id));

        let mut row = local(id);
        row.window_eligible = false;
        let out = partition(vec![row], vec![m]);

        assert!(out.to_update.is_empty());
        assert!(out.to_delete.is_empty(), "the row still exists locally");
    }

    #[test]
    fn snapshot_rows_in_window_resend_every_pass() {
        let id = Uuid::new_v4();
        // No modified_at: in-window snapshot kinds always re-send.
        let out = partition(vec![local(id)], vec![mapping(Some(id))]);
        assert_eq!(out.to_update.len(), 1);
    }
}
