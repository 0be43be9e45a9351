use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use nocodb_client::{DeleteRecord, NewRecord, NocoClient, NocoError, UpdateRecord};
use syndicate_common::{EntityKind, Result, SyncError};

use crate::mapper::NATURAL_KEY_FIELD;
use crate::traits::{OutgoingRecord, RemoteCreated, TargetAdapter};

/// NocoDB push surface: one table per entity kind, resolved by title at
/// connect time, plus the link fields on the sources table that point at
/// each child table.
pub struct NocoTarget {
    client: NocoClient,
    tables: HashMap<EntityKind, String>,
    link_fields: HashMap<EntityKind, String>,
}

impl NocoTarget {
    /// Resolve every table and link-field id up front so a missing table
    /// fails the whole target before any data moves.
    pub async fn connect(client: NocoClient) -> Result<Self> {
        let mut tables = HashMap::new();
        for kind in EntityKind::PUSH_ORDER {
            let id = client
                .table_id_by_title(kind.table_name())
                .await
                .map_err(to_sync)?;
            tables.insert(kind, id);
        }

        // Link fields live on the sources table, titled after the child
        // table they point at. A base without them just skips linking.
        let mut link_fields = HashMap::new();
        let source_table = &tables[&EntityKind::Source];
        let fields = client.list_fields(source_table).await.map_err(to_sync)?;
        for kind in EntityKind::PUSH_ORDER {
            if kind == EntityKind::Source {
                continue;
            }
            if let Some(field) = fields
                .iter()
                .find(|f| f.title.eq_ignore_ascii_case(kind.table_name()))
            {
                link_fields.insert(kind, field.id.clone());
            } else {
                debug!(kind = kind.as_str(), "No link field on sources table");
            }
        }

        Ok(Self {
            client,
            tables,
            link_fields,
        })
    }

    fn table(&self, kind: EntityKind) -> &str {
        &self.tables[&kind]
    }
}

#[async_trait]
impl TargetAdapter for NocoTarget {
    async fn create_batch(
        &self,
        kind: EntityKind,
        records: &[OutgoingRecord],
    ) -> Result<Vec<RemoteCreated>> {
        let payload: Vec<NewRecord> = records
            .iter()
            .map(|r| NewRecord {
                fields: r.fields.clone(),
            })
            .collect();

        let created = self
            .client
            .create_records(self.table(kind), &payload)
            .await
            .map_err(to_sync)?;

        created
            .into_iter()
            .map(|row| {
                let natural_key = row
                    .fields
                    .get(NATURAL_KEY_FIELD)
                    .and_then(Value::as_str)
                    .ok_or_else(|| SyncError::Target {
                        status: 0,
                        message: format!("created record {} echoed no natural key", row.id),
                    })?
                    .to_string();
                Ok(RemoteCreated {
                    remote_id: row.id.to_string(),
                    natural_key,
                })
            })
            .collect()
    }

    async fn update_batch(&self, kind: EntityKind, records: &[(String, Value)]) -> Result<()> {
        let payload: Result<Vec<UpdateRecord>> = records
            .iter()
            .map(|(remote_id, fields)| {
                Ok(UpdateRecord {
                    id: parse_remote_id(remote_id)?,
                    fields: fields.clone(),
                })
            })
            .collect();

        self.client
            .update_records(self.table(kind), &payload?)
            .await
            .map_err(to_sync)
    }

    async fn delete_batch(&self, kind: EntityKind, remote_ids: &[String]) -> Result<()> {
        let payload: Result<Vec<DeleteRecord>> = remote_ids
            .iter()
            .map(|id| Ok(DeleteRecord { id: parse_remote_id(id)? }))
            .collect();

        self.client
            .delete_records(self.table(kind), &payload?)
            .await
            .map_err(to_sync)
    }

    async fn link_children(
        &self,
        parent_remote_id: &str,
        child_kind: EntityKind,
        child_remote_ids: &[String],
    ) -> Result<()> {
        let Some(field_id) = self.link_fields.get(&child_kind) else {
            debug!(kind = child_kind.as_str(), "Skipping link, no field configured");
            return Ok(());
        };

        let parent = parse_remote_id(parent_remote_id)?;
        let children: Result<Vec<i64>> =
            child_remote_ids.iter().map(|id| parse_remote_id(id)).collect();

        self.client
            .link_records(
                self.table(EntityKind::Source),
                field_id,
                parent,
                &children?,
            )
            .await
            .map_err(to_sync)
    }
}

fn parse_remote_id(id: &str) -> Result<i64> {
    id.parse().map_err(|_| SyncError::Target {
        status: 0,
        message: format!("remote id is not numeric: {id}"),
    })
}

fn to_sync(err: NocoError) -> SyncError {
    match err {
        NocoError::Api { status, message } => SyncError::Target { status, message },
        other => SyncError::Other(anyhow::Error::new(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_ids_must_be_numeric() {
        assert_eq!(parse_remote_id("42").unwrap(), 42);
        assert!(parse_remote_id("rec_42").is_err());
    }

    #[test]
    fn api_errors_carry_their_status_through() {
        let err = to_sync(NocoError::Api {
            status: 422,
            message: "bad field".to_string(),
        });
        assert!(matches!(err, SyncError::Target { status: 422, .. }));
    }
}
