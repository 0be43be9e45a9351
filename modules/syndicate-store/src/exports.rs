use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use syndicate_common::{ExportRun, ExportStatus, Result};

use crate::SyncStore;

#[derive(Debug, FromRow)]
struct ExportRunRow {
    id: Uuid,
    owner_id: Uuid,
    target_id: Option<Uuid>,
    method: String,
    status: String,
    reason: Option<String>,
    artifact_path: Option<String>,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl From<ExportRunRow> for ExportRun {
    fn from(r: ExportRunRow) -> Self {
        let status = match r.status.as_str() {
            "completed" => ExportStatus::Completed,
            "failed" => ExportStatus::Failed,
            _ => ExportStatus::Requested,
        };
        ExportRun {
            id: r.id,
            owner_id: r.owner_id,
            target_id: r.target_id,
            method: r.method,
            status,
            reason: r.reason,
            artifact_path: r.artifact_path,
            created_at: r.created_at,
            completed_at: r.completed_at,
        }
    }
}

impl SyncStore {
    /// Open a new export-log entry in Requested state.
    pub async fn create_export_run(
        &self,
        owner_id: Uuid,
        method: &str,
        target_id: Option<Uuid>,
    ) -> Result<ExportRun> {
        let row = sqlx::query_as::<_, ExportRunRow>(
            r#"
            INSERT INTO export_runs (id, owner_id, method, target_id)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(method)
        .bind(target_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    /// Record the single terminal outcome of a run.
    pub async fn complete_export_run(
        &self,
        run_id: Uuid,
        status: ExportStatus,
        reason: Option<&str>,
        artifact_path: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE export_runs
            SET status = $2, reason = $3, artifact_path = $4, completed_at = now()
            WHERE id = $1
            "#,
        )
        .bind(run_id)
        .bind(status.as_str())
        .bind(reason)
        .bind(artifact_path)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn export_runs(&self, owner_id: Uuid, limit: i64) -> Result<Vec<ExportRun>> {
        let rows = sqlx::query_as::<_, ExportRunRow>(
            r#"
            SELECT * FROM export_runs
            WHERE owner_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(owner_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Permanent audit entry; written on the final failed retry of a task.
    pub async fn add_audit_log(
        &self,
        source_id: Option<Uuid>,
        target_id: Option<Uuid>,
        message: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_log (id, source_id, target_id, message)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(source_id)
        .bind(target_id)
        .bind(message)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
