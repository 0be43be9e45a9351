use std::collections::HashMap;
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use tracing::{error, info};

use nocodb_client::NocoClient;
use syndicate_common::{Config, ExportStatus, Result, Source, SyncState, Target, TargetKind};
use syndicate_ingest::{IngestRun, IngestStore, SourceAdapter};
use syndicate_push::{CsvExporter, NocoTarget, Reconciler};
use syndicate_store::SyncStore;

use crate::runner::run_with_retries;

/// Task outcome once retries are exhausted; the error is the reason string
/// recorded on the status row and in the audit log.
type TaskResult = std::result::Result<(), String>;

/// What one scheduler pass needs from the world: the active work list and a
/// way to run each item to a terminal status.
#[async_trait]
pub trait SyncDriver: Send + Sync {
    async fn sources(&self) -> Result<Vec<Source>>;

    async fn targets(&self) -> Result<Vec<Target>>;

    /// Run one source to a terminal state. Failures are recorded on the
    /// source's status; the return value is for pass-level logging only.
    async fn run_source(&self, source: Source);

    async fn run_target(&self, target: Target);
}

/// Production driver: fetch via the registered platform adapters, push via
/// the reconciler, statuses and audit trail in the canonical store.
pub struct StoreDriver {
    store: Arc<SyncStore>,
    adapters: HashMap<&'static str, Arc<dyn SourceAdapter>>,
    reconciler: Reconciler,
    config: Config,
}

impl StoreDriver {
    pub fn new(
        store: Arc<SyncStore>,
        config: Config,
        adapters: Vec<Arc<dyn SourceAdapter>>,
    ) -> Self {
        let reconciler = Reconciler::new(store.clone(), store.clone());
        let adapters = adapters
            .into_iter()
            .map(|a| (a.platform(), a))
            .collect();
        Self {
            store,
            adapters,
            reconciler,
            config,
        }
    }

    async fn fetch_source(&self, source: &Source) -> TaskResult {
        let Some(adapter) = self.adapters.get(source.platform.as_str()) else {
            return Err(format!("no adapter for platform {}", source.platform));
        };

        let adapter = adapter.clone();
        let store: Arc<dyn IngestStore> = self.store.clone();
        let source = source.clone();

        run_with_retries(&source.platform.clone(), move || {
            let adapter = adapter.clone();
            let store = store.clone();
            let source = source.clone();
            async move {
                let mut run = IngestRun::begin(store, source).await?;
                adapter.fetch(&mut run).await?;
                run.finish().await?;
                Ok(())
            }
        })
        .await
    }

    async fn push_target(&self, target: &Target) -> TaskResult {
        let run = self
            .store
            .create_export_run(target.owner_id, target.kind.as_str(), Some(target.id))
            .await
            .map_err(|e| e.to_string())?;

        let store = self.store.clone();
        let reconciler = self.reconciler.clone();
        let token = self.config.nocodb_token.clone();
        let export_dir = self.config.export_dir.clone();
        let target = target.clone();

        // One export run brackets the whole retry budget; only the terminal
        // outcome is recorded on it.
        let outcome = run_with_retries(target.kind.as_str(), move || {
            Self::push_one_target(
                store.clone(),
                reconciler.clone(),
                target.clone(),
                token.clone(),
                export_dir.clone(),
            )
        })
        .await;

        let (status, reason, artifact) = match &outcome {
            Ok(artifact) => (ExportStatus::Completed, None, artifact.as_deref()),
            Err(reason) => (ExportStatus::Failed, Some(reason.as_str()), None),
        };
        if let Err(err) = self
            .store
            .complete_export_run(run.id, status, reason, artifact)
            .await
        {
            error!(run_id = %run.id, error = %err, "Could not close export run");
        }

        outcome.map(|_| ())
    }

    async fn push_one_target(
        store: Arc<SyncStore>,
        reconciler: Reconciler,
        target: Target,
        token: Option<String>,
        export_dir: String,
    ) -> Result<Option<String>> {
        match target.kind {
            TargetKind::NocoDb => {
                let host = target
                    .host_url
                    .as_deref()
                    .ok_or_else(|| anyhow!("nocodb target has no host url"))?;
                let base = target
                    .base_id
                    .as_deref()
                    .ok_or_else(|| anyhow!("nocodb target has no base id"))?;
                let token = token
                    .as_deref()
                    .ok_or_else(|| anyhow!("NOCODB_API_TOKEN is not set"))?;

                let client = NocoClient::new(host, base, token);
                let adapter = NocoTarget::connect(client).await?;

                let report = reconciler.push(&target, &adapter).await?;
                if !report.is_clean() {
                    return Err(
                        anyhow!("{} entity kinds failed", report.failed_kinds.len()).into()
                    );
                }
                Ok(None)
            }
            TargetKind::Csv => {
                let exporter = CsvExporter::new(&export_dir);
                let paths = exporter.export(store.as_ref(), target.owner_id).await?;
                Ok(paths
                    .first()
                    .map(|p| p.parent().unwrap_or(p).display().to_string()))
            }
        }
    }

    async fn set_source_outcome(&self, source: &Source, outcome: &TaskResult) {
        let (state, reason) = match outcome {
            Ok(()) => (SyncState::Synced, None),
            Err(reason) => (SyncState::Failed, Some(reason.as_str())),
        };
        if let Err(err) = self.store.set_source_state(source.id, state, reason).await {
            error!(source_id = %source.id, error = %err, "Could not record source status");
        }
        if let Err(reason) = outcome {
            if let Err(err) = self
                .store
                .add_audit_log(Some(source.id), None, reason)
                .await
            {
                error!(source_id = %source.id, error = %err, "Could not write audit log");
            }
        }
    }

    async fn set_target_outcome(&self, target: &Target, outcome: &TaskResult) {
        let (state, reason) = match outcome {
            Ok(()) => (SyncState::Synced, None),
            Err(reason) => (SyncState::Failed, Some(reason.as_str())),
        };
        if let Err(err) = self.store.set_target_state(target.id, state, reason).await {
            error!(target_id = %target.id, error = %err, "Could not record target status");
        }
        if let Err(reason) = outcome {
            if let Err(err) = self
                .store
                .add_audit_log(None, Some(target.id), reason)
                .await
            {
                error!(target_id = %target.id, error = %err, "Could not write audit log");
            }
        }
    }
}

#[async_trait]
impl SyncDriver for StoreDriver {
    async fn sources(&self) -> Result<Vec<Source>> {
        self.store.active_sources().await
    }

    async fn targets(&self) -> Result<Vec<Target>> {
        self.store.active_targets().await
    }

    async fn run_source(&self, source: Source) {
        if let Err(err) = self
            .store
            .set_source_state(source.id, SyncState::Syncing, None)
            .await
        {
            error!(source_id = %source.id, error = %err, "Could not mark source syncing");
            return;
        }

        let outcome = self.fetch_source(&source).await;
        match &outcome {
            Ok(()) => info!(source_id = %source.id, platform = %source.platform, "Source synced"),
            Err(reason) => {
                error!(source_id = %source.id, reason, "Source sync exhausted its retries")
            }
        }
        self.set_source_outcome(&source, &outcome).await;
    }

    async fn run_target(&self, target: Target) {
        if let Err(err) = self
            .store
            .set_target_state(target.id, SyncState::Syncing, None)
            .await
        {
            error!(target_id = %target.id, error = %err, "Could not mark target syncing");
            return;
        }

        let outcome = self.push_target(&target).await;
        match &outcome {
            Ok(()) => info!(target_id = %target.id, kind = target.kind.as_str(), "Target pushed"),
            Err(reason) => {
                error!(target_id = %target.id, reason, "Target push exhausted its retries")
            }
        }
        self.set_target_outcome(&target, &outcome).await;
    }
}
