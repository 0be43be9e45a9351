use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::driver::SyncDriver;

/// Periodic scheduler. One pass runs at a time, ever: the timer, the manual
/// triggers and overlapping timers all contend on the same flag, and a pass
/// that finds it taken is rejected outright, never queued.
pub struct Worker {
    driver: Arc<dyn SyncDriver>,
    interval: Duration,
    pass_active: Arc<AtomicBool>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl Worker {
    pub fn new(driver: Arc<dyn SyncDriver>, interval: Duration) -> Self {
        Self {
            driver,
            interval,
            pass_active: Arc::new(AtomicBool::new(false)),
            timer: Mutex::new(None),
        }
    }

    /// Start the repeating timer. Returns false without side effects when a
    /// timer is already running.
    pub fn start(&self) -> bool {
        let mut timer = self.timer.lock().unwrap();
        if timer.as_ref().is_some_and(|t| !t.is_finished()) {
            debug!("Worker already started");
            return false;
        }

        let driver = self.driver.clone();
        let pass_active = self.pass_active.clone();
        let period = self.interval;
        *timer = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick fires immediately.
            loop {
                ticker.tick().await;
                run_pass(driver.clone(), &pass_active).await;
            }
        }));
        info!(interval_secs = period.as_secs(), "Worker started");
        true
    }

    pub fn stop(&self) {
        if let Some(timer) = self.timer.lock().unwrap().take() {
            timer.abort();
            info!("Worker stopped");
        }
    }

    pub fn restart(&self) {
        self.stop();
        self.start();
    }

    /// Run a full pass now. Returns false when a pass is already in flight.
    pub async fn sync_all_now(&self) -> bool {
        run_pass(self.driver.clone(), &self.pass_active).await
    }

    /// Run one source now, under the same exclusivity as a full pass.
    /// Returns false when the source is unknown or a pass is in flight.
    pub async fn sync_source_now(&self, source_id: Uuid) -> bool {
        if !acquire(&self.pass_active) {
            return false;
        }
        let result = self.sync_one(source_id).await;
        self.pass_active.store(false, Ordering::SeqCst);
        result
    }

    async fn sync_one(&self, source_id: Uuid) -> bool {
        let sources = match self.driver.sources().await {
            Ok(sources) => sources,
            Err(err) => {
                error!(error = %err, "Could not list sources");
                return false;
            }
        };
        let Some(source) = sources.into_iter().find(|s| s.id == source_id) else {
            debug!(%source_id, "Source not active, nothing to sync");
            return false;
        };
        self.driver.run_source(source).await;
        true
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.lock().unwrap().take() {
            timer.abort();
        }
    }
}

fn acquire(pass_active: &AtomicBool) -> bool {
    pass_active
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_ok()
}

/// One pass: every active source concurrently, a full barrier, then every
/// active target concurrently. Targets never observe a half-finished fetch
/// from their own pass.
async fn run_pass(driver: Arc<dyn SyncDriver>, pass_active: &AtomicBool) -> bool {
    if !acquire(pass_active) {
        debug!("Pass already in flight, rejecting");
        return false;
    }

    do_pass(driver).await;
    pass_active.store(false, Ordering::SeqCst);
    true
}

async fn do_pass(driver: Arc<dyn SyncDriver>) {
    match driver.sources().await {
        Ok(sources) => {
            info!(count = sources.len(), "Syncing sources");
            let mut set = JoinSet::new();
            for source in sources {
                let driver = driver.clone();
                set.spawn(async move { driver.run_source(source).await });
            }
            while set.join_next().await.is_some() {}
        }
        Err(err) => error!(error = %err, "Could not list sources, skipping to targets"),
    }

    match driver.targets().await {
        Ok(targets) => {
            info!(count = targets.len(), "Pushing targets");
            let mut set = JoinSet::new();
            for target in targets {
                let driver = driver.clone();
                set.spawn(async move { driver.run_target(target).await });
            }
            while set.join_next().await.is_some() {}
        }
        Err(err) => error!(error = %err, "Could not list targets"),
    }
}
