//! Queue worker.
//!
//! Drains ready jobs into `SyncEngine` calls under two ceilings: at most
//! `concurrency` jobs in flight, and at most `max_dispatch_per_second`
//! claims per second. A failed job goes back to the queue with backoff;
//! the queue owns the attempt budget.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use log::{debug, info, warn};
use tokio::sync::Semaphore;
use tokio::time::sleep;

use super::queue::{JobQueue, SyncJob};
use crate::engine::SyncEngine;
use clearway_core::errors::{Error, Result};

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Jobs executing at once.
    pub concurrency: usize,
    /// Claim rate ceiling.
    pub max_dispatch_per_second: u32,
    /// Sleep between queue polls when nothing is ready.
    pub idle_poll: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            max_dispatch_per_second: 10,
            idle_poll: Duration::from_secs(1),
        }
    }
}

impl WorkerConfig {
    fn dispatch_interval(&self) -> Duration {
        Duration::from_millis(1000 / u64::from(self.max_dispatch_per_second.max(1)))
    }
}

/// Executes queued sync jobs against the engine.
pub struct SyncWorker {
    engine: Arc<SyncEngine>,
    queue: Arc<dyn JobQueue>,
    config: WorkerConfig,
}

impl SyncWorker {
    pub fn new(engine: Arc<SyncEngine>, queue: Arc<dyn JobQueue>, config: WorkerConfig) -> Self {
        Self {
            engine,
            queue,
            config,
        }
    }

    /// Claims and executes jobs until nothing is ready, then waits for the
    /// in-flight ones. Jobs re-queued with backoff during the drain have a
    /// future ready time, so the loop terminates. Returns the number of
    /// jobs dispatched.
    pub async fn run_until_idle(&self) -> Result<u32> {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
        let interval = self.config.dispatch_interval();
        let mut handles = Vec::new();
        let mut dispatched = 0u32;

        loop {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| Error::Unexpected(e.to_string()))?;
            let Some(job) = self.queue.next_ready(Utc::now()).await? else {
                break;
            };
            dispatched += 1;

            let engine = self.engine.clone();
            let queue = self.queue.clone();
            handles.push(tokio::spawn(async move {
                let _permit = permit;
                process(engine, queue, job).await;
            }));

            sleep(interval).await;
        }

        for joined in join_all(handles).await {
            if let Err(e) = joined {
                warn!("Sync job task panicked: {e}");
            }
        }
        if dispatched > 0 {
            info!("Worker drained {} jobs", dispatched);
        }
        Ok(dispatched)
    }

    /// Long-running worker loop: drain, purge expired jobs, sleep, repeat.
    pub async fn run(&self) -> Result<()> {
        loop {
            self.run_until_idle().await?;
            let purged = self.queue.purge(Utc::now()).await?;
            if purged > 0 {
                debug!("Purged {} expired jobs", purged);
            }
            sleep(self.config.idle_poll).await;
        }
    }
}

async fn process(engine: Arc<SyncEngine>, queue: Arc<dyn JobQueue>, job: SyncJob) {
    debug!(
        "Executing job {} (attempt {}/{})",
        job.id, job.attempts, job.max_attempts
    );
    let result = engine
        .sync(&job.payload.connection_id, job.payload.data_type, job.payload.force)
        .await;

    let settle = match result {
        Ok(outcome) if outcome.success() => queue.complete(&job.id).await,
        Ok(outcome) => {
            let message = outcome
                .operation()
                .and_then(|op| op.error_message.clone())
                .unwrap_or_else(|| "sync operation failed".to_string());
            queue.fail(&job.id, message).await
        }
        Err(err) => queue.fail(&job.id, err.to_string()).await,
    };
    if let Err(e) = settle {
        warn!("Failed to settle job {}: {e}", job.id);
    }
}
