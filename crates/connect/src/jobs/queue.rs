//! Sync job queue.
//!
//! Jobs are keyed by caller-chosen ids; enqueueing an id that is already
//! present is a no-op, which is what makes scheduler runs idempotent.
//! Ready jobs are claimed highest priority first, then oldest ready time.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use log::debug;
use serde::{Deserialize, Serialize};

use clearway_core::errors::{Error, Result};
use clearway_core::sync::SyncDataType;

/// Dispatch priority. Manual syncs outrank scheduled ones.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobPriority {
    Low,
    #[default]
    Normal,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Enqueued, waiting for its ready time and a worker slot.
    #[default]
    Waiting,
    /// Claimed by a worker.
    Active,
    Completed,
    /// All attempts exhausted; kept for operator retry.
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// What the worker should ask the engine to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncJobPayload {
    pub connection_id: String,
    pub data_type: SyncDataType,
    /// Bypass the auto-sync cadence check.
    pub force: bool,
}

/// One queued sync request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncJob {
    /// Caller-chosen id; deterministic ids make scheduling idempotent.
    pub id: String,
    pub payload: SyncJobPayload,
    pub priority: JobPriority,
    pub status: JobStatus,
    /// Execution attempts so far (successful or not).
    pub attempts: u32,
    pub max_attempts: u32,
    /// Earliest time a worker may claim this job.
    pub ready_at: DateTime<Utc>,
    pub enqueued_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// Queue counters by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    pub waiting: usize,
    pub active: usize,
    pub completed: usize,
    pub failed: usize,
}

/// Retry and retention policy.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub max_attempts: u32,
    /// Base delay for the exponential retry backoff.
    pub backoff_base: Duration,
    /// Completed jobs older than this are purged.
    pub completed_retention: Duration,
    /// At most this many completed jobs are retained regardless of age.
    pub completed_cap: usize,
    /// Failed jobs older than this are purged.
    pub failed_retention: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::seconds(5),
            completed_retention: Duration::days(7),
            completed_cap: 100,
            failed_retention: Duration::days(30),
        }
    }
}

/// Contract between the scheduler, the worker, and the queue backing store.
#[async_trait::async_trait]
pub trait JobQueue: Send + Sync {
    /// Adds a job unless its id is already present. Returns false for the
    /// duplicate no-op; an existing job is never modified.
    async fn enqueue(
        &self,
        id: String,
        payload: SyncJobPayload,
        priority: JobPriority,
        delay: Option<Duration>,
    ) -> Result<bool>;

    /// Claims the best ready job at `now` and marks it ACTIVE: highest
    /// priority first, ties broken by earliest ready time.
    async fn next_ready(&self, now: DateTime<Utc>) -> Result<Option<SyncJob>>;

    /// Marks an active job COMPLETED.
    async fn complete(&self, job_id: &str) -> Result<SyncJob>;

    /// Records a failed attempt. While attempts remain the job goes back
    /// to WAITING with an exponential-backoff ready time; otherwise FAILED.
    async fn fail(&self, job_id: &str, error: String) -> Result<SyncJob>;

    /// Puts a FAILED job back to WAITING with a fresh attempt budget.
    async fn retry(&self, job_id: &str) -> Result<SyncJob>;

    /// Drops completed jobs past retention (age or count cap) and failed
    /// jobs past retention age. Returns the number purged.
    async fn purge(&self, now: DateTime<Utc>) -> Result<usize>;

    fn get_job(&self, job_id: &str) -> Result<Option<SyncJob>>;

    fn stats(&self) -> QueueStats;

    /// FAILED jobs, newest first.
    fn failed_jobs(&self) -> Result<Vec<SyncJob>>;
}

/// DashMap-backed queue for tests and single-process deployments.
#[derive(Default)]
pub struct InMemoryJobQueue {
    jobs: DashMap<String, SyncJob>,
    config: QueueConfig,
}

impl InMemoryJobQueue {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            jobs: DashMap::new(),
            config,
        }
    }

    fn not_found(job_id: &str) -> Error {
        Error::Repository(format!("job not found: {job_id}"))
    }
}

#[async_trait::async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn enqueue(
        &self,
        id: String,
        payload: SyncJobPayload,
        priority: JobPriority,
        delay: Option<Duration>,
    ) -> Result<bool> {
        use dashmap::mapref::entry::Entry;
        let now = Utc::now();
        match self.jobs.entry(id) {
            Entry::Occupied(existing) => {
                debug!("Job {} already enqueued; skipping", existing.key());
                Ok(false)
            }
            Entry::Vacant(slot) => {
                let job = SyncJob {
                    id: slot.key().clone(),
                    payload,
                    priority,
                    status: JobStatus::Waiting,
                    attempts: 0,
                    max_attempts: self.config.max_attempts,
                    ready_at: now + delay.unwrap_or_else(Duration::zero),
                    enqueued_at: now,
                    started_at: None,
                    finished_at: None,
                    last_error: None,
                };
                slot.insert(job);
                Ok(true)
            }
        }
    }

    async fn next_ready(&self, now: DateTime<Utc>) -> Result<Option<SyncJob>> {
        let best_id = self
            .jobs
            .iter()
            .filter(|j| j.status == JobStatus::Waiting && j.ready_at <= now)
            .max_by(|a, b| {
                a.priority
                    .cmp(&b.priority)
                    .then(b.ready_at.cmp(&a.ready_at))
            })
            .map(|j| j.id.clone());

        let Some(id) = best_id else {
            return Ok(None);
        };
        // Claim under the shard lock; another worker may have raced us.
        match self.jobs.get_mut(&id) {
            Some(mut job) if job.status == JobStatus::Waiting => {
                job.status = JobStatus::Active;
                job.attempts += 1;
                job.started_at = Some(now);
                Ok(Some(job.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn complete(&self, job_id: &str) -> Result<SyncJob> {
        let mut job = self
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| Self::not_found(job_id))?;
        job.status = JobStatus::Completed;
        job.finished_at = Some(Utc::now());
        job.last_error = None;
        Ok(job.clone())
    }

    async fn fail(&self, job_id: &str, error: String) -> Result<SyncJob> {
        let mut job = self
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| Self::not_found(job_id))?;
        let now = Utc::now();
        job.last_error = Some(error);
        if job.attempts < job.max_attempts {
            // attempts was already bumped when the job was claimed, so the
            // first failure backs off by the base delay.
            let factor = 2_i32.pow(job.attempts.saturating_sub(1));
            job.status = JobStatus::Waiting;
            job.ready_at = now + self.config.backoff_base * factor;
            job.finished_at = None;
        } else {
            job.status = JobStatus::Failed;
            job.finished_at = Some(now);
        }
        Ok(job.clone())
    }

    async fn retry(&self, job_id: &str) -> Result<SyncJob> {
        let mut job = self
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| Self::not_found(job_id))?;
        if job.status != JobStatus::Failed {
            return Err(Error::Repository(format!(
                "job {} is {:?}, only FAILED jobs can be retried",
                job.id, job.status
            )));
        }
        job.status = JobStatus::Waiting;
        job.attempts = 0;
        job.ready_at = Utc::now();
        job.started_at = None;
        job.finished_at = None;
        Ok(job.clone())
    }

    async fn purge(&self, now: DateTime<Utc>) -> Result<usize> {
        let before = self.jobs.len();

        self.jobs.retain(|_, job| match job.status {
            JobStatus::Completed => job
                .finished_at
                .map_or(true, |at| now - at < self.config.completed_retention),
            JobStatus::Failed => job
                .finished_at
                .map_or(true, |at| now - at < self.config.failed_retention),
            _ => true,
        });

        // Count cap on completed jobs: keep the newest.
        let mut completed: Vec<(String, DateTime<Utc>)> = self
            .jobs
            .iter()
            .filter(|j| j.status == JobStatus::Completed)
            .map(|j| (j.id.clone(), j.finished_at.unwrap_or(j.enqueued_at)))
            .collect();
        if completed.len() > self.config.completed_cap {
            completed.sort_by(|a, b| b.1.cmp(&a.1));
            for (id, _) in completed.drain(self.config.completed_cap..) {
                self.jobs.remove(&id);
            }
        }

        Ok(before - self.jobs.len())
    }

    fn get_job(&self, job_id: &str) -> Result<Option<SyncJob>> {
        Ok(self.jobs.get(job_id).map(|j| j.clone()))
    }

    fn stats(&self) -> QueueStats {
        let mut stats = QueueStats::default();
        for job in self.jobs.iter() {
            match job.status {
                JobStatus::Waiting => stats.waiting += 1,
                JobStatus::Active => stats.active += 1,
                JobStatus::Completed => stats.completed += 1,
                JobStatus::Failed => stats.failed += 1,
            }
        }
        stats
    }

    fn failed_jobs(&self) -> Result<Vec<SyncJob>> {
        let mut failed: Vec<SyncJob> = self
            .jobs
            .iter()
            .filter(|j| j.status == JobStatus::Failed)
            .map(|j| j.clone())
            .collect();
        failed.sort_by(|a, b| b.finished_at.cmp(&a.finished_at));
        Ok(failed)
    }
}
