//! Job-based sync orchestration.
//!
//! The scheduler turns sync intent into queue jobs with deterministic ids,
//! the queue holds them with priority, delay, and retention, and the worker
//! drains the queue into `SyncEngine` calls under concurrency and dispatch
//! rate ceilings.

pub mod orchestrator;
pub mod queue;
pub mod worker;

pub use orchestrator::SyncJobOrchestrator;
pub use queue::{
    InMemoryJobQueue, JobPriority, JobQueue, JobStatus, QueueConfig, QueueStats, SyncJob,
    SyncJobPayload,
};
pub use worker::{SyncWorker, WorkerConfig};
