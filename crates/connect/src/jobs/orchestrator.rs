//! Sync job scheduling.
//!
//! Deterministic job ids are the idempotency mechanism: re-running the
//! scheduler for the same date enqueues nothing new, because the queue
//! treats a duplicate id as a no-op.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Weekday};
use log::info;
use uuid::Uuid;

use super::queue::{JobPriority, JobQueue, QueueStats, SyncJob, SyncJobPayload};
use clearway_core::connections::{Connection, ConnectionRepositoryTrait};
use clearway_core::errors::Result;
use clearway_core::sync::SyncDataType;

/// Schedules sync jobs onto the queue.
pub struct SyncJobOrchestrator {
    connections: Arc<dyn ConnectionRepositoryTrait>,
    queue: Arc<dyn JobQueue>,
}

impl SyncJobOrchestrator {
    pub fn new(connections: Arc<dyn ConnectionRepositoryTrait>, queue: Arc<dyn JobQueue>) -> Self {
        Self { connections, queue }
    }

    /// Enqueues the daily ALL sync for every active auto-sync connection,
    /// plus the weekly investor-roster sync for fund-admin connections on
    /// Mondays. Safe to call repeatedly for the same date. Returns the
    /// number of jobs actually enqueued.
    pub async fn schedule_daily_syncs(&self, today: NaiveDate) -> Result<u32> {
        let connections = self.connections.list(true)?;
        let mut enqueued = 0;

        for connection in &connections {
            let id = daily_job_id(connection, SyncDataType::All, today);
            let added = self
                .queue
                .enqueue(
                    id,
                    SyncJobPayload {
                        connection_id: connection.id.clone(),
                        data_type: SyncDataType::All,
                        force: false,
                    },
                    JobPriority::Normal,
                    None,
                )
                .await?;
            if added {
                enqueued += 1;
            }

            if today.weekday() == Weekday::Mon && connection.platform.is_fund_admin() {
                let added = self
                    .queue
                    .enqueue(
                        roster_job_id(connection, today),
                        SyncJobPayload {
                            connection_id: connection.id.clone(),
                            data_type: SyncDataType::Investors,
                            force: false,
                        },
                        JobPriority::Normal,
                        None,
                    )
                    .await?;
                if added {
                    enqueued += 1;
                }
            }
        }

        info!(
            "Scheduled {} sync jobs for {} ({} connections)",
            enqueued,
            today,
            connections.len()
        );
        Ok(enqueued)
    }

    /// Enqueues a high-priority forced sync for one connection. Every call
    /// is a distinct job.
    pub async fn sync_now(&self, connection_id: &str, data_type: SyncDataType) -> Result<String> {
        let connection = self.connections.get_by_id(connection_id)?;
        let id = format!("manual:{}:{}", connection.id, Uuid::new_v4());
        self.queue
            .enqueue(
                id.clone(),
                SyncJobPayload {
                    connection_id: connection.id,
                    data_type,
                    force: true,
                },
                JobPriority::High,
                None,
            )
            .await?;
        Ok(id)
    }

    /// Enqueues a forced ALL sync for every active connection.
    pub async fn sync_all(&self) -> Result<Vec<String>> {
        let connections = self.connections.list(true)?;
        let mut job_ids = Vec::with_capacity(connections.len());
        for connection in connections {
            job_ids.push(self.sync_now(&connection.id, SyncDataType::All).await?);
        }
        Ok(job_ids)
    }

    /// Re-runs a FAILED job with a fresh attempt budget.
    pub async fn retry_failed_job(&self, job_id: &str) -> Result<SyncJob> {
        self.queue.retry(job_id).await
    }

    pub fn queue_stats(&self) -> QueueStats {
        self.queue.stats()
    }

    pub fn failed_jobs(&self) -> Result<Vec<SyncJob>> {
        self.queue.failed_jobs()
    }
}

/// `daily:{platform}:{account}:{data_type}:{date}`
fn daily_job_id(connection: &Connection, data_type: SyncDataType, date: NaiveDate) -> String {
    format!(
        "daily:{}:{}:{}:{}",
        connection.platform.as_str(),
        connection.account_id,
        data_type.as_str(),
        date.format("%Y-%m-%d")
    )
}

/// `investor-roster:{platform}:{account}:{iso_week}`
fn roster_job_id(connection: &Connection, date: NaiveDate) -> String {
    format!(
        "investor-roster:{}:{}:{}",
        connection.platform.as_str(),
        connection.account_id,
        date.format("%G-W%V")
    )
}
