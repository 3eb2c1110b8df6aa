//! Sync operation domain models.
//!
//! A `SyncOperation` is the audit record of one execution attempt:
//! `PENDING → IN_PROGRESS → {COMPLETED | PARTIAL | FAILED}`, with FAILED
//! transitioning back to PENDING via an explicit retry, bounded by
//! `max_retries`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::sync_errors::SyncError;

/// Default retry bound for a sync operation.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncDirection {
    #[default]
    Pull,
    Push,
}

/// What a sync operation covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncDataType {
    Holdings,
    Transactions,
    Performance,
    /// Weekly investor-roster pull; fund-admin platforms only.
    Investors,
    /// Expands to holdings + transactions + performance.
    All,
}

impl SyncDataType {
    /// Concrete data types behind a request. `All` expands to the three
    /// daily types; the roster type is always scheduled explicitly.
    pub fn expand(&self) -> Vec<SyncDataType> {
        match self {
            SyncDataType::All => vec![
                SyncDataType::Holdings,
                SyncDataType::Transactions,
                SyncDataType::Performance,
            ],
            other => vec![*other],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncDataType::Holdings => "HOLDINGS",
            SyncDataType::Transactions => "TRANSACTIONS",
            SyncDataType::Performance => "PERFORMANCE",
            SyncDataType::Investors => "INVESTORS",
            SyncDataType::All => "ALL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncOperationStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    /// Some records failed but the operation ran to the end.
    Partial,
    Failed,
}

impl SyncOperationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SyncOperationStatus::Completed
                | SyncOperationStatus::Partial
                | SyncOperationStatus::Failed
        )
    }
}

/// Severity of a per-record sync error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

/// One failed record within a sync operation. Isolated: recorded and
/// counted, never aborts the remaining entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRecordError {
    pub severity: ErrorSeverity,
    pub retryable: bool,
    pub message: String,
    /// Identifier of the record that failed (security id, platform
    /// transaction id, period name).
    pub entity: Option<String>,
    /// Opaque audit payload.
    pub context: Option<Value>,
}

/// Counters aggregated over one sync operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSummary {
    pub records_processed: u32,
    pub records_inserted: u32,
    pub records_updated: u32,
    pub records_skipped: u32,
    pub records_failed: u32,
}

impl SyncSummary {
    pub fn merge(&mut self, other: SyncSummary) {
        self.records_processed += other.records_processed;
        self.records_inserted += other.records_inserted;
        self.records_updated += other.records_updated;
        self.records_skipped += other.records_skipped;
        self.records_failed += other.records_failed;
    }
}

/// One sync execution attempt for one connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOperation {
    pub id: String,
    pub connection_id: String,
    pub direction: SyncDirection,
    /// The requested data type; `All` stays `All` here so a retry
    /// re-expands it.
    pub data_type: SyncDataType,
    pub status: SyncOperationStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub summary: SyncSummary,
    pub retry_count: u32,
    pub max_retries: u32,
    pub next_retry_at: Option<DateTime<Utc>>,
    /// Whole-operation failure message, if any.
    pub error_message: Option<String>,
    /// Per-record failures, isolated from each other.
    pub record_errors: Vec<SyncRecordError>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SyncOperation {
    pub fn new(connection_id: impl Into<String>, data_type: SyncDataType) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            connection_id: connection_id.into(),
            direction: SyncDirection::Pull,
            data_type,
            status: SyncOperationStatus::Pending,
            started_at: None,
            completed_at: None,
            summary: SyncSummary::default(),
            retry_count: 0,
            max_retries: DEFAULT_MAX_RETRIES,
            next_retry_at: None,
            error_message: None,
            record_errors: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// PENDING → IN_PROGRESS.
    pub fn start(&mut self) {
        let now = Utc::now();
        self.status = SyncOperationStatus::InProgress;
        self.started_at = Some(now);
        self.updated_at = now;
    }

    /// Terminal success: COMPLETED when nothing failed, PARTIAL otherwise.
    pub fn finish(&mut self, summary: SyncSummary, record_errors: Vec<SyncRecordError>) {
        let now = Utc::now();
        self.status = if summary.records_failed == 0 {
            SyncOperationStatus::Completed
        } else {
            SyncOperationStatus::Partial
        };
        self.summary = summary;
        self.record_errors = record_errors;
        self.completed_at = Some(now);
        self.next_retry_at = None;
        self.updated_at = now;
    }

    /// Whole-operation failure. Sets `next_retry_at` by exponential
    /// backoff while attempts remain.
    pub fn fail(&mut self, error: String, backoff_base: chrono::Duration) {
        let now = Utc::now();
        self.status = SyncOperationStatus::Failed;
        self.error_message = Some(error);
        self.completed_at = Some(now);
        self.next_retry_at = if self.retry_count < self.max_retries {
            let factor = 2_i32.pow(self.retry_count);
            Some(now + backoff_base * factor)
        } else {
            None
        };
        self.updated_at = now;
    }

    pub fn can_retry(&self) -> bool {
        self.status == SyncOperationStatus::Failed && self.retry_count < self.max_retries
    }

    /// FAILED → PENDING for an explicit retry, bounded by `max_retries`.
    pub fn prepare_retry(&mut self) -> Result<(), SyncError> {
        if self.retry_count >= self.max_retries {
            return Err(SyncError::MaxRetriesExceeded {
                operation_id: self.id.clone(),
                retry_count: self.retry_count,
                max_retries: self.max_retries,
            });
        }
        if self.status != SyncOperationStatus::Failed {
            return Err(SyncError::InvalidState(format!(
                "operation {} is {:?}, only FAILED operations can be retried",
                self.id, self.status
            )));
        }
        let now = Utc::now();
        self.retry_count += 1;
        self.status = SyncOperationStatus::Pending;
        self.started_at = None;
        self.completed_at = None;
        self.error_message = None;
        self.next_retry_at = None;
        self.updated_at = now;
        Ok(())
    }
}
