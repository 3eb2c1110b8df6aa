//! Conflict domain models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How disagreements between the consolidated store and an incoming
/// platform record are resolved for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResolutionStrategy {
    /// Consolidated (Clearway) value is kept unchanged.
    ClearwayWins,
    /// Incoming platform value overwrites the consolidated one.
    #[default]
    PlatformWins,
    /// A Conflict row is persisted for operator action.
    ManualReview,
    /// Field-wise merge of both records.
    Merge,
    /// The record with the newer `lastUpdated` wins wholesale.
    Timestamp,
}

/// Kind of disagreement detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictType {
    Duplicate,
    QuantityMismatch,
    ValueMismatch,
    MissingSource,
}

/// Entity kind the conflict is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictDataType {
    Holding,
    Transaction,
}

/// Severity ordering: Low < Medium < High.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictSeverity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictStatus {
    #[default]
    Pending,
    Resolved,
    Ignored,
}

impl ConflictStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConflictStatus::Resolved | ConflictStatus::Ignored)
    }
}

/// Structured evidence behind a detected conflict.
///
/// The resolver branches on these fields, so they are typed variants
/// rather than a free-form map; only audit-opaque payloads belong in
/// `Conflict::context`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictDetails {
    #[serde(rename_all = "camelCase")]
    QuantityMismatch {
        existing_quantity: Decimal,
        incoming_quantity: Decimal,
        /// |incoming - existing| / existing
        relative_difference: Decimal,
    },
    #[serde(rename_all = "camelCase")]
    ValueMismatch {
        existing_value: Decimal,
        incoming_value: Decimal,
        relative_difference: Decimal,
    },
    #[serde(rename_all = "camelCase")]
    MultiSource {
        source_count: usize,
        /// (max - min) / max across source quantities.
        quantity_variance: Decimal,
        /// Whether any source's value deviates from the mean by more
        /// than the value tolerance.
        value_outlier: bool,
    },
    #[serde(rename_all = "camelCase")]
    Duplicate {
        matched_transaction_id: String,
        platform_transaction_id: Option<String>,
    },
}

/// A persisted disagreement awaiting (or having received) resolution.
///
/// The `clearway_data`/`platform_data` snapshots are immutable after
/// creation; resolution writes a new Holding/Transaction, never a
/// retroactive edit of the snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub id: String,
    pub portfolio_id: String,
    pub conflict_type: ConflictType,
    pub data_type: ConflictDataType,
    pub severity: ConflictSeverity,
    /// Connection that reported the disagreeing record.
    pub connection_id: Option<String>,
    /// Snapshot of the consolidated record at detection time.
    pub clearway_data: Value,
    /// Snapshot of the incoming platform record at detection time.
    pub platform_data: Value,
    pub details: ConflictDetails,
    pub status: ConflictStatus,
    /// Strategy ultimately applied, once resolved.
    pub resolution_strategy: Option<ResolutionStrategy>,
    pub resolved_by: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    /// Opaque audit payload; resolver logic never branches on this.
    pub context: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conflict {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        portfolio_id: impl Into<String>,
        conflict_type: ConflictType,
        data_type: ConflictDataType,
        severity: ConflictSeverity,
        connection_id: Option<String>,
        clearway_data: Value,
        platform_data: Value,
        details: ConflictDetails,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            portfolio_id: portfolio_id.into(),
            conflict_type,
            data_type,
            severity,
            connection_id,
            clearway_data,
            platform_data,
            details,
            status: ConflictStatus::Pending,
            resolution_strategy: None,
            resolved_by: None,
            resolved_at: None,
            context: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Mark the conflict resolved by an operator.
    pub fn resolve(&mut self, strategy: ResolutionStrategy, reviewer: impl Into<String>) {
        let now = Utc::now();
        self.status = ConflictStatus::Resolved;
        self.resolution_strategy = Some(strategy);
        self.resolved_by = Some(reviewer.into());
        self.resolved_at = Some(now);
        self.updated_at = now;
    }

    /// Mark the conflict ignored by an operator.
    pub fn ignore(&mut self, reviewer: impl Into<String>) {
        let now = Utc::now();
        self.status = ConflictStatus::Ignored;
        self.resolved_by = Some(reviewer.into());
        self.resolved_at = Some(now);
        self.updated_at = now;
    }
}

/// Advisory outcome of portfolio-wide reconciliation for one security.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    ManualReviewRequired,
    UseAverageValue,
    UseMostRecent,
}

impl Recommendation {
    pub fn for_severity(severity: ConflictSeverity) -> Self {
        match severity {
            ConflictSeverity::High => Recommendation::ManualReviewRequired,
            ConflictSeverity::Medium => Recommendation::UseAverageValue,
            ConflictSeverity::Low => Recommendation::UseMostRecent,
        }
    }
}

/// One flagged security in a reconciliation report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationFinding {
    pub security_id: String,
    pub severity: ConflictSeverity,
    pub recommendation: Recommendation,
    pub details: ConflictDetails,
    /// Connections that reported this security.
    pub connection_ids: Vec<String>,
}

/// Full advisory report for one portfolio.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationReport {
    pub portfolio_id: String,
    pub securities_checked: usize,
    pub findings: Vec<ReconciliationFinding>,
}
