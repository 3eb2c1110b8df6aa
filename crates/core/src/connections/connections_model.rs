//! Platform connection domain models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::conflicts::ResolutionStrategy;

/// External platforms a connection can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Platform {
    /// Addepar portfolio platform
    Addepar,
    /// Black Diamond portfolio platform
    BlackDiamond,
    /// Orion portfolio platform
    Orion,
    /// Juniper Square fund administration
    JuniperSquare,
    /// Carta fund administration
    Carta,
}

impl Platform {
    /// Stable string form used in job ids and audit records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Addepar => "ADDEPAR",
            Platform::BlackDiamond => "BLACK_DIAMOND",
            Platform::Orion => "ORION",
            Platform::JuniperSquare => "JUNIPER_SQUARE",
            Platform::Carta => "CARTA",
        }
    }

    /// Fund-admin platforms carry investor rosters and capital calls;
    /// portfolio platforms do not.
    pub fn is_fund_admin(&self) -> bool {
        matches!(self, Platform::JuniperSquare | Platform::Carta)
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStatus {
    /// Authorization in progress
    #[default]
    Connecting,
    /// Healthy and syncable
    Connected,
    /// Soft-deleted; history retained
    Disconnected,
    /// Credential or platform error
    Error,
    /// Last sync attempt failed
    SyncFailed,
}

impl ConnectionStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, ConnectionStatus::Connected | ConnectionStatus::SyncFailed)
    }
}

/// One link between a tenant portfolio and one external platform account.
///
/// Created on successful platform authorization and mutated by every sync
/// attempt. Never hard-deleted while history must be retained; the
/// `Disconnected` status is the soft-delete marker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: String,
    pub platform: Platform,
    /// Consolidated portfolio this connection feeds.
    pub portfolio_id: String,
    /// Platform-side account identifier.
    pub account_id: String,
    pub status: ConnectionStatus,
    /// Whether the daily scheduler picks this connection up.
    pub auto_sync_enabled: bool,
    /// Minimum minutes between automatic syncs.
    pub sync_frequency_minutes: i64,
    /// Strategy applied when incoming data disagrees with the store.
    pub resolution_strategy: ResolutionStrategy,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub last_successful_sync_at: Option<DateTime<Utc>>,
    pub next_sync_at: Option<DateTime<Utc>>,
    /// Consecutive failures since the last success.
    pub error_count: u32,
    pub total_syncs: u64,
    pub successful_syncs: u64,
    /// successful_syncs / total_syncs, recomputed on every attempt.
    pub success_rate: Decimal,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Connection {
    pub fn new(
        platform: Platform,
        portfolio_id: impl Into<String>,
        account_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            platform,
            portfolio_id: portfolio_id.into(),
            account_id: account_id.into(),
            status: ConnectionStatus::Connected,
            auto_sync_enabled: true,
            sync_frequency_minutes: 24 * 60,
            resolution_strategy: ResolutionStrategy::default(),
            last_sync_at: None,
            last_successful_sync_at: None,
            next_sync_at: None,
            error_count: 0,
            total_syncs: 0,
            successful_syncs: 0,
            success_rate: Decimal::ONE,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record a successful sync attempt: resets the error streak and
    /// recomputes the rolling success rate.
    pub fn record_success(&mut self, at: DateTime<Utc>) {
        self.total_syncs += 1;
        self.successful_syncs += 1;
        self.error_count = 0;
        self.last_error = None;
        self.status = ConnectionStatus::Connected;
        self.last_sync_at = Some(at);
        self.last_successful_sync_at = Some(at);
        self.next_sync_at = Some(at + chrono::Duration::minutes(self.sync_frequency_minutes));
        self.recompute_success_rate();
        self.updated_at = at;
    }

    /// Record a failed sync attempt.
    pub fn record_failure(&mut self, error: String, at: DateTime<Utc>) {
        self.total_syncs += 1;
        self.error_count += 1;
        self.last_error = Some(error);
        self.status = ConnectionStatus::SyncFailed;
        self.last_sync_at = Some(at);
        self.recompute_success_rate();
        self.updated_at = at;
    }

    fn recompute_success_rate(&mut self) {
        if self.total_syncs == 0 {
            self.success_rate = Decimal::ONE;
        } else {
            self.success_rate =
                Decimal::from(self.successful_syncs) / Decimal::from(self.total_syncs);
        }
    }

    /// Whether an automatic sync is due at `now`.
    pub fn is_sync_due(&self, now: DateTime<Utc>) -> bool {
        if !self.auto_sync_enabled || !self.status.is_active() {
            return false;
        }
        match self.last_sync_at {
            None => true,
            Some(last) => now - last >= chrono::Duration::minutes(self.sync_frequency_minutes),
        }
    }

    /// Soft delete: history is retained, scheduling stops.
    pub fn disconnect(&mut self) {
        self.status = ConnectionStatus::Disconnected;
        self.auto_sync_enabled = false;
        self.updated_at = Utc::now();
    }
}
