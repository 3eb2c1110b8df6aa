//! Platform adapter contract.
//!
//! One adapter per external platform. Adapters normalize platform-specific
//! payloads into the canonical record shapes defined in `clearway-core` and
//! own their token refresh; the engine only sees the trait.

pub mod rest;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use clearway_core::connections::{Connection, Platform};
use clearway_core::holdings::PlatformHolding;
use clearway_core::investors::{PlatformCapitalCall, PlatformInvestor};
use clearway_core::performance::{PerformancePeriod, PlatformPerformance};
use clearway_core::transactions::PlatformTransaction;

pub use rest::{RestAdapterConfig, RestPlatformAdapter};

/// Adapter failures. Auth errors are typed so the engine can distinguish a
/// whole-operation abort from a per-entity data error.
#[derive(Error, Debug)]
pub enum AdapterError {
    /// Credential invalid or expired beyond refresh; aborts the operation.
    #[error("Authentication failed for {platform}: {message}")]
    Auth { platform: String, message: String },

    /// A payload could not be normalized; isolated to the record.
    #[error("Data error from {platform}: {message}")]
    Data { platform: String, message: String },

    /// Transport-level failure (timeout, connection refused, 5xx).
    #[error("HTTP error from {platform}: {message}")]
    Http { platform: String, message: String },
}

impl AdapterError {
    pub fn is_auth(&self) -> bool {
        matches!(self, AdapterError::Auth { .. })
    }
}

/// Contract every platform integration implements.
///
/// The roster operations default to empty: portfolio platforms have no
/// investor roster, only the fund-admin platforms override these.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    /// Platform this adapter serves.
    fn platform(&self) -> Platform;

    async fn fetch_holdings(&self, connection: &Connection)
        -> Result<Vec<PlatformHolding>, AdapterError>;

    /// Transactions dated at or after `since`.
    async fn fetch_transactions(
        &self,
        connection: &Connection,
        since: DateTime<Utc>,
    ) -> Result<Vec<PlatformTransaction>, AdapterError>;

    async fn fetch_performance(
        &self,
        connection: &Connection,
        period: PerformancePeriod,
    ) -> Result<Vec<PlatformPerformance>, AdapterError>;

    async fn fetch_investors(
        &self,
        _connection: &Connection,
    ) -> Result<Vec<PlatformInvestor>, AdapterError> {
        Ok(Vec::new())
    }

    async fn fetch_capital_calls(
        &self,
        _connection: &Connection,
    ) -> Result<Vec<PlatformCapitalCall>, AdapterError> {
        Ok(Vec::new())
    }

    /// Lightweight credential/reachability probe.
    async fn test_connection(&self, connection: &Connection) -> Result<bool, AdapterError>;

    /// Revokes platform-side access for a disconnected connection.
    async fn revoke_access(&self, connection: &Connection) -> Result<(), AdapterError>;
}

/// Maps platforms to their adapters.
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: HashMap<Platform, Arc<dyn PlatformAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, adapter: Arc<dyn PlatformAdapter>) {
        self.adapters.insert(adapter.platform(), adapter);
    }

    pub fn get(&self, platform: Platform) -> Option<Arc<dyn PlatformAdapter>> {
        self.adapters.get(&platform).cloned()
    }

    pub fn platforms(&self) -> Vec<Platform> {
        self.adapters.keys().copied().collect()
    }
}
