//! Shared fixtures for the engine and job tests.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::adapters::{AdapterError, AdapterRegistry, PlatformAdapter};
use crate::engine::{SyncEngine, SyncEngineConfig};
use clearway_core::connections::{Connection, ConnectionRepositoryTrait, Platform};
use clearway_core::conflicts::{ConflictResolver, ResolutionStrategy};
use clearway_core::holdings::PlatformHolding;
use clearway_core::investors::{PlatformCapitalCall, PlatformInvestor};
use clearway_core::performance::{PerformancePeriod, PlatformPerformance};
use clearway_core::store::MemoryStore;
use clearway_core::transactions::{PlatformTransaction, TransactionType};

/// Canned responses for one mock platform.
#[derive(Default, Clone)]
pub struct MockAdapterData {
    pub holdings: Vec<PlatformHolding>,
    pub transactions: Vec<PlatformTransaction>,
    pub performance: Vec<PlatformPerformance>,
    pub investors: Vec<PlatformInvestor>,
    pub capital_calls: Vec<PlatformCapitalCall>,
    /// Every fetch fails with an auth error.
    pub fail_auth: bool,
}

pub struct MockAdapter {
    platform: Platform,
    data: MockAdapterData,
}

impl MockAdapter {
    pub fn new(platform: Platform, data: MockAdapterData) -> Self {
        Self { platform, data }
    }

    fn auth_check(&self) -> Result<(), AdapterError> {
        if self.data.fail_auth {
            Err(AdapterError::Auth {
                platform: self.platform.to_string(),
                message: "token expired".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PlatformAdapter for MockAdapter {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn fetch_holdings(
        &self,
        _connection: &Connection,
    ) -> Result<Vec<PlatformHolding>, AdapterError> {
        self.auth_check()?;
        Ok(self.data.holdings.clone())
    }

    async fn fetch_transactions(
        &self,
        _connection: &Connection,
        since: DateTime<Utc>,
    ) -> Result<Vec<PlatformTransaction>, AdapterError> {
        self.auth_check()?;
        Ok(self
            .data
            .transactions
            .iter()
            .filter(|t| t.transaction_date >= since)
            .cloned()
            .collect())
    }

    async fn fetch_performance(
        &self,
        _connection: &Connection,
        period: PerformancePeriod,
    ) -> Result<Vec<PlatformPerformance>, AdapterError> {
        self.auth_check()?;
        Ok(self
            .data
            .performance
            .iter()
            .filter(|p| p.period == period)
            .cloned()
            .collect())
    }

    async fn fetch_investors(
        &self,
        _connection: &Connection,
    ) -> Result<Vec<PlatformInvestor>, AdapterError> {
        self.auth_check()?;
        Ok(self.data.investors.clone())
    }

    async fn fetch_capital_calls(
        &self,
        _connection: &Connection,
    ) -> Result<Vec<PlatformCapitalCall>, AdapterError> {
        self.auth_check()?;
        Ok(self.data.capital_calls.clone())
    }

    async fn test_connection(&self, _connection: &Connection) -> Result<bool, AdapterError> {
        Ok(!self.data.fail_auth)
    }

    async fn revoke_access(&self, _connection: &Connection) -> Result<(), AdapterError> {
        Ok(())
    }
}

/// Engine wired entirely to one `MemoryStore` and one mock adapter.
pub fn engine_for(store: &Arc<MemoryStore>, adapter: MockAdapter) -> Arc<SyncEngine> {
    let mut registry = AdapterRegistry::new();
    registry.register(Arc::new(adapter));
    engine_with_registry(store, registry)
}

pub fn engine_with_registry(
    store: &Arc<MemoryStore>,
    registry: AdapterRegistry,
) -> Arc<SyncEngine> {
    Arc::new(SyncEngine::new(
        Arc::new(registry),
        ConflictResolver::default(),
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        SyncEngineConfig::default(),
    ))
}

/// Stores a fresh connection and returns it.
pub async fn seeded_connection(
    store: &Arc<MemoryStore>,
    platform: Platform,
    account_id: &str,
    strategy: ResolutionStrategy,
) -> Connection {
    let mut connection = Connection::new(platform, "pf-1", account_id);
    connection.resolution_strategy = strategy;
    ConnectionRepositoryTrait::upsert(&**store, connection)
        .await
        .unwrap()
}

pub fn holding_record(security_id: &str, quantity: Decimal, market_value: Decimal) -> PlatformHolding {
    PlatformHolding {
        security_id: security_id.to_string(),
        symbol: None,
        quantity: Some(quantity),
        market_value: Some(market_value),
        cost_basis: None,
        unrealized_gain: None,
        currency: "USD".to_string(),
        as_of: None,
    }
}

pub fn txn_record(
    platform_transaction_id: Option<&str>,
    security_id: &str,
    amount: Decimal,
    date: DateTime<Utc>,
) -> PlatformTransaction {
    PlatformTransaction {
        platform_transaction_id: platform_transaction_id.map(str::to_string),
        security_id: Some(security_id.to_string()),
        transaction_type: TransactionType::Buy,
        amount,
        quantity: None,
        price: None,
        currency: "USD".to_string(),
        transaction_date: date,
        description: None,
    }
}
