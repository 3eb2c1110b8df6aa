//! In-memory reference store.
//!
//! Implements every repository trait over concurrent maps. Used by the
//! test suites and as the reference semantics for a relational
//! implementation: natural unique keys become composite map keys, and the
//! single-flight constraint on sync operations is enforced atomically via
//! the in-flight index's entry guard (a SQL store would use a partial
//! unique index on non-terminal rows).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::connections::{Connection, ConnectionRepositoryTrait};
use crate::conflicts::{Conflict, ConflictFilter, ConflictRepositoryTrait};
use crate::errors::{DatabaseError, Result};
use crate::holdings::{Holding, HoldingRepositoryTrait, SourceHolding};
use crate::investors::{CapitalCall, Investor, InvestorRepositoryTrait};
use crate::performance::{PerformanceMetric, PerformanceRepositoryTrait};
use crate::sync::{SyncError, SyncOperation, SyncOperationRepositoryTrait};
use crate::transactions::{SourceTransaction, Transaction, TransactionRepositoryTrait};

/// Concurrent in-memory implementation of the persistent store contract.
#[derive(Default)]
pub struct MemoryStore {
    connections: DashMap<String, Connection>,
    /// Keyed by "portfolio_id|security_id".
    holdings: DashMap<String, Holding>,
    /// Keyed by "holding_id|connection_id".
    source_holdings: DashMap<String, SourceHolding>,
    transactions: DashMap<String, Transaction>,
    /// Keyed by "connection_id|platform_transaction_id".
    source_transactions: DashMap<String, SourceTransaction>,
    /// Keyed by "connection_id|period|calculation_date".
    performance: DashMap<String, PerformanceMetric>,
    /// Keyed by "portfolio_id|external_id".
    investors: DashMap<String, Investor>,
    capital_calls: DashMap<String, CapitalCall>,
    conflicts: DashMap<String, Conflict>,
    operations: DashMap<String, SyncOperation>,
    /// Single-flight index: "connection_id|data_type" -> operation id.
    in_flight: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn holding_key(portfolio_id: &str, security_id: &str) -> String {
        format!("{portfolio_id}|{security_id}")
    }

    fn flight_key(connection_id: &str, data_type: &str) -> String {
        format!("{connection_id}|{data_type}")
    }

    /// Slot keys an operation must hold, one per expanded data type, in a
    /// fixed order so concurrent claimants cannot livelock.
    fn flight_keys(operation: &SyncOperation) -> Vec<String> {
        operation
            .data_type
            .expand()
            .iter()
            .map(|dt| Self::flight_key(&operation.connection_id, dt.as_str()))
            .collect()
    }
}

#[async_trait]
impl ConnectionRepositoryTrait for MemoryStore {
    fn get_by_id(&self, connection_id: &str) -> Result<Connection> {
        self.connections
            .get(connection_id)
            .map(|c| c.clone())
            .ok_or_else(|| DatabaseError::NotFound(format!("connection {connection_id}")).into())
    }

    fn list(&self, auto_sync_only: bool) -> Result<Vec<Connection>> {
        let mut out: Vec<Connection> = self
            .connections
            .iter()
            .map(|c| c.clone())
            .filter(|c| !auto_sync_only || (c.auto_sync_enabled && c.status.is_active()))
            .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(out)
    }

    async fn upsert(&self, connection: Connection) -> Result<Connection> {
        self.connections
            .insert(connection.id.clone(), connection.clone());
        Ok(connection)
    }
}

#[async_trait]
impl HoldingRepositoryTrait for MemoryStore {
    fn find_by_security(&self, portfolio_id: &str, security_id: &str) -> Result<Option<Holding>> {
        Ok(self
            .holdings
            .get(&Self::holding_key(portfolio_id, security_id))
            .map(|h| h.clone()))
    }

    fn list_for_portfolio(&self, portfolio_id: &str) -> Result<Vec<Holding>> {
        let mut out: Vec<Holding> = self
            .holdings
            .iter()
            .filter(|h| h.portfolio_id == portfolio_id)
            .map(|h| h.clone())
            .collect();
        out.sort_by(|a, b| a.security_id.cmp(&b.security_id));
        Ok(out)
    }

    async fn upsert(&self, holding: Holding) -> Result<Holding> {
        let key = Self::holding_key(&holding.portfolio_id, &holding.security_id);
        self.holdings.insert(key, holding.clone());
        Ok(holding)
    }

    async fn upsert_source(&self, source: SourceHolding) -> Result<SourceHolding> {
        let key = format!("{}|{}", source.holding_id, source.connection_id);
        self.source_holdings.insert(key, source.clone());
        Ok(source)
    }

    fn list_sources(&self, holding_id: &str) -> Result<Vec<SourceHolding>> {
        Ok(self
            .source_holdings
            .iter()
            .filter(|s| s.holding_id == holding_id)
            .map(|s| s.clone())
            .collect())
    }

    fn list_sources_for_portfolio(&self, portfolio_id: &str) -> Result<Vec<SourceHolding>> {
        let holding_ids: Vec<String> = self
            .holdings
            .iter()
            .filter(|h| h.portfolio_id == portfolio_id)
            .map(|h| h.id.clone())
            .collect();
        Ok(self
            .source_holdings
            .iter()
            .filter(|s| holding_ids.contains(&s.holding_id))
            .map(|s| s.clone())
            .collect())
    }
}

#[async_trait]
impl TransactionRepositoryTrait for MemoryStore {
    fn list_since(&self, portfolio_id: &str, since: DateTime<Utc>) -> Result<Vec<Transaction>> {
        let mut out: Vec<Transaction> = self
            .transactions
            .iter()
            .filter(|t| t.portfolio_id == portfolio_id && t.transaction_date >= since)
            .map(|t| t.clone())
            .collect();
        out.sort_by(|a, b| a.transaction_date.cmp(&b.transaction_date));
        Ok(out)
    }

    fn source_exists(&self, connection_id: &str, platform_transaction_id: &str) -> Result<bool> {
        Ok(self
            .source_transactions
            .contains_key(&format!("{connection_id}|{platform_transaction_id}")))
    }

    async fn insert(&self, transaction: Transaction) -> Result<Transaction> {
        self.transactions
            .insert(transaction.id.clone(), transaction.clone());
        Ok(transaction)
    }

    async fn insert_source(&self, source: SourceTransaction) -> Result<SourceTransaction> {
        let key = match &source.platform_transaction_id {
            Some(pid) => format!("{}|{}", source.connection_id, pid),
            None => format!("{}|txn:{}", source.connection_id, source.transaction_id),
        };
        self.source_transactions.insert(key, source.clone());
        Ok(source)
    }
}

#[async_trait]
impl PerformanceRepositoryTrait for MemoryStore {
    async fn upsert(&self, metric: PerformanceMetric) -> Result<PerformanceMetric> {
        let key = format!(
            "{}|{}|{}",
            metric.connection_id,
            metric.period.as_str(),
            metric.calculation_date
        );
        self.performance.insert(key, metric.clone());
        Ok(metric)
    }

    fn list_for_connection(&self, connection_id: &str) -> Result<Vec<PerformanceMetric>> {
        Ok(self
            .performance
            .iter()
            .filter(|m| m.connection_id == connection_id)
            .map(|m| m.clone())
            .collect())
    }
}

#[async_trait]
impl InvestorRepositoryTrait for MemoryStore {
    async fn upsert_investor(&self, investor: Investor) -> Result<Investor> {
        let key = format!("{}|{}", investor.portfolio_id, investor.external_id);
        self.investors.insert(key, investor.clone());
        Ok(investor)
    }

    async fn upsert_capital_call(&self, call: CapitalCall) -> Result<CapitalCall> {
        let key = format!("{}|{}", call.portfolio_id, call.external_id);
        self.capital_calls.insert(key, call.clone());
        Ok(call)
    }

    fn list_investors(&self, portfolio_id: &str) -> Result<Vec<Investor>> {
        let mut out: Vec<Investor> = self
            .investors
            .iter()
            .filter(|i| i.portfolio_id == portfolio_id)
            .map(|i| i.clone())
            .collect();
        out.sort_by(|a, b| a.external_id.cmp(&b.external_id));
        Ok(out)
    }

    fn list_capital_calls(&self, portfolio_id: &str) -> Result<Vec<CapitalCall>> {
        let mut out: Vec<CapitalCall> = self
            .capital_calls
            .iter()
            .filter(|c| c.portfolio_id == portfolio_id)
            .map(|c| c.clone())
            .collect();
        out.sort_by(|a, b| a.external_id.cmp(&b.external_id));
        Ok(out)
    }
}

#[async_trait]
impl ConflictRepositoryTrait for MemoryStore {
    async fn insert(&self, conflict: Conflict) -> Result<Conflict> {
        self.conflicts.insert(conflict.id.clone(), conflict.clone());
        Ok(conflict)
    }

    async fn update(&self, conflict: Conflict) -> Result<Conflict> {
        match self.conflicts.entry(conflict.id.clone()) {
            Entry::Occupied(mut entry) => {
                // Snapshots are immutable after creation.
                let mut stored = conflict.clone();
                stored.clearway_data = entry.get().clearway_data.clone();
                stored.platform_data = entry.get().platform_data.clone();
                entry.insert(stored.clone());
                Ok(stored)
            }
            Entry::Vacant(_) => {
                Err(DatabaseError::NotFound(format!("conflict {}", conflict.id)).into())
            }
        }
    }

    fn get_by_id(&self, conflict_id: &str) -> Result<Option<Conflict>> {
        Ok(self.conflicts.get(conflict_id).map(|c| c.clone()))
    }

    fn list(&self, portfolio_id: &str, filter: ConflictFilter) -> Result<Vec<Conflict>> {
        let mut out: Vec<Conflict> = self
            .conflicts
            .iter()
            .filter(|c| c.portfolio_id == portfolio_id)
            .filter(|c| filter.status.map_or(true, |s| c.status == s))
            .filter(|c| filter.data_type.map_or(true, |d| c.data_type == d))
            .map(|c| c.clone())
            .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(out)
    }
}

#[async_trait]
impl SyncOperationRepositoryTrait for MemoryStore {
    async fn begin(&self, operation: SyncOperation) -> Result<SyncOperation> {
        // Every expanded data type is claimed, so an ALL operation contends
        // with HOLDINGS/TRANSACTIONS/PERFORMANCE and vice versa. Claims
        // happen in expansion order; a blocked claim rolls the earlier ones
        // back.
        let keys = Self::flight_keys(&operation);
        let mut claimed: Vec<&String> = Vec::with_capacity(keys.len());
        let mut blocked = false;
        for key in &keys {
            let ok = match self.in_flight.entry(key.clone()) {
                Entry::Occupied(_) => false,
                Entry::Vacant(slot) => {
                    slot.insert(operation.id.clone());
                    claimed.push(key);
                    true
                }
            };
            if !ok {
                blocked = true;
                break;
            }
        }
        if blocked {
            for key in claimed {
                self.in_flight.remove(key);
            }
            return Err(SyncError::OperationInFlight {
                connection_id: operation.connection_id.clone(),
                data_type: operation.data_type,
            }
            .into());
        }
        self.operations
            .insert(operation.id.clone(), operation.clone());
        Ok(operation)
    }

    async fn update(&self, operation: SyncOperation) -> Result<SyncOperation> {
        if !self.operations.contains_key(&operation.id) {
            return Err(SyncError::OperationNotFound(operation.id.clone()).into());
        }
        let keys = Self::flight_keys(&operation);
        if operation.status.is_terminal() {
            // Release only our own slots; a retry may have re-claimed them.
            for key in &keys {
                if self
                    .in_flight
                    .get(key)
                    .is_some_and(|id| *id == operation.id)
                {
                    self.in_flight.remove(key);
                }
            }
        } else {
            // A retried operation returning to PENDING re-claims its slots,
            // unless some other operation claimed one in the meantime.
            let mut claimed_now: Vec<&String> = Vec::with_capacity(keys.len());
            let mut blocked = false;
            for key in &keys {
                let ok = match self.in_flight.entry(key.clone()) {
                    Entry::Occupied(entry) => *entry.get() == operation.id,
                    Entry::Vacant(slot) => {
                        slot.insert(operation.id.clone());
                        claimed_now.push(key);
                        true
                    }
                };
                if !ok {
                    blocked = true;
                    break;
                }
            }
            if blocked {
                for key in claimed_now {
                    self.in_flight.remove(key);
                }
                return Err(SyncError::OperationInFlight {
                    connection_id: operation.connection_id.clone(),
                    data_type: operation.data_type,
                }
                .into());
            }
        }
        self.operations
            .insert(operation.id.clone(), operation.clone());
        Ok(operation)
    }

    fn get_by_id(&self, operation_id: &str) -> Result<SyncOperation> {
        self.operations
            .get(operation_id)
            .map(|o| o.clone())
            .ok_or_else(|| SyncError::OperationNotFound(operation_id.to_string()).into())
    }

    fn list_for_connection(&self, connection_id: &str) -> Result<Vec<SyncOperation>> {
        let mut out: Vec<SyncOperation> = self
            .operations
            .iter()
            .filter(|o| o.connection_id == connection_id)
            .map(|o| o.clone())
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }
}
