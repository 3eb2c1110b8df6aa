//! Per-connection sync engine.
//!
//! Executes one sync attempt for one connection end to end: operation
//! lifecycle, adapter dispatch, per-entity isolation, conflict routing,
//! connection health bookkeeping, and bounded retry.

use std::sync::Arc;

use chrono::{Duration, Utc};
use log::{debug, info, warn};
use rust_decimal::Decimal;

use crate::adapters::{AdapterError, AdapterRegistry, PlatformAdapter};
use clearway_core::connections::{Connection, ConnectionRepositoryTrait};
use clearway_core::conflicts::{
    Conflict, ConflictDataType, ConflictRepositoryTrait, ConflictResolver, Resolution,
    ResolutionStrategy,
};
use clearway_core::errors::{Error, Result};
use clearway_core::holdings::{Holding, HoldingRepositoryTrait, PlatformHolding, SourceHolding};
use clearway_core::investors::{CapitalCall, Investor, InvestorRepositoryTrait};
use clearway_core::performance::{PerformanceMetric, PerformancePeriod, PerformanceRepositoryTrait};
use clearway_core::sync::{
    ErrorSeverity, SyncDataType, SyncError, SyncOperation, SyncOperationRepositoryTrait,
    SyncOperationStatus, SyncRecordError, SyncSummary,
};
use clearway_core::transactions::{
    PlatformTransaction, SourceTransaction, Transaction, TransactionRepositoryTrait,
};

/// Engine policy knobs.
#[derive(Debug, Clone)]
pub struct SyncEngineConfig {
    /// Transaction lookback when a connection has never synced.
    pub default_lookback_days: i64,
    /// Base delay for the exponential retry backoff on whole-operation
    /// failures.
    pub retry_backoff_base: Duration,
}

impl Default for SyncEngineConfig {
    fn default() -> Self {
        Self {
            default_lookback_days: 90,
            retry_backoff_base: Duration::seconds(5),
        }
    }
}

/// Result of one engine invocation.
#[derive(Debug, Clone)]
pub enum SyncOutcome {
    /// The operation ran to a terminal status (possibly FAILED).
    Ran(SyncOperation),
    /// The connection was not due and `force` was not set.
    Skipped { connection_id: String, reason: String },
}

impl SyncOutcome {
    pub fn operation(&self) -> Option<&SyncOperation> {
        match self {
            SyncOutcome::Ran(op) => Some(op),
            SyncOutcome::Skipped { .. } => None,
        }
    }

    /// False only when the operation itself failed.
    pub fn success(&self) -> bool {
        match self {
            SyncOutcome::Ran(op) => op.status != SyncOperationStatus::Failed,
            SyncOutcome::Skipped { .. } => true,
        }
    }
}

enum Applied {
    Inserted,
    Updated,
    Skipped,
}

/// Orchestrates one sync attempt for one connection.
///
/// Stateless apart from configuration: repositories and the adapter
/// registry are injected, so one engine serves every connection.
pub struct SyncEngine {
    adapters: Arc<AdapterRegistry>,
    resolver: ConflictResolver,
    connections: Arc<dyn ConnectionRepositoryTrait>,
    holdings: Arc<dyn HoldingRepositoryTrait>,
    transactions: Arc<dyn TransactionRepositoryTrait>,
    performance: Arc<dyn PerformanceRepositoryTrait>,
    investors: Arc<dyn InvestorRepositoryTrait>,
    conflicts: Arc<dyn ConflictRepositoryTrait>,
    operations: Arc<dyn SyncOperationRepositoryTrait>,
    config: SyncEngineConfig,
}

impl SyncEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        adapters: Arc<AdapterRegistry>,
        resolver: ConflictResolver,
        connections: Arc<dyn ConnectionRepositoryTrait>,
        holdings: Arc<dyn HoldingRepositoryTrait>,
        transactions: Arc<dyn TransactionRepositoryTrait>,
        performance: Arc<dyn PerformanceRepositoryTrait>,
        investors: Arc<dyn InvestorRepositoryTrait>,
        conflicts: Arc<dyn ConflictRepositoryTrait>,
        operations: Arc<dyn SyncOperationRepositoryTrait>,
        config: SyncEngineConfig,
    ) -> Self {
        Self {
            adapters,
            resolver,
            connections,
            holdings,
            transactions,
            performance,
            investors,
            conflicts,
            operations,
            config,
        }
    }

    /// Executes one sync attempt for a connection.
    ///
    /// `force` bypasses the auto-sync cadence only; the single-flight
    /// constraint on (connection, data type) always holds and is enforced
    /// by the operation repository's `begin`.
    pub async fn sync(
        &self,
        connection_id: &str,
        data_type: SyncDataType,
        force: bool,
    ) -> Result<SyncOutcome> {
        let connection = self.connections.get_by_id(connection_id)?;
        let now = Utc::now();

        if !force && !connection.is_sync_due(now) {
            debug!(
                "Sync for connection {} not due (last {:?})",
                connection.id, connection.last_sync_at
            );
            return Ok(SyncOutcome::Skipped {
                connection_id: connection.id,
                reason: "sync not due".to_string(),
            });
        }

        let operation = self
            .operations
            .begin(SyncOperation::new(&connection.id, data_type))
            .await?;

        self.execute(connection, operation).await
    }

    /// Re-runs a FAILED operation, bounded by its `max_retries`.
    pub async fn retry_sync_operation(&self, operation_id: &str) -> Result<SyncOutcome> {
        let mut operation = self.operations.get_by_id(operation_id)?;
        operation.prepare_retry().map_err(Error::Sync)?;
        // Re-claims the single-flight slot; fails if something else is
        // already in flight.
        let operation = self.operations.update(operation).await?;

        let connection = self.connections.get_by_id(&operation.connection_id)?;
        info!(
            "Retrying sync operation {} (attempt {}/{})",
            operation.id, operation.retry_count, operation.max_retries
        );
        self.execute(connection, operation).await
    }

    /// Runs a PENDING operation through to a terminal status.
    async fn execute(
        &self,
        mut connection: Connection,
        mut operation: SyncOperation,
    ) -> Result<SyncOutcome> {
        operation.start();
        let mut operation = self.operations.update(operation).await?;

        info!(
            "Sync {} started for connection {} ({}, {})",
            operation.id,
            connection.id,
            connection.platform,
            operation.data_type.as_str()
        );

        let adapter = match self.adapters.get(connection.platform) {
            Some(adapter) => adapter,
            None => {
                let message =
                    SyncError::UnsupportedPlatform(connection.platform.to_string()).to_string();
                return self.fail_operation(connection, operation, message).await;
            }
        };

        let mut summary = SyncSummary::default();
        let mut record_errors: Vec<SyncRecordError> = Vec::new();

        for data_type in operation.data_type.expand() {
            let result = match data_type {
                SyncDataType::Holdings => {
                    self.sync_holdings(&*adapter, &connection, &mut summary, &mut record_errors)
                        .await
                }
                SyncDataType::Transactions => {
                    self.sync_transactions(&*adapter, &connection, &mut summary, &mut record_errors)
                        .await
                }
                SyncDataType::Performance => {
                    self.sync_performance(&*adapter, &connection, &mut summary, &mut record_errors)
                        .await
                }
                SyncDataType::Investors => {
                    self.sync_investors(&*adapter, &connection, &mut summary, &mut record_errors)
                        .await
                }
                // `expand` never yields ALL.
                SyncDataType::All => Ok(()),
            };

            // Errors escaping per-entity isolation (auth, transport) abort
            // the whole operation.
            if let Err(err) = result {
                let message = err.to_string();
                return self.fail_operation(connection, operation, message).await;
            }
        }

        operation.finish(summary, record_errors);
        let operation = self.operations.update(operation).await?;

        let now = Utc::now();
        connection.record_success(now);
        self.connections.upsert(connection).await?;

        info!(
            "Sync {} finished {:?}: {} processed, {} inserted, {} updated, {} skipped, {} failed",
            operation.id,
            operation.status,
            operation.summary.records_processed,
            operation.summary.records_inserted,
            operation.summary.records_updated,
            operation.summary.records_skipped,
            operation.summary.records_failed
        );
        Ok(SyncOutcome::Ran(operation))
    }

    async fn fail_operation(
        &self,
        mut connection: Connection,
        mut operation: SyncOperation,
        message: String,
    ) -> Result<SyncOutcome> {
        warn!("Sync {} failed: {}", operation.id, message);
        operation.fail(message.clone(), self.config.retry_backoff_base);
        let operation = self.operations.update(operation).await?;

        connection.record_failure(message, Utc::now());
        self.connections.upsert(connection).await?;
        Ok(SyncOutcome::Ran(operation))
    }

    // === Holdings ===

    async fn sync_holdings(
        &self,
        adapter: &dyn PlatformAdapter,
        connection: &Connection,
        summary: &mut SyncSummary,
        record_errors: &mut Vec<SyncRecordError>,
    ) -> Result<()> {
        let records = adapter
            .fetch_holdings(connection)
            .await
            .map_err(map_adapter_error)?;
        debug!(
            "Fetched {} holdings for connection {}",
            records.len(),
            connection.id
        );

        let mut changed = false;
        for record in &records {
            summary.records_processed += 1;
            match self.apply_holding(connection, record).await {
                Ok(Applied::Inserted) => {
                    summary.records_inserted += 1;
                    changed = true;
                }
                Ok(Applied::Updated) => {
                    summary.records_updated += 1;
                    changed = true;
                }
                Ok(Applied::Skipped) => summary.records_skipped += 1,
                Err(err) => {
                    summary.records_failed += 1;
                    record_errors.push(SyncRecordError {
                        severity: ErrorSeverity::Medium,
                        retryable: true,
                        message: err.to_string(),
                        entity: Some(record.security_id.clone()),
                        context: None,
                    });
                }
            }
        }

        if changed {
            if let Err(err) = self.recompute_portfolio_weights(&connection.portfolio_id).await {
                warn!(
                    "Failed to recompute weights for portfolio {}: {}",
                    connection.portfolio_id, err
                );
            }
        }
        Ok(())
    }

    async fn apply_holding(
        &self,
        connection: &Connection,
        record: &PlatformHolding,
    ) -> Result<Applied> {
        let now = Utc::now();
        let existing = self
            .holdings
            .find_by_security(&connection.portfolio_id, &record.security_id)?;

        let Some(existing) = existing else {
            let holding = Holding::from_platform(&connection.portfolio_id, record, now);
            let holding = self.holdings.upsert(holding).await?;
            self.holdings
                .upsert_source(SourceHolding::from_platform(
                    &holding.id,
                    &connection.id,
                    record,
                    now,
                ))
                .await?;
            return Ok(Applied::Inserted);
        };

        // Evidence row is refreshed regardless of how the disagreement is
        // resolved.
        self.holdings
            .upsert_source(SourceHolding::from_platform(
                &existing.id,
                &connection.id,
                record,
                now,
            ))
            .await?;

        let assessment = self.resolver.detect_holding_conflict(&existing, record);
        let strategy = if assessment.has_conflict {
            connection.resolution_strategy
        } else if connection.resolution_strategy == ResolutionStrategy::Timestamp {
            // Within tolerance, but a TIMESTAMP connection still must not let
            // a stale snapshot overwrite newer consolidated data.
            ResolutionStrategy::Timestamp
        } else {
            // Within tolerance: a routine platform refresh.
            ResolutionStrategy::PlatformWins
        };

        match self.resolver.resolve_holding_conflict(&existing, record, strategy) {
            Resolution::Apply(resolved) => {
                if resolved == existing {
                    return Ok(Applied::Skipped);
                }
                self.holdings.upsert(resolved).await?;
                Ok(Applied::Updated)
            }
            Resolution::NeedsReview => {
                if let (Some(conflict_type), Some(details)) =
                    (assessment.conflict_type, assessment.details)
                {
                    let conflict = Conflict::new(
                        connection.portfolio_id.clone(),
                        conflict_type,
                        ConflictDataType::Holding,
                        assessment.severity,
                        Some(connection.id.clone()),
                        serde_json::to_value(&existing)?,
                        serde_json::to_value(record)?,
                        details,
                    );
                    info!(
                        "Conflict {} ({:?}) recorded for {}:{}",
                        conflict.id, conflict_type, connection.portfolio_id, record.security_id
                    );
                    self.conflicts.insert(conflict).await?;
                }
                Ok(Applied::Skipped)
            }
        }
    }

    async fn recompute_portfolio_weights(&self, portfolio_id: &str) -> Result<()> {
        let holdings = self.holdings.list_for_portfolio(portfolio_id)?;
        let total: Decimal = holdings.iter().map(|h| h.market_value).sum();
        if total.is_zero() {
            return Ok(());
        }
        for mut holding in holdings {
            let percent = holding.market_value / total * Decimal::from(100);
            if holding.percent_of_portfolio != Some(percent) {
                holding.percent_of_portfolio = Some(percent);
                self.holdings.upsert(holding).await?;
            }
        }
        Ok(())
    }

    // === Transactions ===

    async fn sync_transactions(
        &self,
        adapter: &dyn PlatformAdapter,
        connection: &Connection,
        summary: &mut SyncSummary,
        record_errors: &mut Vec<SyncRecordError>,
    ) -> Result<()> {
        let now = Utc::now();
        let since = connection
            .last_successful_sync_at
            .unwrap_or(now - Duration::days(self.config.default_lookback_days));

        let records = adapter
            .fetch_transactions(connection, since)
            .await
            .map_err(map_adapter_error)?;
        debug!(
            "Fetched {} transactions for connection {} since {}",
            records.len(),
            connection.id,
            since
        );

        // Include the duplicate window before `since` so boundary records
        // still dedupe.
        let window_start = since - self.resolver.config().duplicate_window;
        let mut known = self
            .transactions
            .list_since(&connection.portfolio_id, window_start)?;

        for record in &records {
            summary.records_processed += 1;
            match self.apply_transaction(connection, &known, record).await {
                Ok(Some(inserted)) => {
                    summary.records_inserted += 1;
                    known.push(inserted);
                }
                Ok(None) => summary.records_skipped += 1,
                Err(err) => {
                    summary.records_failed += 1;
                    record_errors.push(SyncRecordError {
                        severity: ErrorSeverity::Medium,
                        retryable: true,
                        message: err.to_string(),
                        entity: record.platform_transaction_id.clone(),
                        context: None,
                    });
                }
            }
        }
        Ok(())
    }

    /// Inserts a new transaction, or returns None for a duplicate.
    /// Duplicates are never merged or overwritten.
    async fn apply_transaction(
        &self,
        connection: &Connection,
        known: &[Transaction],
        record: &PlatformTransaction,
    ) -> Result<Option<Transaction>> {
        if let Some(platform_id) = &record.platform_transaction_id {
            if self.transactions.source_exists(&connection.id, platform_id)? {
                return Ok(None);
            }
        }
        if let Some(duplicate) = self.resolver.detect_transaction_duplicate(known, record) {
            debug!(
                "Skipping duplicate transaction {:?} (matches {})",
                record.platform_transaction_id, duplicate.id
            );
            return Ok(None);
        }

        let now = Utc::now();
        let transaction = Transaction::from_platform(&connection.portfolio_id, record, now);
        let transaction = self.transactions.insert(transaction).await?;
        self.transactions
            .insert_source(SourceTransaction::new(
                &transaction.id,
                &connection.id,
                record.platform_transaction_id.clone(),
                now,
            ))
            .await?;
        Ok(Some(transaction))
    }

    // === Performance ===

    async fn sync_performance(
        &self,
        adapter: &dyn PlatformAdapter,
        connection: &Connection,
        summary: &mut SyncSummary,
        record_errors: &mut Vec<SyncRecordError>,
    ) -> Result<()> {
        for period in PerformancePeriod::ALL {
            let records = match adapter.fetch_performance(connection, period).await {
                Ok(records) => records,
                // Auth failures abort; anything else is isolated to the
                // period.
                Err(err) if err.is_auth() => return Err(map_adapter_error(err)),
                Err(err) => {
                    summary.records_processed += 1;
                    summary.records_failed += 1;
                    record_errors.push(SyncRecordError {
                        severity: ErrorSeverity::Low,
                        retryable: true,
                        message: err.to_string(),
                        entity: Some(period.as_str().to_string()),
                        context: None,
                    });
                    continue;
                }
            };

            for record in &records {
                summary.records_processed += 1;
                let metric = PerformanceMetric::from_platform(
                    &connection.id,
                    &connection.portfolio_id,
                    record,
                    Utc::now(),
                );
                match self.performance.upsert(metric).await {
                    Ok(_) => summary.records_updated += 1,
                    Err(err) => {
                        summary.records_failed += 1;
                        record_errors.push(SyncRecordError {
                            severity: ErrorSeverity::Low,
                            retryable: true,
                            message: err.to_string(),
                            entity: Some(period.as_str().to_string()),
                            context: None,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    // === Investor roster ===

    async fn sync_investors(
        &self,
        adapter: &dyn PlatformAdapter,
        connection: &Connection,
        summary: &mut SyncSummary,
        record_errors: &mut Vec<SyncRecordError>,
    ) -> Result<()> {
        if !connection.platform.is_fund_admin() {
            debug!(
                "Connection {} ({}) has no investor roster; skipping",
                connection.id, connection.platform
            );
            return Ok(());
        }

        let now = Utc::now();
        let known: Vec<String> = self
            .investors
            .list_investors(&connection.portfolio_id)?
            .into_iter()
            .map(|i| i.external_id)
            .collect();

        let roster = adapter
            .fetch_investors(connection)
            .await
            .map_err(map_adapter_error)?;
        for record in &roster {
            summary.records_processed += 1;
            let investor = Investor::from_platform(&connection.portfolio_id, record, now);
            match self.investors.upsert_investor(investor).await {
                Ok(_) => {
                    if known.contains(&record.external_id) {
                        summary.records_updated += 1;
                    } else {
                        summary.records_inserted += 1;
                    }
                }
                Err(err) => {
                    summary.records_failed += 1;
                    record_errors.push(SyncRecordError {
                        severity: ErrorSeverity::Medium,
                        retryable: true,
                        message: err.to_string(),
                        entity: Some(record.external_id.clone()),
                        context: None,
                    });
                }
            }
        }

        let known_calls: Vec<String> = self
            .investors
            .list_capital_calls(&connection.portfolio_id)?
            .into_iter()
            .map(|c| c.external_id)
            .collect();
        let calls = adapter
            .fetch_capital_calls(connection)
            .await
            .map_err(map_adapter_error)?;
        for record in &calls {
            summary.records_processed += 1;
            let call = CapitalCall::from_platform(&connection.portfolio_id, record, now);
            match self.investors.upsert_capital_call(call).await {
                Ok(_) => {
                    if known_calls.contains(&record.external_id) {
                        summary.records_updated += 1;
                    } else {
                        summary.records_inserted += 1;
                    }
                }
                Err(err) => {
                    summary.records_failed += 1;
                    record_errors.push(SyncRecordError {
                        severity: ErrorSeverity::Medium,
                        retryable: true,
                        message: err.to_string(),
                        entity: Some(record.external_id.clone()),
                        context: None,
                    });
                }
            }
        }
        Ok(())
    }
}

fn map_adapter_error(err: AdapterError) -> Error {
    match err {
        AdapterError::Auth { .. } => SyncError::Auth(err.to_string()).into(),
        other => Error::Unexpected(other.to_string()),
    }
}
