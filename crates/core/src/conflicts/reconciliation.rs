//! Portfolio reconciliation as an asynchronous, pollable operation.
//!
//! `start` snapshots the portfolio's per-source evidence rows, runs the
//! resolver's cross-connection comparison on a background task, and
//! exposes the advisory report through `get`.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use log::{error, info};
use serde::{Deserialize, Serialize};

use super::conflicts_model::ReconciliationReport;
use super::resolver::ConflictResolver;
use crate::errors::Result;
use crate::holdings::{HoldingRepositoryTrait, PlatformHolding};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReconciliationStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// What a reconciliation run covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReconciliationScope {
    /// Every security in the portfolio.
    #[default]
    AllHoldings,
    /// A single security.
    Security(String),
}

/// One pollable reconciliation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationRun {
    pub id: String,
    pub portfolio_id: String,
    pub scope: ReconciliationScope,
    pub status: ReconciliationStatus,
    pub report: Option<ReconciliationReport>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Runs portfolio-wide reconciliation off the request path and keeps
/// completed runs queryable in a process-local registry.
pub struct ReconciliationService {
    holding_repository: Arc<dyn HoldingRepositoryTrait>,
    resolver: ConflictResolver,
    runs: Arc<DashMap<String, ReconciliationRun>>,
}

impl ReconciliationService {
    pub fn new(
        holding_repository: Arc<dyn HoldingRepositoryTrait>,
        resolver: ConflictResolver,
    ) -> Self {
        Self {
            holding_repository,
            resolver,
            runs: Arc::new(DashMap::new()),
        }
    }

    /// Starts a reconciliation run and returns its id immediately.
    pub fn start(&self, portfolio_id: &str, scope: ReconciliationScope) -> Result<String> {
        let run = ReconciliationRun {
            id: uuid::Uuid::new_v4().to_string(),
            portfolio_id: portfolio_id.to_string(),
            scope: scope.clone(),
            status: ReconciliationStatus::Pending,
            report: None,
            error: None,
            started_at: Utc::now(),
            completed_at: None,
        };
        let run_id = run.id.clone();
        self.runs.insert(run_id.clone(), run);

        // Snapshot the evidence rows before handing off so the background
        // task never races concurrent sync writes.
        let per_connection = self.collect_observations(portfolio_id, &scope)?;

        let runs = Arc::clone(&self.runs);
        let resolver = self.resolver.clone();
        let portfolio = portfolio_id.to_string();
        let id = run_id.clone();
        tokio::spawn(async move {
            if let Some(mut entry) = runs.get_mut(&id) {
                entry.status = ReconciliationStatus::Running;
            }
            let report = resolver.reconcile_holdings(&portfolio, &per_connection);
            info!(
                "Reconciliation {} for portfolio {}: {} securities checked, {} findings",
                id,
                portfolio,
                report.securities_checked,
                report.findings.len()
            );
            if let Some(mut entry) = runs.get_mut(&id) {
                entry.status = ReconciliationStatus::Completed;
                entry.report = Some(report);
                entry.completed_at = Some(Utc::now());
            } else {
                error!("Reconciliation run {} vanished from registry", id);
            }
        });

        Ok(run_id)
    }

    /// Polls a run by id.
    pub fn get(&self, run_id: &str) -> Option<ReconciliationRun> {
        self.runs.get(run_id).map(|r| r.clone())
    }

    fn collect_observations(
        &self,
        portfolio_id: &str,
        scope: &ReconciliationScope,
    ) -> Result<Vec<(String, Vec<PlatformHolding>)>> {
        let sources = self.holding_repository.list_sources_for_portfolio(portfolio_id)?;
        let mut per_connection: BTreeMap<String, Vec<PlatformHolding>> = BTreeMap::new();
        for s in sources {
            if let ReconciliationScope::Security(security_id) = scope {
                if &s.security_id != security_id {
                    continue;
                }
            }
            per_connection
                .entry(s.connection_id.clone())
                .or_default()
                .push(PlatformHolding {
                    security_id: s.security_id.clone(),
                    symbol: None,
                    quantity: Some(s.quantity),
                    market_value: Some(s.market_value),
                    cost_basis: s.cost_basis,
                    unrealized_gain: None,
                    currency: String::new(),
                    as_of: s.platform_updated_at,
                });
        }
        Ok(per_connection.into_iter().collect())
    }
}
