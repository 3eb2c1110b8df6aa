//! Holding repository trait.

use async_trait::async_trait;

use super::holdings_model::{Holding, SourceHolding};
use crate::errors::Result;

/// Contract for consolidated holdings and their per-source evidence rows.
#[async_trait]
pub trait HoldingRepositoryTrait: Send + Sync {
    /// Looks up the consolidated holding for one security in one portfolio.
    fn find_by_security(&self, portfolio_id: &str, security_id: &str) -> Result<Option<Holding>>;

    /// Lists all consolidated holdings for a portfolio.
    fn list_for_portfolio(&self, portfolio_id: &str) -> Result<Vec<Holding>>;

    /// Inserts or replaces a holding, keyed by (portfolio_id, security_id).
    async fn upsert(&self, holding: Holding) -> Result<Holding>;

    /// Inserts or replaces a source observation, keyed by
    /// (holding_id, connection_id).
    async fn upsert_source(&self, source: SourceHolding) -> Result<SourceHolding>;

    /// Lists all source observations behind one consolidated holding.
    fn list_sources(&self, holding_id: &str) -> Result<Vec<SourceHolding>>;

    /// Lists every source observation in a portfolio, across holdings.
    fn list_sources_for_portfolio(&self, portfolio_id: &str) -> Result<Vec<SourceHolding>>;
}
