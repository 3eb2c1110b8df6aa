//! Connection repository trait.
//!
//! Database-agnostic contract implemented by the storage layer (and by the
//! in-memory reference store for tests).

use async_trait::async_trait;

use super::connections_model::Connection;
use crate::errors::Result;

/// Contract for Connection persistence.
#[async_trait]
pub trait ConnectionRepositoryTrait: Send + Sync {
    /// Retrieves a connection by its ID. `NotFound` if absent.
    fn get_by_id(&self, connection_id: &str) -> Result<Connection>;

    /// Lists all connections, optionally restricted to active,
    /// auto-sync-enabled ones (the daily scheduler's view).
    fn list(&self, auto_sync_only: bool) -> Result<Vec<Connection>>;

    /// Creates or replaces a connection.
    async fn upsert(&self, connection: Connection) -> Result<Connection>;
}
