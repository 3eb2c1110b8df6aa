//! Sync operation repository trait.

use async_trait::async_trait;

use super::operation_model::SyncOperation;
use crate::errors::Result;

/// Contract for sync operation persistence.
///
/// `begin` carries the single-flight invariant: at most one non-terminal
/// operation may hold the slot for any (connection_id, data type) pair.
/// An operation claims one slot per expanded data type, so an `ALL`
/// operation holds the HOLDINGS, TRANSACTIONS and PERFORMANCE slots and
/// contends with each of them in both directions. Implementations must
/// make the check-and-insert atomic: the in-memory store uses per-key
/// entry guards, a SQL store would use a partial unique index on
/// non-terminal rows. Callers may rely on this instead of taking their
/// own locks.
#[async_trait]
pub trait SyncOperationRepositoryTrait: Send + Sync {
    /// Atomically registers a new operation, rejecting it with
    /// `SyncError::OperationInFlight` when a non-terminal operation
    /// already holds any of the expanded data-type slots for the same
    /// connection.
    async fn begin(&self, operation: SyncOperation) -> Result<SyncOperation>;

    /// Persists updated operation state (status transitions, counters,
    /// record errors). Terminal operations release every slot they hold.
    async fn update(&self, operation: SyncOperation) -> Result<SyncOperation>;

    /// Retrieves an operation by id. `OperationNotFound` if absent.
    fn get_by_id(&self, operation_id: &str) -> Result<SyncOperation>;

    /// Lists operations for a connection, newest first.
    fn list_for_connection(&self, connection_id: &str) -> Result<Vec<SyncOperation>>;
}
