//! Conflict repository trait.

use async_trait::async_trait;

use super::conflicts_model::{Conflict, ConflictDataType, ConflictStatus};
use crate::errors::Result;

/// Filters for conflict listing.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictFilter {
    pub status: Option<ConflictStatus>,
    pub data_type: Option<ConflictDataType>,
}

/// Contract for conflict persistence. Conflict history is append-only:
/// snapshots are never edited after creation, only status and resolution
/// metadata change.
#[async_trait]
pub trait ConflictRepositoryTrait: Send + Sync {
    async fn insert(&self, conflict: Conflict) -> Result<Conflict>;

    /// Persists resolution metadata. Snapshots are immutable; implementations
    /// must not overwrite `clearway_data`/`platform_data`.
    async fn update(&self, conflict: Conflict) -> Result<Conflict>;

    fn get_by_id(&self, conflict_id: &str) -> Result<Option<Conflict>>;

    fn list(&self, portfolio_id: &str, filter: ConflictFilter) -> Result<Vec<Conflict>>;
}
