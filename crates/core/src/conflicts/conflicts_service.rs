//! Conflict query and manual-resolution service.

use std::sync::Arc;

use log::info;

use super::conflicts_errors::ConflictError;
use super::conflicts_model::{Conflict, ConflictDataType, ResolutionStrategy};
use super::conflicts_traits::{ConflictFilter, ConflictRepositoryTrait};
use super::resolver::{ConflictResolver, Resolution};
use crate::errors::Result;
use crate::holdings::{Holding, HoldingRepositoryTrait, PlatformHolding};

/// Operator-chosen resolution for a pending conflict.
#[derive(Debug, Clone)]
pub struct ManualResolution {
    /// CLEARWAY_WINS, PLATFORM_WINS or MERGE.
    pub strategy: ResolutionStrategy,
    /// Explicit merged value; overrides the strategy's computed result.
    pub merged_value: Option<Holding>,
}

/// Coordinates conflict listing and manual resolution.
pub struct ConflictService {
    conflict_repository: Arc<dyn ConflictRepositoryTrait>,
    holding_repository: Arc<dyn HoldingRepositoryTrait>,
    resolver: ConflictResolver,
}

impl ConflictService {
    pub fn new(
        conflict_repository: Arc<dyn ConflictRepositoryTrait>,
        holding_repository: Arc<dyn HoldingRepositoryTrait>,
        resolver: ConflictResolver,
    ) -> Self {
        Self {
            conflict_repository,
            holding_repository,
            resolver,
        }
    }

    pub fn get_conflicts(&self, portfolio_id: &str, filter: ConflictFilter) -> Result<Vec<Conflict>> {
        self.conflict_repository.list(portfolio_id, filter)
    }

    /// Applies an operator-chosen resolution to a pending conflict, writes
    /// the resolved record back to the consolidated store, and marks the
    /// conflict RESOLVED with reviewer identity and timestamp.
    ///
    /// Fails with `NotFound` for an unknown id and `AlreadyResolved` for a
    /// terminal conflict. The conflict's snapshots are never modified.
    pub async fn resolve_manually(
        &self,
        conflict_id: &str,
        user_id: &str,
        resolution: ManualResolution,
    ) -> Result<Conflict> {
        let mut conflict = self
            .conflict_repository
            .get_by_id(conflict_id)?
            .ok_or_else(|| ConflictError::NotFound(conflict_id.to_string()))?;

        if conflict.status.is_terminal() {
            return Err(ConflictError::AlreadyResolved(conflict_id.to_string()).into());
        }
        if matches!(resolution.strategy, ResolutionStrategy::ManualReview) {
            return Err(
                ConflictError::UnsupportedResolution("MANUAL_REVIEW".to_string()).into(),
            );
        }

        if conflict.data_type == ConflictDataType::Holding {
            let resolved = match resolution.merged_value {
                Some(holding) => holding,
                None => self.compute_resolution(&conflict, resolution.strategy)?,
            };
            self.holding_repository.upsert(resolved).await?;
        }
        // Transaction conflicts (duplicates) carry no write-back: resolving
        // them records the operator decision only.

        conflict.resolve(resolution.strategy, user_id);
        let conflict = self.conflict_repository.update(conflict).await?;

        info!(
            "Conflict {} resolved by {} with {:?}",
            conflict.id, user_id, resolution.strategy
        );
        Ok(conflict)
    }

    fn compute_resolution(
        &self,
        conflict: &Conflict,
        strategy: ResolutionStrategy,
    ) -> Result<Holding> {
        let existing: Holding = serde_json::from_value(conflict.clearway_data.clone())
            .map_err(|e| ConflictError::InvalidSnapshot(e.to_string()))?;
        let incoming: PlatformHolding = serde_json::from_value(conflict.platform_data.clone())
            .map_err(|e| ConflictError::InvalidSnapshot(e.to_string()))?;

        match self
            .resolver
            .resolve_holding_conflict(&existing, &incoming, strategy)
        {
            Resolution::Apply(holding) => Ok(holding),
            Resolution::NeedsReview => {
                // Unreachable: MANUAL_REVIEW is rejected above.
                Err(ConflictError::UnsupportedResolution("MANUAL_REVIEW".to_string()).into())
            }
        }
    }
}
