pub mod conflicts_errors;
pub mod conflicts_model;
pub mod conflicts_service;
pub mod conflicts_traits;
pub mod reconciliation;
pub mod resolver;

pub use conflicts_errors::ConflictError;
pub use conflicts_model::*;
pub use conflicts_service::{ConflictService, ManualResolution};
pub use conflicts_traits::*;
pub use reconciliation::{
    ReconciliationRun, ReconciliationScope, ReconciliationService, ReconciliationStatus,
};
pub use resolver::{
    ConflictAssessment, ConflictResolver, HoldingObservation, Resolution, ResolverConfig,
};

#[cfg(test)]
mod tests;
