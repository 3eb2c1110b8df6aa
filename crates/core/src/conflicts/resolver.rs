//! Conflict detection and resolution.
//!
//! The resolver is a pure decision component: it never touches storage.
//! The MANUAL_REVIEW branch surfaces as `Resolution::NeedsReview`, and the
//! caller (sync engine or conflict service) persists the Conflict row.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::conflicts_model::{
    ConflictDetails, ConflictSeverity, ConflictType, Recommendation, ReconciliationFinding,
    ReconciliationReport, ResolutionStrategy,
};
use crate::holdings::{Holding, PlatformHolding, SourceHolding};
use crate::transactions::{PlatformTransaction, Transaction};
use std::collections::BTreeMap;

/// Tolerance policy. These are configuration, not per-call parameters:
/// callers needing different tolerances construct a resolver with a
/// different config.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Relative quantity difference above which a conflict is flagged.
    pub quantity_tolerance: Decimal,
    /// Relative market value difference above which a conflict is flagged.
    pub value_tolerance: Decimal,
    /// Absolute amount difference below which two transactions match.
    pub duplicate_amount_epsilon: Decimal,
    /// Window within which matching transactions count as duplicates.
    pub duplicate_window: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            quantity_tolerance: dec!(0.01),
            value_tolerance: dec!(0.02),
            duplicate_amount_epsilon: dec!(0.01),
            duplicate_window: Duration::hours(24),
        }
    }
}

/// Outcome of single-record conflict detection.
#[derive(Debug, Clone, PartialEq)]
pub struct ConflictAssessment {
    pub has_conflict: bool,
    pub conflict_type: Option<ConflictType>,
    pub severity: ConflictSeverity,
    pub details: Option<ConflictDetails>,
}

impl ConflictAssessment {
    fn none() -> Self {
        Self {
            has_conflict: false,
            conflict_type: None,
            severity: ConflictSeverity::Low,
            details: None,
        }
    }
}

/// Outcome of applying a resolution strategy.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Write this holding to the consolidated store.
    Apply(Holding),
    /// Leave the existing value untouched and persist a Conflict row.
    NeedsReview,
}

/// One source's view of a security, for multi-source detection.
#[derive(Debug, Clone, PartialEq)]
pub struct HoldingObservation {
    pub connection_id: String,
    pub quantity: Decimal,
    pub market_value: Decimal,
    pub as_of: Option<DateTime<Utc>>,
}

impl From<&SourceHolding> for HoldingObservation {
    fn from(s: &SourceHolding) -> Self {
        Self {
            connection_id: s.connection_id.clone(),
            quantity: s.quantity,
            market_value: s.market_value,
            as_of: s.platform_updated_at,
        }
    }
}

/// Pure conflict detection and resolution over holdings and transactions.
#[derive(Debug, Clone, Default)]
pub struct ConflictResolver {
    config: ResolverConfig,
}

impl ConflictResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Compares an incoming platform record against the consolidated
    /// holding. Quantity is checked before value; the first exceeded
    /// tolerance names the conflict type. Severity is MEDIUM whenever a
    /// tolerance is exceeded.
    pub fn detect_holding_conflict(
        &self,
        existing: &Holding,
        incoming: &PlatformHolding,
    ) -> ConflictAssessment {
        if let Some(incoming_qty) = incoming.quantity {
            let diff = relative_difference(existing.quantity, incoming_qty);
            if diff > self.config.quantity_tolerance {
                return ConflictAssessment {
                    has_conflict: true,
                    conflict_type: Some(ConflictType::QuantityMismatch),
                    severity: ConflictSeverity::Medium,
                    details: Some(ConflictDetails::QuantityMismatch {
                        existing_quantity: existing.quantity,
                        incoming_quantity: incoming_qty,
                        relative_difference: diff,
                    }),
                };
            }
        }

        if let Some(incoming_value) = incoming.market_value {
            let diff = relative_difference(existing.market_value, incoming_value);
            if diff > self.config.value_tolerance {
                return ConflictAssessment {
                    has_conflict: true,
                    conflict_type: Some(ConflictType::ValueMismatch),
                    severity: ConflictSeverity::Medium,
                    details: Some(ConflictDetails::ValueMismatch {
                        existing_value: existing.market_value,
                        incoming_value,
                        relative_difference: diff,
                    }),
                };
            }
        }

        ConflictAssessment::none()
    }

    /// Compares the views of two or more connections on the same security.
    ///
    /// Quantity variance is `(max - min) / max`; a value outlier is any
    /// source deviating from the mean by more than the value tolerance.
    /// Severity is HIGH when both quantity and value disagree, MEDIUM when
    /// one does; fewer than two sources never conflict.
    pub fn detect_multi_source_conflict(
        &self,
        sources: &[HoldingObservation],
    ) -> ConflictAssessment {
        if sources.len() < 2 {
            return ConflictAssessment::none();
        }

        let quantities: Vec<Decimal> = sources.iter().map(|s| s.quantity).collect();
        let max_qty = quantities.iter().copied().max().unwrap_or_default();
        let min_qty = quantities.iter().copied().min().unwrap_or_default();
        let quantity_variance = if max_qty.is_zero() {
            Decimal::ZERO
        } else {
            (max_qty - min_qty) / max_qty
        };
        let quantity_disagrees = quantity_variance > self.config.quantity_tolerance;

        let mean_value = sources
            .iter()
            .map(|s| s.market_value)
            .sum::<Decimal>()
            / Decimal::from(sources.len());
        let value_outlier = sources.iter().any(|s| {
            relative_difference(mean_value, s.market_value) > self.config.value_tolerance
        });

        let has_conflict = quantity_disagrees || value_outlier;
        let severity = if quantity_disagrees && value_outlier {
            ConflictSeverity::High
        } else if has_conflict {
            ConflictSeverity::Medium
        } else {
            ConflictSeverity::Low
        };

        ConflictAssessment {
            has_conflict,
            conflict_type: if quantity_disagrees {
                Some(ConflictType::QuantityMismatch)
            } else if value_outlier {
                Some(ConflictType::ValueMismatch)
            } else {
                None
            },
            severity,
            details: Some(ConflictDetails::MultiSource {
                source_count: sources.len(),
                quantity_variance,
                value_outlier,
            }),
        }
    }

    /// Applies a resolution strategy to one disagreement.
    pub fn resolve_holding_conflict(
        &self,
        existing: &Holding,
        incoming: &PlatformHolding,
        strategy: ResolutionStrategy,
    ) -> Resolution {
        match strategy {
            ResolutionStrategy::ClearwayWins => Resolution::Apply(existing.clone()),
            ResolutionStrategy::PlatformWins => {
                Resolution::Apply(Self::overwrite(existing, incoming, Utc::now()))
            }
            ResolutionStrategy::Merge => Resolution::Apply(self.merge(existing, incoming)),
            ResolutionStrategy::Timestamp => {
                // Without a platform timestamp the incoming record cannot
                // prove it is newer, so the existing value stands.
                match incoming.as_of {
                    Some(as_of) if as_of > existing.last_updated => {
                        Resolution::Apply(Self::overwrite(existing, incoming, as_of))
                    }
                    _ => Resolution::Apply(existing.clone()),
                }
            }
            ResolutionStrategy::ManualReview => Resolution::NeedsReview,
        }
    }

    /// Incoming fields overwrite the consolidated record; fields the
    /// platform omitted keep their consolidated values.
    fn overwrite(existing: &Holding, incoming: &PlatformHolding, updated: DateTime<Utc>) -> Holding {
        Holding {
            id: existing.id.clone(),
            portfolio_id: existing.portfolio_id.clone(),
            security_id: existing.security_id.clone(),
            symbol: incoming.symbol.clone().or_else(|| existing.symbol.clone()),
            quantity: incoming.quantity.unwrap_or(existing.quantity),
            market_value: incoming.market_value.unwrap_or(existing.market_value),
            cost_basis: incoming.cost_basis.or(existing.cost_basis),
            unrealized_gain: incoming.unrealized_gain.or(existing.unrealized_gain),
            percent_of_portfolio: existing.percent_of_portfolio,
            currency: existing.currency.clone(),
            last_updated: updated,
        }
    }

    /// Field-wise merge: quantity prefers incoming; market value is the
    /// arithmetic mean when both sides report one; cost basis prefers
    /// incoming; unrealized gain is recomputed from incoming market value
    /// and existing cost basis when both are available.
    fn merge(&self, existing: &Holding, incoming: &PlatformHolding) -> Holding {
        let market_value = match incoming.market_value {
            Some(incoming_value) => (incoming_value + existing.market_value) / dec!(2),
            None => existing.market_value,
        };
        let unrealized_gain = match (incoming.market_value, existing.cost_basis) {
            (Some(mv), Some(cb)) => Some(mv - cb),
            _ => existing.unrealized_gain,
        };
        let last_updated = match incoming.as_of {
            Some(as_of) => as_of.max(existing.last_updated),
            None => existing.last_updated,
        };

        Holding {
            id: existing.id.clone(),
            portfolio_id: existing.portfolio_id.clone(),
            security_id: existing.security_id.clone(),
            symbol: incoming.symbol.clone().or_else(|| existing.symbol.clone()),
            quantity: incoming.quantity.unwrap_or(existing.quantity),
            market_value,
            cost_basis: incoming.cost_basis.or(existing.cost_basis),
            unrealized_gain,
            percent_of_portfolio: existing.percent_of_portfolio,
            currency: existing.currency.clone(),
            last_updated,
        }
    }

    /// A transaction duplicates an existing one iff it targets the same
    /// security with the same type, the amounts differ by less than the
    /// epsilon, and the dates fall within the duplicate window. Duplicates
    /// are reported, never merged; callers must skip insertion.
    pub fn detect_transaction_duplicate<'a>(
        &self,
        existing: &'a [Transaction],
        incoming: &PlatformTransaction,
    ) -> Option<&'a Transaction> {
        existing.iter().find(|t| {
            t.security_id == incoming.security_id
                && t.transaction_type == incoming.transaction_type
                && (t.amount - incoming.amount).abs() < self.config.duplicate_amount_epsilon
                && within_window(
                    t.transaction_date,
                    incoming.transaction_date,
                    self.config.duplicate_window,
                )
        })
    }

    /// Groups incoming holdings by security across connections, runs
    /// multi-source detection per group, and emits an advisory
    /// recommendation per flagged security. Not auto-applied.
    pub fn reconcile_holdings(
        &self,
        portfolio_id: &str,
        per_connection: &[(String, Vec<PlatformHolding>)],
    ) -> ReconciliationReport {
        let mut by_security: BTreeMap<String, Vec<HoldingObservation>> = BTreeMap::new();
        for (connection_id, holdings) in per_connection {
            for h in holdings {
                by_security
                    .entry(h.security_id.clone())
                    .or_default()
                    .push(HoldingObservation {
                        connection_id: connection_id.clone(),
                        quantity: h.quantity.unwrap_or_default(),
                        market_value: h.market_value.unwrap_or_default(),
                        as_of: h.as_of,
                    });
            }
        }

        let securities_checked = by_security.len();
        let mut findings = Vec::new();
        for (security_id, observations) in by_security {
            let assessment = self.detect_multi_source_conflict(&observations);
            if !assessment.has_conflict {
                continue;
            }
            if let Some(details) = assessment.details {
                findings.push(ReconciliationFinding {
                    security_id,
                    severity: assessment.severity,
                    recommendation: Recommendation::for_severity(assessment.severity),
                    details,
                    connection_ids: observations
                        .iter()
                        .map(|o| o.connection_id.clone())
                        .collect(),
                });
            }
        }

        ReconciliationReport {
            portfolio_id: portfolio_id.to_string(),
            securities_checked,
            findings,
        }
    }
}

/// |b - a| / a, with a zero baseline treated as total disagreement
/// unless both sides are zero.
fn relative_difference(baseline: Decimal, other: Decimal) -> Decimal {
    if baseline.is_zero() {
        if other.is_zero() {
            Decimal::ZERO
        } else {
            Decimal::ONE
        }
    } else {
        ((other - baseline) / baseline).abs()
    }
}

fn within_window(a: DateTime<Utc>, b: DateTime<Utc>, window: Duration) -> bool {
    let delta = if a > b { a - b } else { b - a };
    delta <= window
}
