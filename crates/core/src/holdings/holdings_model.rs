//! Holding domain models.
//!
//! A `Holding` is the consolidated position for one security within one
//! portfolio; `SourceHolding` rows are the per-connection evidence trail
//! used for conflict detection and reconciliation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Consolidated position. Unique per (portfolio_id, security_id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    pub id: String,
    pub portfolio_id: String,
    pub security_id: String,
    pub symbol: Option<String>,
    pub quantity: Decimal,
    pub market_value: Decimal,
    pub cost_basis: Option<Decimal>,
    pub unrealized_gain: Option<Decimal>,
    pub percent_of_portfolio: Option<Decimal>,
    pub currency: String,
    pub last_updated: DateTime<Utc>,
}

impl Holding {
    /// Build a fresh consolidated holding from a normalized platform record.
    pub fn from_platform(
        portfolio_id: impl Into<String>,
        record: &PlatformHolding,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            portfolio_id: portfolio_id.into(),
            security_id: record.security_id.clone(),
            symbol: record.symbol.clone(),
            quantity: record.quantity.unwrap_or_default(),
            market_value: record.market_value.unwrap_or_default(),
            cost_basis: record.cost_basis,
            unrealized_gain: record.unrealized_gain,
            percent_of_portfolio: None,
            currency: record.currency.clone(),
            last_updated: record.as_of.unwrap_or(now),
        }
    }
}

/// Last-seen value for a holding as reported by one specific connection.
/// Unique per (holding_id, connection_id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceHolding {
    pub id: String,
    pub holding_id: String,
    pub connection_id: String,
    pub security_id: String,
    pub quantity: Decimal,
    pub market_value: Decimal,
    pub cost_basis: Option<Decimal>,
    /// Timestamp the platform itself attached to the record.
    pub platform_updated_at: Option<DateTime<Utc>>,
    /// When this observation was recorded locally.
    pub reported_at: DateTime<Utc>,
}

impl SourceHolding {
    pub fn from_platform(
        holding_id: impl Into<String>,
        connection_id: impl Into<String>,
        record: &PlatformHolding,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            holding_id: holding_id.into(),
            connection_id: connection_id.into(),
            security_id: record.security_id.clone(),
            quantity: record.quantity.unwrap_or_default(),
            market_value: record.market_value.unwrap_or_default(),
            cost_basis: record.cost_basis,
            platform_updated_at: record.as_of,
            reported_at: now,
        }
    }
}

/// Normalized holding record as produced by a platform adapter.
///
/// Optional numeric fields keep MERGE semantics expressible: a platform
/// that omits a field never clobbers the consolidated value with zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformHolding {
    pub security_id: String,
    pub symbol: Option<String>,
    pub quantity: Option<Decimal>,
    pub market_value: Option<Decimal>,
    pub cost_basis: Option<Decimal>,
    pub unrealized_gain: Option<Decimal>,
    pub currency: String,
    /// Platform-side as-of timestamp.
    pub as_of: Option<DateTime<Utc>>,
}
