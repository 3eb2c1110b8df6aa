//! Performance metric models and repository trait.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// Fixed set of reporting periods synced for every connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PerformancePeriod {
    Daily,
    Weekly,
    Monthly,
    Ytd,
    #[serde(rename = "1Y")]
    OneYear,
    #[serde(rename = "3Y")]
    ThreeYear,
    #[serde(rename = "5Y")]
    FiveYear,
}

impl PerformancePeriod {
    /// Every period the sync engine refreshes on a performance pull.
    pub const ALL: [PerformancePeriod; 7] = [
        PerformancePeriod::Daily,
        PerformancePeriod::Weekly,
        PerformancePeriod::Monthly,
        PerformancePeriod::Ytd,
        PerformancePeriod::OneYear,
        PerformancePeriod::ThreeYear,
        PerformancePeriod::FiveYear,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PerformancePeriod::Daily => "DAILY",
            PerformancePeriod::Weekly => "WEEKLY",
            PerformancePeriod::Monthly => "MONTHLY",
            PerformancePeriod::Ytd => "YTD",
            PerformancePeriod::OneYear => "1Y",
            PerformancePeriod::ThreeYear => "3Y",
            PerformancePeriod::FiveYear => "5Y",
        }
    }
}

/// Consolidated performance point. Unique per
/// (connection_id, period, calculation_date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetric {
    pub id: String,
    pub connection_id: String,
    pub portfolio_id: String,
    pub period: PerformancePeriod,
    pub calculation_date: NaiveDate,
    pub return_percent: Decimal,
    pub ending_value: Option<Decimal>,
    pub currency: String,
    pub updated_at: DateTime<Utc>,
}

impl PerformanceMetric {
    pub fn from_platform(
        connection_id: impl Into<String>,
        portfolio_id: impl Into<String>,
        record: &PlatformPerformance,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            connection_id: connection_id.into(),
            portfolio_id: portfolio_id.into(),
            period: record.period,
            calculation_date: record.calculation_date,
            return_percent: record.return_percent,
            ending_value: record.ending_value,
            currency: record.currency.clone(),
            updated_at: now,
        }
    }
}

/// Normalized performance point as produced by a platform adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformPerformance {
    pub period: PerformancePeriod,
    pub calculation_date: NaiveDate,
    pub return_percent: Decimal,
    pub ending_value: Option<Decimal>,
    pub currency: String,
}

/// Contract for performance metric persistence.
#[async_trait]
pub trait PerformanceRepositoryTrait: Send + Sync {
    /// Inserts or replaces a metric, keyed by
    /// (connection_id, period, calculation_date).
    async fn upsert(&self, metric: PerformanceMetric) -> Result<PerformanceMetric>;

    /// Lists metrics for a connection.
    fn list_for_connection(&self, connection_id: &str) -> Result<Vec<PerformanceMetric>>;
}
