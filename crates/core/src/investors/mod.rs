//! Investor roster and capital call models and repository trait.
//!
//! Fund-admin platforms report investor rosters and capital calls; the
//! weekly roster sync upserts them by platform-native id. Portfolio
//! platforms have no roster and the sync path skips them.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// Consolidated investor. Unique per (portfolio_id, external_id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Investor {
    pub id: String,
    pub portfolio_id: String,
    /// Platform-native investor id.
    pub external_id: String,
    pub name: String,
    pub email: Option<String>,
    pub commitment: Option<Decimal>,
    pub capital_called: Option<Decimal>,
    pub currency: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CapitalCallStatus {
    #[default]
    Pending,
    Funded,
    Overdue,
    Cancelled,
}

/// Consolidated capital call. Unique per (portfolio_id, external_id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapitalCall {
    pub id: String,
    pub portfolio_id: String,
    pub external_id: String,
    /// Platform-native id of the investor being called.
    pub investor_external_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub due_date: NaiveDate,
    pub status: CapitalCallStatus,
    pub updated_at: DateTime<Utc>,
}

/// Normalized investor record as produced by a fund-admin adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformInvestor {
    pub external_id: String,
    pub name: String,
    pub email: Option<String>,
    pub commitment: Option<Decimal>,
    pub capital_called: Option<Decimal>,
    pub currency: String,
}

/// Normalized capital call record as produced by a fund-admin adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformCapitalCall {
    pub external_id: String,
    pub investor_external_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub due_date: NaiveDate,
    pub status: CapitalCallStatus,
}

impl Investor {
    pub fn from_platform(
        portfolio_id: impl Into<String>,
        record: &PlatformInvestor,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            portfolio_id: portfolio_id.into(),
            external_id: record.external_id.clone(),
            name: record.name.clone(),
            email: record.email.clone(),
            commitment: record.commitment,
            capital_called: record.capital_called,
            currency: record.currency.clone(),
            updated_at: now,
        }
    }
}

impl CapitalCall {
    pub fn from_platform(
        portfolio_id: impl Into<String>,
        record: &PlatformCapitalCall,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            portfolio_id: portfolio_id.into(),
            external_id: record.external_id.clone(),
            investor_external_id: record.investor_external_id.clone(),
            amount: record.amount,
            currency: record.currency.clone(),
            due_date: record.due_date,
            status: record.status,
            updated_at: now,
        }
    }
}

/// Contract for investor roster persistence.
#[async_trait]
pub trait InvestorRepositoryTrait: Send + Sync {
    /// Inserts or replaces an investor, keyed by (portfolio_id, external_id).
    async fn upsert_investor(&self, investor: Investor) -> Result<Investor>;

    /// Inserts or replaces a capital call, keyed by
    /// (portfolio_id, external_id).
    async fn upsert_capital_call(&self, call: CapitalCall) -> Result<CapitalCall>;

    fn list_investors(&self, portfolio_id: &str) -> Result<Vec<Investor>>;

    fn list_capital_calls(&self, portfolio_id: &str) -> Result<Vec<CapitalCall>>;
}
