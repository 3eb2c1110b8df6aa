//! Transaction domain models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Buy,
    Sell,
    Dividend,
    Interest,
    Contribution,
    Distribution,
    Fee,
    Transfer,
    Other,
}

/// Consolidated transaction record.
///
/// Transactions are insert-only from the sync path: duplicates are skipped,
/// never merged or overwritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub portfolio_id: String,
    pub security_id: Option<String>,
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    pub quantity: Option<Decimal>,
    pub price: Option<Decimal>,
    pub currency: String,
    pub transaction_date: DateTime<Utc>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn from_platform(
        portfolio_id: impl Into<String>,
        record: &PlatformTransaction,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            portfolio_id: portfolio_id.into(),
            security_id: record.security_id.clone(),
            transaction_type: record.transaction_type,
            amount: record.amount,
            quantity: record.quantity,
            price: record.price,
            currency: record.currency.clone(),
            transaction_date: record.transaction_date,
            description: record.description.clone(),
            created_at: now,
        }
    }
}

/// Evidence row linking a consolidated transaction to the connection that
/// reported it. Unique per (transaction_id, connection_id). The
/// platform-native id is the primary duplicate-detection signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceTransaction {
    pub id: String,
    pub transaction_id: String,
    pub connection_id: String,
    pub platform_transaction_id: Option<String>,
    pub reported_at: DateTime<Utc>,
}

impl SourceTransaction {
    pub fn new(
        transaction_id: impl Into<String>,
        connection_id: impl Into<String>,
        platform_transaction_id: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            transaction_id: transaction_id.into(),
            connection_id: connection_id.into(),
            platform_transaction_id,
            reported_at: now,
        }
    }
}

/// Normalized transaction record as produced by a platform adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformTransaction {
    /// Platform-native transaction id, when the platform provides one.
    pub platform_transaction_id: Option<String>,
    pub security_id: Option<String>,
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    pub quantity: Option<Decimal>,
    pub price: Option<Decimal>,
    pub currency: String,
    pub transaction_date: DateTime<Utc>,
    pub description: Option<String>,
}
