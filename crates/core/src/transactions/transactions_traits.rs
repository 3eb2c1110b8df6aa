//! Transaction repository trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::transactions_model::{SourceTransaction, Transaction};
use crate::errors::Result;

/// Contract for consolidated transactions and their evidence rows.
#[async_trait]
pub trait TransactionRepositoryTrait: Send + Sync {
    /// Lists transactions for a portfolio dated at or after `since`.
    fn list_since(&self, portfolio_id: &str, since: DateTime<Utc>) -> Result<Vec<Transaction>>;

    /// Returns true when this connection already reported a transaction
    /// with this platform-native id.
    fn source_exists(&self, connection_id: &str, platform_transaction_id: &str) -> Result<bool>;

    /// Inserts a new transaction. Sync never updates existing rows.
    async fn insert(&self, transaction: Transaction) -> Result<Transaction>;

    /// Records which connection reported a transaction.
    async fn insert_source(&self, source: SourceTransaction) -> Result<SourceTransaction>;
}
