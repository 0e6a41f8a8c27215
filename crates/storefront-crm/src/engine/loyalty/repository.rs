use async_trait::async_trait;

use super::domain::{
    LedgerReceipt, NewPointTransaction, PointTransaction, PointsTotals, TransactionId,
};
use crate::engine::customers::CustomerId;
use crate::engine::RepositoryError;

/// Append-only point ledger with a cached balance per customer.
///
/// `append` writes the row and moves the cached balance as one atomic step on the store side;
/// callers never read-modify-write the balance. A negative delta that would take the balance
/// below zero is refused with [`RepositoryError::InsufficientBalance`] and nothing is written.
/// Unknown customers yield [`RepositoryError::NotFound`].
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn append(&self, entry: NewPointTransaction) -> Result<LedgerReceipt, RepositoryError>;

    async fn balance(&self, customer_id: &CustomerId) -> Result<i64, RepositoryError>;

    /// Most recent first, restricted to rows older than `before` when given.
    async fn page(
        &self,
        customer_id: &CustomerId,
        before: Option<TransactionId>,
        limit: usize,
    ) -> Result<Vec<PointTransaction>, RepositoryError>;

    async fn totals(&self, customer_id: &CustomerId) -> Result<PointsTotals, RepositoryError>;
}
