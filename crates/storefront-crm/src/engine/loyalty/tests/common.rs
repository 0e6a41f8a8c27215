use std::sync::Arc;

use async_trait::async_trait;
use axum::body::to_bytes;
use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::clock::FixedClock;
use crate::config::LoyaltyConfig;
use crate::engine::customers::{CustomerId, CustomerRecord, CustomerStore};
use crate::engine::loyalty::{
    LedgerReceipt, LedgerStore, LoyaltyLedger, NewPointTransaction, PointTransaction,
    PointsTotals, TransactionId,
};
use crate::engine::memory::InMemoryStore;
use crate::engine::RepositoryError;

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 8, 30, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn member() -> CustomerId {
    CustomerId::new("c-100")
}

pub(super) async fn build_ledger() -> (Arc<LoyaltyLedger<InMemoryStore>>, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    CustomerStore::insert(store.as_ref(), CustomerRecord::new("c-100", "Nok"))
        .await
        .expect("seed customer");

    let ledger = LoyaltyLedger::new(
        Arc::clone(&store),
        Arc::new(FixedClock::new(now())),
        LoyaltyConfig::default(),
    );
    (Arc::new(ledger), store)
}

/// Ledger whose cached balance reads `skew` points away from the rows.
pub(super) struct SkewedBalance {
    pub(super) inner: InMemoryStore,
    pub(super) skew: i64,
}

#[async_trait]
impl LedgerStore for SkewedBalance {
    async fn append(&self, entry: NewPointTransaction) -> Result<LedgerReceipt, RepositoryError> {
        LedgerStore::append(&self.inner, entry).await
    }

    async fn balance(&self, customer_id: &CustomerId) -> Result<i64, RepositoryError> {
        Ok(LedgerStore::balance(&self.inner, customer_id).await? + self.skew)
    }

    async fn page(
        &self,
        customer_id: &CustomerId,
        before: Option<TransactionId>,
        limit: usize,
    ) -> Result<Vec<PointTransaction>, RepositoryError> {
        LedgerStore::page(&self.inner, customer_id, before, limit).await
    }

    async fn totals(&self, customer_id: &CustomerId) -> Result<PointsTotals, RepositoryError> {
        LedgerStore::totals(&self.inner, customer_id).await
    }
}

pub(super) async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("json body")
}
