use std::sync::Arc;

use async_trait::async_trait;
use axum::body::to_bytes;
use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::clock::FixedClock;
use crate::engine::customers::{CustomerId, CustomerRecord, CustomerStore, SegmentationService};
use crate::engine::memory::InMemoryStore;
use crate::engine::rfm::{RfmScore, Segment};
use crate::engine::RepositoryError;

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 15, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn days_ago(days: i64) -> DateTime<Utc> {
    now() - Duration::days(days)
}

/// Four customers, one per expected segment:
/// `c-champ` Champion, `c-risk` AtRisk, `c-new` NewCustomer, `c-idle` Hibernating.
pub(super) fn customers() -> Vec<CustomerRecord> {
    vec![
        CustomerRecord::new("c-champ", "Arthit").with_orders(
            12,
            Decimal::from(60_000),
            days_ago(10),
        ),
        CustomerRecord::new("c-risk", "Busaba").with_orders(
            4,
            Decimal::from(8_000),
            days_ago(165),
        ),
        CustomerRecord::new("c-new", "Chai").with_orders(1, Decimal::from(1_200), days_ago(5)),
        CustomerRecord::new("c-idle", "Dao"),
    ]
}

pub(super) async fn seeded_store() -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    for record in customers() {
        CustomerStore::insert(store.as_ref(), record)
            .await
            .expect("seed customer");
    }
    store
}

pub(super) async fn build_service() -> (SegmentationService<InMemoryStore>, Arc<InMemoryStore>) {
    let store = seeded_store().await;
    let service = SegmentationService::new(Arc::clone(&store), Arc::new(FixedClock::new(now())))
        .with_concurrency(2);
    (service, store)
}

pub(super) async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("json body")
}

/// Lists customers but fails every write.
pub(super) struct ReadOnlyStore;

#[async_trait]
impl CustomerStore for ReadOnlyStore {
    async fn insert(&self, _record: CustomerRecord) -> Result<CustomerRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("read only".to_string()))
    }

    async fn fetch(&self, id: &CustomerId) -> Result<Option<CustomerRecord>, RepositoryError> {
        Ok(customers().into_iter().find(|record| &record.id == id))
    }

    async fn list(&self) -> Result<Vec<CustomerRecord>, RepositoryError> {
        Ok(customers())
    }

    async fn update_segmentation(
        &self,
        _id: &CustomerId,
        _score: RfmScore,
        _segment: Segment,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("read only".to_string()))
    }
}
