use async_trait::async_trait;

use super::domain::{CustomerId, CustomerRecord};
use crate::engine::rfm::{RfmScore, Segment};
use crate::engine::RepositoryError;

/// Storage abstraction for the customer entity.
#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn insert(&self, record: CustomerRecord) -> Result<CustomerRecord, RepositoryError>;
    async fn fetch(&self, id: &CustomerId) -> Result<Option<CustomerRecord>, RepositoryError>;
    async fn list(&self) -> Result<Vec<CustomerRecord>, RepositoryError>;
    async fn update_segmentation(
        &self,
        id: &CustomerId,
        score: RfmScore,
        segment: Segment,
    ) -> Result<(), RepositoryError>;
}
