use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::domain::{CustomerId, CustomerRecord};
use super::repository::CustomerStore;
use crate::clock::Clock;
use crate::config::DispatchConfig;
use crate::engine::rfm::{RfmError, RfmScore, RfmScorer, Segment};
use crate::engine::{ErrorKind, RepositoryError};

/// Recomputes RFM scores from customer records and stores the resulting segment.
pub struct SegmentationService<S> {
    store: Arc<S>,
    scorer: RfmScorer,
    clock: Arc<dyn Clock>,
    concurrency: usize,
}

impl<S> SegmentationService<S>
where
    S: CustomerStore + 'static,
{
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            scorer: RfmScorer::default(),
            clock,
            concurrency: DispatchConfig::DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_scorer(mut self, scorer: RfmScorer) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Upper bound on customers rescored at once by `recompute_all`.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub async fn recompute(
        &self,
        customer_id: &CustomerId,
    ) -> Result<SegmentAssignment, SegmentationError> {
        let record = self
            .store
            .fetch(customer_id)
            .await?
            .ok_or_else(|| SegmentationError::NotFound(customer_id.clone()))?;

        let assignment = self.assign(&record).await?;
        info!(
            customer_id = %assignment.customer_id,
            score = %assignment.score,
            segment = assignment.segment.label(),
            "customer segment recomputed"
        );
        Ok(assignment)
    }

    /// Scores every customer. Order across customers does not matter; a storage failure stops
    /// the run but leaves already written segments in place.
    pub async fn recompute_all(&self) -> Result<SegmentReport, SegmentationError> {
        let customers = self.store.list().await?;
        let evaluated = customers.len();

        let counts = stream::iter(customers)
            .map(|record| async move { self.assign(&record).await })
            .buffer_unordered(self.concurrency)
            .try_fold(HashMap::new(), |mut counts, assignment| async move {
                *counts.entry(assignment.segment).or_insert(0usize) += 1;
                Ok(counts)
            })
            .await?;

        let segments = Segment::ordered()
            .into_iter()
            .filter_map(|segment| {
                counts.get(&segment).map(|customers| SegmentCount {
                    segment,
                    segment_label: segment.label(),
                    customers: *customers,
                })
            })
            .collect();

        info!(evaluated, "segments recomputed for all customers");
        Ok(SegmentReport {
            evaluated,
            segments,
        })
    }

    async fn assign(
        &self,
        record: &CustomerRecord,
    ) -> Result<SegmentAssignment, SegmentationError> {
        let aggregate = record.aggregate(self.clock.today());
        let score = self.scorer.score(&aggregate)?;
        let segment = score.classify();

        self.store
            .update_segmentation(&record.id, score, segment)
            .await
            .map_err(|err| match err {
                RepositoryError::NotFound => SegmentationError::NotFound(record.id.clone()),
                other => SegmentationError::Repository(other),
            })?;
        debug!(customer_id = %record.id, %score, "segment stored");

        Ok(SegmentAssignment {
            customer_id: record.id.clone(),
            score,
            segment,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentAssignment {
    pub customer_id: CustomerId,
    pub score: RfmScore,
    pub segment: Segment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentCount {
    pub segment: Segment,
    pub segment_label: &'static str,
    pub customers: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentReport {
    pub evaluated: usize,
    pub segments: Vec<SegmentCount>,
}

impl SegmentReport {
    pub fn count(&self, segment: Segment) -> usize {
        self.segments
            .iter()
            .find(|entry| entry.segment == segment)
            .map(|entry| entry.customers)
            .unwrap_or(0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SegmentationError {
    #[error("customer {0} not found")]
    NotFound(CustomerId),
    #[error(transparent)]
    Scoring(#[from] RfmError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl SegmentationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Scoring(err) => err.kind(),
            Self::Repository(_) => ErrorKind::Internal,
        }
    }
}
