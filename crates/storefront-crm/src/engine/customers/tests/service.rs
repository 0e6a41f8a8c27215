use std::sync::Arc;

use super::common::*;
use crate::clock::FixedClock;
use crate::engine::customers::{CustomerId, SegmentationError, SegmentationService};
use crate::engine::rfm::{RfmScore, Segment};
use crate::engine::ErrorKind;

#[tokio::test]
async fn recompute_scores_and_persists_the_segment() {
    let (service, store) = build_service().await;
    let customer = CustomerId::new("c-champ");

    let assignment = service.recompute(&customer).await.expect("recompute");
    assert_eq!(assignment.score, RfmScore::new(5, 5, 5).expect("score"));
    assert_eq!(assignment.segment, Segment::Champion);

    let stored = store.customer(&customer).expect("stored");
    assert_eq!(stored.segment, Some(Segment::Champion));
    assert_eq!(stored.rfm, Some(assignment.score));
}

#[tokio::test]
async fn customers_without_orders_hibernate() {
    let (service, _) = build_service().await;
    let assignment = service
        .recompute(&CustomerId::new("c-idle"))
        .await
        .expect("recompute");

    assert_eq!(assignment.score, RfmScore::new(1, 1, 1).expect("score"));
    assert_eq!(assignment.segment, Segment::Hibernating);
}

#[tokio::test]
async fn unknown_customer_is_not_found() {
    let (service, _) = build_service().await;
    let err = service
        .recompute(&CustomerId::new("c-missing"))
        .await
        .expect_err("missing customer");

    assert!(matches!(err, SegmentationError::NotFound(_)));
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn recompute_all_reports_counts_in_segment_order() {
    let (service, store) = build_service().await;
    let report = service.recompute_all().await.expect("recompute all");

    assert_eq!(report.evaluated, 4);
    let order: Vec<Segment> = report.segments.iter().map(|entry| entry.segment).collect();
    assert_eq!(
        order,
        vec![
            Segment::Champion,
            Segment::NewCustomer,
            Segment::AtRisk,
            Segment::Hibernating
        ]
    );
    assert_eq!(report.count(Segment::AtRisk), 1);
    assert_eq!(report.count(Segment::Loyal), 0);

    let risk = store.customer(&CustomerId::new("c-risk")).expect("stored");
    assert_eq!(risk.rfm, Some(RfmScore::new(2, 3, 2).expect("score")));
}

#[tokio::test]
async fn storage_failures_abort_the_run() {
    let service =
        SegmentationService::new(Arc::new(ReadOnlyStore), Arc::new(FixedClock::new(now())));
    let err = service.recompute_all().await.expect_err("writes fail");

    assert!(matches!(err, SegmentationError::Repository(_)));
    assert_eq!(err.kind(), ErrorKind::Internal);
}
