//! Customer records as seen by the engine, and the segmentation pass that keeps their
//! RFM score and lifecycle segment current.

pub mod domain;
pub mod import;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{CustomerId, CustomerRecord, NEVER_PURCHASED_DAYS};
pub use import::{AggregateImporter, ClassifiedCustomer, ImportError};
pub use repository::CustomerStore;
pub use router::segmentation_router;
pub use service::{
    SegmentAssignment, SegmentCount, SegmentReport, SegmentationError, SegmentationService,
};
