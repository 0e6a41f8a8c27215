//! Customer value analysis and targeted dispatch for a retail storefront.

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod telemetry;
