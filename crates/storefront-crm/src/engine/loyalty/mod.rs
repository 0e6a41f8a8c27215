//! Append-only loyalty-points ledger with a store-maintained balance cache.

pub mod domain;
mod history;
pub mod ledger;
pub mod repository;
pub mod router;

#[cfg(test)]
mod tests;

pub use domain::{
    LedgerReceipt, NewPointTransaction, PointTransaction, PointsSummary, PointsTotals, Tier,
    TierPolicy, TransactionId, TransactionKind,
};
pub use history::TransactionHistory;
pub use ledger::{LedgerError, LoyaltyLedger};
pub use repository::LedgerStore;
pub use router::loyalty_router;
