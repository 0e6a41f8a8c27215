use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::customers::CustomerId;

/// Store-assigned, monotonically increasing transaction identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(pub u64);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ptx-{:06}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Earn,
    Redeem,
    Adjustment,
}

impl TransactionKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Earn => "earn",
            Self::Redeem => "redeem",
            Self::Adjustment => "adjustment",
        }
    }
}

/// Immutable ledger row. The balance is the running sum of `delta`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointTransaction {
    pub id: TransactionId,
    pub customer_id: CustomerId,
    pub delta: i64,
    pub kind: TransactionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A row about to be appended; the store assigns the identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPointTransaction {
    pub customer_id: CustomerId,
    pub delta: i64,
    pub kind: TransactionKind,
    pub reference_id: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewPointTransaction {
    pub fn into_transaction(self, id: TransactionId) -> PointTransaction {
        PointTransaction {
            id,
            customer_id: self.customer_id,
            delta: self.delta,
            kind: self.kind,
            reference_id: self.reference_id,
            description: self.description,
            created_at: self.created_at,
        }
    }
}

/// Result of an append: the stored row and the balance right after it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerReceipt {
    pub transaction: PointTransaction,
    pub balance: i64,
}

/// Sums of positive and (absolute) negative deltas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsTotals {
    pub earned: i64,
    pub redeemed: i64,
}

impl PointsTotals {
    pub fn record(&mut self, delta: i64) {
        if delta >= 0 {
            self.earned = self.earned.saturating_add(delta);
        } else {
            self.redeemed = self.redeemed.saturating_add(delta.saturating_abs());
        }
    }

    pub fn balance(&self) -> i64 {
        self.earned.saturating_sub(self.redeemed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Bronze,
    Silver,
    Gold,
}

impl Tier {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Bronze => "Bronze",
            Self::Silver => "Silver",
            Self::Gold => "Gold",
        }
    }
}

/// Point balances at which a customer reaches each tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierPolicy {
    pub silver_points: i64,
    pub gold_points: i64,
}

impl Default for TierPolicy {
    fn default() -> Self {
        Self {
            silver_points: 1_000,
            gold_points: 5_000,
        }
    }
}

impl TierPolicy {
    pub fn tier_for(&self, balance: i64) -> Tier {
        if balance >= self.gold_points {
            Tier::Gold
        } else if balance >= self.silver_points {
            Tier::Silver
        } else {
            Tier::Bronze
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsSummary {
    pub customer_id: CustomerId,
    pub earned: i64,
    pub redeemed: i64,
    pub balance: i64,
    pub tier: Tier,
}
