use std::sync::Arc;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{info, warn};

use super::domain::{LedgerReceipt, NewPointTransaction, PointsSummary, TransactionKind};
use super::history::TransactionHistory;
use super::repository::LedgerStore;
use crate::clock::Clock;
use crate::config::LoyaltyConfig;
use crate::engine::customers::CustomerId;
use crate::engine::{ErrorKind, RepositoryError};

/// Service wrapping the ledger store with input validation and earning rules.
pub struct LoyaltyLedger<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    config: LoyaltyConfig,
}

impl<S> LoyaltyLedger<S>
where
    S: LedgerStore + 'static,
{
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, config: LoyaltyConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &LoyaltyConfig {
        &self.config
    }

    /// Credit `points` to a customer. `kind` must be a crediting kind (earn or adjustment).
    pub async fn earn(
        &self,
        customer_id: &CustomerId,
        points: i64,
        kind: TransactionKind,
        reference_id: Option<String>,
        description: Option<String>,
    ) -> Result<LedgerReceipt, LedgerError> {
        if points <= 0 {
            return Err(LedgerError::InvalidInput(format!(
                "earned points must be positive, got {points}"
            )));
        }
        if kind == TransactionKind::Redeem {
            return Err(LedgerError::InvalidInput(
                "redemptions must go through redeem".to_string(),
            ));
        }

        self.append(customer_id, points, kind, reference_id, description)
            .await
    }

    /// Debit `points`; refused when the balance cannot cover them.
    pub async fn redeem(
        &self,
        customer_id: &CustomerId,
        points: i64,
        reference_id: Option<String>,
        description: Option<String>,
    ) -> Result<LedgerReceipt, LedgerError> {
        if points <= 0 {
            return Err(LedgerError::InvalidInput(format!(
                "redeemed points must be positive, got {points}"
            )));
        }

        self.append(
            customer_id,
            -points,
            TransactionKind::Redeem,
            reference_id,
            description,
        )
        .await
    }

    /// Manual signed correction by an administrator.
    pub async fn adjust(
        &self,
        customer_id: &CustomerId,
        amount: i64,
        reason: &str,
        actor: &str,
    ) -> Result<LedgerReceipt, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidInput(
                "adjustment amount must not be zero".to_string(),
            ));
        }
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(LedgerError::InvalidInput(
                "adjustment reason is required".to_string(),
            ));
        }

        let description = format!("{reason} (by {})", actor.trim());
        self.append(
            customer_id,
            amount,
            TransactionKind::Adjustment,
            None,
            Some(description),
        )
        .await
    }

    /// Earn points for a completed order at the configured spend-per-point rate.
    /// Orders too small to earn a whole point write nothing.
    pub async fn award_order(
        &self,
        customer_id: &CustomerId,
        order_id: &str,
        order_total: Decimal,
    ) -> Result<Option<LedgerReceipt>, LedgerError> {
        if order_total < Decimal::ZERO {
            return Err(LedgerError::InvalidInput(format!(
                "order total {order_total} must not be negative"
            )));
        }

        let points = order_total
            .checked_div(self.config.spend_per_point)
            .and_then(|ratio| ratio.floor().to_i64())
            .ok_or_else(|| {
                LedgerError::InvalidInput(format!(
                    "order total {order_total} cannot be converted at {} per point",
                    self.config.spend_per_point
                ))
            })?;
        if points == 0 {
            return Ok(None);
        }

        let receipt = self
            .append(
                customer_id,
                points,
                TransactionKind::Earn,
                Some(order_id.to_string()),
                Some(format!("order {order_id}")),
            )
            .await?;
        Ok(Some(receipt))
    }

    /// Newest-first view over at most `limit` transactions.
    pub fn history(&self, customer_id: &CustomerId, limit: usize) -> TransactionHistory<'_, S> {
        TransactionHistory::new(self.store.as_ref(), customer_id.clone(), limit)
    }

    /// Totals come from the ledger rows. A cached balance that disagrees with them is
    /// logged and the row sum is reported.
    pub async fn summary(&self, customer_id: &CustomerId) -> Result<PointsSummary, LedgerError> {
        let totals = self
            .store
            .totals(customer_id)
            .await
            .map_err(|err| LedgerError::from_repository(err, customer_id, 0))?;
        let cached = self
            .store
            .balance(customer_id)
            .await
            .map_err(|err| LedgerError::from_repository(err, customer_id, 0))?;
        let balance = totals.balance();
        if cached != balance {
            warn!(
                customer_id = %customer_id,
                cached,
                ledger = balance,
                "cached points balance drifted from the ledger"
            );
        }

        Ok(PointsSummary {
            customer_id: customer_id.clone(),
            earned: totals.earned,
            redeemed: totals.redeemed,
            balance,
            tier: self.config.tiers.tier_for(balance),
        })
    }

    async fn append(
        &self,
        customer_id: &CustomerId,
        delta: i64,
        kind: TransactionKind,
        reference_id: Option<String>,
        description: Option<String>,
    ) -> Result<LedgerReceipt, LedgerError> {
        let entry = NewPointTransaction {
            customer_id: customer_id.clone(),
            delta,
            kind,
            reference_id,
            description,
            created_at: self.clock.now(),
        };

        match self.store.append(entry).await {
            Ok(receipt) => {
                info!(
                    customer_id = %customer_id,
                    transaction = %receipt.transaction.id,
                    kind = kind.label(),
                    delta,
                    balance = receipt.balance,
                    "ledger entry appended"
                );
                Ok(receipt)
            }
            Err(err) => {
                warn!(
                    customer_id = %customer_id,
                    kind = kind.label(),
                    delta,
                    error = %err,
                    "ledger entry refused"
                );
                Err(LedgerError::from_repository(err, customer_id, delta.saturating_abs()))
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("customer {0} not found")]
    NotFound(CustomerId),
    #[error("insufficient balance: requested {requested} point(s), {available} available")]
    InsufficientBalance { requested: i64, available: i64 },
    #[error(transparent)]
    Repository(RepositoryError),
}

impl LedgerError {
    pub(crate) fn from_repository(
        err: RepositoryError,
        customer_id: &CustomerId,
        requested: i64,
    ) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound(customer_id.clone()),
            RepositoryError::InsufficientBalance { available } => Self::InsufficientBalance {
                requested,
                available,
            },
            RepositoryError::OutOfRange => Self::InvalidInput(format!(
                "{requested} point(s) would take the balance of {customer_id} out of range"
            )),
            other => Self::Repository(other),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            Self::Repository(RepositoryError::Conflict) => ErrorKind::Conflict,
            Self::Repository(_) => ErrorKind::Internal,
        }
    }
}
