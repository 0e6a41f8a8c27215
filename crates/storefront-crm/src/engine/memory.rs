//! Process-local store backing every engine repository trait.
//!
//! All state sits behind one mutex, so each trait method is a single atomic step: a ledger
//! append writes the row and moves the cached balance together, and a coupon redemption checks
//! its limits and takes the slot together.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::campaigns::{Campaign, CampaignId, CampaignLog, CampaignStore};
use super::coupons::{Coupon, CouponId, CouponStore, CouponUsage};
use super::customers::{CustomerId, CustomerRecord, CustomerStore};
use super::loyalty::{
    LedgerReceipt, LedgerStore, NewPointTransaction, PointTransaction, PointsTotals, TransactionId,
};
use super::rfm::{RfmScore, Segment};
use super::RepositoryError;

#[derive(Debug, Default)]
struct State {
    customers: BTreeMap<CustomerId, CustomerRecord>,
    transactions: Vec<PointTransaction>,
    last_transaction: u64,
    coupons: HashMap<CouponId, Coupon>,
    coupon_codes: HashMap<String, CouponId>,
    usages: Vec<CouponUsage>,
    campaigns: HashMap<CampaignId, Campaign>,
    logs: Vec<CampaignLog>,
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("store mutex poisoned")
    }

    pub fn customer(&self, id: &CustomerId) -> Option<CustomerRecord> {
        self.lock().customers.get(id).cloned()
    }

    /// Sum of every ledger delta for the customer, independent of the cached balance.
    pub fn ledger_sum(&self, id: &CustomerId) -> i64 {
        self.lock()
            .transactions
            .iter()
            .filter(|transaction| &transaction.customer_id == id)
            .map(|transaction| transaction.delta)
            .sum()
    }

    pub fn coupon_usages(&self) -> Vec<CouponUsage> {
        self.lock().usages.clone()
    }
}

fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

#[async_trait]
impl CustomerStore for InMemoryStore {
    async fn insert(&self, record: CustomerRecord) -> Result<CustomerRecord, RepositoryError> {
        let mut state = self.lock();
        if state.customers.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        state.customers.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn fetch(&self, id: &CustomerId) -> Result<Option<CustomerRecord>, RepositoryError> {
        Ok(self.lock().customers.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<CustomerRecord>, RepositoryError> {
        Ok(self.lock().customers.values().cloned().collect())
    }

    async fn update_segmentation(
        &self,
        id: &CustomerId,
        score: RfmScore,
        segment: Segment,
    ) -> Result<(), RepositoryError> {
        let mut state = self.lock();
        let record = state
            .customers
            .get_mut(id)
            .ok_or(RepositoryError::NotFound)?;
        record.rfm = Some(score);
        record.segment = Some(segment);
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for InMemoryStore {
    async fn append(&self, entry: NewPointTransaction) -> Result<LedgerReceipt, RepositoryError> {
        let mut state = self.lock();
        let available = state
            .customers
            .get(&entry.customer_id)
            .map(|record| record.points)
            .ok_or(RepositoryError::NotFound)?;

        let balance = available
            .checked_add(entry.delta)
            .ok_or(RepositoryError::OutOfRange)?;
        if entry.delta < 0 && balance < 0 {
            return Err(RepositoryError::InsufficientBalance { available });
        }

        state.last_transaction += 1;
        let transaction = entry.into_transaction(TransactionId(state.last_transaction));
        if let Some(record) = state.customers.get_mut(&transaction.customer_id) {
            record.points = balance;
        }
        state.transactions.push(transaction.clone());

        Ok(LedgerReceipt {
            transaction,
            balance,
        })
    }

    async fn balance(&self, customer_id: &CustomerId) -> Result<i64, RepositoryError> {
        self.lock()
            .customers
            .get(customer_id)
            .map(|record| record.points)
            .ok_or(RepositoryError::NotFound)
    }

    async fn page(
        &self,
        customer_id: &CustomerId,
        before: Option<TransactionId>,
        limit: usize,
    ) -> Result<Vec<PointTransaction>, RepositoryError> {
        let state = self.lock();
        if !state.customers.contains_key(customer_id) {
            return Err(RepositoryError::NotFound);
        }

        Ok(state
            .transactions
            .iter()
            .rev()
            .filter(|transaction| &transaction.customer_id == customer_id)
            .filter(|transaction| before.map_or(true, |cursor| transaction.id < cursor))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn totals(&self, customer_id: &CustomerId) -> Result<PointsTotals, RepositoryError> {
        let state = self.lock();
        if !state.customers.contains_key(customer_id) {
            return Err(RepositoryError::NotFound);
        }

        let mut totals = PointsTotals::default();
        state
            .transactions
            .iter()
            .filter(|transaction| &transaction.customer_id == customer_id)
            .for_each(|transaction| totals.record(transaction.delta));
        Ok(totals)
    }
}

#[async_trait]
impl CouponStore for InMemoryStore {
    async fn insert(&self, coupon: Coupon) -> Result<Coupon, RepositoryError> {
        let mut state = self.lock();
        let code = normalize_code(&coupon.code);
        if state.coupon_codes.contains_key(&code) || state.coupons.contains_key(&coupon.id) {
            return Err(RepositoryError::Conflict);
        }
        state.coupon_codes.insert(code, coupon.id.clone());
        state.coupons.insert(coupon.id.clone(), coupon.clone());
        Ok(coupon)
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Coupon>, RepositoryError> {
        let state = self.lock();
        Ok(state
            .coupon_codes
            .get(&normalize_code(code))
            .and_then(|id| state.coupons.get(id))
            .cloned())
    }

    async fn count_usage(
        &self,
        coupon_id: &CouponId,
        customer_id: &CustomerId,
    ) -> Result<u32, RepositoryError> {
        let state = self.lock();
        let count = state
            .usages
            .iter()
            .filter(|usage| &usage.coupon_id == coupon_id && &usage.customer_id == customer_id)
            .count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn record_redemption(&self, usage: CouponUsage) -> Result<u32, RepositoryError> {
        let mut state = self.lock();
        let used_by_customer = state
            .usages
            .iter()
            .filter(|row| row.coupon_id == usage.coupon_id && row.customer_id == usage.customer_id)
            .count();

        let coupon = state
            .coupons
            .get_mut(&usage.coupon_id)
            .ok_or(RepositoryError::NotFound)?;
        if coupon
            .usage_limit
            .is_some_and(|limit| coupon.usage_count >= limit)
        {
            return Err(RepositoryError::Conflict);
        }
        if coupon
            .per_customer_limit
            .is_some_and(|limit| used_by_customer >= limit as usize)
        {
            return Err(RepositoryError::Conflict);
        }

        coupon.usage_count += 1;
        let usage_count = coupon.usage_count;
        state.usages.push(usage);
        Ok(usage_count)
    }
}

#[async_trait]
impl CampaignStore for InMemoryStore {
    async fn insert_campaign(&self, campaign: Campaign) -> Result<Campaign, RepositoryError> {
        let mut state = self.lock();
        if state.campaigns.contains_key(&campaign.id) {
            return Err(RepositoryError::Conflict);
        }
        state.campaigns.insert(campaign.id.clone(), campaign.clone());
        Ok(campaign)
    }

    async fn fetch_campaign(&self, id: &CampaignId) -> Result<Option<Campaign>, RepositoryError> {
        Ok(self.lock().campaigns.get(id).cloned())
    }

    async fn increment_total_sent(
        &self,
        id: &CampaignId,
        by: u64,
    ) -> Result<u64, RepositoryError> {
        let mut state = self.lock();
        let campaign = state
            .campaigns
            .get_mut(id)
            .ok_or(RepositoryError::NotFound)?;
        campaign.total_sent += by;
        Ok(campaign.total_sent)
    }

    async fn append_log(&self, log: CampaignLog) -> Result<(), RepositoryError> {
        self.lock().logs.push(log);
        Ok(())
    }

    async fn logs(
        &self,
        campaign_id: Option<&CampaignId>,
    ) -> Result<Vec<CampaignLog>, RepositoryError> {
        Ok(self
            .lock()
            .logs
            .iter()
            .filter(|log| campaign_id.is_none() || log.campaign_id.as_ref() == campaign_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::engine::loyalty::TransactionKind;

    fn entry(customer: &str, delta: i64) -> NewPointTransaction {
        NewPointTransaction {
            customer_id: CustomerId::new(customer),
            delta,
            kind: TransactionKind::Adjustment,
            reference_id: None,
            description: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn refused_debits_leave_no_trace() {
        let store = InMemoryStore::new();
        CustomerStore::insert(&store, CustomerRecord::new("c-1", "Ploy"))
            .await
            .expect("insert");
        store.append(entry("c-1", 40)).await.expect("credit");

        let err = store.append(entry("c-1", -41)).await.expect_err("overdraw");
        assert_eq!(err, RepositoryError::InsufficientBalance { available: 40 });
        assert_eq!(store.balance(&CustomerId::new("c-1")).await.expect("balance"), 40);
        assert_eq!(store.ledger_sum(&CustomerId::new("c-1")), 40);
    }

    #[tokio::test]
    async fn credits_past_the_representable_balance_are_refused() {
        let store = InMemoryStore::new();
        CustomerStore::insert(&store, CustomerRecord::new("c-1", "Ploy"))
            .await
            .expect("insert");
        store.append(entry("c-1", 10)).await.expect("credit");

        let err = store
            .append(entry("c-1", i64::MAX))
            .await
            .expect_err("overflow");
        assert_eq!(err, RepositoryError::OutOfRange);
        assert_eq!(store.ledger_sum(&CustomerId::new("c-1")), 10);
    }

    #[tokio::test]
    async fn unknown_customers_cannot_earn() {
        let store = InMemoryStore::new();
        let err = store.append(entry("ghost", 5)).await.expect_err("missing");
        assert_eq!(err, RepositoryError::NotFound);
    }

    #[tokio::test]
    async fn pages_walk_backwards_from_the_cursor() {
        let store = InMemoryStore::new();
        CustomerStore::insert(&store, CustomerRecord::new("c-1", "Ploy"))
            .await
            .expect("insert");
        for delta in 1..=5 {
            store.append(entry("c-1", delta)).await.expect("credit");
        }

        let customer = CustomerId::new("c-1");
        let first = store.page(&customer, None, 2).await.expect("page");
        assert_eq!(
            first.iter().map(|t| t.delta).collect::<Vec<_>>(),
            vec![5, 4]
        );
        let second = store
            .page(&customer, Some(first[1].id), 2)
            .await
            .expect("page");
        assert_eq!(
            second.iter().map(|t| t.delta).collect::<Vec<_>>(),
            vec![3, 2]
        );
    }
}
