use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::to_bytes;
use axum::response::Response;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::clock::FixedClock;
use crate::config::DispatchConfig;
use crate::engine::campaigns::{
    Campaign, CampaignId, CampaignLog, CampaignService, CampaignStore, CancelFlag, EmailGateway,
    GatewayError, MessagingGateway,
};
use crate::engine::customers::{CustomerId, CustomerRecord, CustomerStore};
use crate::engine::memory::InMemoryStore;
use crate::engine::rfm::{RfmScore, Segment};
use crate::engine::RepositoryError;

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 15, 3, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

/// Push recipient double; identities listed in `failing` are rejected.
#[derive(Debug, Default)]
pub(super) struct RecordingMessenger {
    failing: HashSet<String>,
    pushed: Mutex<Vec<(String, String)>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl RecordingMessenger {
    pub(super) fn failing(identities: &[&str]) -> Self {
        Self {
            failing: identities.iter().map(|id| id.to_string()).collect(),
            ..Self::default()
        }
    }

    pub(super) fn pushed(&self) -> Vec<(String, String)> {
        self.pushed.lock().expect("messenger mutex poisoned").clone()
    }

    /// Highest number of pushes observed in flight at once.
    pub(super) fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessagingGateway for RecordingMessenger {
    async fn push(&self, identity: &str, text: &str) -> Result<(), GatewayError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(current, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(identity) {
            return Err(GatewayError::Rejected(format!("{identity} blocked the account")));
        }
        self.pushed
            .lock()
            .expect("messenger mutex poisoned")
            .push((identity.to_string(), text.to_string()));
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct SentEmail {
    pub(super) address: String,
    pub(super) subject: String,
    pub(super) body: String,
}

#[derive(Debug, Default)]
pub(super) struct RecordingMailer {
    failing: HashSet<String>,
    sent: Mutex<Vec<SentEmail>>,
}

impl RecordingMailer {
    pub(super) fn failing(addresses: &[&str]) -> Self {
        Self {
            failing: addresses.iter().map(|address| address.to_string()).collect(),
            ..Self::default()
        }
    }

    pub(super) fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().expect("mailer mutex poisoned").clone()
    }
}

#[async_trait]
impl EmailGateway for RecordingMailer {
    async fn send(&self, address: &str, subject: &str, body: &str) -> Result<(), GatewayError> {
        if self.failing.contains(address) {
            return Err(GatewayError::Unavailable("smtp relay timed out".to_string()));
        }
        self.sent.lock().expect("mailer mutex poisoned").push(SentEmail {
            address: address.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

/// Records the push before handing control back, so the send counts as delivered even if
/// the run is torn down while it is suspended.
#[derive(Debug, Default)]
pub(super) struct EagerMessenger {
    pushed: Mutex<Vec<String>>,
}

impl EagerMessenger {
    pub(super) fn pushed(&self) -> Vec<String> {
        self.pushed.lock().expect("messenger mutex poisoned").clone()
    }
}

#[async_trait]
impl MessagingGateway for EagerMessenger {
    async fn push(&self, identity: &str, _text: &str) -> Result<(), GatewayError> {
        self.pushed
            .lock()
            .expect("messenger mutex poisoned")
            .push(identity.to_string());
        tokio::task::yield_now().await;
        Ok(())
    }
}

/// Raises the flag on the first push it sees.
#[derive(Debug)]
pub(super) struct CancellingMessenger {
    pub(super) flag: CancelFlag,
}

#[async_trait]
impl MessagingGateway for CancellingMessenger {
    async fn push(&self, _identity: &str, _text: &str) -> Result<(), GatewayError> {
        self.flag.cancel();
        Ok(())
    }
}

/// Five loyal customers covering every channel combination.
pub(super) fn loyal_customers() -> Vec<CustomerRecord> {
    vec![
        CustomerRecord::new("c-line", "Lek")
            .with_line_user_id("U-lek")
            .with_segment(Segment::Loyal),
        CustomerRecord::new("c-mail", "Mai")
            .with_email("mai@example.com")
            .with_segment(Segment::Loyal),
        CustomerRecord::new("c-both", "Pim")
            .with_line_user_id("U-pim")
            .with_email("pim@example.com")
            .with_segment(Segment::Loyal),
        CustomerRecord::new("c-none", "Noi").with_segment(Segment::Loyal),
        CustomerRecord::new("c-blocked", "Tong")
            .with_line_user_id("U-tong")
            .with_segment(Segment::Loyal),
    ]
}

/// Customers for audience selection as of [`now`].
pub(super) fn audience_customers() -> Vec<CustomerRecord> {
    vec![
        CustomerRecord::new("c-today", "Ann")
            .with_birthday(date(1990, 6, 15))
            .with_line_user_id("U-ann")
            .with_orders(3, Decimal::from(900), now() - Duration::days(100))
            .with_segment(Segment::AtRisk),
        CustomerRecord::new("c-soon", "Ben")
            .with_birthday(date(1985, 6, 20))
            .with_email("ben@example.com")
            .with_orders(8, Decimal::from(20_000), now() - Duration::days(30))
            .with_segment(Segment::Loyal),
        CustomerRecord::new("c-later", "Cat")
            .with_birthday(date(1992, 7, 30))
            .with_line_user_id("U-cat")
            .with_orders(1, Decimal::from(300), now() - Duration::days(90)),
        CustomerRecord::new("c-passed", "Dan")
            .with_birthday(date(1979, 6, 14))
            .with_line_user_id(" "),
        CustomerRecord::new("c-nobday", "Eve").with_email("eve@example.com"),
    ]
}

pub(super) async fn store_with(customers: Vec<CustomerRecord>) -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    for record in customers {
        CustomerStore::insert(store.as_ref(), record)
            .await
            .expect("seed customer");
    }
    store
        .insert_campaign(Campaign::new("cmp-loyal", "Loyal thank-you"))
        .await
        .expect("seed campaign");
    store
}

pub(super) fn dispatch_config(concurrency: usize) -> DispatchConfig {
    DispatchConfig {
        concurrency,
        ..DispatchConfig::default()
    }
}

pub(super) fn service<C, S>(
    campaigns: Arc<C>,
    customers: Arc<S>,
    messenger: Arc<dyn MessagingGateway>,
    mailer: Arc<dyn EmailGateway>,
    concurrency: usize,
) -> CampaignService<C, S>
where
    C: CampaignStore + 'static,
    S: CustomerStore + 'static,
{
    CampaignService::new(
        campaigns,
        customers,
        messenger,
        mailer,
        Arc::new(FixedClock::new(now())),
        dispatch_config(concurrency),
    )
}

pub(super) async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("json body")
}

/// Returns every customer twice.
pub(super) struct DuplicatingStore(pub(super) Vec<CustomerRecord>);

#[async_trait]
impl CustomerStore for DuplicatingStore {
    async fn insert(&self, record: CustomerRecord) -> Result<CustomerRecord, RepositoryError> {
        Ok(record)
    }

    async fn fetch(&self, id: &CustomerId) -> Result<Option<CustomerRecord>, RepositoryError> {
        Ok(self.0.iter().find(|record| &record.id == id).cloned())
    }

    async fn list(&self) -> Result<Vec<CustomerRecord>, RepositoryError> {
        Ok(self.0.iter().chain(self.0.iter()).cloned().collect())
    }

    async fn update_segmentation(
        &self,
        _id: &CustomerId,
        _score: RfmScore,
        _segment: Segment,
    ) -> Result<(), RepositoryError> {
        Ok(())
    }
}

/// Campaign store whose log writes start failing after `accepted` rows.
pub(super) struct FlakyLogStore {
    pub(super) inner: InMemoryStore,
    pub(super) accepted: usize,
    written: AtomicUsize,
}

impl FlakyLogStore {
    pub(super) fn new(inner: InMemoryStore, accepted: usize) -> Self {
        Self {
            inner,
            accepted,
            written: AtomicUsize::new(0),
        }
    }

    /// Log writes attempted so far, refused ones included.
    pub(super) fn attempts(&self) -> usize {
        self.written.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CampaignStore for FlakyLogStore {
    async fn insert_campaign(&self, campaign: Campaign) -> Result<Campaign, RepositoryError> {
        self.inner.insert_campaign(campaign).await
    }

    async fn fetch_campaign(&self, id: &CampaignId) -> Result<Option<Campaign>, RepositoryError> {
        self.inner.fetch_campaign(id).await
    }

    async fn increment_total_sent(
        &self,
        id: &CampaignId,
        by: u64,
    ) -> Result<u64, RepositoryError> {
        self.inner.increment_total_sent(id, by).await
    }

    async fn append_log(&self, log: CampaignLog) -> Result<(), RepositoryError> {
        if self.written.fetch_add(1, Ordering::SeqCst) >= self.accepted {
            return Err(RepositoryError::Unavailable("log table locked".to_string()));
        }
        self.inner.append_log(log).await
    }

    async fn logs(
        &self,
        campaign_id: Option<&CampaignId>,
    ) -> Result<Vec<CampaignLog>, RepositoryError> {
        self.inner.logs(campaign_id).await
    }
}
