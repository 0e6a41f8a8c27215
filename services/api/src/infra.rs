use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use storefront_crm::clock::Clock;
use storefront_crm::config::{DispatchConfig, LoyaltyConfig};
use storefront_crm::engine::campaigns::{
    CampaignService, Channel, EmailGateway, GatewayError, MessagingGateway,
};
use storefront_crm::engine::coupons::CouponService;
use storefront_crm::engine::customers::SegmentationService;
use storefront_crm::engine::loyalty::LoyaltyLedger;
use storefront_crm::engine::memory::InMemoryStore;
use tracing::info;

use crate::throttle::RateLimiter;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) limiter: Arc<RateLimiter>,
    pub(crate) inbox: Arc<ContactInbox>,
}

/// Every engine service wired over one in-memory store and one outbox.
pub(crate) struct Engine {
    pub(crate) store: Arc<InMemoryStore>,
    pub(crate) outbox: Arc<Outbox>,
    pub(crate) segmentation: Arc<SegmentationService<InMemoryStore>>,
    pub(crate) ledger: Arc<LoyaltyLedger<InMemoryStore>>,
    pub(crate) coupons: Arc<CouponService<InMemoryStore>>,
    pub(crate) campaigns: Arc<CampaignService<InMemoryStore, InMemoryStore>>,
}

impl Engine {
    pub(crate) fn in_memory(
        clock: Arc<dyn Clock>,
        dispatch: DispatchConfig,
        loyalty: LoyaltyConfig,
    ) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let outbox = Arc::new(Outbox::default());

        Self {
            segmentation: Arc::new(
                SegmentationService::new(Arc::clone(&store), Arc::clone(&clock))
                    .with_concurrency(dispatch.concurrency),
            ),
            ledger: Arc::new(LoyaltyLedger::new(
                Arc::clone(&store),
                Arc::clone(&clock),
                loyalty,
            )),
            coupons: Arc::new(CouponService::new(Arc::clone(&store), Arc::clone(&clock))),
            campaigns: Arc::new(CampaignService::new(
                Arc::clone(&store),
                Arc::clone(&store),
                outbox.clone(),
                outbox.clone(),
                clock,
                dispatch,
            )),
            store,
            outbox,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Delivery {
    pub(crate) channel: Channel,
    pub(crate) address: String,
    pub(crate) subject: Option<String>,
    pub(crate) body: String,
}

/// Gateway that logs and keeps every message instead of contacting a provider.
#[derive(Debug, Default)]
pub(crate) struct Outbox {
    deliveries: Mutex<Vec<Delivery>>,
}

impl Outbox {
    pub(crate) fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().expect("outbox mutex poisoned").clone()
    }

    fn record(&self, delivery: Delivery) {
        info!(
            channel = delivery.channel.label(),
            address = %delivery.address,
            "message queued in outbox"
        );
        self.deliveries
            .lock()
            .expect("outbox mutex poisoned")
            .push(delivery);
    }
}

#[async_trait]
impl MessagingGateway for Outbox {
    async fn push(&self, identity: &str, text: &str) -> Result<(), GatewayError> {
        self.record(Delivery {
            channel: Channel::Line,
            address: identity.to_string(),
            subject: None,
            body: text.to_string(),
        });
        Ok(())
    }
}

#[async_trait]
impl EmailGateway for Outbox {
    async fn send(&self, address: &str, subject: &str, body: &str) -> Result<(), GatewayError> {
        self.record(Delivery {
            channel: Channel::Email,
            address: address.to_string(),
            subject: Some(subject.to_string()),
            body: body.to_string(),
        });
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ContactMessage {
    pub(crate) name: String,
    pub(crate) email: String,
    pub(crate) message: String,
}

/// Storefront contact form submissions awaiting staff follow-up.
#[derive(Debug, Default)]
pub(crate) struct ContactInbox {
    messages: Mutex<Vec<ContactMessage>>,
}

impl ContactInbox {
    pub(crate) fn deliver(&self, message: ContactMessage) -> usize {
        info!(from = %message.email, "contact message received");
        let mut guard = self.messages.lock().expect("inbox mutex poisoned");
        guard.push(message);
        guard.len()
    }

    #[cfg(test)]
    pub(crate) fn messages(&self) -> Vec<ContactMessage> {
        self.messages.lock().expect("inbox mutex poisoned").clone()
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
