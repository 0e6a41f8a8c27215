use async_trait::async_trait;

use super::domain::{Campaign, CampaignId, CampaignLog};
use crate::engine::RepositoryError;

/// Persistence for campaigns and their append-only dispatch log.
#[async_trait]
pub trait CampaignStore: Send + Sync {
    async fn insert_campaign(&self, campaign: Campaign) -> Result<Campaign, RepositoryError>;

    async fn fetch_campaign(&self, id: &CampaignId) -> Result<Option<Campaign>, RepositoryError>;

    /// Atomically adds `by` to the campaign's cumulative `total_sent`, returning the new value.
    async fn increment_total_sent(
        &self,
        id: &CampaignId,
        by: u64,
    ) -> Result<u64, RepositoryError>;

    async fn append_log(&self, log: CampaignLog) -> Result<(), RepositoryError>;

    /// Logs in append order; `None` returns every row.
    async fn logs(
        &self,
        campaign_id: Option<&CampaignId>,
    ) -> Result<Vec<CampaignLog>, RepositoryError>;
}

/// Push delivery over the messaging platform.
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    async fn push(&self, identity: &str, text: &str) -> Result<(), GatewayError>;
}

#[async_trait]
pub trait EmailGateway: Send + Sync {
    async fn send(&self, address: &str, subject: &str, body: &str) -> Result<(), GatewayError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("delivery rejected: {0}")]
    Rejected(String),
    #[error("delivery service unavailable: {0}")]
    Unavailable(String),
}
