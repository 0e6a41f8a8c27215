use std::sync::Arc;

use tracing::info;

use super::audience::AudienceSelector;
use super::dispatcher::{CampaignDispatcher, CancelFlag};
use super::domain::{AudiencePreview, CampaignId, CampaignRequest, CampaignTarget, DispatchReport};
use super::repository::{CampaignStore, EmailGateway, MessagingGateway};
use crate::clock::Clock;
use crate::config::DispatchConfig;
use crate::engine::customers::CustomerStore;
use crate::engine::{ErrorKind, RepositoryError};

/// Audience selection followed by dispatch, driven by an administrator or a scheduled trigger.
pub struct CampaignService<C, S> {
    campaigns: Arc<C>,
    selector: AudienceSelector<S>,
    dispatcher: CampaignDispatcher<C>,
}

impl<C, S> CampaignService<C, S>
where
    C: CampaignStore + 'static,
    S: CustomerStore + 'static,
{
    pub fn new(
        campaigns: Arc<C>,
        customers: Arc<S>,
        messaging: Arc<dyn MessagingGateway>,
        email: Arc<dyn EmailGateway>,
        clock: Arc<dyn Clock>,
        config: DispatchConfig,
    ) -> Self {
        let selector = AudienceSelector::new(customers, Arc::clone(&clock));
        let dispatcher =
            CampaignDispatcher::new(Arc::clone(&campaigns), messaging, email, clock, config);
        Self {
            campaigns,
            selector,
            dispatcher,
        }
    }

    pub async fn preview(&self, target: &CampaignTarget) -> Result<AudiencePreview, CampaignError> {
        let recipients = self.selector.select(target).await?;
        Ok(AudiencePreview {
            target: *target,
            total: recipients.len(),
            recipients,
        })
    }

    pub async fn run(&self, request: &CampaignRequest) -> Result<DispatchReport, CampaignError> {
        self.run_until(request, &CancelFlag::new()).await
    }

    pub async fn run_until(
        &self,
        request: &CampaignRequest,
        cancel: &CancelFlag,
    ) -> Result<DispatchReport, CampaignError> {
        if request.template.body.trim().is_empty() {
            return Err(CampaignError::InvalidInput(
                "message template body is required".to_string(),
            ));
        }
        if let Some(campaign_id) = &request.campaign_id {
            self.campaigns
                .fetch_campaign(campaign_id)
                .await?
                .ok_or_else(|| CampaignError::NotFound(campaign_id.clone()))?;
        }

        let recipients = self.selector.select(&request.target).await?;
        info!(
            target = request.target.label(),
            recipients = recipients.len(),
            "campaign run started"
        );

        self.dispatcher
            .dispatch_until(
                recipients,
                &request.template,
                request.campaign_id.as_ref(),
                cancel,
            )
            .await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CampaignError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("campaign {0} not found")]
    NotFound(CampaignId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl CampaignError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::NotFound(_) | Self::Repository(RepositoryError::NotFound) => ErrorKind::NotFound,
            Self::Repository(_) => ErrorKind::Internal,
        }
    }
}
