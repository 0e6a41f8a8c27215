//! Targeted campaigns: audience selection over the customer store and bounded-concurrency
//! dispatch through the messaging and email gateways.

pub mod audience;
pub mod dispatcher;
pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use audience::{days_until_birthday, AudienceSelector};
pub use dispatcher::{CampaignDispatcher, CancelFlag};
pub use domain::{
    AudiencePreview, Campaign, CampaignId, CampaignLog, CampaignRequest, CampaignTarget, Channel,
    ChannelCounts, DeliveryStatus, DispatchReport, MessageTemplate, Recipient,
};
pub use repository::{CampaignStore, EmailGateway, GatewayError, MessagingGateway};
pub use router::campaign_router;
pub use service::{CampaignError, CampaignService};
