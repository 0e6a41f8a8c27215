use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use super::domain::{
    CampaignId, CampaignLog, Channel, DeliveryStatus, DispatchReport, MessageTemplate, Recipient,
};
use super::repository::{CampaignStore, EmailGateway, MessagingGateway};
use super::service::CampaignError;
use crate::clock::Clock;
use crate::config::DispatchConfig;

const NO_CHANNEL: &str = "no delivery channel";

/// Flag shared with a running dispatch; once raised no further recipients are attempted.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Sends a rendered template to each recipient with a bounded number of sends in flight.
///
/// Every attempted recipient gets exactly one log row holding the final outcome. Delivery
/// failures are recorded and counted. A failing log write stops new recipients from being
/// picked up; sends already in flight still finish and attempt their row before the first
/// error is returned.
pub struct CampaignDispatcher<C> {
    store: Arc<C>,
    messaging: Arc<dyn MessagingGateway>,
    email: Arc<dyn EmailGateway>,
    clock: Arc<dyn Clock>,
    config: DispatchConfig,
}

impl<C> CampaignDispatcher<C>
where
    C: CampaignStore + 'static,
{
    pub fn new(
        store: Arc<C>,
        messaging: Arc<dyn MessagingGateway>,
        email: Arc<dyn EmailGateway>,
        clock: Arc<dyn Clock>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            store,
            messaging,
            email,
            clock,
            config,
        }
    }

    pub async fn dispatch(
        &self,
        recipients: Vec<Recipient>,
        template: &MessageTemplate,
        campaign_id: Option<&CampaignId>,
    ) -> Result<DispatchReport, CampaignError> {
        self.dispatch_until(recipients, template, campaign_id, &CancelFlag::new())
            .await
    }

    /// Like [`dispatch`](Self::dispatch), but stops picking up recipients once `cancel` is
    /// raised. Sends already in flight finish and are logged.
    pub async fn dispatch_until(
        &self,
        recipients: Vec<Recipient>,
        template: &MessageTemplate,
        campaign_id: Option<&CampaignId>,
        cancel: &CancelFlag,
    ) -> Result<DispatchReport, CampaignError> {
        let total = recipients.len();
        let initial = DispatchReport {
            total,
            ..DispatchReport::default()
        };

        let aborted = AtomicBool::new(false);
        let (mut report, failure) = stream::iter(recipients)
            .take_while(|_| {
                future::ready(!cancel.is_cancelled() && !aborted.load(Ordering::Acquire))
            })
            .map(|recipient| self.deliver(recipient, template, campaign_id))
            .buffer_unordered(self.config.concurrency.max(1))
            .fold((initial, None), |(mut report, mut failure), outcome| {
                match outcome {
                    Ok((channel, status)) => report.record(channel, status),
                    Err(err) => {
                        aborted.store(true, Ordering::Release);
                        failure.get_or_insert(err);
                    }
                }
                future::ready((report, failure))
            })
            .await;
        report.cancelled = report.attempted() < total;

        let counted = self.count_sent(campaign_id, report.sent).await;
        if let Some(err) = failure {
            warn!(
                campaign_id = campaign_id.map(|id| id.0.as_str()).unwrap_or("-"),
                total,
                sent = report.sent,
                error = %err,
                "campaign dispatch aborted after a log write failed"
            );
            return Err(err);
        }
        counted?;

        info!(
            campaign_id = campaign_id.map(|id| id.0.as_str()).unwrap_or("-"),
            total,
            sent = report.sent,
            failed = report.failed,
            skipped = report.skipped,
            line = report.channels.line,
            email = report.channels.email,
            cancelled = report.cancelled,
            "campaign dispatch finished"
        );
        Ok(report)
    }

    async fn count_sent(
        &self,
        campaign_id: Option<&CampaignId>,
        sent: usize,
    ) -> Result<(), CampaignError> {
        let Some(campaign_id) = campaign_id else {
            return Ok(());
        };
        if sent == 0 {
            return Ok(());
        }

        let sent = u64::try_from(sent).unwrap_or(u64::MAX);
        let total_sent = self.store.increment_total_sent(campaign_id, sent).await?;
        debug!(campaign_id = %campaign_id, total_sent, "campaign counter updated");
        Ok(())
    }

    /// Messaging push first, email as the fallback, otherwise skipped.
    async fn deliver(
        &self,
        recipient: Recipient,
        template: &MessageTemplate,
        campaign_id: Option<&CampaignId>,
    ) -> Result<(Channel, DeliveryStatus), CampaignError> {
        let message = template.render(&recipient);
        let mut push_failure = None;

        if let Some(identity) = recipient.line_user_id.as_deref() {
            match self.messaging.push(identity, &message).await {
                Ok(()) => {
                    return self
                        .log(
                            campaign_id,
                            &recipient,
                            Channel::Line,
                            DeliveryStatus::Sent,
                            message,
                            None,
                        )
                        .await;
                }
                Err(err) => {
                    warn!(customer_id = %recipient.customer_id, error = %err, "line push failed");
                    push_failure = Some(format!("line push failed: {err}"));
                }
            }
        }

        let Some(address) = recipient.email.as_deref() else {
            let (channel, status, error) = match push_failure {
                Some(error) => (Channel::Line, DeliveryStatus::Failed, error),
                None => (Channel::None, DeliveryStatus::Skipped, NO_CHANNEL.to_string()),
            };
            return self
                .log(campaign_id, &recipient, channel, status, message, Some(error))
                .await;
        };

        let subject = template
            .subject
            .as_deref()
            .unwrap_or(&self.config.email_subject);
        match self.email.send(address, subject, &message).await {
            Ok(()) => {
                self.log(
                    campaign_id,
                    &recipient,
                    Channel::Email,
                    DeliveryStatus::Sent,
                    message,
                    push_failure,
                )
                .await
            }
            Err(err) => {
                warn!(customer_id = %recipient.customer_id, error = %err, "email send failed");
                let error = match push_failure {
                    Some(push) => format!("{push}; email send failed: {err}"),
                    None => format!("email send failed: {err}"),
                };
                self.log(
                    campaign_id,
                    &recipient,
                    Channel::Email,
                    DeliveryStatus::Failed,
                    message,
                    Some(error),
                )
                .await
            }
        }
    }

    async fn log(
        &self,
        campaign_id: Option<&CampaignId>,
        recipient: &Recipient,
        channel: Channel,
        status: DeliveryStatus,
        message_content: String,
        error_message: Option<String>,
    ) -> Result<(Channel, DeliveryStatus), CampaignError> {
        let log = CampaignLog {
            campaign_id: campaign_id.cloned(),
            customer_id: recipient.customer_id.clone(),
            status,
            channel,
            message_content,
            error_message,
            created_at: self.clock.now(),
        };
        self.store.append_log(log).await?;
        debug!(
            customer_id = %recipient.customer_id,
            channel = channel.label(),
            status = status.label(),
            "dispatch attempt logged"
        );
        Ok((channel, status))
    }
}
