use std::collections::HashMap;
use std::sync::Arc;

use super::common::*;
use crate::engine::campaigns::{
    CampaignId, CampaignRequest, CampaignStore, CampaignTarget, CancelFlag, Channel,
    DeliveryStatus, MessageTemplate,
};
use crate::engine::customers::{CustomerId, CustomerRecord};
use crate::engine::memory::InMemoryStore;
use crate::engine::rfm::Segment;
use crate::engine::ErrorKind;

fn loyal_request(campaign: Option<&str>) -> CampaignRequest {
    CampaignRequest {
        target: CampaignTarget::Segment {
            segment: Segment::Loyal,
        },
        template: MessageTemplate::new("Hi {{name}}, you have {{points}} points"),
        campaign_id: campaign.map(CampaignId::new),
    }
}

fn line_customers(count: usize) -> Vec<CustomerRecord> {
    (0..count)
        .map(|index| {
            CustomerRecord::new(format!("c-{index:02}"), format!("Member {index}"))
                .with_line_user_id(format!("U-{index:02}"))
                .with_segment(Segment::Loyal)
        })
        .collect()
}

#[tokio::test]
async fn every_recipient_gets_one_log_row_with_the_final_outcome() {
    let store = store_with(loyal_customers()).await;
    let messenger = Arc::new(RecordingMessenger::failing(&["U-pim", "U-tong"]));
    let mailer = Arc::new(RecordingMailer::default());
    let campaigns = service(
        Arc::clone(&store),
        Arc::clone(&store),
        messenger.clone(),
        mailer.clone(),
        4,
    );

    let report = campaigns
        .run(&loyal_request(Some("cmp-loyal")))
        .await
        .expect("run");

    assert_eq!(report.total, 5);
    assert_eq!(report.sent, 3);
    assert_eq!(report.failed, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.channels.line, 1);
    assert_eq!(report.channels.email, 2);
    assert!(!report.cancelled);

    let logs = store
        .logs(Some(&CampaignId::new("cmp-loyal")))
        .await
        .expect("logs");
    assert_eq!(logs.len(), 5);
    let outcomes: HashMap<&str, (Channel, DeliveryStatus)> = logs
        .iter()
        .map(|log| (log.customer_id.as_str(), (log.channel, log.status)))
        .collect();
    assert_eq!(outcomes["c-line"], (Channel::Line, DeliveryStatus::Sent));
    assert_eq!(outcomes["c-mail"], (Channel::Email, DeliveryStatus::Sent));
    assert_eq!(outcomes["c-both"], (Channel::Email, DeliveryStatus::Sent));
    assert_eq!(outcomes["c-none"], (Channel::None, DeliveryStatus::Skipped));
    assert_eq!(outcomes["c-blocked"], (Channel::Line, DeliveryStatus::Failed));

    let fallback = logs
        .iter()
        .find(|log| log.customer_id == CustomerId::new("c-both"))
        .expect("fallback row");
    assert!(fallback
        .error_message
        .as_deref()
        .is_some_and(|message| message.starts_with("line push failed")));

    let campaign = store
        .fetch_campaign(&CampaignId::new("cmp-loyal"))
        .await
        .expect("fetch")
        .expect("campaign");
    assert_eq!(campaign.total_sent, 3);
}

#[tokio::test]
async fn placeholders_are_rendered_per_recipient() {
    let store = store_with(loyal_customers()).await;
    let messenger = Arc::new(RecordingMessenger::default());
    let mailer = Arc::new(RecordingMailer::default());
    let campaigns = service(
        Arc::clone(&store),
        Arc::clone(&store),
        messenger.clone(),
        mailer.clone(),
        2,
    );

    campaigns.run(&loyal_request(None)).await.expect("run");

    assert!(messenger
        .pushed()
        .contains(&("U-lek".to_string(), "Hi Lek, you have 0 points".to_string())));
    let mail = mailer.sent();
    assert_eq!(mail.len(), 1);
    assert_eq!(mail[0].address, "mai@example.com");
    assert_eq!(mail[0].subject, "News from the shop");
    assert_eq!(mail[0].body, "Hi Mai, you have 0 points");
}

#[tokio::test]
async fn email_only_recipients_never_touch_the_messaging_channel() {
    let store = store_with(vec![CustomerRecord::new("c-mail", "Mai")
        .with_email("mai@example.com")
        .with_segment(Segment::Loyal)])
    .await;
    let messenger = Arc::new(RecordingMessenger::default());
    let mailer = Arc::new(RecordingMailer::failing(&["mai@example.com"]));
    let campaigns = service(
        Arc::clone(&store),
        Arc::clone(&store),
        messenger.clone(),
        mailer,
        1,
    );

    let mut request = loyal_request(None);
    request.template = request.template.with_subject("Members only");
    let report = campaigns.run(&request).await.expect("run");

    assert_eq!(report.sent, 0);
    assert_eq!(report.failed, 1);
    let logs = store.logs(None).await.expect("logs");
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].channel, Channel::Email);
    assert_eq!(logs[0].status, DeliveryStatus::Failed);
    assert!(messenger.pushed().is_empty());
}

#[tokio::test]
async fn sends_stay_within_the_worker_limit() {
    let store = store_with(line_customers(12)).await;
    let messenger = Arc::new(RecordingMessenger::default());
    let campaigns = service(
        Arc::clone(&store),
        Arc::clone(&store),
        messenger.clone(),
        Arc::new(RecordingMailer::default()),
        3,
    );

    let report = campaigns.run(&loyal_request(None)).await.expect("run");

    assert_eq!(report.sent, 12);
    assert_eq!(messenger.pushed().len(), 12);
    assert!(messenger.peak() <= 3, "peak was {}", messenger.peak());
    assert!(messenger.peak() > 1, "sends never overlapped");
    assert_eq!(store.logs(None).await.expect("logs").len(), 12);
}

#[tokio::test]
async fn cancelled_runs_stop_picking_up_recipients() {
    let store = store_with(line_customers(3)).await;
    let flag = CancelFlag::new();
    let messenger = Arc::new(CancellingMessenger { flag: flag.clone() });
    let campaigns = service(
        Arc::clone(&store),
        Arc::clone(&store),
        messenger,
        Arc::new(RecordingMailer::default()),
        1,
    );

    let report = campaigns
        .run_until(&loyal_request(None), &flag)
        .await
        .expect("run");

    assert!(report.cancelled);
    assert_eq!(report.total, 3);
    assert_eq!(report.sent, 1);
    assert_eq!(store.logs(None).await.expect("logs").len(), 1);
}

#[tokio::test]
async fn log_write_failure_aborts_but_keeps_written_rows() {
    let customers = store_with(line_customers(5)).await;
    let logs = Arc::new(FlakyLogStore::new(InMemoryStore::new(), 2));
    let campaigns = service(
        Arc::clone(&logs),
        customers,
        Arc::new(RecordingMessenger::default()),
        Arc::new(RecordingMailer::default()),
        1,
    );

    let err = campaigns
        .run(&loyal_request(None))
        .await
        .expect_err("log store fails");

    assert_eq!(err.kind(), ErrorKind::Internal);
    assert_eq!(logs.inner.logs(None).await.expect("logs").len(), 2);
}

#[tokio::test]
async fn in_flight_sends_still_attempt_their_row_after_a_log_failure() {
    let customers = store_with(line_customers(8)).await;
    let logs = Arc::new(FlakyLogStore::new(InMemoryStore::new(), 0));
    let messenger = Arc::new(EagerMessenger::default());
    let campaigns = service(
        Arc::clone(&logs),
        customers,
        messenger.clone(),
        Arc::new(RecordingMailer::default()),
        4,
    );

    let err = campaigns
        .run(&loyal_request(None))
        .await
        .expect_err("log store fails");

    assert_eq!(err.kind(), ErrorKind::Internal);
    let pushed = messenger.pushed();
    assert!(!pushed.is_empty() && pushed.len() < 8);
    assert_eq!(logs.attempts(), pushed.len());
}

#[tokio::test]
async fn unknown_campaign_and_empty_template_are_rejected_up_front() {
    let store = store_with(loyal_customers()).await;
    let messenger = Arc::new(RecordingMessenger::default());
    let campaigns = service(
        Arc::clone(&store),
        Arc::clone(&store),
        messenger.clone(),
        Arc::new(RecordingMailer::default()),
        2,
    );

    let missing = campaigns
        .run(&loyal_request(Some("cmp-ghost")))
        .await
        .expect_err("unknown campaign");
    assert_eq!(missing.kind(), ErrorKind::NotFound);

    let mut blank = loyal_request(None);
    blank.template = MessageTemplate::new("   ");
    let invalid = campaigns.run(&blank).await.expect_err("empty body");
    assert_eq!(invalid.kind(), ErrorKind::InvalidInput);

    assert!(messenger.pushed().is_empty());
    assert!(store.logs(None).await.expect("logs").is_empty());
}
