use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::customers::{CustomerId, CustomerRecord};
use crate::engine::rfm::Segment;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CampaignId(pub String);

impl CampaignId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

impl fmt::Display for CampaignId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub name: String,
    #[serde(default)]
    pub total_sent: u64,
}

impl Campaign {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: CampaignId::new(id),
            name: name.into(),
            total_sent: 0,
        }
    }
}

/// Predicate over the customer population. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CampaignTarget {
    Birthday { days_ahead: u32 },
    Reengagement { inactivity_days: u32 },
    Segment { segment: Segment },
    /// Every customer with a messaging identity; used to verify a template end to end.
    TestAll,
}

impl CampaignTarget {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Birthday { .. } => "birthday",
            Self::Reengagement { .. } => "reengagement",
            Self::Segment { .. } => "segment",
            Self::TestAll => "test_all",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Line,
    Email,
    None,
}

impl Channel {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Line => "line",
            Self::Email => "email",
            Self::None => "none",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Sent,
    Failed,
    Skipped,
}

impl DeliveryStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

/// One member of a computed audience.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub customer_id: CustomerId,
    pub name: String,
    pub points: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Days until the next birthday; only set by birthday targeting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_until: Option<u32>,
}

impl Recipient {
    pub fn from_record(record: &CustomerRecord) -> Self {
        Self {
            customer_id: record.id.clone(),
            name: record.name.clone(),
            points: record.points,
            line_user_id: non_blank(record.line_user_id.as_deref()),
            email: non_blank(record.email.as_deref()),
            days_until: None,
        }
    }

    pub fn preferred_channel(&self) -> Channel {
        if self.line_user_id.is_some() {
            Channel::Line
        } else if self.email.is_some() {
            Channel::Email
        } else {
            Channel::None
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Message body with `{{name}}` and `{{points}}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageTemplate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub body: String,
}

impl MessageTemplate {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            subject: None,
            body: body.into(),
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn render(&self, recipient: &Recipient) -> String {
        self.body
            .replace("{{name}}", &recipient.name)
            .replace("{{points}}", &recipient.points.to_string())
    }
}

/// One row per recipient per run; append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignLog {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<CampaignId>,
    pub customer_id: CustomerId,
    pub status: DeliveryStatus,
    pub channel: Channel,
    pub message_content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelCounts {
    pub line: usize,
    pub email: usize,
}

/// Aggregate outcome of a dispatch run. `channels` counts successful sends only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReport {
    pub sent: usize,
    pub failed: usize,
    pub skipped: usize,
    pub total: usize,
    pub channels: ChannelCounts,
    #[serde(default)]
    pub cancelled: bool,
}

impl DispatchReport {
    pub(crate) fn record(&mut self, channel: Channel, status: DeliveryStatus) {
        match status {
            DeliveryStatus::Sent => {
                self.sent += 1;
                match channel {
                    Channel::Line => self.channels.line += 1,
                    Channel::Email => self.channels.email += 1,
                    Channel::None => {}
                }
            }
            DeliveryStatus::Failed => self.failed += 1,
            DeliveryStatus::Skipped => self.skipped += 1,
        }
    }

    /// Recipients that received a log row in this run.
    pub fn attempted(&self) -> usize {
        self.sent + self.failed + self.skipped
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignRequest {
    pub target: CampaignTarget,
    pub template: MessageTemplate,
    #[serde(default)]
    pub campaign_id: Option<CampaignId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudiencePreview {
    pub target: CampaignTarget,
    pub total: usize,
    pub recipients: Vec<Recipient>,
}
