use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Datelike, Duration, NaiveDate};
use tracing::debug;

use super::domain::{CampaignTarget, Recipient};
use super::service::CampaignError;
use crate::clock::Clock;
use crate::engine::customers::{CustomerRecord, CustomerStore};

/// Days from `today` to the next occurrence of `birthday`, zero when it is today.
/// A 29 February birthday falls on 28 February in common years.
pub fn days_until_birthday(birthday: NaiveDate, today: NaiveDate) -> Option<u32> {
    let this_year = anniversary(birthday, today.year())?;
    let next = if this_year >= today {
        this_year
    } else {
        anniversary(birthday, today.year() + 1)?
    };
    u32::try_from((next - today).num_days()).ok()
}

fn anniversary(birthday: NaiveDate, year: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, birthday.month(), birthday.day())
        .or_else(|| NaiveDate::from_ymd_opt(year, 2, 28))
}

/// Computes campaign audiences from the customer store.
pub struct AudienceSelector<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S> AudienceSelector<S>
where
    S: CustomerStore + 'static,
{
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Deduplicated recipients for `target`; birthday audiences are sorted by `days_until`.
    pub async fn select(&self, target: &CampaignTarget) -> Result<Vec<Recipient>, CampaignError> {
        let customers = self.store.list().await?;
        let mut seen = HashSet::new();
        let unique = customers
            .into_iter()
            .filter(|record| seen.insert(record.id.clone()));

        let recipients = match *target {
            CampaignTarget::Birthday { days_ahead } => {
                let today = self.clock.today();
                let mut upcoming: Vec<Recipient> = unique
                    .filter_map(|record| {
                        let days_until = days_until_birthday(record.birthday?, today)?;
                        (days_until <= days_ahead).then(|| Recipient {
                            days_until: Some(days_until),
                            ..Recipient::from_record(&record)
                        })
                    })
                    .collect();
                upcoming.sort_by(|a, b| {
                    a.days_until
                        .cmp(&b.days_until)
                        .then_with(|| a.customer_id.cmp(&b.customer_id))
                });
                upcoming
            }
            CampaignTarget::Reengagement { inactivity_days } => {
                let cutoff = self.clock.now() - Duration::days(i64::from(inactivity_days));
                unique
                    .filter(|record| record.last_order_at.map_or(true, |at| at < cutoff))
                    .map(|record| Recipient::from_record(&record))
                    .collect()
            }
            CampaignTarget::Segment { segment } => unique
                .filter(|record| record.segment == Some(segment))
                .map(|record| Recipient::from_record(&record))
                .collect(),
            CampaignTarget::TestAll => unique
                .filter(has_messaging_identity)
                .map(|record| Recipient::from_record(&record))
                .collect(),
        };

        debug!(
            target = target.label(),
            recipients = recipients.len(),
            "audience selected"
        );
        Ok(recipients)
    }
}

fn has_messaging_identity(record: &CustomerRecord) -> bool {
    record
        .line_user_id
        .as_deref()
        .is_some_and(|identity| !identity.trim().is_empty())
}
