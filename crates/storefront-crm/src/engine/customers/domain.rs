use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::engine::rfm::{CustomerAggregate, RfmScore, Segment};

/// Recency reported for customers without any completed order.
pub const NEVER_PURCHASED_DAYS: i64 = i64::MAX;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(pub String);

impl CustomerId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The slice of the customer entity the engine reads and writes.
///
/// `points` is a cache of the ledger sum and is only ever moved by the ledger store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub id: CustomerId,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub line_user_id: Option<String>,
    #[serde(default)]
    pub birthday: Option<NaiveDate>,
    #[serde(default)]
    pub last_order_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub order_count: u32,
    #[serde(default)]
    pub total_spent: Decimal,
    #[serde(default)]
    pub points: i64,
    #[serde(default)]
    pub rfm: Option<RfmScore>,
    #[serde(default)]
    pub segment: Option<Segment>,
}

impl CustomerRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: CustomerId::new(id),
            name: name.into(),
            email: None,
            line_user_id: None,
            birthday: None,
            last_order_at: None,
            order_count: 0,
            total_spent: Decimal::ZERO,
            points: 0,
            rfm: None,
            segment: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_line_user_id(mut self, line_user_id: impl Into<String>) -> Self {
        self.line_user_id = Some(line_user_id.into());
        self
    }

    pub fn with_birthday(mut self, birthday: NaiveDate) -> Self {
        self.birthday = Some(birthday);
        self
    }

    pub fn with_orders(
        mut self,
        order_count: u32,
        total_spent: Decimal,
        last_order_at: DateTime<Utc>,
    ) -> Self {
        self.order_count = order_count;
        self.total_spent = total_spent;
        self.last_order_at = Some(last_order_at);
        self
    }

    pub fn with_segment(mut self, segment: Segment) -> Self {
        self.segment = Some(segment);
        self
    }

    /// Purchase aggregate as of `today`; orders stamped in the future count as today.
    pub fn aggregate(&self, today: NaiveDate) -> CustomerAggregate {
        let days_since_last_purchase = self
            .last_order_at
            .map(|at| (today - at.date_naive()).num_days().max(0))
            .unwrap_or(NEVER_PURCHASED_DAYS);

        CustomerAggregate {
            days_since_last_purchase,
            order_count: i64::from(self.order_count),
            total_spent: self.total_spent,
        }
    }
}
