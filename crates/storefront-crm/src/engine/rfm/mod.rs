//! Recency-Frequency-Monetary scoring and lifecycle segment classification.

mod bands;
mod cascade;
pub mod router;

pub use bands::ScoreBands;
pub use cascade::{classify, classify_with_rule, SegmentRule, SEGMENT_RULES};
pub use router::rfm_router;

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ErrorKind;

/// Raw purchase behaviour as reported by the order history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerAggregate {
    pub days_since_last_purchase: i64,
    pub order_count: i64,
    pub total_spent: Decimal,
}

/// Three independent scores, each in `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RfmScore {
    pub recency: u8,
    pub frequency: u8,
    pub monetary: u8,
}

impl RfmScore {
    pub fn new(recency: u8, frequency: u8, monetary: u8) -> Result<Self, RfmError> {
        for (dimension, value) in [
            ("recency", recency),
            ("frequency", frequency),
            ("monetary", monetary),
        ] {
            if !(1..=5).contains(&value) {
                return Err(RfmError::InvalidInput(format!(
                    "{dimension} score {value} outside 1..=5"
                )));
            }
        }

        Ok(Self {
            recency,
            frequency,
            monetary,
        })
    }

    pub fn classify(&self) -> Segment {
        classify(self)
    }
}

impl fmt::Display for RfmScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}F{}M{}", self.recency, self.frequency, self.monetary)
    }
}

/// Named lifecycle bucket derived from an [`RfmScore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    Champion,
    Loyal,
    NewCustomer,
    Promising,
    AtRisk,
    CantLose,
    Hibernating,
    Others,
}

impl Segment {
    pub const fn ordered() -> [Self; 8] {
        [
            Self::Champion,
            Self::Loyal,
            Self::NewCustomer,
            Self::Promising,
            Self::AtRisk,
            Self::CantLose,
            Self::Hibernating,
            Self::Others,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Champion => "Champion",
            Self::Loyal => "Loyal",
            Self::NewCustomer => "New Customer",
            Self::Promising => "Promising",
            Self::AtRisk => "At Risk",
            Self::CantLose => "Can't Lose",
            Self::Hibernating => "Hibernating",
            Self::Others => "Others",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RfmError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl RfmError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidInput
    }
}

/// Maps validated aggregates onto the configured bands.
#[derive(Debug, Clone, Default)]
pub struct RfmScorer {
    bands: ScoreBands,
}

impl RfmScorer {
    pub fn new(bands: ScoreBands) -> Self {
        Self { bands }
    }

    pub fn bands(&self) -> &ScoreBands {
        &self.bands
    }

    pub fn score(&self, aggregate: &CustomerAggregate) -> Result<RfmScore, RfmError> {
        let days = non_negative("days_since_last_purchase", aggregate.days_since_last_purchase)?;
        let orders = non_negative("order_count", aggregate.order_count)?;
        if aggregate.total_spent < Decimal::ZERO {
            return Err(RfmError::InvalidInput(format!(
                "total_spent {} must not be negative",
                aggregate.total_spent
            )));
        }

        Ok(RfmScore {
            recency: self.bands.recency(days),
            frequency: self.bands.frequency(orders),
            monetary: self.bands.monetary(aggregate.total_spent),
        })
    }
}

fn non_negative(field: &str, value: i64) -> Result<u64, RfmError> {
    u64::try_from(value)
        .map_err(|_| RfmError::InvalidInput(format!("{field} {value} must not be negative")))
}

/// Scores an aggregate with the standard bands.
pub fn score_customer(aggregate: &CustomerAggregate) -> Result<RfmScore, RfmError> {
    RfmScorer::default().score(aggregate)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aggregate(days: i64, orders: i64, spent: i64) -> CustomerAggregate {
        CustomerAggregate {
            days_since_last_purchase: days,
            order_count: orders,
            total_spent: Decimal::from(spent),
        }
    }

    #[test]
    fn scores_a_regular_customer() {
        let score = score_customer(&aggregate(12, 6, 21_500)).expect("valid input");
        assert_eq!(score, RfmScore::new(5, 4, 4).expect("in range"));
        assert_eq!(score.classify(), Segment::Champion);
        assert_eq!(score.to_string(), "R5F4M4");
    }

    #[test]
    fn rejects_negative_inputs() {
        for input in [
            aggregate(-1, 0, 0),
            aggregate(0, -3, 0),
            aggregate(0, 0, -10),
        ] {
            let err = score_customer(&input).expect_err("negative input rejected");
            assert_eq!(err.kind(), ErrorKind::InvalidInput);
        }
    }

    #[test]
    fn rejects_out_of_range_triplets() {
        assert!(RfmScore::new(0, 3, 3).is_err());
        assert!(RfmScore::new(3, 6, 3).is_err());
        assert!(RfmScore::new(1, 1, 1).is_ok());
    }
}
