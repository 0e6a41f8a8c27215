use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Ascending thresholds for the three RFM dimensions.
///
/// Recency is inverse (fewer days is better) and a value sitting exactly on a threshold
/// belongs to the better band. Frequency and monetary are direct and evaluated from the top
/// threshold down.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBands {
    pub recency_days: [u64; 4],
    pub frequency_orders: [u64; 4],
    pub monetary_spend: [Decimal; 4],
}

impl Default for ScoreBands {
    fn default() -> Self {
        Self {
            recency_days: [30, 60, 90, 180],
            frequency_orders: [2, 3, 5, 10],
            monetary_spend: [
                Decimal::from(5_000),
                Decimal::from(10_000),
                Decimal::from(20_000),
                Decimal::from(50_000),
            ],
        }
    }
}

impl ScoreBands {
    pub fn recency(&self, days_since_last_purchase: u64) -> u8 {
        inverse_band(&days_since_last_purchase, &self.recency_days)
    }

    pub fn frequency(&self, order_count: u64) -> u8 {
        direct_band(&order_count, &self.frequency_orders)
    }

    pub fn monetary(&self, total_spent: Decimal) -> u8 {
        direct_band(&total_spent, &self.monetary_spend)
    }
}

fn inverse_band<T: PartialOrd>(value: &T, thresholds: &[T; 4]) -> u8 {
    thresholds
        .iter()
        .position(|threshold| value <= threshold)
        .map(|index| 5 - index as u8)
        .unwrap_or(1)
}

fn direct_band<T: PartialOrd>(value: &T, thresholds: &[T; 4]) -> u8 {
    thresholds
        .iter()
        .rposition(|threshold| value >= threshold)
        .map(|index| index as u8 + 2)
        .unwrap_or(1)
}
