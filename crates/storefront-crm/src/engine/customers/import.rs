//! Bulk scoring of customer aggregates exported from the order system as CSV.

use std::io::Read;
use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::engine::rfm::{CustomerAggregate, RfmError, RfmScore, RfmScorer, Segment};

#[derive(Debug)]
pub enum ImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidRow { line: u64, source: RfmError },
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportError::Io(err) => write!(f, "failed to read aggregate export: {}", err),
            ImportError::Csv(err) => write!(f, "invalid aggregate CSV data: {}", err),
            ImportError::InvalidRow { line, source } => {
                write!(f, "row on line {} cannot be scored: {}", line, source)
            }
        }
    }
}

impl std::error::Error for ImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImportError::Io(err) => Some(err),
            ImportError::Csv(err) => Some(err),
            ImportError::InvalidRow { source, .. } => Some(source),
        }
    }
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

#[derive(Debug, Deserialize)]
struct AggregateRow {
    customer_id: String,
    #[serde(default)]
    name: String,
    days_since_last_purchase: i64,
    order_count: i64,
    total_spent: Decimal,
}

/// One scored line of the export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedCustomer {
    pub customer_id: String,
    pub name: String,
    pub score: RfmScore,
    pub segment: Segment,
}

pub struct AggregateImporter;

impl AggregateImporter {
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        scorer: &RfmScorer,
    ) -> Result<Vec<ClassifiedCustomer>, ImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, scorer)
    }

    /// Expects the header `customer_id,name,days_since_last_purchase,order_count,total_spent`.
    pub fn from_reader<R: Read>(
        reader: R,
        scorer: &RfmScorer,
    ) -> Result<Vec<ClassifiedCustomer>, ImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut classified = Vec::new();

        for result in csv_reader.deserialize::<AggregateRow>() {
            let row = result?;
            let line = classified.len() as u64 + 2;
            let aggregate = CustomerAggregate {
                days_since_last_purchase: row.days_since_last_purchase,
                order_count: row.order_count,
                total_spent: row.total_spent,
            };
            let score = scorer
                .score(&aggregate)
                .map_err(|source| ImportError::InvalidRow { line, source })?;

            classified.push(ClassifiedCustomer {
                customer_id: row.customer_id,
                name: row.name,
                score,
                segment: score.classify(),
            });
        }

        Ok(classified)
    }
}
