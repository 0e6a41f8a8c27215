use std::collections::VecDeque;

use futures::stream::{self, BoxStream, StreamExt};

use super::domain::{PointTransaction, TransactionId};
use super::ledger::LedgerError;
use super::repository::LedgerStore;
use crate::engine::customers::CustomerId;

pub(crate) const HISTORY_PAGE_SIZE: usize = 50;

/// Lazily paged view over a customer's transactions, newest first.
///
/// Nothing is read until the stream is polled, at most `limit` rows are produced, and every
/// call to [`TransactionHistory::stream`] starts again from the newest row.
pub struct TransactionHistory<'a, S> {
    store: &'a S,
    customer_id: CustomerId,
    limit: usize,
    page_size: usize,
}

struct Cursor {
    buffered: VecDeque<PointTransaction>,
    before: Option<TransactionId>,
    remaining: usize,
    exhausted: bool,
}

impl<'a, S> TransactionHistory<'a, S>
where
    S: LedgerStore,
{
    pub(crate) fn new(store: &'a S, customer_id: CustomerId, limit: usize) -> Self {
        Self {
            store,
            customer_id,
            limit,
            page_size: HISTORY_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn customer_id(&self) -> &CustomerId {
        &self.customer_id
    }

    pub fn stream(&self) -> BoxStream<'_, Result<PointTransaction, LedgerError>> {
        let start = Cursor {
            buffered: VecDeque::new(),
            before: None,
            remaining: self.limit,
            exhausted: false,
        };

        stream::unfold(Some(start), move |state| async move {
            let mut cursor = state?;
            if cursor.remaining == 0 {
                return None;
            }

            if cursor.buffered.is_empty() && !cursor.exhausted {
                let wanted = cursor.remaining.min(self.page_size);
                match self
                    .store
                    .page(&self.customer_id, cursor.before, wanted)
                    .await
                {
                    Ok(page) => {
                        cursor.exhausted = page.len() < wanted;
                        cursor.before = page.last().map(|row| row.id);
                        cursor.buffered.extend(page);
                    }
                    Err(err) => {
                        let err = LedgerError::from_repository(err, &self.customer_id, 0);
                        return Some((Err(err), None));
                    }
                }
            }

            let next = cursor.buffered.pop_front()?;
            cursor.remaining -= 1;
            Some((Ok(next), Some(cursor)))
        })
        .boxed()
    }

    /// Drains one pass of the stream into memory.
    pub async fn collect(&self) -> Result<Vec<PointTransaction>, LedgerError> {
        let mut rows = Vec::with_capacity(self.limit.min(self.page_size));
        let mut stream = self.stream();
        while let Some(row) = stream.next().await {
            rows.push(row?);
        }
        Ok(rows)
    }
}
