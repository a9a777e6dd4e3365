//! Store adapter: atomic fan-out writes with bounded retry, and range reads.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backon::Retryable;
use tracing::{debug, error, warn};

use super::{EventTable, PageRequest, Result, StorageError, StoredRow};
use crate::config::{RetryConfig, DEFAULT_PAGE_SIZE};
use crate::event::EventType;
use crate::projection::StoreEntry;
use crate::utils::retry::{is_retryable_write, write_backoff};

/// Bridges the engine to one table of an [`EventTable`] store.
#[derive(Debug, Clone)]
pub struct StoreAdapter<S> {
    table: S,
    table_name: String,
    retry: RetryConfig,
    page_size: u32,
}

impl<S: EventTable> StoreAdapter<S> {
    pub fn new(table: S, table_name: impl Into<String>) -> Self {
        Self {
            table,
            table_name: table_name.into(),
            retry: RetryConfig::default(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Rows requested per page by [`query_all`](Self::query_all). Clamped to 1.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn table(&self) -> &S {
        &self.table
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Write every entry of one logical event in a single transaction.
    ///
    /// Transient failures are retried with exponential backoff. Once the
    /// attempt budget is spent the call fails with
    /// [`StorageError::WriteExhausted`], which carries every row for replay.
    /// Non-retryable errors surface unchanged after the first attempt.
    pub async fn save_atomic<T: EventType>(&self, entries: &[StoreEntry<T>]) -> Result<()> {
        let rows = entries
            .iter()
            .map(StoredRow::from_entry)
            .collect::<Result<Vec<_>>>()?;

        let attempts = AtomicU32::new(0);
        let (counter, batch) = (&attempts, rows.as_slice());
        let result = (|| async move {
            counter.fetch_add(1, Ordering::SeqCst);
            self.table.transact_put(&self.table_name, batch).await
        })
        .retry(write_backoff(&self.retry))
        .when(is_retryable_write)
        .notify(|err: &StorageError, dur: Duration| {
            warn!(
                table = %self.table_name,
                attempt = attempts.load(Ordering::SeqCst),
                error = %err,
                delay = ?dur,
                "Atomic write failed, retrying"
            );
        })
        .await;

        let attempts = attempts.into_inner();
        match result {
            Ok(()) => {
                debug!(table = %self.table_name, rows = rows.len(), attempts, "Wrote event rows");
                Ok(())
            }
            Err(err) if err.is_retryable() => {
                error!(
                    table = %self.table_name,
                    rows = rows.len(),
                    attempts,
                    error = %err,
                    "Atomic write exhausted retries"
                );
                Err(StorageError::WriteExhausted {
                    attempts,
                    entries: rows,
                    source: Box::new(err),
                })
            }
            Err(err) => Err(err),
        }
    }

    /// First entry in `partition_key` whose sort key is greater than `after`.
    ///
    /// Rows come back ascending, so this is the OLDEST qualifying entry, not
    /// the most recent one.
    pub async fn query_one<T: EventType>(
        &self,
        partition_key: &str,
        after: Option<&str>,
    ) -> Result<Option<StoreEntry<T>>> {
        let page = self
            .table
            .query_page(
                &self.table_name,
                PageRequest {
                    partition_key,
                    after,
                    limit: 1,
                    start_key: None,
                },
            )
            .await?;

        debug!(table = %self.table_name, pk = %partition_key, found = !page.rows.is_empty(), "Queried one");
        page.rows.into_iter().next().map(StoredRow::into_entry).transpose()
    }

    /// Every entry in `partition_key` after `after`, ascending by sort key.
    ///
    /// Follows continuation keys page by page until the store reports none.
    pub async fn query_all<T: EventType>(
        &self,
        partition_key: &str,
        after: Option<&str>,
    ) -> Result<Vec<StoreEntry<T>>> {
        let mut entries = Vec::new();
        let mut start_key = None;
        let mut pages = 0u32;

        loop {
            let page = self
                .table
                .query_page(
                    &self.table_name,
                    PageRequest {
                        partition_key,
                        after,
                        limit: self.page_size,
                        start_key: start_key.take(),
                    },
                )
                .await?;
            pages += 1;

            for row in page.rows {
                entries.push(row.into_entry()?);
            }

            match page.continuation {
                Some(next) => start_key = Some(next),
                None => break,
            }
        }

        debug!(table = %self.table_name, pk = %partition_key, rows = entries.len(), pages, "Queried all");
        Ok(entries)
    }
}
