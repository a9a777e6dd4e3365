//! In-memory table with DynamoDB semantics.
//!
//! Rows are ordered by `(pk, sk)`. A transaction is validated in full
//! before anything is written. A query page that reaches its limit always
//! carries a continuation key, even when no rows remain after it.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{validate_transaction, EventTable, Page, PageRequest, Result, StorageError, StoredRow};

type Rows = BTreeMap<(String, String), Value>;

/// In-memory [`EventTable`], with failure injection for tests.
#[derive(Default)]
pub struct MemoryTable {
    tables: RwLock<HashMap<String, Rows>>,
    fail_next_puts: RwLock<u32>,
    fail_on_query: RwLock<bool>,
    put_attempts: RwLock<u32>,
    query_calls: RwLock<u32>,
}

impl MemoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` puts fail with a transient error.
    pub async fn fail_next_puts(&self, count: u32) {
        *self.fail_next_puts.write().await = count;
    }

    pub async fn set_fail_on_query(&self, fail: bool) {
        *self.fail_on_query.write().await = fail;
    }

    /// Puts attempted so far, including failed ones.
    pub async fn put_attempts(&self) -> u32 {
        *self.put_attempts.read().await
    }

    /// Page queries issued so far.
    pub async fn query_calls(&self) -> u32 {
        *self.query_calls.read().await
    }

    /// Every row in `table`, ordered by `(pk, sk)`.
    pub async fn rows(&self, table: &str) -> Vec<StoredRow> {
        self.tables
            .read()
            .await
            .get(table)
            .map(|rows| {
                rows.iter()
                    .map(|((pk, sk), event)| StoredRow {
                        pk: pk.clone(),
                        sk: sk.clone(),
                        event: event.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl EventTable for MemoryTable {
    async fn transact_put(&self, table: &str, rows: &[StoredRow]) -> Result<()> {
        *self.put_attempts.write().await += 1;

        {
            let mut remaining = self.fail_next_puts.write().await;
            if *remaining > 0 {
                *remaining -= 1;
                return Err(StorageError::Transaction(
                    "injected transaction failure".to_string(),
                ));
            }
        }

        validate_transaction(rows)?;

        let mut tables = self.tables.write().await;
        let stored = tables.entry(table.to_string()).or_default();
        for row in rows {
            stored.insert((row.pk.clone(), row.sk.clone()), row.event.clone());
        }
        Ok(())
    }

    async fn query_page(&self, table: &str, request: PageRequest<'_>) -> Result<Page> {
        *self.query_calls.write().await += 1;

        if *self.fail_on_query.read().await {
            return Err(StorageError::Query("injected query failure".to_string()));
        }
        if request.limit == 0 {
            return Err(StorageError::Query("limit must be at least 1".to_string()));
        }

        let tables = self.tables.read().await;
        let Some(rows) = tables.get(table) else {
            return Ok(Page::default());
        };

        let pk = request.partition_key.to_string();
        let lower = match (&request.start_key, request.after) {
            (Some(start), _) => Bound::Excluded((pk.clone(), start.sk.clone())),
            (None, Some(after)) => Bound::Excluded((pk.clone(), after.to_string())),
            (None, None) => Bound::Included((pk.clone(), String::new())),
        };

        let limit = request.limit as usize;
        let page: Vec<StoredRow> = rows
            .range((lower, Bound::Unbounded))
            .take_while(|((row_pk, _), _)| row_pk.as_str() == pk.as_str())
            .filter(|((_, sk), _)| request.after.map_or(true, |after| sk.as_str() > after))
            .take(limit)
            .map(|((pk, sk), event)| StoredRow {
                pk: pk.clone(),
                sk: sk.clone(),
                event: event.clone(),
            })
            .collect();

        let continuation = if page.len() == limit {
            page.last().map(StoredRow::key)
        } else {
            None
        };

        Ok(Page {
            rows: page,
            continuation,
        })
    }
}

impl std::fmt::Debug for MemoryTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTable").finish_non_exhaustive()
    }
}
