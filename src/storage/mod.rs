//! Storage: the key-value table primitives and the adapter built on them.
//!
//! ## Table layout
//! - `pk`: partition key, built by [`crate::keys::build_key`] (String)
//! - `sk`: sort key, the event id (String)
//! - `event`: the full event envelope `{id, type, timestamp, data}` (Map)
//!
//! The underlying store must provide exactly two primitives, modelled by
//! [`EventTable`]: an all-or-nothing multi-row put, and an ascending range
//! query within one partition with an exclusive lower bound, a page limit
//! and a continuation key.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::config::{StorageConfig, StorageType};
use crate::event::{EventError, EventType};
use crate::projection::StoreEntry;

mod adapter;
pub mod memory;

#[cfg(feature = "dynamo")]
pub mod dynamo;

pub use adapter::StoreAdapter;
pub use memory::MemoryTable;

#[cfg(feature = "dynamo")]
pub use dynamo::DynamoTable;

/// Most rows one atomic put may carry (the DynamoDB transaction limit).
pub const MAX_TRANSACT_ITEMS: usize = 100;

/// Storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Transaction failed: {0}")]
    Transaction(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error(
        "Failed to write events after {attempts} attempts: {source}\n{}",
        describe_rows(.entries)
    )]
    WriteExhausted {
        attempts: u32,
        /// Every row of the failed write, for replay.
        entries: Vec<StoredRow>,
        source: Box<StorageError>,
    },

    #[error("Invalid item: {0}")]
    InvalidItem(String),

    #[error("Invalid event: {0}")]
    InvalidEvent(#[from] EventError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unknown storage type: {0}")]
    UnknownBackend(String),
}

impl StorageError {
    /// Whether a failed atomic put may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StorageError::Transaction(_))
    }
}

/// Reject what a DynamoDB transaction would reject, before writing anything.
pub(crate) fn validate_transaction(rows: &[StoredRow]) -> Result<()> {
    if rows.is_empty() {
        return Err(StorageError::InvalidRequest(
            "transaction must contain at least one item".to_string(),
        ));
    }
    if rows.len() > MAX_TRANSACT_ITEMS {
        return Err(StorageError::InvalidRequest(format!(
            "transaction holds {} items, limit is {}",
            rows.len(),
            MAX_TRANSACT_ITEMS
        )));
    }
    let mut seen = HashSet::with_capacity(rows.len());
    for row in rows {
        if !seen.insert((row.pk.as_str(), row.sk.as_str())) {
            return Err(StorageError::InvalidRequest(format!(
                "transaction includes multiple operations on one item: pk={} sk={}",
                row.pk, row.sk
            )));
        }
    }
    Ok(())
}

fn describe_rows(rows: &[StoredRow]) -> String {
    rows.iter()
        .map(|row| format!("  pk={} sk={} event={}", row.pk, row.sk, row.event))
        .collect::<Vec<_>>()
        .join("\n")
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// One row as the table sees it: keys plus an opaque event document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRow {
    pub pk: String,
    pub sk: String,
    pub event: Value,
}

impl StoredRow {
    pub fn from_entry<T: EventType>(entry: &StoreEntry<T>) -> Result<Self> {
        Ok(Self {
            pk: entry.partition_key.clone(),
            sk: entry.sort_key.clone(),
            event: serde_json::to_value(&entry.event)?,
        })
    }

    pub fn into_entry<T: EventType>(self) -> Result<StoreEntry<T>> {
        Ok(StoreEntry {
            partition_key: self.pk,
            sort_key: self.sk,
            event: serde_json::from_value(self.event)?,
        })
    }

    pub fn key(&self) -> ContinuationKey {
        ContinuationKey {
            pk: self.pk.clone(),
            sk: self.sk.clone(),
        }
    }
}

/// Where the previous page stopped. Treat as opaque.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContinuationKey {
    pub pk: String,
    pub sk: String,
}

/// One range query page request.
#[derive(Debug, Clone)]
pub struct PageRequest<'a> {
    pub partition_key: &'a str,
    /// Exclusive lower bound on the sort key.
    pub after: Option<&'a str>,
    pub limit: u32,
    pub start_key: Option<ContinuationKey>,
}

/// Rows ascending by sort key, plus a continuation key when the store
/// stopped at the limit.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub rows: Vec<StoredRow>,
    pub continuation: Option<ContinuationKey>,
}

/// The two store primitives the engine relies on.
#[async_trait]
pub trait EventTable: Send + Sync {
    /// Write every row or none of them.
    async fn transact_put(&self, table: &str, rows: &[StoredRow]) -> Result<()>;

    /// Rows in one partition with `sk > after`, ascending, at most `limit`.
    async fn query_page(&self, table: &str, request: PageRequest<'_>) -> Result<Page>;
}

#[async_trait]
impl<S: EventTable + ?Sized> EventTable for Arc<S> {
    async fn transact_put(&self, table: &str, rows: &[StoredRow]) -> Result<()> {
        (**self).transact_put(table, rows).await
    }

    async fn query_page(&self, table: &str, request: PageRequest<'_>) -> Result<Page> {
        (**self).query_page(table, request).await
    }
}

/// Build the configured table backend.
pub async fn init_table(config: &StorageConfig) -> Result<Arc<dyn EventTable>> {
    info!(storage_type = ?config.storage_type, table = %config.table_name, "Initializing storage");

    match config.storage_type {
        StorageType::Memory => Ok(Arc::new(MemoryTable::new())),
        #[cfg(feature = "dynamo")]
        StorageType::Dynamo => Ok(Arc::new(DynamoTable::connect(&config.dynamo).await)),
        #[cfg(not(feature = "dynamo"))]
        StorageType::Dynamo => {
            tracing::error!("DynamoDB storage requested but 'dynamo' feature is not enabled");
            Err(StorageError::UnknownBackend("dynamo".to_string()))
        }
    }
}
