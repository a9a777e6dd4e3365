//! Stream merging: one chronological log across several event types.

use futures::future::try_join_all;
use tracing::debug;

use crate::event::{Event, EventType};
use crate::keys::{build_key, KeyParams};
use crate::storage::{EventTable, Result, StoreAdapter};

/// Key parameters shared by every event type of one stream or lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    /// Value of the enclosing partition field.
    pub partition_id: Option<String>,
    /// Foreign-identifier field name, e.g. `todo_id`.
    pub model_field: Option<String>,
    pub model_id: Option<String>,
    /// Exclusive lower bound on event ids.
    pub after: Option<String>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn partition(mut self, partition_id: impl Into<String>) -> Self {
        self.partition_id = Some(partition_id.into());
        self
    }

    pub fn model(mut self, field: impl Into<String>, id: impl Into<String>) -> Self {
        self.model_field = Some(field.into());
        self.model_id = Some(id.into());
        self
    }

    pub fn after(mut self, cursor: impl Into<String>) -> Self {
        self.after = Some(cursor.into());
        self
    }

    /// Partition key for `event_type` under this scope.
    ///
    /// Model-scoped rows are written without the partition segment, so a
    /// complete model scope takes precedence and the partition id is ignored.
    pub fn key_for(&self, event_type: &str, partition_field: Option<&str>) -> String {
        let params = KeyParams::new(event_type);
        let params = match (self.model_field.as_deref(), self.model_id.as_deref()) {
            (Some(field), Some(id)) => params.model(Some(field), Some(id)),
            _ => params.partition(partition_field, self.partition_id.as_deref()),
        };
        build_key(&params)
    }
}

/// Read every requested type under `scope` and merge into one log.
///
/// Per-type queries run concurrently. The first failure aborts the whole
/// call and nothing is merged.
pub async fn get_event_stream<T, S>(
    adapter: &StoreAdapter<S>,
    partition_field: Option<&str>,
    event_types: &[T],
    scope: &Scope,
) -> Result<Vec<Event<T>>>
where
    T: EventType,
    S: EventTable,
{
    let keys: Vec<String> = event_types
        .iter()
        .map(|event_type| scope.key_for(event_type.as_str(), partition_field))
        .collect();

    let per_type = try_join_all(
        keys.iter()
            .map(|key| adapter.query_all::<T>(key, scope.after.as_deref())),
    )
    .await?;

    let streams = per_type
        .into_iter()
        .map(|entries| entries.into_iter().map(|entry| entry.event).collect())
        .collect();
    let merged = merge_streams(streams);

    debug!(types = event_types.len(), events = merged.len(), "Merged event stream");
    Ok(merged)
}

/// Flatten per-type logs and sort by timestamp, ties broken by id.
pub fn merge_streams<T>(streams: Vec<Vec<Event<T>>>) -> Vec<Event<T>>
where
    T: EventType,
{
    let mut merged: Vec<Event<T>> = streams.into_iter().flatten().collect();
    merged.sort_by(|a, b| {
        a.timestamp()
            .cmp(b.timestamp())
            .then_with(|| a.id().cmp(b.id()))
    });
    merged
}
