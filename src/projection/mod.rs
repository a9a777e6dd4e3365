//! Fan-out indexing: one event, many physical rows.
//!
//! Every stamped event is written once under its identity key and once more
//! under a model-scoped key for each `_id` field in its payload. All rows
//! carry the full event and share the event id as sort key.
//!
//! Only the identity key carries the enclosing partition. Model-scoped keys
//! are global, so an event is reachable from any of its foreign ids alone.
//! A key derived twice is written once: the partition field's own model key
//! equals the identity key, and `todo_id` next to `Todo_id` names one model.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::event::{Event, EventType};
use crate::keys::{build_key, enumerate_foreign_keys, key_value, KeyParams};

/// One physical row: a denormalized copy of an event under a derived key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreEntry<T> {
    #[serde(rename = "pk")]
    pub partition_key: String,
    #[serde(rename = "sk")]
    pub sort_key: String,
    pub event: Event<T>,
}

/// Expand a stamped event into its full row set.
///
/// The identity row comes first, followed by one row per distinct
/// foreign-key key in payload order. When `partition_field` is set, the
/// identity key is scoped by the value of that field in the payload
/// (omitted if the field is absent).
pub fn expand<T: EventType>(event: &Event<T>, partition_field: Option<&str>) -> Vec<StoreEntry<T>> {
    let event_type = event.event_type().as_str();
    let partition_id = partition_field
        .and_then(|field| event.field(field))
        .and_then(key_value);
    let partition_id = partition_id.as_deref();

    let row = |partition_key: String| StoreEntry {
        partition_key,
        sort_key: event.id().to_string(),
        event: event.clone(),
    };

    let identity = build_key(&KeyParams::new(event_type).partition(partition_field, partition_id));
    let mut seen = HashSet::from([identity.clone()]);
    let mut entries = vec![row(identity)];

    for (model_field, model_id) in enumerate_foreign_keys(event.data()) {
        let key = build_key(&KeyParams::new(event_type).model(Some(model_field), Some(&*model_id)));
        if seen.insert(key.clone()) {
            entries.push(row(key));
        }
    }

    entries
}
