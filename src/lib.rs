//! Keyfan - fan-out event indexing over a key-value store
//!
//! Every event is written once under its identity key and once more under
//! a model-scoped key for each foreign identifier in its payload, in a
//! single atomic transaction. Reads are range queries on one derived key,
//! optionally merged across event types into one chronological stream.

pub mod client;
pub mod config;
pub mod event;
pub mod keys;
pub mod projection;
pub mod stamp;
pub mod storage;
pub mod stream;
pub mod utils;

pub use client::EventClient;
pub use config::Config;
pub use event::{Event, EventData, EventDraft, EventError, EventType};
pub use keys::{build_key, KeyParams};
pub use projection::{expand, StoreEntry};
pub use stamp::{sequential_stamp_and_id, with_time_and_id, Stamper};
pub use storage::{EventTable, StorageError, StoreAdapter};
pub use stream::{get_event_stream, Scope};
