//! Event client: the caller-facing facade over stamping, fan-out and storage.
//!
//! One client binds one table, one optional enclosing-partition field and
//! one closed set of event types `T`.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::{Config, RetryConfig};
use crate::event::{Event, EventDraft, EventType};
use crate::projection::expand;
use crate::stamp::Stamper;
use crate::storage::{init_table, EventTable, Result, StoreAdapter};
use crate::stream::{self, Scope};

/// Saves and reads events of type set `T` through store `S`.
pub struct EventClient<T, S> {
    adapter: StoreAdapter<S>,
    partition_field: Option<String>,
    stamper: Stamper,
    _types: PhantomData<fn() -> T>,
}

impl<T, S> std::fmt::Debug for EventClient<T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventClient")
            .field("partition_field", &self.partition_field)
            .finish_non_exhaustive()
    }
}

impl<T: EventType> EventClient<T, Arc<dyn EventTable>> {
    /// Build the configured store and a client over it.
    pub async fn connect(config: &Config) -> Result<Self> {
        let table = init_table(&config.storage).await?;
        Ok(Self::from_config(table, config))
    }
}

impl<T: EventType, S: EventTable> EventClient<T, S> {
    pub fn new(table: S, table_name: impl Into<String>) -> Self {
        Self {
            adapter: StoreAdapter::new(table, table_name),
            partition_field: None,
            stamper: Stamper::default(),
            _types: PhantomData,
        }
    }

    /// Client over `table` with table name, partition field, retry policy
    /// and page size taken from `config`.
    pub fn from_config(table: S, config: &Config) -> Self {
        let mut client = Self::new(table, config.storage.table_name.clone())
            .with_retry(config.retry.clone())
            .with_page_size(config.query.page_size);
        client.partition_field = config.events.partition_field.clone();
        client
    }

    /// Scope identity keys by the value of `field` in each payload.
    pub fn with_partition_field(mut self, field: impl Into<String>) -> Self {
        self.partition_field = Some(field.into());
        self
    }

    pub fn with_stamper(mut self, stamper: Stamper) -> Self {
        self.stamper = stamper;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.adapter = self.adapter.with_retry(retry);
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.adapter = self.adapter.with_page_size(page_size);
        self
    }

    pub fn partition_field(&self) -> Option<&str> {
        self.partition_field.as_deref()
    }

    pub fn adapter(&self) -> &StoreAdapter<S> {
        &self.adapter
    }

    /// Stamp `draft`, fan it out, and write every row atomically.
    pub async fn save_event(&self, draft: EventDraft<T>) -> Result<Event<T>> {
        let event = self.stamper.stamp(draft);
        self.write(&event).await?;
        Ok(event)
    }

    /// Stamp and save an adjacently tagged domain event.
    pub async fn save_domain_event<E: Serialize>(&self, domain_event: &E) -> Result<Event<T>> {
        let draft = EventDraft::from_domain(domain_event)?;
        self.save_event(draft).await
    }

    /// Stamp a batch with one timestamp and ascending ids, then save each
    /// event in input order.
    ///
    /// Each event's rows are written atomically; the batch as a whole is
    /// not. On failure the events before the failing one stay written.
    pub async fn save_events(&self, drafts: Vec<EventDraft<T>>) -> Result<Vec<Event<T>>> {
        let events = self.stamper.stamp_batch(drafts);
        for event in &events {
            self.write(event).await?;
        }
        info!(events = events.len(), "Saved event batch");
        Ok(events)
    }

    async fn write(&self, event: &Event<T>) -> Result<()> {
        let entries = expand(event, self.partition_field());
        self.adapter.save_atomic(&entries).await?;
        debug!(
            id = %event.id(),
            event_type = %event.event_type().as_str(),
            rows = entries.len(),
            "Saved event"
        );
        Ok(())
    }

    /// The first event of `event_type` under `scope` after its cursor.
    ///
    /// Despite the name this is the OLDEST matching event, since rows are
    /// read in ascending id order. Use [`get_latest_events`] and take the
    /// last element for the most recent one.
    ///
    /// [`get_latest_events`]: Self::get_latest_events
    pub async fn get_latest_event(&self, event_type: &T, scope: &Scope) -> Result<Option<Event<T>>> {
        let key = scope.key_for(event_type.as_str(), self.partition_field());
        let entry = self
            .adapter
            .query_one::<T>(&key, scope.after.as_deref())
            .await?;
        Ok(entry.map(|entry| entry.event))
    }

    /// Every event of `event_type` under `scope`, ascending by id.
    pub async fn get_latest_events(&self, event_type: &T, scope: &Scope) -> Result<Vec<Event<T>>> {
        let key = scope.key_for(event_type.as_str(), self.partition_field());
        let entries = self
            .adapter
            .query_all::<T>(&key, scope.after.as_deref())
            .await?;
        Ok(entries.into_iter().map(|entry| entry.event).collect())
    }

    /// Events of several types under one scope, merged chronologically.
    pub async fn get_event_stream(&self, event_types: &[T], scope: &Scope) -> Result<Vec<Event<T>>> {
        stream::get_event_stream(&self.adapter, self.partition_field(), event_types, scope).await
    }
}
