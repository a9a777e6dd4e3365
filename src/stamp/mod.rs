//! Event stamping: identity and creation time.
//!
//! Ids are UUIDv7 strings built by the `uuid` crate from the injected
//! instant, rendered lower-case and hyphenated. The rendering is fixed width,
//! so string order equals numeric order equals time order at millisecond
//! resolution.
//!
//! [`TimeSeededIds`] uses a fresh [`ContextV7`] for every id and gives no
//! ordering guarantee within one millisecond. [`MonotonicIds`] shares one
//! context, whose counter keeps ids from one instance strictly increasing
//! within a millisecond and across a clock that steps backwards. Batch
//! stamping uses a single monotonic instance.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::{ContextV7, Timestamp, Uuid};

use crate::event::{Event, EventDraft, EventType};

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at one instant. For tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Produces sortable unique ids seeded from an instant.
pub trait IdGenerator: Send {
    fn next_id(&mut self, at: DateTime<Utc>) -> String;
}

/// Builds a fresh generator for each stamping call.
pub type IdGeneratorFactory = Arc<dyn Fn() -> Box<dyn IdGenerator> + Send + Sync>;

/// v7 id for `at` under `context`. Instants before the epoch clamp to zero.
fn v7_id(context: &ContextV7, at: DateTime<Utc>) -> String {
    let (secs, nanos) = match u64::try_from(at.timestamp()) {
        Ok(secs) => (secs, at.timestamp_subsec_nanos()),
        Err(_) => (0, 0),
    };
    Uuid::new_v7(Timestamp::from_unix(context, secs, nanos))
        .hyphenated()
        .to_string()
}

/// Fresh context for every id.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeSeededIds;

impl IdGenerator for TimeSeededIds {
    fn next_id(&mut self, at: DateTime<Utc>) -> String {
        v7_id(&ContextV7::new(), at)
    }
}

/// Strictly increasing ids for the lifetime of one instance.
pub struct MonotonicIds {
    context: ContextV7,
}

impl MonotonicIds {
    pub fn new() -> Self {
        Self {
            context: ContextV7::new(),
        }
    }
}

impl Default for MonotonicIds {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MonotonicIds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonotonicIds").finish_non_exhaustive()
    }
}

impl IdGenerator for MonotonicIds {
    fn next_id(&mut self, at: DateTime<Utc>) -> String {
        v7_id(&self.context, at)
    }
}

/// Render an instant the way every event timestamp is stored.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Stamp one draft at `at` with an id drawn from `ids`.
pub fn with_time_and_id<T: EventType>(
    draft: EventDraft<T>,
    at: DateTime<Utc>,
    ids: &mut dyn IdGenerator,
) -> Event<T> {
    let id = ids.next_id(at);
    Event::stamped(draft, id, format_timestamp(at))
}

/// Stamp a batch with one shared timestamp and ids from one generator.
///
/// With a [`MonotonicIds`] generator the ids sort in input order.
pub fn sequential_stamp_and_id<T: EventType>(
    drafts: Vec<EventDraft<T>>,
    clock: &dyn Clock,
    ids: &mut dyn IdGenerator,
) -> Vec<Event<T>> {
    let at = clock.now();
    drafts
        .into_iter()
        .map(|draft| with_time_and_id(draft, at, &mut *ids))
        .collect()
}

/// Stamping with injected clock and id generators.
#[derive(Clone)]
pub struct Stamper {
    clock: Arc<dyn Clock>,
    single_ids: IdGeneratorFactory,
    batch_ids: IdGeneratorFactory,
}

impl Default for Stamper {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl std::fmt::Debug for Stamper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stamper").finish_non_exhaustive()
    }
}

impl Stamper {
    /// Time-seeded ids for single events, monotonic ids for batches.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            single_ids: Arc::new(|| Box::new(TimeSeededIds) as Box<dyn IdGenerator>),
            batch_ids: Arc::new(|| Box::new(MonotonicIds::new()) as Box<dyn IdGenerator>),
        }
    }

    /// Use `factory` for both single and batch stamping.
    pub fn with_ids(mut self, factory: IdGeneratorFactory) -> Self {
        self.single_ids = factory.clone();
        self.batch_ids = factory;
        self
    }

    pub fn stamp<T: EventType>(&self, draft: EventDraft<T>) -> Event<T> {
        let mut ids = (self.single_ids)();
        with_time_and_id(draft, self.clock.now(), ids.as_mut())
    }

    pub fn stamp_batch<T: EventType>(&self, drafts: Vec<EventDraft<T>>) -> Vec<Event<T>> {
        let mut ids = (self.batch_ids)();
        sequential_stamp_and_id(drafts, self.clock.as_ref(), ids.as_mut())
    }
}
