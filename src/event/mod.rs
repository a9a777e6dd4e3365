//! Event envelope types.
//!
//! An [`Event`] is the unit of truth: an immutable record with a sortable
//! `id`, a `type` tag, a creation `timestamp` and an opaque `data` payload.
//! Callers build [`EventDraft`]s (no id, no timestamp) and hand them to the
//! stamper, which assigns both exactly once.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque event payload. Field order is the insertion order.
pub type EventData = Map<String, Value>;

/// Errors converting between envelopes and domain event types.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("Domain event must serialize to an object with `type` and `data`, got: {0}")]
    NotAnEnvelope(String),

    #[error("Domain event payload must be an object, got: {0}")]
    PayloadNotObject(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A tag from a closed, caller-defined set of event types.
///
/// The string form is used verbatim as the trailing segment of every
/// partition key, so it must be stable.
pub trait EventType:
    Clone + std::fmt::Debug + Send + Sync + Serialize + DeserializeOwned + 'static
{
    fn as_str(&self) -> &str;
}

impl EventType for String {
    fn as_str(&self) -> &str {
        self
    }
}

/// Declares a closed enum of event type tags.
///
/// The calling crate needs `serde` (with `derive`) as a dependency.
///
/// ```
/// keyfan::event_types! {
///     pub enum TodoEventType {
///         Created => "TODO_CREATED",
///         Deleted => "TODO_DELETED",
///     }
/// }
///
/// use keyfan::event::EventType;
/// assert_eq!(TodoEventType::Created.as_str(), "TODO_CREATED");
/// ```
#[macro_export]
macro_rules! event_types {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($variant:ident => $tag:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, ::serde::Serialize, ::serde::Deserialize,
        )]
        $vis enum $name {
            $(
                #[serde(rename = $tag)]
                $variant,
            )+
        }

        impl $crate::event::EventType for $name {
            fn as_str(&self) -> &str {
                match self {
                    $(Self::$variant => $tag,)+
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str($crate::event::EventType::as_str(self))
            }
        }
    };
}

/// A caller-supplied event before stamping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDraft<T> {
    #[serde(rename = "type")]
    pub event_type: T,
    #[serde(default)]
    pub data: EventData,
}

impl<T: EventType> EventDraft<T> {
    pub fn new(event_type: T, data: EventData) -> Self {
        Self { event_type, data }
    }

    /// Build a draft from an adjacently tagged domain enum
    /// (`#[serde(tag = "type", content = "data")]`).
    pub fn from_domain<E: Serialize>(domain_event: &E) -> Result<Self, EventError> {
        let mut envelope = match serde_json::to_value(domain_event)? {
            Value::Object(envelope) => envelope,
            other => return Err(EventError::NotAnEnvelope(other.to_string())),
        };
        let tag = match envelope.remove("type") {
            Some(tag) => tag,
            None => {
                return Err(EventError::NotAnEnvelope(
                    Value::Object(envelope).to_string(),
                ))
            }
        };
        let event_type: T = serde_json::from_value(tag)?;
        let data = match envelope.remove("data") {
            Some(Value::Object(data)) => data,
            None | Some(Value::Null) => Map::new(),
            Some(other) => return Err(EventError::PayloadNotObject(other.to_string())),
        };
        Ok(Self { event_type, data })
    }
}

/// A stamped, immutable event.
///
/// Fields are private so `id` and `timestamp` cannot be changed after
/// stamping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event<T> {
    id: String,
    #[serde(rename = "type")]
    event_type: T,
    timestamp: String,
    #[serde(default)]
    data: EventData,
}

impl<T: EventType> Event<T> {
    pub(crate) fn stamped(draft: EventDraft<T>, id: String, timestamp: String) -> Self {
        Self {
            id,
            event_type: draft.event_type,
            timestamp,
            data: draft.data,
        }
    }

    /// Sortable unique identifier. Also the sort key of every stored row.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn event_type(&self) -> &T {
        &self.event_type
    }

    /// Creation instant, RFC 3339 with millisecond precision.
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn data(&self) -> &EventData {
        &self.data
    }

    /// Look up a payload field.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }

    /// Decode into an adjacently tagged domain enum.
    pub fn to_domain<E: DeserializeOwned>(&self) -> Result<E, EventError> {
        let mut envelope = Map::new();
        envelope.insert("type".to_string(), serde_json::to_value(&self.event_type)?);
        envelope.insert("data".to_string(), Value::Object(self.data.clone()));
        Ok(serde_json::from_value(Value::Object(envelope))?)
    }
}
