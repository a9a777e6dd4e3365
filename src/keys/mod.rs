//! Partition key derivation.
//!
//! Key format, segments in this order, absent segments leave no trace:
//!
//! ```text
//! [<PARTITION_MODEL>::<partition_id>::][<MODEL>::<model_id>::]<EVENT_TYPE>
//! ```
//!
//! A model type is a field name with its `_id` suffix stripped and the rest
//! upper-cased: `list_id` becomes `LIST`.

use std::borrow::Cow;

use serde_json::Value;

use crate::event::EventData;

/// Suffix marking a payload field as a reference to another model.
pub const ID_SUFFIX: &str = "_id";

/// Separator between key segments.
pub const SEGMENT_SEPARATOR: &str = "::";

/// Model-type tag for a field name: strip `_id`, upper-case the rest.
///
/// Field names differing only in case map to one tag, so `todo_id` and
/// `Todo_id` with equal values derive the same key.
pub fn model_type_of(field: &str) -> String {
    field
        .strip_suffix(ID_SUFFIX)
        .unwrap_or(field)
        .to_uppercase()
}

/// True for field names that reference another model (`<model>_id`).
pub fn is_foreign_key(field: &str) -> bool {
    field.len() > ID_SUFFIX.len() && field.ends_with(ID_SUFFIX)
}

/// Render a payload value as a key segment id.
///
/// Strings are used verbatim, numbers and booleans by their JSON text.
/// `null`, arrays and objects identify nothing and yield `None`.
pub fn key_value(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::String(s) => Some(Cow::Borrowed(s.as_str())),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        Value::Bool(b) => Some(Cow::Owned(b.to_string())),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Inputs to [`build_key`].
///
/// A segment is emitted only when both its field and its id are present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyParams<'a> {
    pub event_type: &'a str,
    pub partition_field: Option<&'a str>,
    pub partition_id: Option<&'a str>,
    pub model_field: Option<&'a str>,
    pub model_id: Option<&'a str>,
}

impl<'a> KeyParams<'a> {
    pub fn new(event_type: &'a str) -> Self {
        Self {
            event_type,
            partition_field: None,
            partition_id: None,
            model_field: None,
            model_id: None,
        }
    }

    /// Scope to an enclosing partition (tenant, list, ...).
    pub fn partition(mut self, field: Option<&'a str>, id: Option<&'a str>) -> Self {
        self.partition_field = field;
        self.partition_id = id;
        self
    }

    /// Scope to one specific model instance.
    pub fn model(mut self, field: Option<&'a str>, id: Option<&'a str>) -> Self {
        self.model_field = field;
        self.model_id = id;
        self
    }
}

fn push_segment(key: &mut String, field: Option<&str>, id: Option<&str>) {
    if let (Some(field), Some(id)) = (field, id) {
        key.push_str(&model_type_of(field));
        key.push_str(SEGMENT_SEPARATOR);
        key.push_str(id);
        key.push_str(SEGMENT_SEPARATOR);
    }
}

/// Build the partition key for a combination of event type, enclosing
/// partition and specific model.
pub fn build_key(params: &KeyParams<'_>) -> String {
    let mut key = String::new();
    push_segment(&mut key, params.partition_field, params.partition_id);
    push_segment(&mut key, params.model_field, params.model_id);
    key.push_str(params.event_type);
    key
}

/// Every `(field, id)` pair in the payload whose field name ends in `_id`,
/// in payload order.
///
/// The enclosing partition field is included when present. Its model-scoped
/// key equals the partition-scoped identity key, and the expander writes it
/// once.
pub fn enumerate_foreign_keys(data: &EventData) -> Vec<(&str, Cow<'_, str>)> {
    data.iter()
        .filter(|(field, _)| is_foreign_key(field))
        .filter_map(|(field, value)| key_value(value).map(|id| (field.as_str(), id)))
        .collect()
}
