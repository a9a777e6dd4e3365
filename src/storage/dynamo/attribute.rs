//! JSON <-> DynamoDB attribute conversion for event documents.

use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;
use serde_json::{Map, Number, Value};

use crate::storage::{ContinuationKey, Result, StorageError, StoredRow};

pub(super) const PK: &str = "pk";
pub(super) const SK: &str = "sk";
pub(super) const EVENT: &str = "event";

pub(super) type Item = HashMap<String, AttributeValue>;

pub(super) fn to_attribute(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s.clone()),
        Value::Array(items) => AttributeValue::L(items.iter().map(to_attribute).collect()),
        Value::Object(map) => AttributeValue::M(
            map.iter()
                .map(|(k, v)| (k.clone(), to_attribute(v)))
                .collect(),
        ),
    }
}

pub(super) fn from_attribute(attribute: &AttributeValue) -> Result<Value> {
    match attribute {
        AttributeValue::Null(_) => Ok(Value::Null),
        AttributeValue::Bool(b) => Ok(Value::Bool(*b)),
        AttributeValue::N(n) => parse_number(n).map(Value::Number),
        AttributeValue::S(s) => Ok(Value::String(s.clone())),
        AttributeValue::L(items) => items
            .iter()
            .map(from_attribute)
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        AttributeValue::M(map) => from_map(map).map(Value::Object),
        other => Err(StorageError::InvalidItem(format!(
            "unsupported attribute type: {:?}",
            other
        ))),
    }
}

fn from_map(map: &Item) -> Result<Map<String, Value>> {
    // HashMap iteration order is arbitrary; sort so decoding is stable.
    let mut keys: Vec<_> = map.keys().collect();
    keys.sort();
    keys.into_iter()
        .map(|k| Ok((k.clone(), from_attribute(&map[k])?)))
        .collect()
}

fn parse_number(raw: &str) -> Result<Number> {
    if let Ok(n) = raw.parse::<i64>() {
        return Ok(n.into());
    }
    if let Ok(n) = raw.parse::<u64>() {
        return Ok(n.into());
    }
    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .ok_or_else(|| StorageError::InvalidItem(format!("invalid number attribute: {}", raw)))
}

fn string_attribute(item: &Item, name: &str) -> Result<String> {
    match item.get(name) {
        Some(AttributeValue::S(s)) => Ok(s.clone()),
        Some(_) => Err(StorageError::InvalidItem(format!(
            "attribute {} is not a string",
            name
        ))),
        None => Err(StorageError::InvalidItem(format!("missing attribute {}", name))),
    }
}

pub(super) fn row_to_item(row: &StoredRow) -> Item {
    HashMap::from([
        (PK.to_string(), AttributeValue::S(row.pk.clone())),
        (SK.to_string(), AttributeValue::S(row.sk.clone())),
        (EVENT.to_string(), to_attribute(&row.event)),
    ])
}

pub(super) fn item_to_row(item: &Item) -> Result<StoredRow> {
    let event = item
        .get(EVENT)
        .ok_or_else(|| StorageError::InvalidItem(format!("missing attribute {}", EVENT)))
        .and_then(from_attribute)?;

    Ok(StoredRow {
        pk: string_attribute(item, PK)?,
        sk: string_attribute(item, SK)?,
        event,
    })
}

pub(super) fn key_to_item(key: &ContinuationKey) -> Item {
    HashMap::from([
        (PK.to_string(), AttributeValue::S(key.pk.clone())),
        (SK.to_string(), AttributeValue::S(key.sk.clone())),
    ])
}

pub(super) fn item_to_key(item: &Item) -> Result<ContinuationKey> {
    Ok(ContinuationKey {
        pk: string_attribute(item, PK)?,
        sk: string_attribute(item, SK)?,
    })
}
