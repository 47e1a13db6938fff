//! Raw backend records and their normalized forms.
//!
//! The backend is loose about field names and types, so every raw field is an
//! optional JSON value. Normalization applies the defaulting rules once, and
//! the alert logic downstream only ever sees typed records.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier used for batches that carry none of `id`, `_id` or `batchNumber`.
pub const UNKNOWN_BATCH_ID: &str = "unknown";

const NAIVE_DATETIME_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

/// Inventory record as served by `GET /api/inventory`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawInventoryItem {
    pub name: Option<Value>,
    pub branch: Option<Value>,
    pub quantity: Option<Value>,
    pub reorder_level: Option<Value>,
    #[serde(rename = "reorderLevel")]
    pub reorder_level_camel: Option<Value>,
}

/// Batch record as served by `GET /api/batches`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawBatch {
    pub id: Option<Value>,
    #[serde(rename = "_id")]
    pub mongo_id: Option<Value>,
    pub batch_number: Option<Value>,
    #[serde(rename = "batchNumber")]
    pub batch_number_camel: Option<Value>,
    pub item_name: Option<Value>,
    #[serde(rename = "itemName")]
    pub item_name_camel: Option<Value>,
    pub branch: Option<Value>,
    pub exp_date: Option<Value>,
    #[serde(rename = "expDate")]
    pub exp_date_camel: Option<Value>,
    pub expiration_date: Option<Value>,
    #[serde(rename = "expirationDate")]
    pub expiration_date_camel: Option<Value>,
}

/// System alert as served by `GET /api/alerts`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawApiAlert {
    pub id: Option<Value>,
    pub title: Option<Value>,
    #[serde(rename = "type")]
    pub alert_type: Option<Value>,
    pub severity: Option<Value>,
    pub description: Option<Value>,
    pub branch: Option<Value>,
}

/// Inventory item with numeric fields defaulted to zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryItem {
    pub name: Option<String>,
    pub branch: Option<String>,
    pub quantity: f64,
    pub reorder_level: f64,
}

impl From<RawInventoryItem> for InventoryItem {
    fn from(raw: RawInventoryItem) -> Self {
        Self {
            name: text(raw.name.as_ref()),
            branch: text(raw.branch.as_ref()),
            quantity: number_or_zero(raw.quantity.as_ref()),
            reorder_level: number_or_zero(first_truthy([
                &raw.reorder_level,
                &raw.reorder_level_camel,
            ])),
        }
    }
}

/// Stock batch with its identifier resolved and its expiration parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub id: String,
    pub item_name: Option<String>,
    pub branch: Option<String>,
    /// `None` when the batch has no parseable expiration date.
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<RawBatch> for Batch {
    fn from(raw: RawBatch) -> Self {
        let id = [
            &raw.id,
            &raw.mongo_id,
            &raw.batch_number,
            &raw.batch_number_camel,
        ]
        .into_iter()
        .find_map(|value| truthy_text(value.as_ref()))
        .unwrap_or_else(|| UNKNOWN_BATCH_ID.to_owned());

        let expires_at = first_truthy([
            &raw.exp_date,
            &raw.exp_date_camel,
            &raw.expiration_date,
            &raw.expiration_date_camel,
        ])
        .and_then(parse_expiration);

        Self {
            id,
            item_name: text(first_truthy([&raw.item_name, &raw.item_name_camel])),
            branch: text(raw.branch.as_ref()),
            expires_at,
        }
    }
}

/// System alert passed through from the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiAlert {
    pub id: Option<String>,
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub alert_type: Option<String>,
    pub severity: Option<String>,
    pub description: Option<String>,
    pub branch: Option<String>,
}

impl From<RawApiAlert> for ApiAlert {
    fn from(raw: RawApiAlert) -> Self {
        Self {
            id: text(raw.id.as_ref()),
            title: text(raw.title.as_ref()),
            alert_type: text(raw.alert_type.as_ref()),
            severity: text(raw.severity.as_ref()),
            description: text(raw.description.as_ref()),
            branch: text(raw.branch.as_ref()),
        }
    }
}

/// Decode each element of a fetched array into `R` and normalize it into `T`.
///
/// Elements that are not JSON objects, or that fail to decode, are skipped.
pub fn normalize_records<R, T>(records: Vec<Value>) -> Vec<T>
where
    R: DeserializeOwned,
    T: From<R>,
{
    records
        .into_iter()
        .filter_map(|value| {
            if !value.is_object() {
                log::debug!("skipping non-object record: {value}");
                return None;
            }
            match serde_json::from_value::<R>(value) {
                Ok(raw) => Some(T::from(raw)),
                Err(err) => {
                    log::debug!("skipping malformed record: {err}");
                    None
                }
            }
        })
        .collect()
}

/// Parse an expiration date in any of the formats the backend produces.
pub fn parse_expiration(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_date_text(s.trim()),
        Value::Number(n) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        // Mongo extended JSON
        Value::Object(map) => map.get("$date").and_then(parse_expiration),
        _ => None,
    }
}

fn parse_date_text(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn number_or_zero(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .unwrap_or(0.0),
        Some(Value::Bool(b)) => f64::from(u8::from(*b)),
        _ => 0.0,
    }
}

fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// First truthy value among alternative spellings of one field.
fn first_truthy<'a>(values: impl IntoIterator<Item = &'a Option<Value>>) -> Option<&'a Value> {
    values
        .into_iter()
        .filter_map(Option::as_ref)
        .find(|value| is_truthy(value))
}

fn truthy_text(value: Option<&Value>) -> Option<String> {
    let value = value?;
    if !is_truthy(value) {
        return None;
    }
    match value {
        Value::Object(map) => map.get("$oid").and_then(|oid| truthy_text(Some(oid))),
        Value::Bool(_) => Some(value.to_string()),
        _ => text(Some(value)),
    }
}
