//! The JSON envelope stored in an element's `data` column.

use serde_json::{Map, Value};

use crate::migration::{decode_value, VALUE_KEY};

/// Always a JSON object; a bare legacy scalar lives under `value`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Envelope(Map<String, Value>);

impl Envelope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read stored `data`, tolerating rows that were never migrated.
    pub fn parse(data: Option<&str>) -> Self {
        let Some(raw) = data.filter(|d| !d.trim_start_matches('\u{feff}').trim().is_empty()) else {
            return Self::default();
        };
        match decode_value(raw) {
            Value::Object(map) => Self(map),
            other => {
                let mut map = Map::new();
                map.insert(VALUE_KEY.into(), other);
                Self(map)
            }
        }
    }

    /// Accept `raw` only if it is a JSON object.
    pub fn parse_object(raw: &str) -> Option<Self> {
        match serde_json::from_str::<Value>(raw.trim_start_matches('\u{feff}')) {
            Ok(Value::Object(map)) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Integers, whole floats and numeric strings all count.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        value_as_i64(self.0.get(key)?)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.shift_remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn to_json(&self) -> String {
        Value::Object(self.0.clone()).to_string()
    }

    /// Value for the `data` column; `None` when there is no payload.
    pub fn to_data(&self) -> Option<String> {
        if self.0.is_empty() {
            None
        } else {
            Some(self.to_json())
        }
    }
}

pub(crate) fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
