//! Data Migration - Legacy Rows to Canonical Envelopes
//!
//! Element rows written by older releases carry their payload in every shape
//! imaginable: a bare number, a quoted string, a JSON object, or nothing at
//! all with the visual attributes held in separate columns. `migrate` folds
//! all of them into one JSON object:
//!
//! | `data`                        | result                              |
//! |-------------------------------|-------------------------------------|
//! | absent/blank, no visuals      | `None`                              |
//! | absent/blank, some visuals    | `{<visuals>}`                       |
//! | JSON object                   | object, visuals merged over it      |
//! | JSON array/scalar/bool/null   | `{"value": <decoded>, <visuals>}`   |
//! | not JSON                      | `{"value": "<verbatim>", <visuals>}`|

use serde_json::{Map, Value};

use crate::model::ElementRecord;

/// Reserved key holding a pre-migration scalar.
pub const VALUE_KEY: &str = "value";

/// Shared visual keys, in the order they are merged.
pub const VISUAL_KEYS: [&str; 4] = ["width", "font", "fontsize", "colour"];

const BOM: char = '\u{feff}';

/// Element type whose legacy scalar is really its width.
pub const BORDER_TYPE: &str = "border";

/// The legacy visual columns of an element row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisualColumns {
    pub width: Option<i64>,
    pub font: Option<String>,
    pub fontsize: Option<i64>,
    pub colour: Option<String>,
}

impl VisualColumns {
    pub fn is_empty(&self) -> bool {
        self.width.is_none()
            && self.font.is_none()
            && self.fontsize.is_none()
            && self.colour.is_none()
    }

    /// Explicit columns win over same-named keys already present.
    pub fn merge_into(&self, map: &mut Map<String, Value>) {
        if let Some(width) = self.width {
            map.insert("width".into(), Value::from(width));
        }
        if let Some(font) = &self.font {
            map.insert("font".into(), Value::from(font.as_str()));
        }
        if let Some(fontsize) = self.fontsize {
            map.insert("fontsize".into(), Value::from(fontsize));
        }
        if let Some(colour) = &self.colour {
            map.insert("colour".into(), Value::from(colour.as_str()));
        }
    }
}

/// How the `data` input was interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Blank,
    Object,
    Scalar,
    Verbatim,
}

/// Outcome of migrating one stored row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordMigration {
    Unchanged,
    Folded,
    /// A bare scalar or non-JSON string was wrapped under `value`.
    WrappedScalar,
}

fn strip_bom(data: &str) -> &str {
    data.strip_prefix(BOM).unwrap_or(data)
}

/// Decode a legacy scalar with native JSON typing, keeping unparseable
/// text verbatim.
pub fn decode_value(raw: &str) -> Value {
    serde_json::from_str(strip_bom(raw)).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn fold(
    data: Option<&str>,
    visuals: &VisualColumns,
    border: bool,
) -> Option<(Map<String, Value>, Shape)> {
    let blank = data.map_or(true, |d| strip_bom(d).trim().is_empty());
    if blank {
        if visuals.is_empty() {
            return None;
        }
        let mut map = Map::new();
        visuals.merge_into(&mut map);
        return Some((map, Shape::Blank));
    }

    let raw = data.unwrap_or_default();
    let (mut map, shape) = match serde_json::from_str::<Value>(strip_bom(raw)) {
        Ok(Value::Object(object)) => (object, Shape::Object),
        // An explicit width column supersedes the border scalar.
        Ok(scalar @ Value::Number(_)) if border => {
            let mut map = Map::new();
            if visuals.width.is_none() {
                map.insert("width".into(), scalar);
            }
            (map, Shape::Scalar)
        }
        Ok(other) => (wrap(other), Shape::Scalar),
        Err(_) => (wrap(Value::String(raw.to_string())), Shape::Verbatim),
    };
    visuals.merge_into(&mut map);
    Some((map, shape))
}

fn wrap(value: Value) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(VALUE_KEY.into(), value);
    map
}

fn encode(map: Map<String, Value>) -> String {
    Value::Object(map).to_string()
}

/// Fold legacy `data` and visual columns into one envelope.
pub fn migrate(
    data: Option<&str>,
    width: Option<i64>,
    font: Option<&str>,
    fontsize: Option<i64>,
    colour: Option<&str>,
) -> Option<String> {
    let visuals = VisualColumns {
        width,
        font: font.map(str::to_string),
        fontsize,
        colour: colour.map(str::to_string),
    };
    fold(data, &visuals, false).map(|(map, _)| encode(map))
}

/// Border variant: a bare numeric scalar is the border width.
pub fn migrate_border(
    data: Option<&str>,
    width: Option<i64>,
    font: Option<&str>,
    fontsize: Option<i64>,
    colour: Option<&str>,
) -> Option<String> {
    let visuals = VisualColumns {
        width,
        font: font.map(str::to_string),
        fontsize,
        colour: colour.map(str::to_string),
    };
    fold(data, &visuals, true).map(|(map, _)| encode(map))
}

/// Migrate one stored row in place, clearing its legacy columns.
pub fn migrate_record(record: &mut ElementRecord) -> RecordMigration {
    let visuals = record.visual_columns();
    let data = record.data.as_deref();
    let already_canonical = visuals.is_empty()
        && match data {
            None => true,
            Some(d) if strip_bom(d).trim().is_empty() => true,
            Some(d) => matches!(serde_json::from_str::<Value>(strip_bom(d)), Ok(Value::Object(_))),
        };
    if already_canonical {
        return RecordMigration::Unchanged;
    }

    let folded = fold(data, &visuals, record.element == BORDER_TYPE);
    let outcome = match &folded {
        Some((map, Shape::Scalar | Shape::Verbatim)) if map.contains_key(VALUE_KEY) => {
            RecordMigration::WrappedScalar
        }
        _ => RecordMigration::Folded,
    };
    record.data = folded.map(|(map, _)| encode(map));
    record.clear_visual_columns();
    outcome
}
