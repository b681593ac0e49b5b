//! Layout Fingerprints - SHA-256 over canonical JSON
//!
//! A fingerprint covers what a template looks like: pages in order with
//! their dimensions, and each page's elements in order with their type,
//! payload and placement. Identifiers, timestamps, the template's name and
//! its context are left out, so a faithful copy has the same fingerprint as
//! its source.

use serde::Serialize;
use serde_json::{to_string, Value};
use sha2::{Digest, Sha256};

use crate::envelope::Envelope;
use crate::model::{Alignment, ElementRecord, PageRecord, PageSpec, RefPoint};

/// Bumped whenever the fingerprinted fields change.
const LAYOUT_FORMAT: &str = "certforge-layout-1";

/// Compute SHA-256 hash of bytes, return hex string
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    hex::encode(result)
}

/// Convert to canonical JSON (sorted keys, no whitespace)
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let v: Value = serde_json::to_value(value)?;
    let sorted = sort_value(&v);
    to_string(&sorted)
}

fn sort_value(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut sorted: Vec<_> = map.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(b.0));
            let sorted_map: serde_json::Map<String, Value> = sorted
                .into_iter()
                .map(|(k, v)| (k.clone(), sort_value(v)))
                .collect();
            Value::Object(sorted_map)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_value).collect()),
        _ => v.clone(),
    }
}

#[derive(Serialize)]
struct LayoutElement<'a> {
    name: &'a str,
    element: &'a str,
    data: Value,
    font: Option<&'a str>,
    fontsize: Option<i64>,
    colour: Option<&'a str>,
    width: Option<i64>,
    posx: i64,
    posy: i64,
    refpoint: RefPoint,
    alignment: Alignment,
}

impl<'a> From<&'a ElementRecord> for LayoutElement<'a> {
    fn from(record: &'a ElementRecord) -> Self {
        Self {
            name: &record.name,
            element: &record.element,
            data: Value::Object(Envelope::parse(record.data.as_deref()).into_map()),
            font: record.font.as_deref(),
            fontsize: record.fontsize,
            colour: record.colour.as_deref(),
            width: record.width,
            posx: record.posx,
            posy: record.posy,
            refpoint: record.refpoint,
            alignment: record.alignment,
        }
    }
}

#[derive(Serialize)]
struct LayoutPage<'a> {
    spec: PageSpec,
    elements: Vec<LayoutElement<'a>>,
}

#[derive(Serialize)]
struct Layout<'a> {
    format: &'static str,
    pages: Vec<LayoutPage<'a>>,
}

/// Fingerprint of ordered pages, each with its ordered elements.
pub fn layout_fingerprint(
    pages: &[(PageRecord, Vec<ElementRecord>)],
) -> Result<String, serde_json::Error> {
    let layout = Layout {
        format: LAYOUT_FORMAT,
        pages: pages
            .iter()
            .map(|(page, elements)| LayoutPage {
                spec: page.spec(),
                elements: elements.iter().map(LayoutElement::from).collect(),
            })
            .collect(),
    };
    let canonical = canonical_json(&layout)?;
    Ok(sha256_hex(canonical.as_bytes()))
}

mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{:02x}", b)).collect()
    }
}
