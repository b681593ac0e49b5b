//! Persistence Helper - form input to stored `data`.

use serde_json::{Map, Value};
use std::panic::Location;

use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::element::{form_int, form_str, Element, FormInput};
use crate::envelope::Envelope;
use crate::migration::{decode_value, VisualColumns, VALUE_KEY};

/// Visual fields explicitly present in submitted form input.
pub fn form_visuals(form: &FormInput) -> VisualColumns {
    let text = |key: &str| {
        form_str(form, key)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    VisualColumns {
        width: form_int(form, "width"),
        font: text("font"),
        fontsize: form_int(form, "fontsize"),
        colour: text("colour"),
    }
}

/// Build the `data` value for `element` from validated form input.
///
/// Returns an empty string when there is no payload at all. Deprecation
/// notices raised by legacy elements point at the caller.
#[track_caller]
pub fn to_json_data(element: &dyn Element, form: &FormInput, diagnostics: &Diagnostics) -> String {
    let visuals = form_visuals(form);

    let mut payload = match element.form_normalizer() {
        Some(normalizer) => normalizer.normalize_form(form),
        None => match element.save_unique_data_for(form, Location::caller()) {
            Some(raw) => {
                if visuals.is_empty() && Envelope::parse_object(&raw).is_some() {
                    return raw;
                }
                legacy_payload(element.type_key(), &raw, diagnostics)
            }
            None => Map::new(),
        },
    };

    visuals.merge_into(&mut payload);
    if payload.is_empty() {
        String::new()
    } else {
        Value::Object(payload).to_string()
    }
}

fn legacy_payload(type_key: &str, raw: &str, diagnostics: &Diagnostics) -> Map<String, Value> {
    if raw.trim().is_empty() {
        return Map::new();
    }
    if let Some(envelope) = Envelope::parse_object(raw) {
        return envelope.into_map();
    }

    diagnostics.emit(Diagnostic::new(
        DiagnosticKind::Migration,
        type_key,
        format!("'{type_key}' saved a bare value; wrapping it under '{VALUE_KEY}'"),
    ));
    let mut payload = Map::new();
    payload.insert(VALUE_KEY.into(), decode_value(raw));
    payload
}
