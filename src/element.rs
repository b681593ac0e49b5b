//! Element Contract
//!
//! Every element type, built-in, third-party or wrapped legacy, is used
//! through [`Element`]. Getters read the canonical envelope first and fall
//! back to the legacy visual columns of rows that were never migrated.
//! Optional behaviour has a safe default so callers never need to know which
//! generation of element they hold.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::panic::Location;

use crate::elements::unknown::UnknownElement;
use crate::envelope::{value_as_i64, Envelope};
use crate::error::ElementError;
use crate::model::{Alignment, ElementId, ElementRecord, PageId, RefPoint};
use crate::validation::ValidationViolation;

/// Submitted form values, keyed by field name.
pub type FormInput = Map<String, Value>;

pub fn form_str<'a>(form: &'a FormInput, key: &str) -> Option<&'a str> {
    form.get(key).and_then(Value::as_str)
}

pub fn form_int(form: &FormInput, key: &str) -> Option<i64> {
    form.get(key).and_then(value_as_i64)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    TextArea,
    Number,
    Colour,
    Checkbox,
    File,
    Select { options: Vec<(String, String)> },
}

/// Declarative description of one element-specific form field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormField {
    pub name: String,
    pub label: String,
    #[serde(flatten)]
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
}

impl FormField {
    pub fn new(name: &str, label: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            kind,
            required: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Identifier remapping available after a template is restored elsewhere.
#[derive(Debug, Clone, Default)]
pub struct RestoreContext {
    mappings: HashMap<(String, i64), i64>,
}

impl RestoreContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map(mut self, kind: &str, old: i64, new: i64) -> Self {
        self.mappings.insert((kind.to_string(), old), new);
        self
    }

    pub fn mapped(&self, kind: &str, old: i64) -> Option<i64> {
        self.mappings.get(&(kind.to_string(), old)).copied()
    }
}

/// Turns submitted form values into the type-specific envelope payload.
pub trait FormNormalizer {
    fn normalize_form(&self, form: &FormInput) -> Map<String, Value>;
}

pub trait Element: Send + Sync + fmt::Debug {
    fn record(&self) -> &ElementRecord;
    fn record_mut(&mut self) -> &mut ElementRecord;

    fn id(&self) -> ElementId {
        self.record().id
    }

    fn page_id(&self) -> PageId {
        self.record().page_id
    }

    fn name(&self) -> &str {
        &self.record().name
    }

    fn type_key(&self) -> &str {
        &self.record().element
    }

    fn data(&self) -> Option<&str> {
        self.record().data.as_deref()
    }

    fn envelope(&self) -> Envelope {
        self.record().envelope()
    }

    fn font(&self) -> Option<String> {
        let record = self.record();
        record.envelope().get_str("font").map(str::to_string).or_else(|| record.font.clone())
    }

    fn fontsize(&self) -> Option<i64> {
        let record = self.record();
        record.envelope().get_i64("fontsize").or(record.fontsize)
    }

    fn colour(&self) -> Option<String> {
        let record = self.record();
        record.envelope().get_str("colour").map(str::to_string).or_else(|| record.colour.clone())
    }

    fn width(&self) -> Option<i64> {
        let record = self.record();
        record.envelope().get_i64("width").or(record.width)
    }

    fn position(&self) -> (i64, i64) {
        (self.record().posx, self.record().posy)
    }

    fn refpoint(&self) -> RefPoint {
        self.record().refpoint
    }

    fn alignment(&self) -> Alignment {
        self.record().alignment
    }

    /// Whether the edit form offers "save and continue".
    fn has_save_and_continue(&self) -> bool {
        false
    }

    fn form_normalizer(&self) -> Option<&dyn FormNormalizer> {
        None
    }

    fn form_fields(&self) -> Vec<FormField> {
        Vec::new()
    }

    /// [`Element::form_fields`] on behalf of `caller`. Deprecation notices
    /// point at `caller`, which survives dynamic dispatch.
    fn form_fields_for(&self, _caller: &'static Location<'static>) -> Vec<FormField> {
        self.form_fields()
    }

    fn validate_form(&self, _form: &FormInput) -> Vec<ValidationViolation> {
        Vec::new()
    }

    fn after_restore(&mut self, _ctx: &RestoreContext) -> Result<(), ElementError> {
        Ok(())
    }

    /// Legacy payload hook, consulted only when no normalizer exists.
    fn save_unique_data(&self, _form: &FormInput) -> Option<String> {
        None
    }

    fn save_unique_data_for(
        &self,
        form: &FormInput,
        _caller: &'static Location<'static>,
    ) -> Option<String> {
        self.save_unique_data(form)
    }

    /// Runs before the row is removed; an error vetoes the delete.
    fn on_delete(&mut self) -> Result<(), ElementError> {
        Ok(())
    }

    fn as_unknown(&self) -> Option<&UnknownElement> {
        None
    }
}

/// Copy the textual form values named in `keys` into a payload map.
pub(crate) fn copy_str_keys(form: &FormInput, keys: &[&str]) -> Map<String, Value> {
    let mut payload = Map::new();
    for key in keys {
        if let Some(value) = form_str(form, key) {
            payload.insert((*key).to_string(), Value::from(value));
        }
    }
    payload
}
