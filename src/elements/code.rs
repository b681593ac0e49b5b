//! Verification code, optionally with the verification URL.

use serde_json::{Map, Value};

use crate::element::{form_int, Element, FieldKind, FormField, FormInput, FormNormalizer};
use crate::error::ElementError;
use crate::model::ElementRecord;
use crate::validation::ValidationViolation;

pub const DISPLAY_CODE: i64 = 1;
pub const DISPLAY_CODE_WITH_URL: i64 = 2;
pub const DISPLAY_URL: i64 = 3;

#[derive(Debug)]
pub struct CodeElement {
    record: ElementRecord,
}

impl CodeElement {
    pub fn from_record(record: ElementRecord) -> Result<Box<dyn Element>, ElementError> {
        Ok(Box::new(Self { record }))
    }

    pub fn display(&self) -> i64 {
        self.record.envelope().get_i64("display").unwrap_or(DISPLAY_CODE)
    }
}

impl FormNormalizer for CodeElement {
    fn normalize_form(&self, form: &FormInput) -> Map<String, Value> {
        let mut payload = Map::new();
        let display = form_int(form, "display").unwrap_or(DISPLAY_CODE);
        payload.insert("display".into(), Value::from(display));
        payload
    }
}

impl Element for CodeElement {
    fn record(&self) -> &ElementRecord {
        &self.record
    }

    fn record_mut(&mut self) -> &mut ElementRecord {
        &mut self.record
    }

    fn form_normalizer(&self) -> Option<&dyn FormNormalizer> {
        Some(self)
    }

    fn form_fields(&self) -> Vec<FormField> {
        let options = [
            (DISPLAY_CODE, "Code"),
            (DISPLAY_CODE_WITH_URL, "Code and URL"),
            (DISPLAY_URL, "URL"),
        ]
        .into_iter()
        .map(|(value, label)| (value.to_string(), label.to_string()))
        .collect();
        vec![FormField::new("display", "Display", FieldKind::Select { options })]
    }

    fn validate_form(&self, form: &FormInput) -> Vec<ValidationViolation> {
        match form_int(form, "display") {
            None | Some(DISPLAY_CODE..=DISPLAY_URL) => vec![],
            Some(other) => vec![
                ValidationViolation::error("code", "display", "Unknown display option")
                    .expected("1-3", other.to_string()),
            ],
        }
    }
}
