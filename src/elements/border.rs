//! Page border. Its only setting is the line width.

use serde_json::{Map, Value};

use crate::element::{form_int, Element, FieldKind, FormField, FormInput, FormNormalizer};
use crate::error::ElementError;
use crate::model::ElementRecord;
use crate::validation::ValidationViolation;

#[derive(Debug)]
pub struct BorderElement {
    record: ElementRecord,
}

impl BorderElement {
    pub fn from_record(record: ElementRecord) -> Result<Box<dyn Element>, ElementError> {
        Ok(Box::new(Self { record }))
    }
}

impl FormNormalizer for BorderElement {
    fn normalize_form(&self, form: &FormInput) -> Map<String, Value> {
        let mut payload = Map::new();
        if let Some(width) = form_int(form, "width") {
            payload.insert("width".into(), Value::from(width));
        }
        payload
    }
}

impl Element for BorderElement {
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
        vec![
            FormField::new("width", "Width", FieldKind::Number).required(),
            FormField::new("colour", "Colour", FieldKind::Colour),
        ]
    }

    fn validate_form(&self, form: &FormInput) -> Vec<ValidationViolation> {
        match form_int(form, "width") {
            Some(width) if width > 0 => vec![],
            _ => vec![ValidationViolation::error(
                "border",
                "width",
                "Border width must be positive",
            )],
        }
    }
}
