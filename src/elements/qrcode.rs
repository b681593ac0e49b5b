//! QR code pointing at the certificate verification page.

use serde_json::{Map, Value};

use crate::element::{form_int, Element, FieldKind, FormField, FormInput, FormNormalizer};
use crate::error::ElementError;
use crate::model::ElementRecord;
use crate::validation::ValidationViolation;

#[derive(Debug)]
pub struct QrCodeElement {
    record: ElementRecord,
}

impl QrCodeElement {
    pub fn from_record(record: ElementRecord) -> Result<Box<dyn Element>, ElementError> {
        Ok(Box::new(Self { record }))
    }

    pub fn height(&self) -> Option<i64> {
        self.record.envelope().get_i64("height")
    }
}

impl FormNormalizer for QrCodeElement {
    fn normalize_form(&self, form: &FormInput) -> Map<String, Value> {
        let mut payload = Map::new();
        for key in ["width", "height"] {
            if let Some(value) = form_int(form, key) {
                payload.insert(key.into(), Value::from(value));
            }
        }
        payload
    }
}

impl Element for QrCodeElement {
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
            FormField::new("height", "Height", FieldKind::Number).required(),
        ]
    }

    fn validate_form(&self, form: &FormInput) -> Vec<ValidationViolation> {
        ["width", "height"]
            .into_iter()
            .filter(|key| !form_int(form, key).is_some_and(|v| v > 0))
            .map(|key| ValidationViolation::error("qrcode", key, "QR code size must be positive"))
            .collect()
    }
}
