//! Image placed from file storage. The file itself lives outside this crate;
//! the envelope only names it.

use serde_json::{Map, Value};

use crate::element::{
    copy_str_keys, form_int, Element, FieldKind, FormField, FormInput, FormNormalizer,
};
use crate::error::ElementError;
use crate::model::ElementRecord;
use crate::validation::ValidationViolation;

#[derive(Debug)]
pub struct ImageElement {
    record: ElementRecord,
}

impl ImageElement {
    pub fn from_record(record: ElementRecord) -> Result<Box<dyn Element>, ElementError> {
        Ok(Box::new(Self { record }))
    }

    pub fn filename(&self) -> Option<String> {
        self.record.envelope().get_str("filename").map(str::to_string)
    }

    pub fn height(&self) -> Option<i64> {
        self.record.envelope().get_i64("height")
    }
}

impl FormNormalizer for ImageElement {
    fn normalize_form(&self, form: &FormInput) -> Map<String, Value> {
        let mut payload = copy_str_keys(form, &["filename", "filearea"]);
        for key in ["height", "alphachannel"] {
            if let Some(value) = form_int(form, key) {
                payload.insert(key.into(), Value::from(value));
            }
        }
        payload
    }
}

impl Element for ImageElement {
    fn record(&self) -> &ElementRecord {
        &self.record
    }

    fn record_mut(&mut self) -> &mut ElementRecord {
        &mut self.record
    }

    // Uploading a file needs a second round trip before a preview exists.
    fn has_save_and_continue(&self) -> bool {
        true
    }

    fn form_normalizer(&self) -> Option<&dyn FormNormalizer> {
        Some(self)
    }

    fn form_fields(&self) -> Vec<FormField> {
        vec![
            FormField::new("filename", "Image", FieldKind::File),
            FormField::new("width", "Width", FieldKind::Number),
            FormField::new("height", "Height", FieldKind::Number),
            FormField::new("alphachannel", "Alpha channel", FieldKind::Number),
        ]
    }

    fn validate_form(&self, form: &FormInput) -> Vec<ValidationViolation> {
        let mut violations = vec![];
        if form_int(form, "height").is_some_and(|h| h < 0) {
            violations.push(ValidationViolation::error(
                "image",
                "height",
                "Height must not be negative",
            ));
        }
        if form_int(form, "alphachannel").is_some_and(|a| !(0..=100).contains(&a)) {
            violations.push(ValidationViolation::error(
                "image",
                "alphachannel",
                "Alpha channel must be 0-100",
            ));
        }
        violations
    }
}
