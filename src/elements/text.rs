//! Free text.

use serde_json::{Map, Value};

use crate::element::{
    copy_str_keys, form_str, Element, FieldKind, FormField, FormInput, FormNormalizer,
};
use crate::error::ElementError;
use crate::migration::VALUE_KEY;
use crate::model::ElementRecord;
use crate::validation::ValidationViolation;

#[derive(Debug)]
pub struct TextElement {
    record: ElementRecord,
}

impl TextElement {
    pub fn from_record(record: ElementRecord) -> Result<Box<dyn Element>, ElementError> {
        Ok(Box::new(Self { record }))
    }

    /// The configured text; migrated legacy rows keep it under `value`.
    pub fn text(&self) -> String {
        let envelope = self.record.envelope();
        envelope
            .get_str("text")
            .or_else(|| envelope.get_str(VALUE_KEY))
            .unwrap_or_default()
            .to_string()
    }
}

impl FormNormalizer for TextElement {
    fn normalize_form(&self, form: &FormInput) -> Map<String, Value> {
        copy_str_keys(form, &["text"])
    }
}

impl Element for TextElement {
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
        vec![FormField::new("text", "Text", FieldKind::TextArea).required()]
    }

    fn validate_form(&self, form: &FormInput) -> Vec<ValidationViolation> {
        match form_str(form, "text") {
            Some(text) if !text.trim().is_empty() => vec![],
            _ => vec![ValidationViolation::error("text", "text", "Text is required")],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn legacy_value_is_read_as_text() {
        let mut record = ElementRecord::new(1, "Title", "text");
        record.data = Some(r#"{"value":"Certificate"}"#.into());
        let element = TextElement { record };
        assert_eq!(element.text(), "Certificate");
    }

    #[test]
    fn normalize_keeps_only_text() {
        let element = TextElement { record: ElementRecord::new(1, "Title", "text") };
        let form = json!({"text": "Hello", "name": "Title"}).as_object().cloned().unwrap();
        assert_eq!(Value::Object(element.normalize_form(&form)), json!({"text": "Hello"}));
    }
}
