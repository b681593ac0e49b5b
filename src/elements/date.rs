//! Date element - shows one of the dates associated with an issued
//! certificate in a configurable format.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::element::{form_int, form_str, Element, FieldKind, FormField, FormInput, FormNormalizer};
use crate::error::ElementError;
use crate::model::ElementRecord;
use crate::validation::ValidationViolation;

pub const DATE_ISSUE: i64 = -1;
pub const DATE_COMPLETION: i64 = -2;
pub const DATE_ENROLMENT_START: i64 = -3;
pub const DATE_ENROLMENT_END: i64 = -4;
pub const DATE_COURSE_START: i64 = -5;
pub const DATE_COURSE_END: i64 = -6;

/// Stored format keys and the chrono pattern each one stands for.
pub const DATE_FORMATS: &[(&str, &str)] = &[
    ("1", "%B %d, %Y"),
    ("2", "%d %B %Y"),
    ("3", "%d/%m/%Y"),
    ("4", "%B %Y"),
    ("strftimedate", "%-d %B %Y"),
    ("strftimedatefullshort", "%d/%m/%y"),
    ("strftimedateshort", "%-d %B"),
];

/// Format `date` with a stored format key, if the key is known.
pub fn format_date(format_key: &str, date: DateTime<Utc>) -> Option<String> {
    DATE_FORMATS
        .iter()
        .find(|(key, _)| *key == format_key)
        .map(|(_, pattern)| date.format(pattern).to_string())
}

#[derive(Debug)]
pub struct DateElement {
    record: ElementRecord,
}

impl DateElement {
    pub fn from_record(record: ElementRecord) -> Result<Box<dyn Element>, ElementError> {
        Ok(Box::new(Self { record }))
    }

    pub fn date_item(&self) -> Option<i64> {
        self.record.envelope().get_i64("dateitem")
    }

    pub fn date_format(&self) -> Option<String> {
        self.record.envelope().get_str("dateformat").map(str::to_string)
    }
}

impl FormNormalizer for DateElement {
    fn normalize_form(&self, form: &FormInput) -> Map<String, Value> {
        let mut payload = Map::new();
        if let Some(item) = form_int(form, "dateitem") {
            payload.insert("dateitem".into(), Value::from(item));
        }
        if let Some(format) = form_str(form, "dateformat") {
            payload.insert("dateformat".into(), Value::from(format));
        }
        payload
    }
}

impl Element for DateElement {
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
        let items = [
            (DATE_ISSUE, "Issued date"),
            (DATE_COMPLETION, "Completion date"),
            (DATE_ENROLMENT_START, "Enrolment start date"),
            (DATE_ENROLMENT_END, "Enrolment end date"),
            (DATE_COURSE_START, "Course start date"),
            (DATE_COURSE_END, "Course end date"),
        ]
        .into_iter()
        .map(|(value, label)| (value.to_string(), label.to_string()))
        .collect();
        let formats = DATE_FORMATS
            .iter()
            .map(|(key, pattern)| (key.to_string(), pattern.to_string()))
            .collect();
        vec![
            FormField::new("dateitem", "Date item", FieldKind::Select { options: items })
                .required(),
            FormField::new("dateformat", "Date format", FieldKind::Select { options: formats })
                .required(),
        ]
    }

    fn validate_form(&self, form: &FormInput) -> Vec<ValidationViolation> {
        let mut violations = vec![];
        // Positive items refer to an activity's grade date.
        if matches!(form_int(form, "dateitem"), None | Some(0)) {
            violations.push(ValidationViolation::error("date", "dateitem", "Choose a date item"));
        }
        match form_str(form, "dateformat") {
            Some(key) if DATE_FORMATS.iter().any(|(k, _)| *k == key) => {}
            other => violations.push(
                ValidationViolation::error("date", "dateformat", "Unknown date format")
                    .expected("a known format key", other.unwrap_or_default()),
            ),
        }
        violations
    }
}
