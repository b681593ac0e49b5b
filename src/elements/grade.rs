//! Grade reference: the course total or one activity's grade.

use serde_json::{Map, Value};

use crate::element::{
    form_int, Element, FieldKind, FormField, FormInput, FormNormalizer, RestoreContext,
};
use crate::error::ElementError;
use crate::model::ElementRecord;
use crate::validation::ValidationViolation;

/// `gradeitem` value meaning the course total.
pub const COURSE_GRADE: i64 = 0;

pub const FORMAT_PERCENTAGE: i64 = 1;
pub const FORMAT_POINTS: i64 = 2;
pub const FORMAT_LETTER: i64 = 3;

/// Restore mapping kind for course module identifiers.
pub const COURSE_MODULE: &str = "course_module";

#[derive(Debug)]
pub struct GradeElement {
    record: ElementRecord,
}

impl GradeElement {
    pub fn from_record(record: ElementRecord) -> Result<Box<dyn Element>, ElementError> {
        Ok(Box::new(Self { record }))
    }

    pub fn grade_item(&self) -> i64 {
        self.record.envelope().get_i64("gradeitem").unwrap_or(COURSE_GRADE)
    }

    pub fn grade_format(&self) -> i64 {
        self.record.envelope().get_i64("gradeformat").unwrap_or(FORMAT_PERCENTAGE)
    }
}

impl FormNormalizer for GradeElement {
    fn normalize_form(&self, form: &FormInput) -> Map<String, Value> {
        let mut payload = Map::new();
        let item = form_int(form, "gradeitem").unwrap_or(COURSE_GRADE);
        payload.insert("gradeitem".into(), Value::from(item));
        payload.insert(
            "gradeformat".into(),
            Value::from(form_int(form, "gradeformat").unwrap_or(FORMAT_PERCENTAGE)),
        );
        payload
    }
}

impl Element for GradeElement {
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
        let formats = [
            (FORMAT_PERCENTAGE, "Percentage"),
            (FORMAT_POINTS, "Points"),
            (FORMAT_LETTER, "Letter"),
        ]
        .into_iter()
        .map(|(value, label)| (value.to_string(), label.to_string()))
        .collect();
        vec![
            FormField::new("gradeitem", "Grade item", FieldKind::Number),
            FormField::new("gradeformat", "Grade format", FieldKind::Select { options: formats }),
        ]
    }

    fn validate_form(&self, form: &FormInput) -> Vec<ValidationViolation> {
        let mut violations = vec![];
        if let Some(format) = form_int(form, "gradeformat") {
            if !(FORMAT_PERCENTAGE..=FORMAT_LETTER).contains(&format) {
                violations.push(
                    ValidationViolation::error("grade", "gradeformat", "Unknown grade format")
                        .expected("1-3", format.to_string()),
                );
            }
        }
        if form_int(form, "gradeitem").is_some_and(|item| item < 0) {
            violations.push(ValidationViolation::error("grade", "gradeitem", "Unknown grade item"));
        }
        violations
    }

    /// Activity grade items point at course modules, which get new
    /// identifiers on restore.
    fn after_restore(&mut self, ctx: &RestoreContext) -> Result<(), ElementError> {
        let item = self.grade_item();
        if item == COURSE_GRADE {
            return Ok(());
        }
        let mapped = ctx.mapped(COURSE_MODULE, item).ok_or_else(|| ElementError::Hook {
            hook: "after_restore",
            reason: format!("no restored course module for {item}"),
        })?;
        let mut envelope = self.record.envelope();
        envelope.set("gradeitem", mapped);
        self.record.set_envelope(&envelope);
        Ok(())
    }
}
