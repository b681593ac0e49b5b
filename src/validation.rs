//! Validation System - Rule/Violation Separation
//!
//! Rules inspect submitted form input and produce structured violations.
//! Nothing is written while a result carries errors.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::element::FormInput;
use crate::envelope::value_as_i64;
use crate::error::{CoreError, CoreResult};
use crate::model::PageSpec;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationViolation {
    pub rule: String,
    pub field: String,
    pub severity: ViolationSeverity,
    pub message: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
}

impl ValidationViolation {
    pub fn error(rule: &str, field: &str, message: impl Into<String>) -> Self {
        Self {
            rule: rule.to_string(),
            field: field.to_string(),
            severity: ViolationSeverity::Error,
            message: message.into(),
            expected: None,
            actual: None,
        }
    }

    pub fn expected(mut self, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self.actual = Some(actual.into());
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub violations: Vec<ValidationViolation>,
}

impl ValidationResult {
    pub fn success() -> Self {
        Self { valid: true, violations: vec![] }
    }

    /// Warnings alone keep the result valid.
    pub fn from_violations(violations: Vec<ValidationViolation>) -> Self {
        let valid = !violations.iter().any(|v| v.severity == ViolationSeverity::Error);
        Self { valid, violations }
    }

    pub fn has_errors(&self) -> bool {
        !self.valid
    }

    pub fn merge(mut self, other: Vec<ValidationViolation>) -> Self {
        self.violations.extend(other);
        Self::from_violations(self.violations)
    }

    pub fn into_result(self) -> CoreResult<()> {
        if self.valid {
            return Ok(());
        }
        let messages: Vec<_> = self
            .violations
            .iter()
            .filter(|v| v.severity == ViolationSeverity::Error)
            .map(|v| format!("{}: {}", v.field, v.message))
            .collect();
        Err(CoreError::Validation(messages.join("; ")))
    }
}

/// Validation rule trait - produces violations
pub trait ValidationRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn validate(&self, input: &FormInput) -> Vec<ValidationViolation>;
}

fn integer_field(
    rule: &'static str,
    input: &FormInput,
    field: &str,
) -> Result<Option<i64>, ValidationViolation> {
    match input.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(value) => value_as_i64(value).map(Some).ok_or_else(|| {
            ValidationViolation::error(rule, field, "must be a whole number")
                .expected("integer", value.to_string())
        }),
    }
}

// --- Concrete Rules ---

pub struct NameRule;

impl ValidationRule for NameRule {
    fn name(&self) -> &'static str { "name" }

    fn validate(&self, input: &FormInput) -> Vec<ValidationViolation> {
        match input.get("name") {
            Some(Value::String(name)) if !name.trim().is_empty() => vec![],
            Some(_) => vec![ValidationViolation::error(self.name(), "name", "Name is required")],
            None => vec![],
        }
    }
}

pub struct WidthRule;

impl ValidationRule for WidthRule {
    fn name(&self) -> &'static str { "width" }

    fn validate(&self, input: &FormInput) -> Vec<ValidationViolation> {
        match integer_field(self.name(), input, "width") {
            Ok(Some(width)) if width < 0 => vec![ValidationViolation::error(
                self.name(),
                "width",
                "Width must not be negative",
            )
            .expected(">= 0", width.to_string())],
            Ok(_) => vec![],
            Err(violation) => vec![violation],
        }
    }
}

pub struct FontSizeRule;

impl ValidationRule for FontSizeRule {
    fn name(&self) -> &'static str { "fontsize" }

    fn validate(&self, input: &FormInput) -> Vec<ValidationViolation> {
        match integer_field(self.name(), input, "fontsize") {
            Ok(Some(size)) if size <= 0 => vec![ValidationViolation::error(
                self.name(),
                "fontsize",
                "Font size must be positive",
            )
            .expected("> 0", size.to_string())],
            Ok(_) => vec![],
            Err(violation) => vec![violation],
        }
    }
}

pub struct ColourRule;

/// `#rgb` or `#rrggbb`.
pub fn is_valid_colour(colour: &str) -> bool {
    let Some(hex) = colour.strip_prefix('#') else {
        return false;
    };
    matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit())
}

impl ValidationRule for ColourRule {
    fn name(&self) -> &'static str { "colour" }

    fn validate(&self, input: &FormInput) -> Vec<ValidationViolation> {
        match input.get("colour") {
            None | Some(Value::Null) => vec![],
            Some(Value::String(colour)) if is_valid_colour(colour.trim()) => vec![],
            Some(other) => vec![ValidationViolation::error(
                self.name(),
                "colour",
                "Colour must be a hex value",
            )
            .expected("#rgb or #rrggbb", other.to_string())],
        }
    }
}

pub struct PositionRule;

impl ValidationRule for PositionRule {
    fn name(&self) -> &'static str { "position" }

    fn validate(&self, input: &FormInput) -> Vec<ValidationViolation> {
        let mut violations = vec![];
        for field in ["posx", "posy"] {
            match integer_field(self.name(), input, field) {
                Ok(Some(pos)) if pos < 0 => violations.push(
                    ValidationViolation::error(self.name(), field, "Position must not be negative")
                        .expected(">= 0", pos.to_string()),
                ),
                Ok(_) => {}
                Err(violation) => violations.push(violation),
            }
        }
        violations
    }
}

/// Validator orchestrates the element form rules.
pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Validator {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(NameRule),
                Box::new(WidthRule),
                Box::new(FontSizeRule),
                Box::new(ColourRule),
                Box::new(PositionRule),
            ],
        }
    }

    pub fn with_rule(mut self, rule: Box<dyn ValidationRule>) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn validate(&self, input: &FormInput) -> ValidationResult {
        let violations = self
            .rules
            .iter()
            .flat_map(|rule| rule.validate(input))
            .collect();
        ValidationResult::from_violations(violations)
    }

    pub fn validate_page(&self, spec: &PageSpec) -> ValidationResult {
        let mut violations = vec![];
        for (field, value) in [("width", spec.width), ("height", spec.height)] {
            if value <= 0 {
                violations.push(
                    ValidationViolation::error("page", field, "Page dimensions must be positive")
                        .expected("> 0", value.to_string()),
                );
            }
        }
        let margins = [("left_margin", spec.left_margin), ("right_margin", spec.right_margin)];
        for (field, value) in margins {
            if value < 0 {
                violations.push(
                    ValidationViolation::error("page", field, "Margins must not be negative")
                        .expected(">= 0", value.to_string()),
                );
            }
        }
        if spec.left_margin + spec.right_margin >= spec.width && spec.width > 0 {
            violations.push(ValidationViolation::error(
                "page",
                "right_margin",
                "Margins leave no printable width",
            ));
        }
        ValidationResult::from_violations(violations)
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}
