//! Stand-in for elements whose type cannot be resolved, e.g. after the
//! plugin providing it was removed.

use crate::element::Element;
use crate::model::ElementRecord;

#[derive(Debug)]
pub struct UnknownElement {
    record: ElementRecord,
    reason: String,
}

impl UnknownElement {
    pub fn new(record: ElementRecord, reason: impl Into<String>) -> Self {
        Self { record, reason: reason.into() }
    }

    /// The type key nothing could be resolved for.
    pub fn missing_type(&self) -> &str {
        &self.record.element
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Human readable notice shown in previews.
    pub fn notice(&self) -> String {
        format!(
            "Element '{}' uses the type '{}', which is not installed.",
            self.record.name, self.record.element
        )
    }
}

impl Element for UnknownElement {
    fn record(&self) -> &ElementRecord {
        &self.record
    }

    fn record_mut(&mut self) -> &mut ElementRecord {
        &mut self.record
    }

    fn as_unknown(&self) -> Option<&UnknownElement> {
        Some(self)
    }
}
