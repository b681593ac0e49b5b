//! Legacy Element Adapter
//!
//! Element types written against the old contract implement
//! [`LegacyElement`]: the getters read the row as it was stored, and each
//! optional behaviour is a small capability trait exposed through an `as_*`
//! accessor. [`LegacyAdapter`] makes such a type satisfy [`Element`]. A
//! missing capability yields a safe default; a present one is delegated to,
//! and the deprecated ones (form definition, unique-data save) leave a
//! deprecation diagnostic the first time they run.

use std::fmt;
use std::panic::Location;

use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::element::{Element, FormField, FormInput, RestoreContext};
use crate::error::ElementError;
use crate::model::{Alignment, ElementId, ElementRecord, PageId, RefPoint};
use crate::validation::ValidationViolation;

pub trait SaveAndContinue {
    fn has_save_and_continue(&self) -> bool;
}

pub trait Validatable {
    fn validate_form_elements(&self, form: &FormInput) -> Vec<ValidationViolation>;
}

pub trait Restorable {
    fn after_restore(&mut self, ctx: &RestoreContext) -> Result<(), ElementError>;
}

/// Deprecated: describe fields through [`Element::form_fields`].
pub trait FormBuildable {
    fn render_form_elements(&self) -> Vec<FormField>;
}

/// Deprecated: implement [`crate::element::FormNormalizer`].
pub trait UniqueDataSaver {
    fn save_unique_data(&self, form: &FormInput) -> String;
}

pub trait Deletable {
    fn delete(&mut self) -> Result<(), ElementError>;
}

pub trait LegacyElement: Send + Sync + fmt::Debug {
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

    fn element_type(&self) -> &str {
        &self.record().element
    }

    fn data(&self) -> Option<&str> {
        self.record().data.as_deref()
    }

    fn font(&self) -> Option<String> {
        let record = self.record();
        record.font.clone().or_else(|| record.envelope().get_str("font").map(str::to_string))
    }

    fn fontsize(&self) -> Option<i64> {
        let record = self.record();
        record.fontsize.or_else(|| record.envelope().get_i64("fontsize"))
    }

    fn colour(&self) -> Option<String> {
        let record = self.record();
        record.colour.clone().or_else(|| record.envelope().get_str("colour").map(str::to_string))
    }

    fn width(&self) -> Option<i64> {
        let record = self.record();
        record.width.or_else(|| record.envelope().get_i64("width"))
    }

    fn posx(&self) -> i64 {
        self.record().posx
    }

    fn posy(&self) -> i64 {
        self.record().posy
    }

    fn refpoint(&self) -> RefPoint {
        self.record().refpoint
    }

    fn alignment(&self) -> Alignment {
        self.record().alignment
    }

    fn as_save_and_continue(&self) -> Option<&dyn SaveAndContinue> {
        None
    }

    fn as_validatable(&self) -> Option<&dyn Validatable> {
        None
    }

    fn as_restorable(&mut self) -> Option<&mut dyn Restorable> {
        None
    }

    fn as_form_buildable(&self) -> Option<&dyn FormBuildable> {
        None
    }

    fn as_unique_data_saver(&self) -> Option<&dyn UniqueDataSaver> {
        None
    }

    fn as_deletable(&mut self) -> Option<&mut dyn Deletable> {
        None
    }
}

#[derive(Debug)]
pub struct LegacyAdapter {
    inner: Box<dyn LegacyElement>,
    diagnostics: Diagnostics,
}

impl LegacyAdapter {
    pub fn new(inner: Box<dyn LegacyElement>, diagnostics: Diagnostics) -> Self {
        Self { inner, diagnostics }
    }

    pub fn inner(&self) -> &dyn LegacyElement {
        self.inner.as_ref()
    }

    pub fn into_inner(self) -> Box<dyn LegacyElement> {
        self.inner
    }

    /// One notice per diagnostics log, type and capability.
    fn deprecated(&self, capability: &str, replacement: &str, location: &Location<'_>) {
        let type_key = self.inner.element_type();
        let key = format!("deprecated:{type_key}:{capability}");
        self.diagnostics.emit_once(
            &key,
            Diagnostic::new(
                DiagnosticKind::Deprecation,
                type_key,
                format!(
                    "'{type_key}' relies on deprecated {capability}; implement {replacement} instead"
                ),
            )
            .at(location),
        );
    }
}

impl Element for LegacyAdapter {
    fn record(&self) -> &ElementRecord {
        self.inner.record()
    }

    fn record_mut(&mut self) -> &mut ElementRecord {
        self.inner.record_mut()
    }

    fn id(&self) -> ElementId {
        self.inner.id()
    }

    fn page_id(&self) -> PageId {
        self.inner.page_id()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn type_key(&self) -> &str {
        self.inner.element_type()
    }

    fn data(&self) -> Option<&str> {
        self.inner.data()
    }

    fn font(&self) -> Option<String> {
        self.inner.font()
    }

    fn fontsize(&self) -> Option<i64> {
        self.inner.fontsize()
    }

    fn colour(&self) -> Option<String> {
        self.inner.colour()
    }

    fn width(&self) -> Option<i64> {
        self.inner.width()
    }

    fn position(&self) -> (i64, i64) {
        (self.inner.posx(), self.inner.posy())
    }

    fn refpoint(&self) -> RefPoint {
        self.inner.refpoint()
    }

    fn alignment(&self) -> Alignment {
        self.inner.alignment()
    }

    fn has_save_and_continue(&self) -> bool {
        self.inner
            .as_save_and_continue()
            .is_some_and(|capability| capability.has_save_and_continue())
    }

    #[track_caller]
    fn form_fields(&self) -> Vec<FormField> {
        self.form_fields_for(Location::caller())
    }

    fn form_fields_for(&self, caller: &'static Location<'static>) -> Vec<FormField> {
        match self.inner.as_form_buildable() {
            Some(capability) => {
                self.deprecated("render_form_elements", "Element::form_fields", caller);
                capability.render_form_elements()
            }
            None => Vec::new(),
        }
    }

    fn validate_form(&self, form: &FormInput) -> Vec<ValidationViolation> {
        self.inner
            .as_validatable()
            .map(|capability| capability.validate_form_elements(form))
            .unwrap_or_default()
    }

    fn after_restore(&mut self, ctx: &RestoreContext) -> Result<(), ElementError> {
        match self.inner.as_restorable() {
            Some(capability) => capability.after_restore(ctx),
            None => Ok(()),
        }
    }

    #[track_caller]
    fn save_unique_data(&self, form: &FormInput) -> Option<String> {
        self.save_unique_data_for(form, Location::caller())
    }

    fn save_unique_data_for(
        &self,
        form: &FormInput,
        caller: &'static Location<'static>,
    ) -> Option<String> {
        let capability = self.inner.as_unique_data_saver()?;
        self.deprecated("save_unique_data", "FormNormalizer", caller);
        Some(capability.save_unique_data(form))
    }

    fn on_delete(&mut self) -> Result<(), ElementError> {
        match self.inner.as_deletable() {
            Some(capability) => capability.delete(),
            None => Ok(()),
        }
    }
}
