//! Element Factory
//!
//! Turns a stored row into a usable element. Resolution never fails: a key
//! that is not registered, an implementation that cannot be resolved, or a
//! constructor that errors all produce an [`UnknownElement`] placeholder and
//! a diagnostic, so one broken type cannot take a whole page down with it.

use std::sync::Arc;

use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::element::Element;
use crate::elements::UnknownElement;
use crate::legacy::{LegacyAdapter, LegacyElement};
use crate::model::ElementRecord;
use crate::registry::{Constructor, ElementTypeRegistry, ImplementationCatalog};

#[derive(Debug, Clone)]
pub struct ElementFactory {
    registry: Arc<ElementTypeRegistry>,
    catalog: Arc<ImplementationCatalog>,
    diagnostics: Diagnostics,
}

impl ElementFactory {
    pub fn new(
        registry: Arc<ElementTypeRegistry>,
        catalog: Arc<ImplementationCatalog>,
        diagnostics: Diagnostics,
    ) -> Self {
        Self { registry, catalog, diagnostics }
    }

    pub fn registry(&self) -> &ElementTypeRegistry {
        &self.registry
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Build the element for `record` as type `type_key`.
    pub fn create(&self, type_key: &str, mut record: ElementRecord) -> Box<dyn Element> {
        record.element = type_key.to_string();

        let implementation = match self.registry.get(type_key) {
            Ok(implementation) => implementation,
            Err(_) => return self.unknown(record, "type key is not registered"),
        };
        let descriptor = match self.catalog.resolve(implementation) {
            Ok(descriptor) => descriptor,
            Err(e) => return self.unknown(record, e.to_string()),
        };

        let built = match descriptor.constructor {
            Constructor::FromRecord(build) => build(record.clone()),
            Constructor::Legacy(build) => build(record.clone())
                .map(|legacy| Box::new(self.wrap_legacy(legacy)) as Box<dyn Element>),
        };
        built.unwrap_or_else(|e| self.unknown(record, e.to_string()))
    }

    /// Build the element for a row using its own stored type key.
    pub fn from_record(&self, record: ElementRecord) -> Box<dyn Element> {
        let type_key = record.element.clone();
        self.create(&type_key, record)
    }

    pub fn wrap_legacy(&self, element: Box<dyn LegacyElement>) -> LegacyAdapter {
        LegacyAdapter::new(element, self.diagnostics.clone())
    }

    fn unknown(&self, record: ElementRecord, reason: impl Into<String>) -> Box<dyn Element> {
        let reason = reason.into();
        self.diagnostics.emit(Diagnostic::new(
            DiagnosticKind::UnknownType,
            record.element.as_str(),
            format!("element {} falls back to a placeholder: {reason}", record.id),
        ));
        Box::new(UnknownElement::new(record, reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ElementError;
    use crate::registry::{ImplementationDescriptor, RegistryBootstrap};
    use semver::Version;
    use tracing_test::traced_test;

    #[derive(Debug)]
    struct OldSignature {
        record: ElementRecord,
    }

    impl LegacyElement for OldSignature {
        fn record(&self) -> &ElementRecord {
            &self.record
        }

        fn record_mut(&mut self) -> &mut ElementRecord {
            &mut self.record
        }
    }

    fn old_signature(record: ElementRecord) -> Result<Box<dyn LegacyElement>, ElementError> {
        Ok(Box::new(OldSignature { record }))
    }

    fn failing(record: ElementRecord) -> Result<Box<dyn Element>, ElementError> {
        Err(ElementError::InvalidRecord { id: record.id, reason: "corrupt payload".into() })
    }

    fn factory() -> ElementFactory {
        let mut catalog = ImplementationCatalog::with_builtins();
        catalog.register(ImplementationDescriptor::legacy(
            "certforge_element_signature::element",
            Version::new(0, 9, 0),
            old_signature,
        ));
        catalog.register(ImplementationDescriptor::from_record(
            "certforge_element_broken::element",
            Version::new(1, 0, 0),
            failing,
        ));
        let diagnostics = Diagnostics::new();
        let mut registry = RegistryBootstrap::new().build(&catalog, None, &diagnostics);
        registry.register("signature", "certforge_element_signature::element");
        registry.register("broken", "certforge_element_broken::element");
        registry.register("orphan", "certforge_element_orphan::element");
        ElementFactory::new(Arc::new(registry), Arc::new(catalog), diagnostics)
    }

    #[test]
    fn builtin_types_construct_directly() {
        let element = factory().create("text", ElementRecord::new(1, "Title", "text"));
        assert!(element.as_unknown().is_none());
        assert!(element.form_normalizer().is_some());
    }

    #[test]
    fn legacy_types_are_wrapped() {
        let element = factory().create("signature", ElementRecord::new(1, "Sig", "signature"));
        assert!(element.as_unknown().is_none());
        assert!(element.form_normalizer().is_none());
        assert_eq!(element.type_key(), "signature");
    }

    #[test]
    #[traced_test]
    fn unregistered_type_yields_placeholder() {
        let factory = factory();
        let element = factory.create("hologram", ElementRecord::new(1, "Shiny", "hologram"));
        let placeholder = element.as_unknown().expect("placeholder");
        assert_eq!(placeholder.missing_type(), "hologram");
        assert_eq!(factory.diagnostics().of_kind(DiagnosticKind::UnknownType).len(), 1);
        assert!(logs_contain("type key is not registered"));
    }

    #[test]
    fn unresolvable_or_failing_implementations_yield_placeholder() {
        let factory = factory();
        for key in ["orphan", "broken"] {
            let element = factory.create(key, ElementRecord::new(1, key, key));
            assert!(element.as_unknown().is_some(), "{key}");
        }
        let reasons: Vec<_> = factory
            .diagnostics()
            .of_kind(DiagnosticKind::UnknownType)
            .into_iter()
            .map(|d| d.message)
            .collect();
        assert!(reasons[0].contains("No implementation registered"));
        assert!(reasons[1].contains("corrupt payload"));
    }
}
