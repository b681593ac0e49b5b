//! Template Service - Single Entry Point
//!
//! Every change to templates, pages and elements made through the crate goes
//! through [`TemplateService`]. Element forms are validated before anything
//! is written, element hooks run where the element's lifecycle requires, and
//! operations touching a whole template run inside one transaction that is
//! rolled back completely when any step fails.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex};

use crate::config::{CoreConfig, UnknownTypePolicy};
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::element::{form_int, form_str, Element, FormInput, RestoreContext};
use crate::error::{CoreError, CoreResult};
use crate::factory::ElementFactory;
use crate::hashing::layout_fingerprint;
use crate::migration::{migrate_record, RecordMigration};
use crate::model::{
    Alignment, ElementId, ElementRecord, PageId, PageRecord, PageSpec, RefPoint, TemplateContext,
    TemplateId, TemplateRecord,
};
use crate::persistence::to_json_data;
use crate::registry::{DiscoveryProvider, ImplementationCatalog, RegistryBootstrap};
use crate::render::{render_html, render_pdf, DocumentContext, RenderCapability};
use crate::repository::{
    ordered, CopySummary, Direction, ElementRepository, PageRepository, TemplateRepository,
};
use crate::storage::{transaction, Store};
use crate::validation::Validator;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TemplateEvent {
    Created { template_id: TemplateId },
    Updated { template_id: TemplateId },
    Deleted { template_id: TemplateId },
}

pub trait EventSink: Send + Sync {
    fn notify(&self, event: TemplateEvent);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn notify(&self, _event: TemplateEvent) {}
}

/// Keeps every event; clones share one list.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<TemplateEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TemplateEvent> {
        self.events.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

impl EventSink for RecordingSink {
    fn notify(&self, event: TemplateEvent) {
        self.events.lock().unwrap_or_else(|p| p.into_inner()).push(event);
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MigrationReport {
    pub examined: usize,
    pub rewritten: usize,
    /// Rewritten rows whose bare value was wrapped under `value`.
    pub wrapped: usize,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RestoreReport {
    pub examined: usize,
    pub updated: usize,
    pub failed: usize,
}

/// Markup of one page's elements, in order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PagePreview {
    pub page_id: PageId,
    pub sequence: u32,
    pub markup: Vec<String>,
}

pub struct TemplateService<S: Store> {
    store: S,
    factory: ElementFactory,
    validator: Validator,
    config: CoreConfig,
    events: Box<dyn EventSink>,
}

impl<S: Store> TemplateService<S> {
    pub fn new(store: S, factory: ElementFactory, config: CoreConfig) -> Self {
        Self {
            store,
            factory,
            validator: Validator::new(),
            config,
            events: Box::new(NoopSink),
        }
    }

    /// Service over the built-in element types plus whatever `provider`
    /// discovers.
    pub fn bootstrap(
        store: S,
        config: CoreConfig,
        catalog: ImplementationCatalog,
        bootstrap: &RegistryBootstrap,
        provider: Option<&dyn DiscoveryProvider>,
    ) -> Self {
        let diagnostics = Diagnostics::new();
        let registry = bootstrap.build(&catalog, provider, &diagnostics);
        let factory = ElementFactory::new(Arc::new(registry), Arc::new(catalog), diagnostics);
        Self::new(store, factory, config)
    }

    pub fn with_builtins(store: S, config: CoreConfig) -> Self {
        let catalog = ImplementationCatalog::with_builtins();
        Self::bootstrap(store, config, catalog, &RegistryBootstrap::new(), None)
    }

    pub fn with_events(mut self, events: Box<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Validator applied to every element form, see [`Validator::with_rule`].
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn factory(&self) -> &ElementFactory {
        &self.factory
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        self.factory.diagnostics()
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    // Reads

    pub fn templates(&self) -> CoreResult<Vec<TemplateRecord>> {
        let mut templates = self.store.templates()?;
        templates.sort_by_key(|t| t.id);
        Ok(templates)
    }

    pub fn template(&self, id: TemplateId) -> CoreResult<TemplateRecord> {
        self.store
            .template(id)?
            .ok_or_else(|| CoreError::not_found("template", id))
    }

    pub fn pages(&self, template_id: TemplateId) -> CoreResult<Vec<PageRecord>> {
        self.template(template_id)?;
        Ok(ordered(self.store.pages_of(template_id)?))
    }

    pub fn element_rows(&self, page_id: PageId) -> CoreResult<Vec<ElementRecord>> {
        if self.store.page(page_id)?.is_none() {
            return Err(CoreError::not_found("page", page_id));
        }
        Ok(ordered(self.store.elements_of(page_id)?))
    }

    /// Resolved elements of a page in order. Unresolvable types never fail
    /// the load; `policy` decides whether they are kept as placeholders.
    pub fn load_page_elements(
        &self,
        page_id: PageId,
        policy: UnknownTypePolicy,
    ) -> CoreResult<Vec<Box<dyn Element>>> {
        let mut elements = Vec::new();
        for record in self.element_rows(page_id)? {
            let element = self.factory.from_record(record);
            if let Some(unknown) = element.as_unknown() {
                if policy == UnknownTypePolicy::Skip {
                    tracing::warn!(
                        element = element.id(),
                        missing = unknown.missing_type(),
                        "skipping element of unknown type"
                    );
                    continue;
                }
                tracing::warn!(
                    element = element.id(),
                    missing = unknown.missing_type(),
                    "keeping placeholder"
                );
            }
            elements.push(element);
        }
        Ok(elements)
    }

    // Templates

    /// Create a template with its first page.
    pub fn create_template(
        &mut self,
        name: &str,
        context: TemplateContext,
    ) -> CoreResult<TemplateRecord> {
        let page_spec = self.config.page_defaults;
        let template = transaction(&mut self.store, |tx| {
            let template = TemplateRepository::new(&mut *tx).create(name, context)?;
            PageRepository::new(tx).create(template.id, page_spec, None)?;
            Ok::<_, CoreError>(template)
        })?;
        tracing::info!(template_id = template.id, name = %template.name, "template created");
        self.events.notify(TemplateEvent::Created { template_id: template.id });
        Ok(template)
    }

    pub fn rename_template(&mut self, id: TemplateId, name: &str) -> CoreResult<TemplateRecord> {
        let template = TemplateRepository::new(&mut self.store).rename(id, name)?;
        self.events.notify(TemplateEvent::Updated { template_id: id });
        Ok(template)
    }

    /// Delete a template, running each element's delete hook first.
    pub fn delete_template(&mut self, id: TemplateId) -> CoreResult<()> {
        let factory = &self.factory;
        transaction(&mut self.store, |tx| {
            for page in tx.pages_of(id)? {
                run_delete_hooks(factory, &*tx, page.id)?;
            }
            TemplateRepository::new(tx).delete(id)
        })?;
        tracing::info!(template_id = id, "template deleted");
        self.events.notify(TemplateEvent::Deleted { template_id: id });
        Ok(())
    }

    /// Copy a template; see [`crate::repository::copy_name`] for the name
    /// used when `name` is `None`.
    pub fn duplicate(
        &mut self,
        source: TemplateId,
        name: Option<&str>,
    ) -> CoreResult<TemplateRecord> {
        let (copy, summary) = transaction(&mut self.store, |tx| {
            TemplateRepository::new(tx).duplicate(source, name)
        })?;
        tracing::info!(
            source,
            template_id = copy.id,
            pages = summary.pages,
            elements = summary.elements,
            "template duplicated"
        );
        self.events.notify(TemplateEvent::Created { template_id: copy.id });
        Ok(copy)
    }

    /// Replace `target`'s content with a copy of `source`'s.
    pub fn load(&mut self, target: TemplateId, source: TemplateId) -> CoreResult<CopySummary> {
        let factory = &self.factory;
        let summary = transaction(&mut self.store, |tx| {
            let repository = TemplateRepository::new(&mut *tx);
            repository.get(source)?;
            if target == source {
                return Err(CoreError::Validation(
                    "source: A template cannot be loaded into itself".into(),
                ));
            }
            for page in tx.pages_of(target)? {
                run_delete_hooks(factory, &*tx, page.id)?;
            }
            TemplateRepository::new(tx).replace_content(target, source)
        })?;
        let template = self.template(target)?;
        tracing::info!(
            target,
            source,
            pages = summary.pages,
            elements = summary.elements,
            "template loaded"
        );
        if template.context.is_module() {
            self.events.notify(TemplateEvent::Updated { template_id: target });
        }
        Ok(summary)
    }

    /// Append a copy of `source`'s pages to `target`.
    pub fn copy_to_template(
        &mut self,
        target: TemplateId,
        source: TemplateId,
    ) -> CoreResult<CopySummary> {
        let summary = transaction(&mut self.store, |tx| {
            TemplateRepository::new(tx).copy_content(target, source)
        })?;
        tracing::info!(target, source, pages = summary.pages, "pages copied");
        self.events.notify(TemplateEvent::Updated { template_id: target });
        Ok(summary)
    }

    // Pages

    /// Add a page at the end; `spec` defaults to the configured page size.
    pub fn add_page(
        &mut self,
        template_id: TemplateId,
        spec: Option<PageSpec>,
    ) -> CoreResult<PageRecord> {
        let spec = spec.unwrap_or(self.config.page_defaults);
        PageRepository::new(&mut self.store).create(template_id, spec, None)
    }

    pub fn update_page(&mut self, id: PageId, spec: PageSpec) -> CoreResult<PageRecord> {
        PageRepository::new(&mut self.store).update(id, spec)
    }

    /// Delete a page and its elements. The last page of a template stays.
    pub fn delete_page(&mut self, id: PageId) -> CoreResult<()> {
        let factory = &self.factory;
        transaction(&mut self.store, |tx| {
            let page = PageRepository::new(&mut *tx).get(id)?;
            if tx.pages_of(page.template_id)?.len() <= 1 {
                return Err(CoreError::Validation(
                    "page: A template needs at least one page".into(),
                ));
            }
            run_delete_hooks(factory, &*tx, id)?;
            PageRepository::new(tx).delete(id)
        })
    }

    pub fn move_page(&mut self, id: PageId, direction: Direction) -> CoreResult<bool> {
        PageRepository::new(&mut self.store).move_page(id, direction)
    }

    // Elements

    /// Add an element of `type_key` from submitted form input.
    #[track_caller]
    pub fn add_element(
        &mut self,
        page_id: PageId,
        type_key: &str,
        form: &FormInput,
    ) -> CoreResult<ElementRecord> {
        self.factory.registry().get(type_key)?;
        let mut form = form.clone();
        form.entry("name").or_insert_with(|| Value::String(String::new()));
        self.config.element_defaults.fill_form(&mut form);

        let mut record = ElementRecord::new(page_id, "", type_key);
        record.refpoint = self.config.element_defaults.refpoint;
        record.alignment = self.config.element_defaults.alignment;
        let element = self.factory.create(type_key, record);
        if let Some(unknown) = element.as_unknown() {
            return Err(CoreError::Validation(format!("element: {}", unknown.reason())));
        }
        self.validator.validate(&form).merge(element.validate_form(&form)).into_result()?;

        let mut record = element.record().clone();
        apply_form(&mut record, &form);
        record.data = non_empty(to_json_data(element.as_ref(), &form, self.factory.diagnostics()));
        ElementRepository::new(&mut self.store).create(record, None)
    }

    /// Apply an edit form to an existing element. Visual values the form
    /// leaves out keep what the element already has, from its envelope or
    /// its legacy columns.
    #[track_caller]
    pub fn update_element(&mut self, id: ElementId, form: &FormInput) -> CoreResult<ElementRecord> {
        let record = ElementRepository::new(&mut self.store).get(id)?;
        let element = self.factory.from_record(record);
        if let Some(unknown) = element.as_unknown() {
            return Err(CoreError::Validation(format!(
                "element: '{}' cannot be edited: {}",
                unknown.missing_type(),
                unknown.reason()
            )));
        }
        self.validator.validate(form).merge(element.validate_form(form)).into_result()?;

        let mut form = form.clone();
        let mut record = element.record().clone();
        for (key, value) in [
            ("width", element.width().map(Value::from)),
            ("font", element.font().map(Value::from)),
            ("fontsize", element.fontsize().map(Value::from)),
            ("colour", element.colour().map(Value::from)),
        ] {
            if let Some(value) = value {
                form.entry(key).or_insert(value);
            }
        }

        apply_form(&mut record, &form);
        record.data = non_empty(to_json_data(element.as_ref(), &form, self.factory.diagnostics()));
        record.clear_visual_columns();
        ElementRepository::new(&mut self.store).save(&record)
    }

    pub fn delete_element(&mut self, id: ElementId) -> CoreResult<()> {
        let factory = &self.factory;
        transaction(&mut self.store, |tx| {
            let record = ElementRepository::new(&mut *tx).get(id)?;
            factory.from_record(record).on_delete()?;
            ElementRepository::new(tx).delete(id)
        })
    }

    pub fn move_element(&mut self, id: ElementId, direction: Direction) -> CoreResult<bool> {
        ElementRepository::new(&mut self.store).move_element(id, direction)
    }

    /// Write an element's record back as held.
    pub fn save_element(&mut self, element: &dyn Element) -> CoreResult<ElementRecord> {
        ElementRepository::new(&mut self.store).save(element.record())
    }

    // Rendering

    pub fn render_document(
        &self,
        template_id: TemplateId,
        renderer: &dyn RenderCapability,
    ) -> CoreResult<DocumentContext> {
        let mut doc = DocumentContext::new();
        for page in self.pages(template_id)? {
            doc.start_page(&page);
            for element in self.load_page_elements(page.id, self.config.unknown_type_policy)? {
                render_pdf(element.as_ref(), renderer, &mut doc)?;
            }
        }
        Ok(doc)
    }

    pub fn preview_html(
        &self,
        template_id: TemplateId,
        renderer: &dyn RenderCapability,
    ) -> CoreResult<Vec<PagePreview>> {
        let mut previews = Vec::new();
        for page in self.pages(template_id)? {
            let mut markup = Vec::new();
            for element in self.load_page_elements(page.id, self.config.unknown_type_policy)? {
                markup.push(render_html(element.as_ref(), renderer)?);
            }
            previews.push(PagePreview { page_id: page.id, sequence: page.sequence, markup });
        }
        Ok(previews)
    }

    // Maintenance

    /// Run every element's restore hook after a template was restored from
    /// a backup. A failing hook is logged and does not stop the others.
    pub fn run_after_restore(
        &mut self,
        template_id: TemplateId,
        ctx: &RestoreContext,
    ) -> CoreResult<RestoreReport> {
        let mut report = RestoreReport::default();
        for page in self.pages(template_id)? {
            for record in self.element_rows(page.id)? {
                report.examined += 1;
                let before = record.clone();
                let mut element = self.factory.from_record(record);
                if let Err(e) = element.after_restore(ctx) {
                    tracing::warn!(element = element.id(), error = %e, "restore hook failed");
                    report.failed += 1;
                    continue;
                }
                if *element.record() != before {
                    ElementRepository::new(&mut self.store).save(element.record())?;
                    report.updated += 1;
                }
            }
        }
        Ok(report)
    }

    /// Rewrite every stored element into the canonical envelope.
    pub fn migrate_legacy_rows(&mut self) -> CoreResult<MigrationReport> {
        let diagnostics = self.factory.diagnostics().clone();
        let report = transaction(&mut self.store, |tx| {
            let mut report = MigrationReport::default();
            for mut record in tx.all_elements()? {
                report.examined += 1;
                let outcome = migrate_record(&mut record);
                if outcome == RecordMigration::Unchanged {
                    continue;
                }
                if outcome == RecordMigration::WrappedScalar {
                    report.wrapped += 1;
                    diagnostics.emit(Diagnostic::new(
                        DiagnosticKind::Migration,
                        record.element.as_str(),
                        format!("element {} had a bare value; wrapped under 'value'", record.id),
                    ));
                }
                tx.update_element(&record)?;
                report.rewritten += 1;
            }
            Ok::<_, CoreError>(report)
        })?;
        tracing::info!(
            examined = report.examined,
            rewritten = report.rewritten,
            "legacy rows migrated"
        );
        Ok(report)
    }

    pub fn fingerprint(&self, template_id: TemplateId) -> CoreResult<String> {
        let mut layout = Vec::new();
        for page in self.pages(template_id)? {
            let elements = self.element_rows(page.id)?;
            layout.push((page, elements));
        }
        Ok(layout_fingerprint(&layout)?)
    }

    /// Sequence integrity of every page and element list under a template.
    pub fn check_sequences(&mut self, template_id: TemplateId) -> CoreResult<()> {
        PageRepository::new(&mut self.store).check_sequences(template_id)?;
        for page in self.pages(template_id)? {
            ElementRepository::new(&mut self.store).check_sequences(page.id)?;
        }
        Ok(())
    }
}

fn run_delete_hooks<S: Store + ?Sized>(
    factory: &ElementFactory,
    store: &S,
    page_id: PageId,
) -> CoreResult<()> {
    for record in store.elements_of(page_id)? {
        factory.from_record(record).on_delete()?;
    }
    Ok(())
}

fn non_empty(data: String) -> Option<String> {
    if data.is_empty() {
        None
    } else {
        Some(data)
    }
}

/// Copy the shared element fields (name, placement) out of a form.
fn apply_form(record: &mut ElementRecord, form: &FormInput) {
    if let Some(name) = form_str(form, "name") {
        record.name = name.trim().to_string();
    }
    if let Some(posx) = form_int(form, "posx") {
        record.posx = posx;
    }
    if let Some(posy) = form_int(form, "posy") {
        record.posy = posy;
    }
    if let Some(refpoint) = form.get("refpoint").and_then(|v| RefPoint::deserialize(v).ok()) {
        record.refpoint = refpoint;
    }
    if let Some(alignment) = form.get("alignment").and_then(|v| Alignment::deserialize(v).ok()) {
        record.alignment = alignment;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ContextKind, RefPoint};
    use crate::storage::MemoryStore;
    use crate::validation::{ValidationRule, ValidationViolation};
    use serde_json::json;
    use tracing_test::traced_test;

    fn service() -> TemplateService<MemoryStore> {
        TemplateService::with_builtins(MemoryStore::new(), CoreConfig::default())
    }

    fn form(value: Value) -> FormInput {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn new_template_gets_default_page() {
        let mut service = service();
        let template = service.create_template("  Award ", TemplateContext::system()).unwrap();
        assert_eq!(template.name, "Award");
        let pages = service.pages(template.id).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].spec(), PageSpec::default());
    }

    #[test]
    fn element_form_defaults_land_in_envelope() {
        let mut service = service();
        let template = service.create_template("Award", TemplateContext::system()).unwrap();
        let page = service.pages(template.id).unwrap()[0].id;

        let record = service
            .add_element(
                page,
                "text",
                &form(json!({
                    "name": "Title",
                    "text": "Well done",
                    "posx": 10,
                    "refpoint": "top_center",
                })),
            )
            .unwrap();
        assert_eq!(record.sequence, 1);
        assert_eq!(record.refpoint, RefPoint::TopCenter);
        assert_eq!(
            record.data.as_deref(),
            Some(
                r##"{"text":"Well done","width":0,"font":"times","fontsize":12,"colour":"#000000"}"##
            )
        );
    }

    #[test]
    fn invalid_forms_write_nothing() {
        let mut service = service();
        let template = service.create_template("Award", TemplateContext::system()).unwrap();
        let page = service.pages(template.id).unwrap()[0].id;

        let err = service
            .add_element(page, "text", &form(json!({"name": "Title", "text": "", "colour": "red"})))
            .unwrap_err();
        let CoreError::Validation(message) = err else { panic!("expected validation error") };
        assert!(message.contains("colour"));
        assert!(message.contains("text"));
        let err = service.add_element(page, "hologram", &form(json!({"name": "x"}))).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(service.store().counts(), (1, 1, 0));
    }

    #[test]
    fn update_folds_legacy_columns() {
        let mut service = service();
        let template = service.create_template("Award", TemplateContext::system()).unwrap();
        let page = service.pages(template.id).unwrap()[0].id;
        let mut legacy = ElementRecord::new(page, "Old", "text");
        legacy.data = Some("Hello".into());
        legacy.font = Some("helvetica".into());
        let legacy = service.store_mut().insert_element(legacy).unwrap();

        let updated = service
            .update_element(
                legacy.id,
                &form(json!({"name": "Old", "text": "Hello again", "fontsize": 16})),
            )
            .unwrap();
        assert_eq!(updated.font, None);
        assert_eq!(
            updated.data.as_deref(),
            Some(r#"{"text":"Hello again","font":"helvetica","fontsize":16}"#)
        );
    }

    #[test]
    fn update_keeps_envelope_visuals() {
        let mut service = service();
        let template = service.create_template("Award", TemplateContext::system()).unwrap();
        let page = service.pages(template.id).unwrap()[0].id;
        let record = service
            .add_element(
                page,
                "text",
                &form(json!({"name": "T", "text": "Hi", "font": "helvetica", "fontsize": 20})),
            )
            .unwrap();

        let updated = service
            .update_element(record.id, &form(json!({"name": "T", "text": "Bye"})))
            .unwrap();
        assert_eq!(
            updated.data.as_deref(),
            Some(
                r##"{"text":"Bye","width":0,"font":"helvetica","fontsize":20,"colour":"#000000"}"##
            )
        );

        let resized = service
            .update_element(record.id, &form(json!({"name": "T", "text": "Bye", "fontsize": 9})))
            .unwrap();
        assert_eq!(service.factory().from_record(resized).fontsize(), Some(9));
    }

    struct NoDrafts;

    impl ValidationRule for NoDrafts {
        fn name(&self) -> &'static str {
            "no_drafts"
        }

        fn validate(&self, input: &FormInput) -> Vec<ValidationViolation> {
            match form_str(input, "name") {
                Some(name) if name.starts_with("Draft") => {
                    vec![ValidationViolation::error(self.name(), "name", "Drafts cannot be placed")]
                }
                _ => vec![],
            }
        }
    }

    #[test]
    fn host_rules_run_with_the_built_in_ones() {
        let mut service = service().with_validator(Validator::new().with_rule(Box::new(NoDrafts)));
        let template = service.create_template("Award", TemplateContext::system()).unwrap();
        let page = service.pages(template.id).unwrap()[0].id;

        let err = service
            .add_element(
                page,
                "text",
                &form(json!({"name": "Draft title", "text": "Hi", "colour": "red"})),
            )
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Drafts cannot be placed"));
        assert!(message.contains("colour"));
        let title = form(json!({"name": "Title", "text": "Hi"}));
        assert!(service.add_element(page, "text", &title).is_ok());
    }

    #[test]
    fn last_page_cannot_be_deleted() {
        let mut service = service();
        let template = service.create_template("Award", TemplateContext::system()).unwrap();
        let first = service.pages(template.id).unwrap()[0].id;
        assert!(matches!(service.delete_page(first), Err(CoreError::Validation(_))));

        service.add_page(template.id, None).unwrap();
        service.delete_page(first).unwrap();
        assert_eq!(service.pages(template.id).unwrap()[0].sequence, 1);
    }

    #[test]
    fn load_notifies_only_module_templates() {
        let sink = RecordingSink::new();
        let mut service = service().with_events(Box::new(sink.clone()));
        let source = service.create_template("Source", TemplateContext::system()).unwrap();
        let system = service.create_template("System", TemplateContext::system()).unwrap();
        let module = service
            .create_template("Module", TemplateContext { id: 12, kind: ContextKind::Module })
            .unwrap();

        service.load(system.id, source.id).unwrap();
        service.load(module.id, source.id).unwrap();
        let updates: Vec<_> = sink
            .events()
            .into_iter()
            .filter(|e| matches!(e, TemplateEvent::Updated { .. }))
            .collect();
        assert_eq!(updates, vec![TemplateEvent::Updated { template_id: module.id }]);
    }

    #[test]
    fn loading_into_itself_is_rejected() {
        let mut service = service();
        let template = service.create_template("Award", TemplateContext::system()).unwrap();
        assert!(matches!(service.load(template.id, template.id), Err(CoreError::Validation(_))));
        assert_eq!(service.pages(template.id).unwrap().len(), 1);
    }

    #[test]
    #[traced_test]
    fn skipped_unknown_elements_are_logged() {
        let mut service = service();
        let template = service.create_template("Award", TemplateContext::system()).unwrap();
        let page = service.pages(template.id).unwrap()[0].id;
        service.store_mut().insert_element(ElementRecord::new(page, "Gone", "hologram")).unwrap();

        assert!(service.load_page_elements(page, UnknownTypePolicy::Skip).unwrap().is_empty());
        assert!(logs_contain("skipping element of unknown type"));
        assert!(logs_contain("type key is not registered"));
    }
}
