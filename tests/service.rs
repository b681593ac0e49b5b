//! Template service workflows over the public API.

use certforge_core::{
    model::{
        ElementId, ElementRecord, PageId, PageRecord, PageSpec, TemplateContext, TemplateId,
        TemplateRecord,
    },
    registry::third_party_implementation_id,
    render::OutlineRenderer,
    CoreConfig, CoreError, DiagnosticKind, Direction, Element, FormInput, ImplementationCatalog,
    ImplementationDescriptor, MemoryStore, RegistryBootstrap, RestoreContext, StaticDiscovery,
    StorageError, Store, TemplateEvent, TemplateService,
};
use certforge_core::elements::{grade::COURSE_MODULE, TextElement};
use certforge_core::service::RecordingSink;
use serde_json::{json, Value};

fn form(value: Value) -> FormInput {
    value.as_object().cloned().unwrap_or_default()
}

fn service() -> TemplateService<MemoryStore> {
    TemplateService::with_builtins(MemoryStore::new(), CoreConfig::default())
}

/// Template with two pages holding one and two text elements.
fn populated(service: &mut TemplateService<MemoryStore>, name: &str) -> TemplateId {
    let template = service.create_template(name, TemplateContext::system()).unwrap();
    let first = service.pages(template.id).unwrap()[0].id;
    let second = service
        .add_page(template.id, Some(PageSpec { width: 297, height: 210, ..PageSpec::default() }))
        .unwrap()
        .id;
    for (page, text) in [(first, "Certificate"), (second, "Awarded to"), (second, "Signed")] {
        service
            .add_element(page, "text", &form(json!({"name": text, "text": text, "posx": 20})))
            .unwrap();
    }
    template.id
}

/// Memory store whose element inserts start failing after `budget`.
struct FlakyStore {
    inner: MemoryStore,
    budget: usize,
}

impl Store for FlakyStore {
    fn begin(&mut self) -> Result<(), StorageError> {
        self.inner.begin()
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        self.inner.commit()
    }

    fn rollback(&mut self) -> Result<(), StorageError> {
        self.inner.rollback()
    }

    fn insert_template(&mut self, t: TemplateRecord) -> Result<TemplateRecord, StorageError> {
        self.inner.insert_template(t)
    }

    fn template(&self, id: TemplateId) -> Result<Option<TemplateRecord>, StorageError> {
        self.inner.template(id)
    }

    fn templates(&self) -> Result<Vec<TemplateRecord>, StorageError> {
        self.inner.templates()
    }

    fn update_template(&mut self, t: &TemplateRecord) -> Result<(), StorageError> {
        self.inner.update_template(t)
    }

    fn delete_template(&mut self, id: TemplateId) -> Result<(), StorageError> {
        self.inner.delete_template(id)
    }

    fn insert_page(&mut self, p: PageRecord) -> Result<PageRecord, StorageError> {
        self.inner.insert_page(p)
    }

    fn page(&self, id: PageId) -> Result<Option<PageRecord>, StorageError> {
        self.inner.page(id)
    }

    fn pages_of(&self, id: TemplateId) -> Result<Vec<PageRecord>, StorageError> {
        self.inner.pages_of(id)
    }

    fn update_page(&mut self, p: &PageRecord) -> Result<(), StorageError> {
        self.inner.update_page(p)
    }

    fn delete_page(&mut self, id: PageId) -> Result<(), StorageError> {
        self.inner.delete_page(id)
    }

    fn insert_element(&mut self, e: ElementRecord) -> Result<ElementRecord, StorageError> {
        if self.budget == 0 {
            return Err(StorageError::Backend("simulated write failure".into()));
        }
        self.budget -= 1;
        self.inner.insert_element(e)
    }

    fn element(&self, id: ElementId) -> Result<Option<ElementRecord>, StorageError> {
        self.inner.element(id)
    }

    fn elements_of(&self, id: PageId) -> Result<Vec<ElementRecord>, StorageError> {
        self.inner.elements_of(id)
    }

    fn all_elements(&self) -> Result<Vec<ElementRecord>, StorageError> {
        self.inner.all_elements()
    }

    fn update_element(&mut self, e: &ElementRecord) -> Result<(), StorageError> {
        self.inner.update_element(e)
    }

    fn delete_element(&mut self, id: ElementId) -> Result<(), StorageError> {
        self.inner.delete_element(id)
    }
}

#[test]
fn failed_load_rolls_back_everything() {
    let mut setup = service();
    let target = populated(&mut setup, "Target");
    let source = populated(&mut setup, "Source");
    let before = setup.fingerprint(target).unwrap();
    let counts = setup.store().counts();

    // One element copies fine, the second insert fails mid-replace.
    let store = FlakyStore { inner: setup.into_store(), budget: 1 };
    let mut service = TemplateService::with_builtins(store, CoreConfig::default());
    let err = service.load(target, source).unwrap_err();
    assert!(matches!(err, CoreError::Storage(StorageError::Backend(_))));

    assert_eq!(service.fingerprint(target).unwrap(), before);
    assert_eq!(service.store().inner.counts(), counts);
    assert!(!service.store().inner.in_transaction());
}

#[test]
fn duplicate_preserves_layout() {
    let mut service = service();
    let source = populated(&mut service, "Gold");
    let copy = service.duplicate(source, None).unwrap();

    assert_eq!(copy.name, "Gold (copy)");
    assert_ne!(copy.id, source);
    assert_eq!(service.fingerprint(copy.id).unwrap(), service.fingerprint(source).unwrap());
    service.check_sequences(copy.id).unwrap();
}

#[test]
fn copy_to_template_appends_pages() {
    let mut service = service();
    let target = populated(&mut service, "Target");
    let source = populated(&mut service, "Source");

    let summary = service.copy_to_template(target, source).unwrap();
    assert_eq!((summary.pages, summary.elements), (2, 3));

    let pages = service.pages(target).unwrap();
    assert_eq!(pages.iter().map(|p| p.sequence).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    assert_eq!(pages[2].width, 210);
    assert_eq!(pages[3].width, 297);
    assert_eq!(service.pages(source).unwrap().len(), 2);
}

#[test]
fn moving_elements_swaps_neighbours() {
    let mut service = service();
    let template = populated(&mut service, "Award");
    let page = service.pages(template).unwrap()[1].id;
    let rows = service.element_rows(page).unwrap();

    assert!(service.move_element(rows[1].id, Direction::Up).unwrap());
    let names: Vec<_> = service.element_rows(page).unwrap().into_iter().map(|e| e.name).collect();
    assert_eq!(names, vec!["Signed", "Awarded to"]);
    assert!(!service.move_element(rows[1].id, Direction::Up).unwrap());
}

#[test]
fn saving_keeps_unknown_envelope_keys() {
    let mut service = service();
    let template = service.create_template("Award", TemplateContext::system()).unwrap();
    let page = service.pages(template.id).unwrap()[0].id;
    let mut record = ElementRecord::new(page, "Title", "text");
    record.data = Some(r#"{"text":"Hi","plugin_extra":{"kept":true}}"#.into());
    let record = service.store_mut().insert_element(record).unwrap();

    let mut element = service.load_page_elements(page, Default::default()).unwrap().remove(0);
    element.record_mut().posx = 40;
    service.save_element(element.as_ref()).unwrap();

    let saved = service.store().element(record.id).unwrap().unwrap();
    assert_eq!(saved.posx, 40);
    assert_eq!(saved.data.as_deref(), Some(r#"{"text":"Hi","plugin_extra":{"kept":true}}"#));
}

#[test]
fn legacy_rows_are_migrated_in_place() {
    let mut service = service();
    let template = service.create_template("Award", TemplateContext::system()).unwrap();
    let page = service.pages(template.id).unwrap()[0].id;

    let mut border = ElementRecord::new(page, "Frame", "border");
    border.data = Some("4".into());
    border.colour = Some("#ff0000".into());
    let mut text = ElementRecord::new(page, "Title", "text");
    text.data = Some("Welcome".into());
    text.fontsize = Some(20);
    let canonical = ElementRecord::new(page, "Fine", "text");
    let ids: Vec<_> = [border, text, canonical]
        .into_iter()
        .map(|r| service.store_mut().insert_element(r).unwrap().id)
        .collect();

    let report = service.migrate_legacy_rows().unwrap();
    assert_eq!((report.examined, report.rewritten, report.wrapped), (3, 2, 1));
    assert_eq!(service.diagnostics().of_kind(DiagnosticKind::Migration).len(), 1);

    let border = service.store().element(ids[0]).unwrap().unwrap();
    assert_eq!(border.data.as_deref(), Some(r##"{"width":4,"colour":"#ff0000"}"##));
    assert_eq!(border.colour, None);
    let text = service.store().element(ids[1]).unwrap().unwrap();
    assert_eq!(text.data.as_deref(), Some(r#"{"value":"Welcome","fontsize":20}"#));

    let again = service.migrate_legacy_rows().unwrap();
    assert_eq!(again.rewritten, 0);
}

#[test]
fn discovered_types_are_usable() {
    let mut catalog = ImplementationCatalog::with_builtins();
    catalog.register(ImplementationDescriptor::from_record(
        third_party_implementation_id("stamp"),
        semver::Version::new(1, 2, 0),
        TextElement::from_record,
    ));
    let provider = StaticDiscovery::new("plugins", ["stamp", "text", "ghost"]);
    let bootstrap = RegistryBootstrap::new();
    let mut service = TemplateService::bootstrap(
        MemoryStore::new(),
        CoreConfig::default(),
        catalog,
        &bootstrap,
        Some(&provider),
    );

    let template = service.create_template("Award", TemplateContext::system()).unwrap();
    let page = service.pages(template.id).unwrap()[0].id;
    let stamp = service
        .add_element(page, "stamp", &form(json!({"name": "Stamp", "text": "OK"})))
        .unwrap();
    assert_eq!(stamp.element, "stamp");
    assert!(service.add_element(page, "ghost", &form(json!({"name": "Ghost"}))).is_err());
    assert_eq!(service.diagnostics().of_kind(DiagnosticKind::Discovery).len(), 1);
}

#[test]
fn preview_and_document_skip_nothing_resolvable() {
    let mut service = service();
    let template = populated(&mut service, "Award");
    let second = service.pages(template).unwrap()[1].id;
    let mut gone = ElementRecord::new(second, "Gone", "hologram");
    gone.sequence = 3;
    service.store_mut().insert_element(gone).unwrap();

    let doc = service.render_document(template, &OutlineRenderer).unwrap();
    assert_eq!(doc.pages.len(), 2);
    assert_eq!(doc.pages[1].spec.width, 297);
    assert_eq!(doc.item_count(), 3);

    let previews = service.preview_html(template, &OutlineRenderer).unwrap();
    assert_eq!(previews[1].markup.len(), 3);
    assert!(previews[1].markup[2].contains("hologram"));
}

#[test]
fn store_survives_a_round_trip_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("certforge.json");

    let mut service = service();
    let template = populated(&mut service, "Award");
    let fingerprint = service.fingerprint(template).unwrap();
    service.store().save(&path).unwrap();

    let store = MemoryStore::open(&path).unwrap();
    let reopened = TemplateService::with_builtins(store, CoreConfig::default());
    assert_eq!(reopened.fingerprint(template).unwrap(), fingerprint);
    assert_eq!(reopened.templates().unwrap()[0].name, "Award");
}

#[test]
fn deleting_a_template_cascades() {
    let mut service = service();
    let keep = populated(&mut service, "Keep");
    let gone = populated(&mut service, "Gone");
    service.delete_template(gone).unwrap();

    assert!(service.template(gone).unwrap_err().is_not_found());
    assert_eq!(service.store().counts(), (1, 2, 3));
    assert_eq!(service.templates().unwrap()[0].id, keep);
}

#[test]
fn restore_hooks_remap_and_count_failures() {
    let mut service = service();
    let template = service.create_template("Award", TemplateContext::system()).unwrap();
    let page = service.pages(template.id).unwrap()[0].id;
    let mut ids = Vec::new();
    for item in [12, 99, 0] {
        let grade = service
            .add_element(
                page,
                "grade",
                &form(json!({"name": "Grade", "gradeitem": item, "gradeformat": 2})),
            )
            .unwrap();
        ids.push(grade.id);
    }
    service
        .add_element(page, "text", &form(json!({"name": "Title", "text": "Hi"})))
        .unwrap();

    let ctx = RestoreContext::new().map(COURSE_MODULE, 12, 40);
    let report = service.run_after_restore(template.id, &ctx).unwrap();
    assert_eq!((report.examined, report.updated, report.failed), (4, 1, 1));

    let item = |id| {
        let record = service.store().element(id).unwrap().unwrap();
        serde_json::from_str::<Value>(record.data.as_deref().unwrap()).unwrap()["gradeitem"].clone()
    };
    assert_eq!(item(ids[0]), json!(40));
    assert_eq!(item(ids[1]), json!(99));
    assert_eq!(item(ids[2]), json!(0));
}

#[test]
fn renaming_validates_and_notifies() {
    let sink = RecordingSink::new();
    let mut service = service().with_events(Box::new(sink.clone()));
    let template = service.create_template("Award", TemplateContext::system()).unwrap();

    let renamed = service.rename_template(template.id, "  Gold award ").unwrap();
    assert_eq!(renamed.name, "Gold award");
    assert_eq!(service.template(template.id).unwrap().name, "Gold award");
    assert!(matches!(service.rename_template(template.id, "   "), Err(CoreError::Validation(_))));
    assert!(service.rename_template(template.id + 100, "Other").unwrap_err().is_not_found());

    assert_eq!(service.template(template.id).unwrap().name, "Gold award");
    assert_eq!(
        sink.events(),
        vec![
            TemplateEvent::Created { template_id: template.id },
            TemplateEvent::Updated { template_id: template.id },
        ]
    );
}

#[test]
fn page_updates_keep_position_and_reject_bad_sizes() {
    let mut service = service();
    let template = populated(&mut service, "Award");
    let pages = service.pages(template).unwrap();
    let second = pages[1].id;

    let spec = PageSpec { width: 420, height: 297, ..PageSpec::default() };
    let updated = service.update_page(second, spec).unwrap();
    assert_eq!((updated.width, updated.height, updated.sequence), (420, 297, 2));
    assert_eq!(service.pages(template).unwrap()[1].spec(), spec);
    assert_eq!(service.element_rows(second).unwrap().len(), 2);

    let bad = PageSpec { width: 0, ..PageSpec::default() };
    assert!(matches!(service.update_page(second, bad), Err(CoreError::Validation(_))));
    assert_eq!(service.pages(template).unwrap()[1].width, 420);
    assert!(service.update_page(second + 100, spec).unwrap_err().is_not_found());
}
