//! Storage Contract
//!
//! Plain CRUD over the three tables plus transactions. Stores assign
//! identifiers on insert and do not cascade; ordering and cascading are the
//! repositories' job. [`MemoryStore`] is the bundled implementation and can
//! be kept in a JSON file between runs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::model::{ElementId, ElementRecord, PageId, PageRecord, TemplateId, TemplateRecord};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{table} row {id} does not exist")]
    MissingRow { table: &'static str, id: i64 },

    #[error("{table} row references missing parent {parent}")]
    MissingParent { table: &'static str, parent: i64 },

    #[error("No transaction is open")]
    NoTransaction,

    #[error("Storage backend error: {0}")]
    Backend(String),
}

pub trait Store {
    fn begin(&mut self) -> Result<(), StorageError>;
    fn commit(&mut self) -> Result<(), StorageError>;
    fn rollback(&mut self) -> Result<(), StorageError>;

    fn insert_template(&mut self, template: TemplateRecord) -> Result<TemplateRecord, StorageError>;
    fn template(&self, id: TemplateId) -> Result<Option<TemplateRecord>, StorageError>;
    fn templates(&self) -> Result<Vec<TemplateRecord>, StorageError>;
    fn update_template(&mut self, template: &TemplateRecord) -> Result<(), StorageError>;
    fn delete_template(&mut self, id: TemplateId) -> Result<(), StorageError>;

    fn insert_page(&mut self, page: PageRecord) -> Result<PageRecord, StorageError>;
    fn page(&self, id: PageId) -> Result<Option<PageRecord>, StorageError>;
    /// Pages of one template, in no particular order.
    fn pages_of(&self, template_id: TemplateId) -> Result<Vec<PageRecord>, StorageError>;
    fn update_page(&mut self, page: &PageRecord) -> Result<(), StorageError>;
    fn delete_page(&mut self, id: PageId) -> Result<(), StorageError>;

    fn insert_element(&mut self, element: ElementRecord) -> Result<ElementRecord, StorageError>;
    fn element(&self, id: ElementId) -> Result<Option<ElementRecord>, StorageError>;
    /// Elements of one page, in no particular order.
    fn elements_of(&self, page_id: PageId) -> Result<Vec<ElementRecord>, StorageError>;
    fn all_elements(&self) -> Result<Vec<ElementRecord>, StorageError>;
    fn update_element(&mut self, element: &ElementRecord) -> Result<(), StorageError>;
    fn delete_element(&mut self, id: ElementId) -> Result<(), StorageError>;
}

/// Run `work` atomically: commit on success, roll back on any error and
/// hand back the error that caused it.
pub fn transaction<S, T, E, F>(store: &mut S, work: F) -> Result<T, E>
where
    S: Store + ?Sized,
    E: From<StorageError>,
    F: FnOnce(&mut S) -> Result<T, E>,
{
    store.begin()?;
    match work(store) {
        Ok(value) => {
            store.commit()?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback) = store.rollback() {
                tracing::error!(error = %rollback, "rollback failed");
            }
            Err(e)
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
struct Tables {
    next_template_id: i64,
    next_page_id: i64,
    next_element_id: i64,
    templates: BTreeMap<TemplateId, TemplateRecord>,
    pages: BTreeMap<PageId, PageRecord>,
    elements: BTreeMap<ElementId, ElementRecord>,
}

fn next(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

/// In-process store; transactions snapshot the tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Tables,
    snapshots: Vec<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store saved with [`MemoryStore::save`]; a missing file is an
    /// empty store.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = fs::read_to_string(path)?;
        let tables = serde_json::from_str(&content)?;
        Ok(Self { tables, snapshots: Vec::new() })
    }

    pub fn save(&self, path: &Path) -> Result<(), StorageError> {
        if !self.snapshots.is_empty() {
            return Err(StorageError::Backend("cannot save with an open transaction".into()));
        }
        let content = serde_json::to_string_pretty(&self.tables)?;
        let staging = path.with_extension("tmp");
        fs::write(&staging, content)?;
        fs::rename(&staging, path)?;
        Ok(())
    }

    pub fn in_transaction(&self) -> bool {
        !self.snapshots.is_empty()
    }

    pub fn counts(&self) -> (usize, usize, usize) {
        (
            self.tables.templates.len(),
            self.tables.pages.len(),
            self.tables.elements.len(),
        )
    }
}

impl Store for MemoryStore {
    fn begin(&mut self) -> Result<(), StorageError> {
        self.snapshots.push(self.tables.clone());
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        self.snapshots.pop().map(|_| ()).ok_or(StorageError::NoTransaction)
    }

    fn rollback(&mut self) -> Result<(), StorageError> {
        self.tables = self.snapshots.pop().ok_or(StorageError::NoTransaction)?;
        Ok(())
    }

    fn insert_template(
        &mut self,
        mut template: TemplateRecord,
    ) -> Result<TemplateRecord, StorageError> {
        template.id = next(&mut self.tables.next_template_id);
        self.tables.templates.insert(template.id, template.clone());
        Ok(template)
    }

    fn template(&self, id: TemplateId) -> Result<Option<TemplateRecord>, StorageError> {
        Ok(self.tables.templates.get(&id).cloned())
    }

    fn templates(&self) -> Result<Vec<TemplateRecord>, StorageError> {
        Ok(self.tables.templates.values().cloned().collect())
    }

    fn update_template(&mut self, template: &TemplateRecord) -> Result<(), StorageError> {
        let row = self
            .tables
            .templates
            .get_mut(&template.id)
            .ok_or(StorageError::MissingRow { table: "template", id: template.id })?;
        *row = template.clone();
        Ok(())
    }

    fn delete_template(&mut self, id: TemplateId) -> Result<(), StorageError> {
        self.tables.templates.remove(&id);
        Ok(())
    }

    fn insert_page(&mut self, mut page: PageRecord) -> Result<PageRecord, StorageError> {
        if !self.tables.templates.contains_key(&page.template_id) {
            return Err(StorageError::MissingParent { table: "page", parent: page.template_id });
        }
        page.id = next(&mut self.tables.next_page_id);
        self.tables.pages.insert(page.id, page.clone());
        Ok(page)
    }

    fn page(&self, id: PageId) -> Result<Option<PageRecord>, StorageError> {
        Ok(self.tables.pages.get(&id).cloned())
    }

    fn pages_of(&self, template_id: TemplateId) -> Result<Vec<PageRecord>, StorageError> {
        Ok(self
            .tables
            .pages
            .values()
            .filter(|p| p.template_id == template_id)
            .cloned()
            .collect())
    }

    fn update_page(&mut self, page: &PageRecord) -> Result<(), StorageError> {
        let row = self
            .tables
            .pages
            .get_mut(&page.id)
            .ok_or(StorageError::MissingRow { table: "page", id: page.id })?;
        *row = page.clone();
        Ok(())
    }

    fn delete_page(&mut self, id: PageId) -> Result<(), StorageError> {
        self.tables.pages.remove(&id);
        Ok(())
    }

    fn insert_element(
        &mut self,
        mut element: ElementRecord,
    ) -> Result<ElementRecord, StorageError> {
        if !self.tables.pages.contains_key(&element.page_id) {
            return Err(StorageError::MissingParent { table: "element", parent: element.page_id });
        }
        element.id = next(&mut self.tables.next_element_id);
        self.tables.elements.insert(element.id, element.clone());
        Ok(element)
    }

    fn element(&self, id: ElementId) -> Result<Option<ElementRecord>, StorageError> {
        Ok(self.tables.elements.get(&id).cloned())
    }

    fn elements_of(&self, page_id: PageId) -> Result<Vec<ElementRecord>, StorageError> {
        Ok(self
            .tables
            .elements
            .values()
            .filter(|e| e.page_id == page_id)
            .cloned()
            .collect())
    }

    fn all_elements(&self) -> Result<Vec<ElementRecord>, StorageError> {
        Ok(self.tables.elements.values().cloned().collect())
    }

    fn update_element(&mut self, element: &ElementRecord) -> Result<(), StorageError> {
        let row = self
            .tables
            .elements
            .get_mut(&element.id)
            .ok_or(StorageError::MissingRow { table: "element", id: element.id })?;
        *row = element.clone();
        Ok(())
    }

    fn delete_element(&mut self, id: ElementId) -> Result<(), StorageError> {
        self.tables.elements.remove(&id);
        Ok(())
    }
}
