//! Page, Element and Template Repositories
//!
//! Repositories own the ordering rules: within a parent, sequences are
//! 1-based and contiguous, listing is `(sequence, id)` ascending, and
//! deleting a page or element compacts what is left behind it. Cascading
//! deletes happen here as well, because stores never cascade.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::model::{
    ElementId, ElementRecord, PageId, PageRecord, PageSpec, Sequenced, TemplateContext, TemplateId,
    TemplateRecord, UNSAVED_ID,
};
use crate::storage::{StorageError, Store};
use crate::validation::Validator;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

/// Rows created by a copy, duplicate or replace.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CopySummary {
    pub pages: usize,
    pub elements: usize,
}

/// Siblings in display order.
pub fn ordered<T: Sequenced>(mut rows: Vec<T>) -> Vec<T> {
    rows.sort_by_key(|row| (row.sequence(), row.row_id()));
    rows
}

pub fn next_sequence<T: Sequenced>(rows: &[T]) -> u32 {
    rows.iter().map(Sequenced::sequence).max().unwrap_or(0).saturating_add(1)
}

/// The requested sequence, or the end of `siblings`. Sequences are 1-based.
fn placement<T: Sequenced>(entity: &str, sequence: Option<u32>, siblings: &[T]) -> CoreResult<u32> {
    match sequence {
        Some(0) => Err(CoreError::Validation(format!("sequence: {entity} sequences start at 1"))),
        Some(sequence) => Ok(sequence),
        None => Ok(next_sequence(siblings)),
    }
}

/// Ok when the siblings of one parent are numbered exactly `1..=N`.
pub fn check_sequences<T: Sequenced>(entity: &str, parent: i64, rows: &[T]) -> CoreResult<()> {
    let mut sequences: Vec<u32> = rows.iter().map(Sequenced::sequence).collect();
    sequences.sort_unstable();
    for (position, sequence) in sequences.iter().enumerate() {
        let expected = position as u32 + 1;
        if *sequence != expected {
            return Err(CoreError::Integrity(format!(
                "{entity} sequences under {parent} are {sequences:?}, expected 1..={}",
                sequences.len()
            )));
        }
    }
    Ok(())
}

/// Renumber `rows` to `1..=N` in their current order, writing only the rows
/// whose sequence changed.
fn renumber<T, F>(rows: Vec<T>, mut write: F) -> Result<usize, StorageError>
where
    T: Sequenced,
    F: FnMut(&T) -> Result<(), StorageError>,
{
    let mut changed = 0;
    for (position, mut row) in ordered(rows).into_iter().enumerate() {
        let sequence = position as u32 + 1;
        if row.sequence() != sequence {
            row.set_sequence(sequence);
            write(&row)?;
            changed += 1;
        }
    }
    Ok(changed)
}

/// The row `direction` of `id` among `rows`, paired with the row itself.
fn neighbours<T: Sequenced>(rows: Vec<T>, id: i64, direction: Direction) -> Option<(T, T)> {
    let mut rows = ordered(rows);
    let index = rows.iter().position(|row| row.row_id() == id)?;
    let other = match direction {
        Direction::Up => index.checked_sub(1)?,
        Direction::Down => index + 1,
    };
    if other >= rows.len() {
        return None;
    }
    let (low, high) = (index.min(other), index.max(other));
    let second = rows.swap_remove(high);
    let first = rows.swap_remove(low);
    if low == index {
        Some((first, second))
    } else {
        Some((second, first))
    }
}

fn swap_sequences<T: Sequenced>(a: &mut T, b: &mut T) {
    let sequence = a.sequence();
    a.set_sequence(b.sequence());
    b.set_sequence(sequence);
}

/// Trimmed name, rejected when empty.
pub fn validate_template_name(name: &str) -> CoreResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation("name: Template name is required".into()));
    }
    Ok(trimmed.to_string())
}

/// Name given to a duplicate when none is supplied.
pub fn copy_name(source: &str) -> String {
    let source = source.trim();
    if source.is_empty() {
        "Template (copy)".to_string()
    } else {
        format!("{source} (copy)")
    }
}

pub struct ElementRepository<'a, S: Store + ?Sized> {
    store: &'a mut S,
}

impl<'a, S: Store + ?Sized> ElementRepository<'a, S> {
    pub fn new(store: &'a mut S) -> Self {
        Self { store }
    }

    /// Insert `record` under its page; `sequence` defaults to the end.
    pub fn create(
        &mut self,
        mut record: ElementRecord,
        sequence: Option<u32>,
    ) -> CoreResult<ElementRecord> {
        let siblings = self.siblings(record.page_id)?;
        record.sequence = placement("element", sequence, &siblings)?;
        record.id = UNSAVED_ID;
        let now = Utc::now();
        record.time_created = now;
        record.time_modified = now;
        Ok(self.store.insert_element(record)?)
    }

    /// Insert several elements under one page. A record whose sequence is 0
    /// goes after everything inserted so far; others keep theirs.
    pub fn bulk_create(
        &mut self,
        page_id: PageId,
        records: Vec<ElementRecord>,
    ) -> CoreResult<Vec<ElementRecord>> {
        let mut next = next_sequence(&self.siblings(page_id)?);
        let mut created = Vec::with_capacity(records.len());
        for mut record in records {
            record.page_id = page_id;
            let sequence = if record.sequence == 0 { next } else { record.sequence };
            next = next.max(sequence.saturating_add(1));
            created.push(self.create(record, Some(sequence))?);
        }
        Ok(created)
    }

    pub fn get(&self, id: ElementId) -> CoreResult<ElementRecord> {
        self.store
            .element(id)?
            .ok_or_else(|| CoreError::not_found("element", id))
    }

    pub fn list(&self, page_id: PageId) -> CoreResult<Vec<ElementRecord>> {
        Ok(ordered(self.store.elements_of(page_id)?))
    }

    /// Write `record` back exactly as held, stamping the modification time.
    pub fn save(&mut self, record: &ElementRecord) -> CoreResult<ElementRecord> {
        let mut record = record.clone();
        record.time_modified = Utc::now();
        match self.store.update_element(&record) {
            Ok(()) => Ok(record),
            Err(StorageError::MissingRow { .. }) => Err(CoreError::not_found("element", record.id)),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete one element and close the gap it leaves.
    pub fn delete(&mut self, id: ElementId) -> CoreResult<()> {
        let record = self.get(id)?;
        self.store.delete_element(id)?;
        self.resequence(record.page_id)?;
        Ok(())
    }

    pub fn resequence(&mut self, page_id: PageId) -> CoreResult<usize> {
        let rows = self.store.elements_of(page_id)?;
        let store = &mut *self.store;
        let changed = renumber(rows, |row| store.update_element(row))?;
        tracing::debug!(page_id, changed, "resequenced elements");
        Ok(changed)
    }

    /// Swap an element with its neighbour; false when already at the edge.
    pub fn move_element(&mut self, id: ElementId, direction: Direction) -> CoreResult<bool> {
        let record = self.get(id)?;
        let siblings = self.list(record.page_id)?;
        let Some((mut moved, mut other)) = neighbours(siblings, id, direction) else {
            return Ok(false);
        };
        swap_sequences(&mut moved, &mut other);
        self.store.update_element(&moved)?;
        self.store.update_element(&other)?;
        Ok(true)
    }

    pub fn check_sequences(&self, page_id: PageId) -> CoreResult<()> {
        check_sequences("element", page_id, &self.store.elements_of(page_id)?)
    }

    fn siblings(&self, page_id: PageId) -> CoreResult<Vec<ElementRecord>> {
        if self.store.page(page_id)?.is_none() {
            return Err(CoreError::not_found("page", page_id));
        }
        Ok(self.store.elements_of(page_id)?)
    }
}

pub struct PageRepository<'a, S: Store + ?Sized> {
    store: &'a mut S,
}

impl<'a, S: Store + ?Sized> PageRepository<'a, S> {
    pub fn new(store: &'a mut S) -> Self {
        Self { store }
    }

    pub fn create(
        &mut self,
        template_id: TemplateId,
        spec: PageSpec,
        sequence: Option<u32>,
    ) -> CoreResult<PageRecord> {
        Validator::new().validate_page(&spec).into_result()?;
        let siblings = self.siblings(template_id)?;
        let sequence = placement("page", sequence, &siblings)?;
        Ok(self.store.insert_page(PageRecord::new(template_id, spec, sequence))?)
    }

    /// Insert several pages under one template. A sequence of `None` goes
    /// after everything inserted so far.
    pub fn bulk_create(
        &mut self,
        template_id: TemplateId,
        pages: Vec<(PageSpec, Option<u32>)>,
    ) -> CoreResult<Vec<PageRecord>> {
        let mut next = next_sequence(&self.siblings(template_id)?);
        let mut created = Vec::with_capacity(pages.len());
        for (spec, sequence) in pages {
            let sequence = sequence.unwrap_or(next);
            next = next.max(sequence.saturating_add(1));
            created.push(self.create(template_id, spec, Some(sequence))?);
        }
        Ok(created)
    }

    pub fn get(&self, id: PageId) -> CoreResult<PageRecord> {
        self.store.page(id)?.ok_or_else(|| CoreError::not_found("page", id))
    }

    pub fn list(&self, template_id: TemplateId) -> CoreResult<Vec<PageRecord>> {
        Ok(ordered(self.store.pages_of(template_id)?))
    }

    /// Change a page's dimensions.
    pub fn update(&mut self, id: PageId, spec: PageSpec) -> CoreResult<PageRecord> {
        Validator::new().validate_page(&spec).into_result()?;
        let current = self.get(id)?;
        let mut page = PageRecord::new(current.template_id, spec, current.sequence);
        page.id = current.id;
        page.time_created = current.time_created;
        self.store.update_page(&page)?;
        Ok(page)
    }

    /// Delete a page with its elements and close the gap it leaves.
    pub fn delete(&mut self, id: PageId) -> CoreResult<()> {
        let page = self.get(id)?;
        for element in self.store.elements_of(id)? {
            self.store.delete_element(element.id)?;
        }
        self.store.delete_page(id)?;
        self.resequence(page.template_id)?;
        Ok(())
    }

    pub fn resequence(&mut self, template_id: TemplateId) -> CoreResult<usize> {
        let rows = self.store.pages_of(template_id)?;
        let store = &mut *self.store;
        let changed = renumber(rows, |row| store.update_page(row))?;
        tracing::debug!(template_id, changed, "resequenced pages");
        Ok(changed)
    }

    pub fn move_page(&mut self, id: PageId, direction: Direction) -> CoreResult<bool> {
        let page = self.get(id)?;
        let siblings = self.list(page.template_id)?;
        let Some((mut moved, mut other)) = neighbours(siblings, id, direction) else {
            return Ok(false);
        };
        swap_sequences(&mut moved, &mut other);
        self.store.update_page(&moved)?;
        self.store.update_page(&other)?;
        Ok(true)
    }

    pub fn check_sequences(&self, template_id: TemplateId) -> CoreResult<()> {
        check_sequences("page", template_id, &self.store.pages_of(template_id)?)
    }

    fn siblings(&self, template_id: TemplateId) -> CoreResult<Vec<PageRecord>> {
        if self.store.template(template_id)?.is_none() {
            return Err(CoreError::not_found("template", template_id));
        }
        Ok(self.store.pages_of(template_id)?)
    }
}

pub struct TemplateRepository<'a, S: Store + ?Sized> {
    store: &'a mut S,
}

impl<'a, S: Store + ?Sized> TemplateRepository<'a, S> {
    pub fn new(store: &'a mut S) -> Self {
        Self { store }
    }

    fn pages(&mut self) -> PageRepository<'_, S> {
        PageRepository::new(&mut *self.store)
    }

    fn elements(&mut self) -> ElementRepository<'_, S> {
        ElementRepository::new(&mut *self.store)
    }

    /// Create an empty template; the service adds its first page.
    pub fn create(&mut self, name: &str, context: TemplateContext) -> CoreResult<TemplateRecord> {
        let name = validate_template_name(name)?;
        Ok(self.store.insert_template(TemplateRecord::new(name, context))?)
    }

    pub fn get(&self, id: TemplateId) -> CoreResult<TemplateRecord> {
        self.store
            .template(id)?
            .ok_or_else(|| CoreError::not_found("template", id))
    }

    pub fn list(&self) -> CoreResult<Vec<TemplateRecord>> {
        let mut templates = self.store.templates()?;
        templates.sort_by_key(|t| t.id);
        Ok(templates)
    }

    pub fn rename(&mut self, id: TemplateId, name: &str) -> CoreResult<TemplateRecord> {
        let name = validate_template_name(name)?;
        let mut template = self.get(id)?;
        template.name = name;
        template.time_modified = Utc::now();
        self.store.update_template(&template)?;
        Ok(template)
    }

    /// Delete a template together with its pages and elements.
    pub fn delete(&mut self, id: TemplateId) -> CoreResult<()> {
        self.get(id)?;
        self.clear_content(id)?;
        self.store.delete_template(id)?;
        Ok(())
    }

    /// Copy `source` into a new template in the same context.
    pub fn duplicate(
        &mut self,
        source: TemplateId,
        name: Option<&str>,
    ) -> CoreResult<(TemplateRecord, CopySummary)> {
        let original = self.get(source)?;
        let name = match name {
            Some(name) => validate_template_name(name)?,
            None => copy_name(&original.name),
        };
        let copy = self.store.insert_template(TemplateRecord::new(name, original.context))?;
        let summary = self.copy_content(copy.id, source)?;
        Ok((copy, summary))
    }

    /// Make `target`'s pages and elements an exact copy of `source`'s.
    pub fn replace_content(
        &mut self,
        target: TemplateId,
        source: TemplateId,
    ) -> CoreResult<CopySummary> {
        if target == source {
            return Err(CoreError::Validation(
                "source: A template cannot be loaded into itself".into(),
            ));
        }
        self.get(target)?;
        self.get(source)?;
        self.clear_content(target)?;
        self.copy_content(target, source)
    }

    /// Append copies of `source`'s pages after `target`'s last page.
    pub fn copy_content(
        &mut self,
        target: TemplateId,
        source: TemplateId,
    ) -> CoreResult<CopySummary> {
        let source_pages = self.pages().list(source)?;
        let mut next = next_sequence(&self.pages().list(target)?);
        let mut summary = CopySummary::default();

        for page in source_pages {
            let copy = self.pages().create(target, page.spec(), Some(next))?;
            next += 1;
            summary.pages += 1;

            let elements = self.elements().list(page.id)?;
            for (position, element) in elements.into_iter().enumerate() {
                let mut record = element;
                record.page_id = copy.id;
                self.elements().create(record, Some(position as u32 + 1))?;
                summary.elements += 1;
            }
        }
        Ok(summary)
    }

    fn clear_content(&mut self, id: TemplateId) -> CoreResult<()> {
        for page in self.store.pages_of(id)? {
            for element in self.store.elements_of(page.id)? {
                self.store.delete_element(element.id)?;
            }
            self.store.delete_page(page.id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn template(store: &mut MemoryStore) -> TemplateId {
        TemplateRepository::new(store)
            .create("Certificate", TemplateContext::system())
            .unwrap()
            .id
    }

    fn sequences<T: Sequenced>(rows: &[T]) -> Vec<u32> {
        rows.iter().map(Sequenced::sequence).collect()
    }

    #[test]
    fn omitted_sequence_goes_last() {
        let mut store = MemoryStore::new();
        let id = template(&mut store);
        let mut pages = PageRepository::new(&mut store);
        pages.create(id, PageSpec::default(), Some(2)).unwrap();
        pages.create(id, PageSpec::default(), None).unwrap();
        pages.create(id, PageSpec::default(), Some(1)).unwrap();

        let listed = pages.list(id).unwrap();
        assert_eq!(sequences(&listed), vec![1, 2, 3]);
    }

    #[test]
    fn equal_sequences_list_by_id() {
        let mut store = MemoryStore::new();
        let id = template(&mut store);
        let mut pages = PageRepository::new(&mut store);
        let first = pages.create(id, PageSpec::default(), Some(1)).unwrap();
        let second = pages.create(id, PageSpec::default(), Some(1)).unwrap();

        let ids: Vec<_> = pages.list(id).unwrap().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
        assert!(matches!(pages.check_sequences(id), Err(CoreError::Integrity(_))));
        pages.resequence(id).unwrap();
        assert!(pages.check_sequences(id).is_ok());
    }

    #[test]
    fn missing_parent_is_not_found() {
        let mut store = MemoryStore::new();
        let err = PageRepository::new(&mut store)
            .create(42, PageSpec::default(), None)
            .unwrap_err();
        assert!(err.is_not_found());
        let err = ElementRepository::new(&mut store)
            .create(ElementRecord::new(42, "Orphan", "text"), None)
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn invalid_page_is_rejected_before_writing() {
        let mut store = MemoryStore::new();
        let id = template(&mut store);
        let spec = PageSpec { width: 0, ..PageSpec::default() };
        let err = PageRepository::new(&mut store).create(id, spec, None).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(store.counts(), (1, 0, 0));
    }

    #[test]
    fn sequence_zero_is_rejected() {
        let mut store = MemoryStore::new();
        let id = template(&mut store);
        let err = PageRepository::new(&mut store)
            .create(id, PageSpec::default(), Some(0))
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));

        let page = PageRepository::new(&mut store).create(id, PageSpec::default(), None).unwrap();
        let err = ElementRepository::new(&mut store)
            .create(ElementRecord::new(page.id, "Zero", "text"), Some(0))
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(store.counts(), (1, 1, 0));
    }

    #[test]
    fn sequences_saturate_at_the_top() {
        let mut store = MemoryStore::new();
        let id = template(&mut store);
        let pages = PageRepository::new(&mut store)
            .bulk_create(
                id,
                vec![(PageSpec::default(), Some(u32::MAX)), (PageSpec::default(), None)],
            )
            .unwrap();
        assert_eq!(sequences(&pages), vec![u32::MAX, u32::MAX]);
    }

    #[test]
    fn deleting_middle_element_compacts() {
        let mut store = MemoryStore::new();
        let id = template(&mut store);
        let page = PageRepository::new(&mut store).create(id, PageSpec::default(), None).unwrap();
        let mut elements = ElementRepository::new(&mut store);
        let ids: Vec<_> = ["a", "b", "c"]
            .into_iter()
            .map(|name| {
                elements
                    .create(ElementRecord::new(page.id, name, "text"), None)
                    .unwrap()
                    .id
            })
            .collect();

        elements.delete(ids[1]).unwrap();
        let left = elements.list(page.id).unwrap();
        assert_eq!(sequences(&left), vec![1, 2]);
        assert_eq!(left[1].name, "c");
    }

    #[test]
    fn bulk_create_honours_explicit_sequences() {
        let mut store = MemoryStore::new();
        let id = template(&mut store);
        let page = PageRepository::new(&mut store).create(id, PageSpec::default(), None).unwrap();
        let mut placed = ElementRecord::new(page.id, "placed", "text");
        placed.sequence = 5;
        let created = ElementRepository::new(&mut store)
            .bulk_create(
                page.id,
                vec![
                    ElementRecord::new(page.id, "first", "text"),
                    placed,
                    ElementRecord::new(page.id, "after", "text"),
                ],
            )
            .unwrap();
        assert_eq!(sequences(&created), vec![1, 5, 6]);
    }

    #[test]
    fn move_swaps_with_neighbour() {
        let mut store = MemoryStore::new();
        let id = template(&mut store);
        let mut pages = PageRepository::new(&mut store);
        let first = pages.create(id, PageSpec::default(), None).unwrap();
        let landscape = PageSpec { width: 297, height: 210, ..PageSpec::default() };
        let second = pages.create(id, landscape, None).unwrap();

        assert!(!pages.move_page(first.id, Direction::Up).unwrap());
        assert!(pages.move_page(first.id, Direction::Down).unwrap());
        let ids: Vec<_> = pages.list(id).unwrap().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
        assert!(!pages.move_page(first.id, Direction::Down).unwrap());
    }

    #[test]
    fn duplicate_naming() {
        assert_eq!(copy_name("Gold"), "Gold (copy)");
        assert_eq!(copy_name("  "), "Template (copy)");
        assert!(validate_template_name("   ").is_err());
        assert_eq!(validate_template_name("  Silver ").unwrap(), "Silver");
    }

    #[test]
    fn delete_template_cascades() {
        let mut store = MemoryStore::new();
        let id = template(&mut store);
        let page = PageRepository::new(&mut store).create(id, PageSpec::default(), None).unwrap();
        ElementRepository::new(&mut store)
            .create(ElementRecord::new(page.id, "name", "text"), None)
            .unwrap();

        TemplateRepository::new(&mut store).delete(id).unwrap();
        assert_eq!(store.counts(), (0, 0, 0));
    }
}
