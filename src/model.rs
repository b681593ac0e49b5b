//! Stored Records - Templates, Pages and Elements

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::envelope::Envelope;
use crate::migration::VisualColumns;

pub type TemplateId = i64;
pub type PageId = i64;
pub type ElementId = i64;

/// Placeholder identifier of a record the store has not assigned yet.
pub const UNSAVED_ID: i64 = 0;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContextKind {
    #[default]
    System,
    Course,
    Module,
}

/// The authorization boundary a template lives in.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TemplateContext {
    pub id: i64,
    pub kind: ContextKind,
}

impl TemplateContext {
    pub fn system() -> Self {
        Self { id: 1, kind: ContextKind::System }
    }

    pub fn module(id: i64) -> Self {
        Self { id, kind: ContextKind::Module }
    }

    pub fn is_module(&self) -> bool {
        self.kind == ContextKind::Module
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TemplateRecord {
    pub id: TemplateId,
    /// Legacy rows may carry an empty name.
    #[serde(default)]
    pub name: String,
    pub context: TemplateContext,
    pub time_created: DateTime<Utc>,
    pub time_modified: DateTime<Utc>,
}

impl TemplateRecord {
    pub fn new(name: impl Into<String>, context: TemplateContext) -> Self {
        let now = Utc::now();
        Self {
            id: UNSAVED_ID,
            name: name.into(),
            context,
            time_created: now,
            time_modified: now,
        }
    }
}

/// Physical dimensions of a page, in millimetres.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PageSpec {
    pub width: i64,
    pub height: i64,
    pub left_margin: i64,
    pub right_margin: i64,
}

impl Default for PageSpec {
    fn default() -> Self {
        Self {
            width: 210,
            height: 297,
            left_margin: 0,
            right_margin: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageRecord {
    pub id: PageId,
    pub template_id: TemplateId,
    pub width: i64,
    pub height: i64,
    pub left_margin: i64,
    pub right_margin: i64,
    pub sequence: u32,
    pub time_created: DateTime<Utc>,
    pub time_modified: DateTime<Utc>,
}

impl PageRecord {
    pub fn new(template_id: TemplateId, spec: PageSpec, sequence: u32) -> Self {
        let now = Utc::now();
        Self {
            id: UNSAVED_ID,
            template_id,
            width: spec.width,
            height: spec.height,
            left_margin: spec.left_margin,
            right_margin: spec.right_margin,
            sequence,
            time_created: now,
            time_modified: now,
        }
    }

    pub fn spec(&self) -> PageSpec {
        PageSpec {
            width: self.width,
            height: self.height,
            left_margin: self.left_margin,
            right_margin: self.right_margin,
        }
    }
}

/// Anchor of an element's position.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RefPoint {
    #[default]
    TopLeft,
    TopCenter,
    TopRight,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

/// One stored element row.
///
/// `font`, `fontsize`, `colour` and `width` are the legacy visual columns;
/// migrated rows keep these values in `data` and leave the columns empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElementRecord {
    pub id: ElementId,
    pub page_id: PageId,
    pub name: String,
    /// Type key resolved through the registry.
    pub element: String,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub font: Option<String>,
    #[serde(default)]
    pub fontsize: Option<i64>,
    #[serde(default)]
    pub colour: Option<String>,
    #[serde(default)]
    pub width: Option<i64>,
    #[serde(default)]
    pub posx: i64,
    #[serde(default)]
    pub posy: i64,
    #[serde(default)]
    pub refpoint: RefPoint,
    #[serde(default)]
    pub alignment: Alignment,
    pub sequence: u32,
    pub time_created: DateTime<Utc>,
    pub time_modified: DateTime<Utc>,
}

impl ElementRecord {
    pub fn new(page_id: PageId, name: impl Into<String>, element: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: UNSAVED_ID,
            page_id,
            name: name.into(),
            element: element.into(),
            data: None,
            font: None,
            fontsize: None,
            colour: None,
            width: None,
            posx: 0,
            posy: 0,
            refpoint: RefPoint::default(),
            alignment: Alignment::default(),
            sequence: 0,
            time_created: now,
            time_modified: now,
        }
    }

    pub fn visual_columns(&self) -> VisualColumns {
        VisualColumns {
            width: self.width,
            font: self.font.clone(),
            fontsize: self.fontsize,
            colour: self.colour.clone(),
        }
    }

    pub fn clear_visual_columns(&mut self) {
        self.width = None;
        self.font = None;
        self.fontsize = None;
        self.colour = None;
    }

    pub fn envelope(&self) -> Envelope {
        Envelope::parse(self.data.as_deref())
    }

    /// Replace `data` with `envelope`; an empty envelope clears it.
    pub fn set_envelope(&mut self, envelope: &Envelope) {
        self.data = envelope.to_data();
    }
}

/// Siblings ordered by a 1-based sequence within their parent.
pub trait Sequenced {
    fn row_id(&self) -> i64;
    fn parent_id(&self) -> i64;
    fn sequence(&self) -> u32;
    fn set_sequence(&mut self, sequence: u32);
}

impl Sequenced for PageRecord {
    fn row_id(&self) -> i64 { self.id }
    fn parent_id(&self) -> i64 { self.template_id }
    fn sequence(&self) -> u32 { self.sequence }
    fn set_sequence(&mut self, sequence: u32) { self.sequence = sequence; }
}

impl Sequenced for ElementRecord {
    fn row_id(&self) -> i64 { self.id }
    fn parent_id(&self) -> i64 { self.page_id }
    fn sequence(&self) -> u32 { self.sequence }
    fn set_sequence(&mut self, sequence: u32) { self.sequence = sequence; }
}
