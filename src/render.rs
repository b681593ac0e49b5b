//! Render Dispatch
//!
//! The core does not draw anything. A [`RenderCapability`] supplied by the
//! host turns elements into document items or markup; this module decides
//! when it is called. Placeholders never reach the renderer: they are
//! skipped in documents and become a notice in previews.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::element::Element;
use crate::model::{Alignment, ElementId, PageRecord, PageSpec, RefPoint};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("No page has been started in the document")]
    NoPage,

    #[error("Renderer failed on element {element}: {reason}")]
    Backend { element: ElementId, reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlacedItem {
    pub element_id: ElementId,
    pub type_key: String,
    pub name: String,
    pub posx: i64,
    pub posy: i64,
    pub refpoint: RefPoint,
    pub alignment: Alignment,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentPage {
    pub spec: PageSpec,
    pub items: Vec<PlacedItem>,
}

/// Document being assembled, one [`DocumentPage`] per template page.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DocumentContext {
    pub pages: Vec<DocumentPage>,
}

impl DocumentContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_page(&mut self, page: &PageRecord) {
        self.pages.push(DocumentPage { spec: page.spec(), items: Vec::new() });
    }

    pub fn place(&mut self, item: PlacedItem) -> Result<(), RenderError> {
        let page = self.pages.last_mut().ok_or(RenderError::NoPage)?;
        page.items.push(item);
        Ok(())
    }

    pub fn item_count(&self) -> usize {
        self.pages.iter().map(|p| p.items.len()).sum()
    }
}

pub trait RenderCapability {
    fn render_to_document(
        &self,
        element: &dyn Element,
        doc: &mut DocumentContext,
    ) -> Result<(), RenderError>;

    fn render_to_markup(&self, element: &dyn Element) -> Result<String, RenderError>;

    /// Decorate a placeholder notice for previews.
    fn wrap_notice(&self, message: &str) -> String {
        message.to_string()
    }
}

pub fn render_pdf(
    element: &dyn Element,
    renderer: &dyn RenderCapability,
    doc: &mut DocumentContext,
) -> Result<(), RenderError> {
    if let Some(unknown) = element.as_unknown() {
        tracing::debug!(
            element = element.id(),
            missing = unknown.missing_type(),
            "placeholder not rendered"
        );
        return Ok(());
    }
    renderer.render_to_document(element, doc)
}

pub fn render_html(
    element: &dyn Element,
    renderer: &dyn RenderCapability,
) -> Result<String, RenderError> {
    match element.as_unknown() {
        Some(unknown) => Ok(renderer.wrap_notice(&unknown.notice())),
        None => renderer.render_to_markup(element),
    }
}

/// Renderer that records element placement without drawing, used by the CLI
/// preview.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutlineRenderer;

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

impl RenderCapability for OutlineRenderer {
    fn render_to_document(
        &self,
        element: &dyn Element,
        doc: &mut DocumentContext,
    ) -> Result<(), RenderError> {
        let (posx, posy) = element.position();
        doc.place(PlacedItem {
            element_id: element.id(),
            type_key: element.type_key().to_string(),
            name: element.name().to_string(),
            posx,
            posy,
            refpoint: element.refpoint(),
            alignment: element.alignment(),
            content: element.envelope().to_json(),
        })
    }

    fn render_to_markup(&self, element: &dyn Element) -> Result<String, RenderError> {
        let (posx, posy) = element.position();
        Ok(format!(
            r#"<div class="element element-{}" data-x="{posx}" data-y="{posy}">{}</div>"#,
            escape(element.type_key()),
            escape(element.name()),
        ))
    }

    fn wrap_notice(&self, message: &str) -> String {
        format!(r#"<div class="notice">{}</div>"#, escape(message))
    }
}
