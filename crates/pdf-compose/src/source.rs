//! Physical template pages and the handles that keep them open
//!
//! A [`TemplateSource`] is one page of a PDF (or a generated blank page) that
//! templates are drawn on. Every time the composer places a page it opens a
//! [`SourceHandle`]; the assembler keeps the handles until the output has been
//! persisted and then releases them. Release happens on drop, so every exit
//! path releases each handle exactly once.

use crate::constants::DEFAULT_PAGE_DIMENSIONS;
use crate::render::page_media_box;
use crate::types::*;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

static NEXT_SOURCE_ID: AtomicUsize = AtomicUsize::new(1);

/// Identity of a template source, used to share imported page content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(usize);

/// A single physical page that templates are laid over
#[derive(Debug)]
pub struct TemplateSource {
    id: SourceId,
    label: String,
    document: Document,
    page_id: ObjectId,
    opened: AtomicUsize,
    released: AtomicUsize,
}

impl TemplateSource {
    /// Use page `page_number` (1-based) of `document`
    pub fn from_document(
        label: impl Into<String>,
        document: Document,
        page_number: u32,
    ) -> Result<Self> {
        let label = label.into();
        let page_id = document
            .get_pages()
            .get(&page_number)
            .copied()
            .ok_or_else(|| {
                ComposeError::Config(format!(
                    "template source '{}' has no page {}",
                    label, page_number
                ))
            })?;

        Ok(Self::with_page(label, document, page_id))
    }

    /// A generated blank page of the given size in points
    pub fn blank(label: impl Into<String>, width: f32, height: f32) -> Self {
        let mut document = Document::with_version("1.7");
        let pages_id = document.new_object_id();
        let content_id = document.add_object(Stream::new(Dictionary::new(), Vec::new()));
        let page_id = document.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(width),
                    Object::Real(height),
                ]),
            ),
            ("Resources", Object::Dictionary(Dictionary::new())),
            ("Contents", Object::Reference(content_id)),
        ]));
        document.objects.insert(
            pages_id,
            Object::Dictionary(Dictionary::from_iter(vec![
                ("Type", Object::Name(b"Pages".to_vec())),
                ("Kids", Object::Array(vec![Object::Reference(page_id)])),
                ("Count", Object::Integer(1)),
            ])),
        );
        let catalog_id = document.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]));
        document.trailer.set("Root", catalog_id);

        Self::with_page(label.into(), document, page_id)
    }

    /// A blank US Letter page
    pub fn letter(label: impl Into<String>) -> Self {
        Self::blank(label, DEFAULT_PAGE_DIMENSIONS.0, DEFAULT_PAGE_DIMENSIONS.1)
    }

    fn with_page(label: String, document: Document, page_id: ObjectId) -> Self {
        Self {
            id: SourceId(NEXT_SOURCE_ID.fetch_add(1, Ordering::Relaxed)),
            label,
            document,
            page_id,
            opened: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
        }
    }

    pub fn id(&self) -> SourceId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn page_id(&self) -> ObjectId {
        self.page_id
    }

    /// Page size (width, height) in points
    pub fn dimensions(&self) -> (f32, f32) {
        let rect = page_media_box(&self.document, self.page_id);
        (rect.width, rect.height)
    }

    /// Open a handle on this source. The handle is released when dropped.
    pub fn open(self: &Arc<Self>) -> SourceHandle {
        self.opened.fetch_add(1, Ordering::SeqCst);
        SourceHandle {
            source: Arc::clone(self),
        }
    }

    /// Total handles opened so far
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Total handles released so far
    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Handles currently open
    pub fn open_handles(&self) -> usize {
        self.opened() - self.released()
    }
}

/// An open use of a [`TemplateSource`] by one composed page
#[derive(Debug)]
pub struct SourceHandle {
    source: Arc<TemplateSource>,
}

impl SourceHandle {
    pub fn source(&self) -> &TemplateSource {
        &self.source
    }

    /// Release the handle now rather than at end of scope
    pub fn release(self) {}
}

impl Drop for SourceHandle {
    fn drop(&mut self) {
        self.source.released.fetch_add(1, Ordering::SeqCst);
        log::trace!("released template source '{}'", self.source.label);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_source_dimensions() {
        let source = TemplateSource::blank("card", 288.0, 432.0);
        assert_eq!(source.dimensions(), (288.0, 432.0));
        assert_eq!(source.document().get_pages().len(), 1);
    }

    #[test]
    fn test_handles_release_on_drop() {
        let source = Arc::new(TemplateSource::letter("page"));
        let first = source.open();
        let second = source.open();
        assert_eq!(source.open_handles(), 2);

        first.release();
        assert_eq!(source.released(), 1);

        drop(second);
        assert_eq!(source.opened(), 2);
        assert_eq!(source.released(), 2);
        assert_eq!(source.open_handles(), 0);
    }

    #[test]
    fn test_missing_page_is_config_error() {
        let source = TemplateSource::letter("page");
        let document = source.document().clone();
        let result = TemplateSource::from_document("copy", document, 3);
        assert!(matches!(result, Err(ComposeError::Config(_))));
    }

    #[test]
    fn test_sources_have_distinct_ids() {
        let a = TemplateSource::letter("a");
        let b = TemplateSource::letter("b");
        assert_ne!(a.id(), b.id());
    }
}
