//! The output document being composed
//!
//! Pages are only ever appended by the composer; blank pages may be inserted
//! by the assembler when padding the page count. The page tree and catalog are
//! written when the document is persisted.

use crate::constants::{DEFAULT_PAGE_DIMENSIONS, TEMPLATE_XOBJECT_NAME};
use crate::render::{create_page_xobject, page_media_box, rect_to_array};
use crate::source::{SourceId, TemplateSource};
use crate::types::*;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::HashMap;
use std::io::Write;

/// An image written to the document as an Image XObject
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageXObject {
    pub id: ObjectId,
    /// Pixel width
    pub width: u32,
    /// Pixel height
    pub height: u32,
}

pub struct ComposedDocument {
    doc: Document,
    pages_id: ObjectId,
    catalog_id: Option<ObjectId>,
    page_ids: Vec<ObjectId>,
    /// Template XObject per imported source
    templates: HashMap<SourceId, ObjectId>,
    /// Copied object ids per imported source
    copied: HashMap<SourceId, HashMap<ObjectId, ObjectId>>,
    images: HashMap<String, ImageXObject>,
}

impl Default for ComposedDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl ComposedDocument {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            catalog_id: None,
            page_ids: Vec::new(),
            templates: HashMap::new(),
            copied: HashMap::new(),
            images: HashMap::new(),
        }
    }

    /// Number of pages composed so far
    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Page object ids in output order
    pub fn page_ids(&self) -> &[ObjectId] {
        &self.page_ids
    }

    pub fn object_count(&self) -> usize {
        self.doc.objects.len()
    }

    pub fn add_object(&mut self, object: impl Into<Object>) -> ObjectId {
        self.doc.add_object(object)
    }

    pub fn get_object(&self, id: ObjectId) -> Result<&Object> {
        Ok(self.doc.get_object(id)?)
    }

    pub fn page(&self, page_id: ObjectId) -> Result<&Dictionary> {
        Ok(self.doc.get_dictionary(page_id)?)
    }

    pub fn page_mut(&mut self, page_id: ObjectId) -> Result<&mut Dictionary> {
        Ok(self.doc.get_dictionary_mut(page_id)?)
    }

    pub fn media_box(&self, page_id: ObjectId) -> Rect {
        page_media_box(&self.doc, page_id)
    }

    /// Append a page drawing `source` and return its object id.
    ///
    /// The source page is copied into the document once, as a Form XObject;
    /// later pages built on the same source reuse it.
    pub fn import_page(&mut self, source: &TemplateSource) -> Result<ObjectId> {
        let xobject_id = match self.templates.get(&source.id()) {
            Some(id) => *id,
            None => {
                let cache = self.copied.entry(source.id()).or_default();
                let id =
                    create_page_xobject(&mut self.doc, source.document(), source.page_id(), cache)?;
                log::debug!("imported template source '{}'", source.label());
                self.templates.insert(source.id(), id);
                id
            }
        };

        let media_box = page_media_box(source.document(), source.page_id());
        let draw = format!("q /{} Do Q\n", TEMPLATE_XOBJECT_NAME);
        let content_id = self.add_object(Stream::new(Dictionary::new(), draw.into_bytes()));

        let mut xobjects = Dictionary::new();
        xobjects.set(TEMPLATE_XOBJECT_NAME, Object::Reference(xobject_id));
        let mut resources = Dictionary::new();
        resources.set("XObject", Object::Dictionary(xobjects));

        let mut page_dict = Dictionary::new();
        page_dict.set("Type", Object::Name(b"Page".to_vec()));
        page_dict.set("Parent", Object::Reference(self.pages_id));
        page_dict.set("MediaBox", rect_to_array(&media_box));
        page_dict.set("Resources", Object::Dictionary(resources));
        page_dict.set("Contents", Object::Array(vec![Object::Reference(content_id)]));
        if let Ok(rotate) = source.document().get_dictionary(source.page_id())?.get(b"Rotate") {
            page_dict.set("Rotate", rotate.clone());
        }

        let page_id = self.add_object(page_dict);
        self.page_ids.push(page_id);
        Ok(page_id)
    }

    /// Insert `count` blank pages before page index `index` (0-based).
    ///
    /// Blank pages take the MediaBox of the last page, or US Letter when the
    /// document is still empty.
    pub fn insert_blank_pages(&mut self, index: usize, count: usize) -> Result<()> {
        let media_box = match self.page_ids.last() {
            Some(last) => self.media_box(*last),
            None => Rect::new(0.0, 0.0, DEFAULT_PAGE_DIMENSIONS.0, DEFAULT_PAGE_DIMENSIONS.1),
        };

        let index = index.min(self.page_ids.len());
        for offset in 0..count {
            let page_id = self.create_blank_page(&media_box);
            self.page_ids.insert(index + offset, page_id);
        }
        Ok(())
    }

    fn create_blank_page(&mut self, media_box: &Rect) -> ObjectId {
        let content_id = self.add_object(Stream::new(Dictionary::new(), Vec::new()));

        let mut page_dict = Dictionary::new();
        page_dict.set("Type", Object::Name(b"Page".to_vec()));
        page_dict.set("Parent", Object::Reference(self.pages_id));
        page_dict.set("MediaBox", rect_to_array(media_box));
        page_dict.set("Contents", Object::Reference(content_id));
        page_dict.set("Resources", Object::Dictionary(Dictionary::new()));

        self.add_object(page_dict)
    }

    /// Append a content stream to a page's `Contents`
    pub fn append_content(&mut self, page_id: ObjectId, content: Vec<u8>) -> Result<()> {
        let content_id = self.add_object(Stream::new(Dictionary::new(), content));
        let page = self.page_mut(page_id)?;

        let mut contents = match page.get(b"Contents") {
            Ok(Object::Array(existing)) => existing.clone(),
            Ok(single @ Object::Reference(_)) => vec![single.clone()],
            _ => Vec::new(),
        };
        contents.push(Object::Reference(content_id));
        page.set("Contents", Object::Array(contents));
        Ok(())
    }

    /// Merge entries into one category (`Font`, `XObject`, ...) of a page's
    /// resource dictionary. Existing entries with the same name are replaced.
    pub fn merge_resources(
        &mut self,
        page_id: ObjectId,
        category: &str,
        entries: Dictionary,
    ) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let page = self.page_mut(page_id)?;
        let mut resources = match page.get(b"Resources") {
            Ok(Object::Dictionary(dict)) => dict.clone(),
            _ => Dictionary::new(),
        };
        let mut merged = match resources.get(category.as_bytes()) {
            Ok(Object::Dictionary(dict)) => dict.clone(),
            _ => Dictionary::new(),
        };
        for (name, value) in entries.iter() {
            merged.set(name.clone(), value.clone());
        }
        resources.set(category, Object::Dictionary(merged));
        page.set("Resources", Object::Dictionary(resources));
        Ok(())
    }

    /// Image previously embedded under `key`
    pub fn image(&self, key: &str) -> Option<ImageXObject> {
        self.images.get(key).copied()
    }

    pub fn insert_image(&mut self, key: impl Into<String>, image: ImageXObject) {
        self.images.insert(key.into(), image);
    }

    /// Write the page tree and catalog. Safe to call more than once.
    fn finalize(&mut self) {
        let kids: Vec<Object> = self
            .page_ids
            .iter()
            .map(|id| Object::Reference(*id))
            .collect();
        let pages_dict = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(kids)),
            ("Count", Object::Integer(self.page_ids.len() as i64)),
        ]);
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages_dict));

        let catalog_id = match self.catalog_id {
            Some(id) => id,
            None => {
                let id = self.doc.add_object(Dictionary::from_iter(vec![
                    ("Type", Object::Name(b"Catalog".to_vec())),
                    ("Pages", Object::Reference(self.pages_id)),
                ]));
                self.catalog_id = Some(id);
                id
            }
        };
        self.doc.trailer.set("Root", catalog_id);
    }

    /// Serialize the document to `writer`
    pub fn save_to<W: Write>(&mut self, writer: &mut W) -> Result<()> {
        self.finalize();
        self.doc.save_to(writer)?;
        Ok(())
    }

    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.save_to(&mut bytes)?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_reuses_template_xobject() {
        let source = TemplateSource::blank("half-letter", 396.0, 612.0);
        let mut document = ComposedDocument::new();

        let first = document.import_page(&source).unwrap();
        let objects_after_first = document.object_count();
        let second = document.import_page(&source).unwrap();

        assert_ne!(first, second);
        assert_eq!(document.page_count(), 2);
        // Second import adds only a content stream and a page dictionary
        assert_eq!(document.object_count(), objects_after_first + 2);
        assert_eq!(document.media_box(second), Rect::new(0.0, 0.0, 396.0, 612.0));
    }

    #[test]
    fn test_insert_blank_pages_before_index() {
        let source = TemplateSource::letter("page");
        let mut document = ComposedDocument::new();
        let first = document.import_page(&source).unwrap();
        let last = document.import_page(&source).unwrap();

        document.insert_blank_pages(1, 2).unwrap();

        assert_eq!(document.page_count(), 4);
        assert_eq!(document.page_ids()[0], first);
        assert_eq!(document.page_ids()[3], last);
    }

    #[test]
    fn test_finished_document_has_page_tree() {
        let source = TemplateSource::letter("page");
        let mut document = ComposedDocument::new();
        document.import_page(&source).unwrap();
        document.insert_blank_pages(0, 1).unwrap();

        let bytes = document.to_bytes().unwrap();
        let loaded = Document::load_mem(&bytes).unwrap();
        assert_eq!(loaded.get_pages().len(), 2);
    }

    #[test]
    fn test_merge_resources_keeps_template_xobject() {
        let source = TemplateSource::letter("page");
        let mut document = ComposedDocument::new();
        let page_id = document.import_page(&source).unwrap();

        let font_id = document.add_object(Dictionary::new());
        let mut fonts = Dictionary::new();
        fonts.set("F1", Object::Reference(font_id));
        document.merge_resources(page_id, "Font", fonts).unwrap();

        let page = document.page(page_id).unwrap();
        let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
        assert!(resources.get(b"Font").is_ok());
        assert!(resources.get(b"XObject").is_ok());
    }
}
