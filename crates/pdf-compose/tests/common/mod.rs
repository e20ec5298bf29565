#![allow(dead_code)]

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use pdf_compose::*;
use serde_json::Value;
use std::sync::{Arc, Mutex};

pub fn create_test_pdf(num_pages: usize, width: i64, height: i64) -> Document {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for _ in 0..num_pages {
        let content_id = doc.add_object(Stream::new(Dictionary::new(), b"q Q".to_vec()));
        let page_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(width),
                    Object::Integer(height),
                ]),
            ),
            ("Resources", Object::Dictionary(Dictionary::new())),
            ("Contents", Object::Reference(content_id)),
        ]));
        kids.push(Object::Reference(page_id));
    }

    let pages_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(kids)),
        ("Count", Object::Integer(num_pages as i64)),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", catalog_id);

    doc
}

/// A US Letter template source backed by a real PDF page
pub fn letter_source(label: &str) -> Arc<TemplateSource> {
    Arc::new(TemplateSource::from_document(label, create_test_pdf(1, 612, 792), 1).unwrap())
}

pub fn full_page(name: &str, kind: &str) -> RegionSpec {
    RegionSpec::new(name, kind, Rect::new(72.0, 72.0, 468.0, 648.0))
}

/// Pages of an assembled PDF, in order
pub fn output_pages(bytes: &[u8]) -> (Document, Vec<ObjectId>) {
    let doc = Document::load_mem(bytes).unwrap();
    let pages = doc.get_pages().into_values().collect();
    (doc, pages)
}

pub fn page_total(bytes: &[u8]) -> usize {
    output_pages(bytes).1.len()
}

/// Records every region it is asked to fill
#[derive(Clone, Default)]
pub struct Recorder {
    calls: Arc<Mutex<Vec<(String, FieldMap)>>>,
}

impl Recorder {
    pub fn names(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn fields(&self, index: usize) -> FieldMap {
        self.calls.lock().unwrap()[index].1.clone()
    }
}

impl RegionFiller for Recorder {
    fn fill(
        &self,
        _document: &mut ComposedDocument,
        _canvas: &mut Canvas,
        input: &RegionInput<'_>,
        _context: &AssemblyContext<'_>,
    ) -> Result<Option<LocationEntry>> {
        self.calls
            .lock()
            .unwrap()
            .push((input.name().to_string(), input.fields().clone()));
        Ok(None)
    }
}

/// Takes up to `capacity` items from an array `contents` and overflows the rest
#[derive(Clone, Default)]
pub struct Chunker {
    drawn: Arc<Mutex<Vec<Value>>>,
}

impl Chunker {
    pub fn drawn(&self) -> Vec<Value> {
        self.drawn.lock().unwrap().clone()
    }
}

impl RegionFiller for Chunker {
    fn fill(
        &self,
        _document: &mut ComposedDocument,
        _canvas: &mut Canvas,
        input: &RegionInput<'_>,
        _context: &AssemblyContext<'_>,
    ) -> Result<Option<LocationEntry>> {
        let items = input
            .contents()
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let capacity = input
            .field("capacity")
            .and_then(Value::as_u64)
            .unwrap_or(1) as usize;

        let split = capacity.min(items.len());
        self.drawn.lock().unwrap().extend_from_slice(&items[..split]);
        let rest = items[split..].to_vec();
        if rest.is_empty() {
            Ok(None)
        } else {
            Ok(Some(input.remainder(Value::Array(rest))))
        }
    }
}
