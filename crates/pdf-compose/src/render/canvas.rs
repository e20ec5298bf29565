//! Drawing canvas for one output page
//!
//! Region fillers draw through a [`Canvas`]. Operations and the resources they
//! use are buffered and written to the page when the canvas is closed, as one
//! content stream appended after the template drawing.

use crate::constants::IMAGE_RESOURCE_PREFIX;
use crate::document::{ComposedDocument, ImageXObject};
use crate::font::{EmbeddedFont, encode_text};
use crate::types::*;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Object, ObjectId};

pub struct Canvas {
    page_id: ObjectId,
    media_box: Rect,
    operations: Vec<Operation>,
    fonts: Dictionary,
    xobjects: Dictionary,
}

impl Canvas {
    /// Open a canvas on a page of `document`
    pub fn open(document: &ComposedDocument, page_id: ObjectId) -> Self {
        Self {
            page_id,
            media_box: document.media_box(page_id),
            operations: Vec::new(),
            fonts: Dictionary::new(),
            xobjects: Dictionary::new(),
        }
    }

    pub fn page_id(&self) -> ObjectId {
        self.page_id
    }

    pub fn media_box(&self) -> Rect {
        self.media_box
    }

    /// Operations drawn so far
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn push(&mut self, operation: Operation) {
        self.operations.push(operation);
    }

    pub fn save_state(&mut self) {
        self.push(Operation::new("q", vec![]));
    }

    pub fn restore_state(&mut self) {
        self.push(Operation::new("Q", vec![]));
    }

    /// Intersect the clipping path with `rect`
    pub fn clip(&mut self, rect: &Rect) {
        self.push(Operation::new(
            "re",
            vec![
                rect.x.into(),
                rect.y.into(),
                rect.width.into(),
                rect.height.into(),
            ],
        ));
        self.push(Operation::new("W", vec![]));
        self.push(Operation::new("n", vec![]));
    }

    /// Draw one line of text with its baseline starting at (x, y)
    pub fn draw_text(&mut self, font: &EmbeddedFont, size: f32, x: f32, y: f32, text: &str) {
        if text.is_empty() {
            return;
        }
        self.use_font(font);
        self.push(Operation::new("BT", vec![]));
        self.push(Operation::new(
            "Tf",
            vec![
                Object::Name(font.resource_name().as_bytes().to_vec()),
                size.into(),
            ],
        ));
        self.push(Operation::new("Td", vec![x.into(), y.into()]));
        self.push(Operation::new(
            "Tj",
            vec![Object::string_literal(encode_text(text))],
        ));
        self.push(Operation::new("ET", vec![]));
    }

    /// Draw an image stretched over `rect`
    pub fn draw_image(&mut self, image: &ImageXObject, rect: &Rect) {
        let name = format!("{}{}", IMAGE_RESOURCE_PREFIX, image.id.0);
        self.xobjects
            .set(name.as_bytes().to_vec(), Object::Reference(image.id));

        self.save_state();
        self.push(Operation::new(
            "cm",
            vec![
                rect.width.into(),
                Object::Integer(0),
                Object::Integer(0),
                rect.height.into(),
                rect.x.into(),
                rect.y.into(),
            ],
        ));
        self.push(Operation::new("Do", vec![Object::Name(name.into_bytes())]));
        self.restore_state();
    }

    fn use_font(&mut self, font: &EmbeddedFont) {
        self.fonts.set(
            font.resource_name().as_bytes().to_vec(),
            Object::Reference(font.object_id()),
        );
    }

    /// Write buffered operations and resources to the page
    pub fn close(self, document: &mut ComposedDocument) -> Result<()> {
        if self.operations.is_empty() {
            return Ok(());
        }

        let content = Content {
            operations: self.operations,
        }
        .encode()?;
        document.append_content(self.page_id, content)?;
        document.merge_resources(self.page_id, "Font", self.fonts)?;
        document.merge_resources(self.page_id, "XObject", self.xobjects)?;
        Ok(())
    }
}
