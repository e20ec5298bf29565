//! Document assembly
//!
//! Composes a sequence of [`PageData`] into one PDF: fonts are embedded first,
//! pages are composed in order, the page count is padded if requested, and the
//! result is persisted. Template source handles are released once the output
//! has been written, on success and on failure alike.

use crate::compose::Composer;
use crate::document::ComposedDocument;
use crate::fill::{FillerRegistry, RegionFiller};
use crate::page_data::PageData;
use crate::registry::Registry;
use crate::source::SourceHandle;
use crate::transform::{PageTransform, TransformRegistry};
use crate::types::*;
use std::fmt;
use std::io::Write;
use std::sync::Arc;

/// Target page count of the assembled document
#[derive(Clone, Default)]
pub enum PageCount {
    /// Whatever the pages compose to
    #[default]
    Natural,
    /// At least this many pages; blank pages are inserted before the last page
    Fixed(usize),
    /// Number of blank pages to insert before the last page, given the
    /// composed page count
    Dynamic(Arc<dyn Fn(usize) -> usize + Send + Sync>),
}

impl PageCount {
    pub fn dynamic(blanks: impl Fn(usize) -> usize + Send + Sync + 'static) -> Self {
        PageCount::Dynamic(Arc::new(blanks))
    }

    /// Blank pages to add to a document of `count` pages
    pub fn blanks_needed(&self, count: usize) -> usize {
        match self {
            PageCount::Natural => 0,
            PageCount::Fixed(target) => target.saturating_sub(count),
            PageCount::Dynamic(blanks) => blanks(count),
        }
    }
}

impl fmt::Debug for PageCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageCount::Natural => f.write_str("Natural"),
            PageCount::Fixed(target) => f.debug_tuple("Fixed").field(target).finish(),
            PageCount::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AssembleOptions {
    pub number_of_pages: PageCount,
    /// Upper bound on composed pages, guarding against runaway overflow chains
    pub page_limit: Option<usize>,
}

impl AssembleOptions {
    pub fn with_number_of_pages(mut self, count: PageCount) -> Self {
        self.number_of_pages = count;
        self
    }

    pub fn with_page_limit(mut self, limit: usize) -> Self {
        self.page_limit = Some(limit);
        self
    }
}

/// Handles kept open until the output is persisted
#[derive(Default)]
struct HandleGuard {
    handles: Vec<SourceHandle>,
}

impl Drop for HandleGuard {
    fn drop(&mut self) {
        if !self.handles.is_empty() {
            log::debug!("releasing {} template source handles", self.handles.len());
        }
        self.handles.clear();
    }
}

/// Region fillers and page transforms used for assembly
#[derive(Default)]
pub struct Assembler {
    fillers: FillerRegistry,
    transforms: TransformRegistry,
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registries(fillers: FillerRegistry, transforms: TransformRegistry) -> Self {
        Self {
            fillers,
            transforms,
        }
    }

    pub fn register_filler(&mut self, tag: impl Into<String>, filler: impl RegionFiller + 'static) {
        self.fillers.register(tag, filler);
    }

    pub fn register_transform(
        &mut self,
        kind: impl Into<String>,
        transform: impl PageTransform + 'static,
    ) {
        self.transforms.register(kind, transform);
    }

    pub fn fillers(&self) -> &FillerRegistry {
        &self.fillers
    }

    pub fn transforms(&self) -> &TransformRegistry {
        &self.transforms
    }

    /// Assemble `pages` into a PDF.
    ///
    /// The document is written to `sink` when one is given. The serialized
    /// bytes are returned either way.
    pub fn assemble(
        &self,
        sink: Option<&mut dyn Write>,
        pages: &[PageData],
        registry: &Registry,
        options: &AssembleOptions,
    ) -> Result<Vec<u8>> {
        let mut document = ComposedDocument::new();
        let context = registry.embed_fonts(&mut document)?;
        let composer = Composer::new(&self.fillers, &self.transforms, &context)
            .with_page_limit(options.page_limit);

        let mut guard = HandleGuard::default();
        for page in pages {
            let handles = composer.compose_page(&mut document, page)?;
            guard.handles.extend(handles);
        }

        let composed = document.page_count();
        let blanks = options.number_of_pages.blanks_needed(composed);
        if blanks > 0 {
            log::debug!("padding {} pages with {} blank pages", composed, blanks);
            document.insert_blank_pages(composed.saturating_sub(1), blanks)?;
        }

        let bytes = document.to_bytes()?;
        if let Some(sink) = sink {
            sink.write_all(&bytes)?;
            sink.flush()?;
        }

        log::info!(
            "assembled {} page(s) from {} page data entries ({} bytes)",
            document.page_count(),
            pages.len(),
            bytes.len()
        );
        drop(guard);
        Ok(bytes)
    }
}

/// Assemble with the built-in fillers and transforms
pub fn assemble(
    sink: Option<&mut dyn Write>,
    pages: &[PageData],
    registry: &Registry,
    options: &AssembleOptions,
) -> Result<Vec<u8>> {
    Assembler::default().assemble(sink, pages, registry, options)
}
