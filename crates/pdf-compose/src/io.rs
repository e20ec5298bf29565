//! File I/O for template sources, page data and composed output
//!
//! Composition itself is synchronous; these helpers do the file work on tokio
//! and move PDF parsing onto the blocking pool.

use crate::assemble::{AssembleOptions, Assembler};
use crate::page_data::PageData;
use crate::registry::Registry;
use crate::source::TemplateSource;
use crate::types::*;
use lopdf::Document;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Load a PDF document
pub async fn load_template_pdf(path: impl AsRef<Path>) -> Result<Document> {
    let path = path.as_ref().to_owned();
    let bytes = tokio::fs::read(&path).await?;
    let doc = tokio::task::spawn_blocking(move || Document::load_mem(&bytes)).await??;
    log::debug!("loaded {} ({} pages)", path.display(), doc.get_pages().len());
    Ok(doc)
}

/// Load page `page_number` (1-based) of a PDF as a template source
pub async fn load_template_source(
    path: impl AsRef<Path>,
    page_number: u32,
) -> Result<TemplateSource> {
    let path = path.as_ref();
    let doc = load_template_pdf(path).await?;
    TemplateSource::from_document(path.display().to_string(), doc, page_number)
}

/// Load a JSON array of page data
pub async fn load_pages(path: impl AsRef<Path>) -> Result<Vec<PageData>> {
    let bytes = tokio::fs::read(path.as_ref()).await?;
    let pages: Vec<PageData> = serde_json::from_slice(&bytes)?;
    Ok(pages)
}

/// Assemble `pages` into a new PDF file at `path`. Returns the size in bytes.
///
/// The file is the assembler's sink, so template handles are released only
/// after it has been written and flushed. A failed assembly may leave a
/// partial file behind.
pub async fn compose_to_file(
    assembler: &Assembler,
    path: impl AsRef<Path>,
    pages: &[PageData],
    registry: &Registry,
    options: &AssembleOptions,
) -> Result<usize> {
    let path = path.as_ref();
    let file = tokio::fs::File::create(path).await?.into_std().await;
    let mut writer = BufWriter::new(file);
    let bytes = assembler.assemble(Some(&mut writer as &mut dyn Write), pages, registry, options)?;
    log::debug!("wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(bytes.len())
}
