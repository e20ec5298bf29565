//! Template-driven PDF page composition
//!
//! Pages are described as [`PageData`]: a template name plus content for the
//! template's regions. The [`Assembler`] lays each page over its template's
//! source page, fills the regions, follows overflow into continuation pages,
//! honours page restrictions with filler pages and writes one PDF.

mod assemble;
mod compose;
pub mod constants;
mod document;
pub mod fill;
mod font;
mod io;
mod manifest;
mod page_data;
mod registry;
pub mod render;
mod source;
mod template;
pub mod transform;
mod types;

pub use assemble::{AssembleOptions, Assembler, PageCount, assemble};
pub use compose::Composer;
pub use document::{ComposedDocument, ImageXObject};
pub use fill::{FillerRegistry, RegionFiller, RegionInput};
pub use font::*;
pub use io::{compose_to_file, load_pages, load_template_pdf, load_template_source};
pub use manifest::*;
pub use page_data::*;
pub use registry::{AssemblyContext, Registry, RegistryBuilder};
pub use render::Canvas;
pub use source::{SourceHandle, SourceId, TemplateSource};
pub use template::*;
pub use transform::{PageTransform, Rotate, TransformRegistry};
pub use types::*;
