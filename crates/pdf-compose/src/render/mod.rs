//! PDF rendering for composed pages
//!
//! This module handles all PDF-specific drawing:
//! - Importing template pages as Form XObjects
//! - Deep copying objects between documents
//! - The per-page drawing canvas used by region fillers

mod canvas;
mod xobject;

pub use canvas::Canvas;
pub use xobject::{copy_object_deep, create_page_xobject, page_media_box};
pub(crate) use xobject::rect_to_array;
