//! Shared constants for page composition
//!
//! This module centralizes magic numbers and default values used by the
//! composer, the region fillers and the font layer.

// =============================================================================
// Default Page Dimensions
// =============================================================================

/// Default page width in points (US Letter: 8.5" × 11")
pub const DEFAULT_PAGE_WIDTH_PT: f32 = 612.0;

/// Default page height in points (US Letter)
pub const DEFAULT_PAGE_HEIGHT_PT: f32 = 792.0;

/// Default page dimensions as tuple (width, height)
pub const DEFAULT_PAGE_DIMENSIONS: (f32, f32) = (DEFAULT_PAGE_WIDTH_PT, DEFAULT_PAGE_HEIGHT_PT);

// =============================================================================
// Resource Names
// =============================================================================

/// Name under which an imported template page is drawn on its output page
pub const TEMPLATE_XOBJECT_NAME: &str = "Tpl";

/// Prefix for embedded font resource names (`F1`, `F2`, ...)
pub const FONT_RESOURCE_PREFIX: &str = "F";

/// Prefix for image XObject resource names (`Im1`, `Im2`, ...)
pub const IMAGE_RESOURCE_PREFIX: &str = "Im";

// =============================================================================
// Text
// =============================================================================

/// Font size used when a text region does not specify one (points)
pub const DEFAULT_FONT_SIZE: f32 = 10.0;

/// Line height as a multiple of the font size
pub const DEFAULT_LEADING: f32 = 1.2;

/// Family registered when a registry is built without any fonts
pub const DEFAULT_FONT_FAMILY: &str = "Helvetica";

/// First and last character codes covered by simple font width tables
pub const FIRST_CHAR: u8 = 32;
pub const LAST_CHAR: u8 = 255;

/// Substituted for characters outside the single-byte encoding
pub const REPLACEMENT_CHAR: u8 = b'?';

/// Ascent of the standard 14 fonts, in thousandths of the font size
pub const STANDARD_FONT_ASCENT: f32 = 718.0;

/// Descent of the standard 14 fonts, in thousandths of the font size
pub const STANDARD_FONT_DESCENT: f32 = -207.0;
