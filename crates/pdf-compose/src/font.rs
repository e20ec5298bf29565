//! Fonts: registration, embedding and text measurement
//!
//! Two kinds of faces are supported:
//! - the standard 14 Type1 fonts, which need no font program and are measured
//!   with an average glyph width per family
//! - TrueType fonts, parsed with `ttf-parser`, embedded as `FontFile2` and
//!   measured with their real advance widths
//!
//! Text is written with `WinAnsiEncoding`. Characters outside the printable
//! Latin-1 range are replaced.

use crate::constants::*;
use crate::document::ComposedDocument;
use crate::types::*;
use lopdf::{Dictionary, Object, ObjectId, Stream};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

// =============================================================================
// Styles and Faces
// =============================================================================

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum FontStyle {
    #[default]
    Regular,
    Bold,
    Italic,
    BoldItalic,
}

impl FontStyle {
    pub const ALL: [FontStyle; 4] = [
        FontStyle::Regular,
        FontStyle::Bold,
        FontStyle::Italic,
        FontStyle::BoldItalic,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "regular" | "normal" => Some(FontStyle::Regular),
            "bold" => Some(FontStyle::Bold),
            "italic" => Some(FontStyle::Italic),
            "bold-italic" | "bolditalic" => Some(FontStyle::BoldItalic),
            _ => None,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            FontStyle::Regular => "",
            FontStyle::Bold => "-Bold",
            FontStyle::Italic => "-Italic",
            FontStyle::BoldItalic => "-BoldItalic",
        }
    }
}

const STANDARD_FONTS: [&str; 14] = [
    "Helvetica",
    "Helvetica-Bold",
    "Helvetica-Oblique",
    "Helvetica-BoldOblique",
    "Times-Roman",
    "Times-Bold",
    "Times-Italic",
    "Times-BoldItalic",
    "Courier",
    "Courier-Bold",
    "Courier-Oblique",
    "Courier-BoldOblique",
    "Symbol",
    "ZapfDingbats",
];

/// One of the 14 fonts every PDF reader provides
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandardFont {
    base_font: &'static str,
}

impl StandardFont {
    pub fn from_name(name: &str) -> Option<Self> {
        STANDARD_FONTS
            .iter()
            .find(|candidate| **candidate == name)
            .map(|base_font| Self {
                base_font: *base_font,
            })
    }

    pub fn base_font(&self) -> &'static str {
        self.base_font
    }

    /// Average advance width in thousandths of the font size
    fn average_width(&self) -> f32 {
        if self.base_font.starts_with("Courier") {
            600.0
        } else if self.base_font.starts_with("Times") {
            450.0
        } else if self.base_font.contains("Bold") {
            550.0
        } else {
            500.0
        }
    }
}

/// Metrics of a TrueType face, scaled to a 1000 unit em
#[derive(Debug, Clone, PartialEq)]
struct TrueTypeMetrics {
    /// Advance widths for codes `FIRST_CHAR..=LAST_CHAR`
    widths: Vec<u16>,
    missing_width: u16,
    ascent: i16,
    descent: i16,
    cap_height: i16,
    bbox: [i16; 4],
}

/// A parsed TrueType font program
#[derive(Debug, Clone, PartialEq)]
pub struct TrueTypeFace {
    base_font: String,
    data: Vec<u8>,
    metrics: TrueTypeMetrics,
}

impl TrueTypeFace {
    /// Parse a TrueType program; `base_font` is the PostScript name to embed under
    pub fn parse(base_font: impl Into<String>, data: Vec<u8>) -> Result<Self> {
        let base_font = sanitize_font_name(&base_font.into());
        let face = ttf_parser::Face::parse(&data, 0)
            .map_err(|e| ComposeError::Font(format!("invalid font data for {base_font}: {e}")))?;

        let units = face.units_per_em().max(1) as f32;
        let scale = |value: i16| -> i16 { (value as f32 * 1000.0 / units).round() as i16 };

        let widths: Vec<u16> = (FIRST_CHAR..=LAST_CHAR)
            .map(|code| {
                face.glyph_index(code as char)
                    .and_then(|gid| face.glyph_hor_advance(gid))
                    .map(|advance| (advance as f32 * 1000.0 / units).round() as u16)
                    .unwrap_or(0)
            })
            .collect();
        let missing_width = widths[(b' ' - FIRST_CHAR) as usize];

        let bbox = face.global_bounding_box();
        let ascent = scale(face.ascender());
        let metrics = TrueTypeMetrics {
            widths,
            missing_width,
            ascent,
            descent: scale(face.descender()),
            cap_height: face.capital_height().map(scale).unwrap_or(ascent),
            bbox: [
                scale(bbox.x_min),
                scale(bbox.y_min),
                scale(bbox.x_max),
                scale(bbox.y_max),
            ],
        };

        Ok(Self {
            base_font,
            data,
            metrics,
        })
    }

    pub fn base_font(&self) -> &str {
        &self.base_font
    }
}

fn sanitize_font_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}

/// A face that can be embedded and measured
#[derive(Debug, Clone, PartialEq)]
pub enum FontFace {
    Standard(StandardFont),
    TrueType(Arc<TrueTypeFace>),
}

impl FontFace {
    /// Standard font by base name, e.g. `Times-Bold`
    pub fn standard(name: &str) -> Result<Self> {
        StandardFont::from_name(name)
            .map(FontFace::Standard)
            .ok_or_else(|| ComposeError::Font(format!("'{name}' is not a standard PDF font")))
    }

    pub fn true_type(base_font: impl Into<String>, data: Vec<u8>) -> Result<Self> {
        Ok(FontFace::TrueType(Arc::new(TrueTypeFace::parse(
            base_font, data,
        )?)))
    }

    /// Advance width of a single-byte code, in thousandths of the font size
    fn code_width(&self, code: u8) -> f32 {
        match self {
            FontFace::Standard(font) => font.average_width(),
            FontFace::TrueType(face) => {
                let metrics = &face.metrics;
                code.checked_sub(FIRST_CHAR)
                    .and_then(|index| metrics.widths.get(index as usize))
                    .copied()
                    .filter(|width| *width > 0)
                    .unwrap_or(metrics.missing_width) as f32
            }
        }
    }

    fn ascent(&self) -> f32 {
        match self {
            FontFace::Standard(_) => STANDARD_FONT_ASCENT,
            FontFace::TrueType(face) => face.metrics.ascent as f32,
        }
    }

    fn descent(&self) -> f32 {
        match self {
            FontFace::Standard(_) => STANDARD_FONT_DESCENT,
            FontFace::TrueType(face) => face.metrics.descent as f32,
        }
    }
}

/// A named font family with up to four styles
#[derive(Debug, Clone, PartialEq)]
pub struct FontFamily {
    pub name: String,
    faces: BTreeMap<FontStyle, FontFace>,
}

impl FontFamily {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            faces: BTreeMap::new(),
        }
    }

    pub fn with_face(mut self, style: FontStyle, face: FontFace) -> Self {
        self.faces.insert(style, face);
        self
    }

    /// The four Helvetica faces
    pub fn helvetica(name: impl Into<String>) -> Self {
        Self::standard_family(
            name,
            ["Helvetica", "Helvetica-Bold", "Helvetica-Oblique", "Helvetica-BoldOblique"],
        )
    }

    /// The four Times faces
    pub fn times(name: impl Into<String>) -> Self {
        Self::standard_family(
            name,
            ["Times-Roman", "Times-Bold", "Times-Italic", "Times-BoldItalic"],
        )
    }

    /// The four Courier faces
    pub fn courier(name: impl Into<String>) -> Self {
        Self::standard_family(
            name,
            ["Courier", "Courier-Bold", "Courier-Oblique", "Courier-BoldOblique"],
        )
    }

    fn standard_family(name: impl Into<String>, base_fonts: [&'static str; 4]) -> Self {
        let mut family = Self::new(name);
        for (style, base_font) in FontStyle::ALL.into_iter().zip(base_fonts) {
            family
                .faces
                .insert(style, FontFace::Standard(StandardFont { base_font }));
        }
        family
    }

    pub fn face(&self, style: FontStyle) -> Option<&FontFace> {
        self.faces.get(&style)
    }

    /// Styles this family provides
    pub fn styles(&self) -> impl Iterator<Item = FontStyle> + '_ {
        self.faces.keys().copied()
    }
}

// =============================================================================
// Embedded Fonts
// =============================================================================

/// A face that has been written to the output document
#[derive(Debug, Clone)]
pub struct EmbeddedFont {
    resource_name: String,
    object_id: ObjectId,
    face: FontFace,
}

impl EmbeddedFont {
    /// Name of the font in page resource dictionaries (`F1`, `F2`, ...)
    pub fn resource_name(&self) -> &str {
        &self.resource_name
    }

    pub fn object_id(&self) -> ObjectId {
        self.object_id
    }

    pub fn face(&self) -> &FontFace {
        &self.face
    }

    /// Width of `text` set at `size` points
    pub fn text_width(&self, text: &str, size: f32) -> f32 {
        encode_text(text)
            .iter()
            .map(|code| self.face.code_width(*code))
            .sum::<f32>()
            * size
            / 1000.0
    }

    /// Distance from the baseline to the top of the tallest glyphs
    pub fn ascent(&self, size: f32) -> f32 {
        self.face.ascent() * size / 1000.0
    }

    /// Distance below the baseline (negative)
    pub fn descent(&self, size: f32) -> f32 {
        self.face.descent() * size / 1000.0
    }
}

/// Encode text as single-byte WinAnsi codes
pub fn encode_text(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| match ch as u32 {
            code @ 0x20..=0x7E | code @ 0xA0..=0xFF => code as u8,
            _ => REPLACEMENT_CHAR,
        })
        .collect()
}

/// Fonts embedded in one output document, keyed by (family, style)
#[derive(Debug, Clone, Default)]
pub struct FontBook {
    fonts: BTreeMap<(String, FontStyle), EmbeddedFont>,
    default_family: Option<String>,
}

impl FontBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Embed one style of a family. Embedding the same pair again is a no-op.
    pub fn embed(
        &mut self,
        document: &mut ComposedDocument,
        family: &FontFamily,
        style: FontStyle,
    ) -> Result<()> {
        let key = (family.name.clone(), style);
        if self.fonts.contains_key(&key) {
            return Ok(());
        }

        let face = family.face(style).ok_or_else(|| {
            ComposeError::Font(format!("family '{}' has no {:?} face", family.name, style))
        })?;

        let object_id = match face {
            FontFace::Standard(font) => embed_standard(document, font),
            FontFace::TrueType(face) => embed_true_type(document, face, style)?,
        };
        let resource_name = format!("{}{}", FONT_RESOURCE_PREFIX, self.fonts.len() + 1);
        log::debug!(
            "embedded font {} ({:?}) as /{}",
            family.name,
            style,
            resource_name
        );

        self.default_family.get_or_insert_with(|| family.name.clone());
        self.fonts.insert(
            key,
            EmbeddedFont {
                resource_name,
                object_id,
                face: face.clone(),
            },
        );
        Ok(())
    }

    /// Find an embedded face. A missing family means the first embedded family;
    /// a missing style falls back to the family's regular face.
    pub fn resolve(&self, family: Option<&str>, style: FontStyle) -> Result<&EmbeddedFont> {
        let family = family
            .or(self.default_family.as_deref())
            .ok_or_else(|| ComposeError::Font("no fonts have been embedded".to_string()))?;

        self.fonts
            .get(&(family.to_string(), style))
            .or_else(|| self.fonts.get(&(family.to_string(), FontStyle::Regular)))
            .ok_or_else(|| ComposeError::Font(format!("font '{family}' is not embedded")))
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }
}

fn embed_standard(document: &mut ComposedDocument, font: &StandardFont) -> ObjectId {
    let mut font_dict = Dictionary::new();
    font_dict.set("Type", Object::Name(b"Font".to_vec()));
    font_dict.set("Subtype", Object::Name(b"Type1".to_vec()));
    font_dict.set("BaseFont", Object::Name(font.base_font.as_bytes().to_vec()));
    if font.base_font != "Symbol" && font.base_font != "ZapfDingbats" {
        font_dict.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
    }
    document.add_object(font_dict)
}

fn embed_true_type(
    document: &mut ComposedDocument,
    face: &TrueTypeFace,
    style: FontStyle,
) -> Result<ObjectId> {
    let metrics = &face.metrics;
    let base_font = format!("{}{}", face.base_font, style.suffix());

    let mut program = Stream::new(
        Dictionary::from_iter(vec![("Length1", Object::Integer(face.data.len() as i64))]),
        face.data.clone(),
    );
    program.compress()?;
    let program_id = document.add_object(program);

    // Nonsymbolic, plus Italic when slanted
    let mut flags = 32;
    if matches!(style, FontStyle::Italic | FontStyle::BoldItalic) {
        flags |= 64;
    }
    let descriptor_id = document.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"FontDescriptor".to_vec())),
        ("FontName", Object::Name(base_font.as_bytes().to_vec())),
        ("Flags", Object::Integer(flags)),
        (
            "FontBBox",
            Object::Array(metrics.bbox.iter().map(|v| Object::Integer(*v as i64)).collect()),
        ),
        ("ItalicAngle", Object::Integer(0)),
        ("Ascent", Object::Integer(metrics.ascent as i64)),
        ("Descent", Object::Integer(metrics.descent as i64)),
        ("CapHeight", Object::Integer(metrics.cap_height as i64)),
        ("StemV", Object::Integer(80)),
        ("MissingWidth", Object::Integer(metrics.missing_width as i64)),
        ("FontFile2", Object::Reference(program_id)),
    ]));

    Ok(document.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"TrueType".to_vec())),
        ("BaseFont", Object::Name(base_font.into_bytes())),
        ("FirstChar", Object::Integer(FIRST_CHAR as i64)),
        ("LastChar", Object::Integer(LAST_CHAR as i64)),
        (
            "Widths",
            Object::Array(
                metrics
                    .widths
                    .iter()
                    .map(|w| Object::Integer(*w as i64))
                    .collect(),
            ),
        ),
        ("FontDescriptor", Object::Reference(descriptor_id)),
        ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
    ])))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_replaces_unencodable_characters() {
        assert_eq!(encode_text("Aé€"), vec![b'A', 0xE9, REPLACEMENT_CHAR]);
    }

    #[test]
    fn test_standard_font_lookup() {
        assert!(StandardFont::from_name("Times-Roman").is_some());
        assert!(StandardFont::from_name("Arial").is_none());
        assert!(FontFace::standard("Comic Sans").is_err());
    }

    #[test]
    fn test_embedding_is_idempotent() {
        let mut document = ComposedDocument::new();
        let family = FontFamily::helvetica("Sans");
        let mut book = FontBook::new();

        book.embed(&mut document, &family, FontStyle::Bold).unwrap();
        let objects = document.object_count();
        book.embed(&mut document, &family, FontStyle::Bold).unwrap();

        assert_eq!(book.len(), 1);
        assert_eq!(document.object_count(), objects);
        assert_eq!(
            book.resolve(Some("Sans"), FontStyle::Bold).unwrap().resource_name(),
            "F1"
        );
    }

    #[test]
    fn test_resolve_falls_back_to_regular_and_default_family() {
        let mut document = ComposedDocument::new();
        let family = FontFamily::courier("Mono");
        let mut book = FontBook::new();
        book.embed(&mut document, &family, FontStyle::Regular).unwrap();

        let font = book.resolve(None, FontStyle::Italic).unwrap();
        assert_eq!(font.resource_name(), "F1");
        assert!(book.resolve(Some("Serif"), FontStyle::Regular).is_err());
    }

    #[test]
    fn test_courier_is_monospaced() {
        let mut document = ComposedDocument::new();
        let mut book = FontBook::new();
        book.embed(&mut document, &FontFamily::courier("Mono"), FontStyle::Regular)
            .unwrap();
        let font = book.resolve(None, FontStyle::Regular).unwrap();

        assert!((font.text_width("iiii", 10.0) - 24.0).abs() < 0.001);
        assert!((font.text_width("MMMM", 10.0) - 24.0).abs() < 0.001);
    }

    #[test]
    fn test_invalid_true_type_data() {
        let result = FontFace::true_type("Broken", vec![0, 1, 2, 3]);
        assert!(matches!(result, Err(ComposeError::Font(_))));
    }
}
