use super::text::lines_that_fit;
use super::wrap::{self, Align, Line, Piece, Tokenizer};
use super::{RegionFiller, RegionInput};
use crate::constants::{DEFAULT_FONT_SIZE, DEFAULT_LEADING};
use crate::document::ComposedDocument;
use crate::font::{EmbeddedFont, FontStyle};
use crate::page_data::LocationEntry;
use crate::registry::AssemblyContext;
use crate::render::Canvas;
use crate::types::*;
use serde::{Deserialize, Serialize};

/// A run of text sharing one font, style and size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<FontStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f32>,
}

impl Span {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font: None,
            style: None,
            size: None,
        }
    }

    pub fn styled(mut self, style: FontStyle) -> Self {
        self.style = Some(style);
        self
    }

    pub fn sized(mut self, size: f32) -> Self {
        self.size = Some(size);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    pub spans: Vec<Span>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<Align>,
    /// Extra space below the paragraph, in points
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_after: Option<f32>,
}

impl Paragraph {
    pub fn new(spans: Vec<Span>) -> Self {
        Self {
            spans,
            align: None,
            space_after: None,
        }
    }
}

/// Pre-parsed paragraphs of styled spans.
///
/// Region fields `font`, `style`, `size`, `leading` and `align` are the
/// defaults for spans and paragraphs that do not set their own. Overflow is
/// the list of paragraphs that did not fit, the first one possibly cut at a
/// line boundary.
pub struct RichTextFiller;

struct Defaults<'a> {
    font: Option<&'a str>,
    style: FontStyle,
    size: f32,
}

impl RegionFiller for RichTextFiller {
    fn fill(
        &self,
        _document: &mut ComposedDocument,
        canvas: &mut Canvas,
        input: &RegionInput<'_>,
        context: &AssemblyContext<'_>,
    ) -> Result<Option<LocationEntry>> {
        let contents = input
            .contents()
            .ok_or_else(|| input.invalid("missing 'contents'"))?;
        let paragraphs: Vec<Paragraph> = serde_json::from_value(contents.clone())
            .map_err(|err| input.invalid(format!("malformed paragraphs: {err}")))?;

        let defaults = Defaults {
            font: input.str_field("font")?,
            style: input.font_style()?,
            size: input.f32_field("size")?.unwrap_or(DEFAULT_FONT_SIZE),
        };
        let leading = input.f32_field("leading")?.unwrap_or(DEFAULT_LEADING);
        let region_align: Align = input.parse_field("align")?.unwrap_or_default();
        let bounds = input.bounds();

        let mut cursor = 0.0_f32;
        for (index, paragraph) in paragraphs.iter().enumerate() {
            let fonts = resolve_spans(paragraph, &defaults, context)?;
            let measure = |word: &str, span: &usize| {
                let (font, size) = fonts[*span];
                font.text_width(word, size)
            };
            let space = |span: &usize| {
                let (font, size) = fonts[*span];
                font.text_width(" ", size)
            };

            let mut tokenizer = Tokenizer::new();
            for (span_index, span) in paragraph.spans.iter().enumerate() {
                tokenizer.push(&span.text, span_index);
            }
            let pieces = wrap::split_long_words(tokenizer.finish(), bounds.width, measure);
            let lines = wrap::break_lines(&pieces, bounds.width, measure, space);
            let align = paragraph.align.unwrap_or(region_align);
            let fallback_size = fonts
                .iter()
                .map(|(_, size)| *size)
                .fold(defaults.size, f32::max);

            for (row, line) in lines.iter().enumerate() {
                let line_size = line_size(&pieces, line, &fonts).unwrap_or(fallback_size);
                let line_height = line_size * leading;
                if lines_that_fit(bounds.height - cursor, line_height) == 0 {
                    log::debug!(
                        "region '{}': paragraph {} breaks at line {}",
                        input.name(),
                        index,
                        row
                    );
                    let tail = wrap::remainder(&pieces, line.start);
                    let mut rest = Vec::with_capacity(paragraphs.len() - index);
                    if has_words(&tail) {
                        rest.push(if row == 0 {
                            paragraph.clone()
                        } else {
                            regroup(paragraph, &tail)
                        });
                    }
                    rest.extend_from_slice(&paragraphs[index + 1..]);

                    // Only blank lines left
                    if !rest.iter().any(has_text) {
                        return Ok(None);
                    }
                    return Ok(Some(input.remainder(serde_json::to_value(rest)?)));
                }

                let ascent = line_ascent(&pieces, line, &fonts).unwrap_or(0.0);
                let baseline = bounds.top() - cursor - ascent;
                let mut x = bounds.x + align.offset(bounds.width, line.width);
                for (position, piece) in pieces[line.start..line.end].iter().enumerate() {
                    let Piece::Word {
                        text,
                        style: span,
                        joined,
                    } = piece
                    else {
                        continue;
                    };
                    let (font, size) = fonts[*span];
                    if position > 0 && !joined {
                        x += font.text_width(" ", size);
                    }
                    canvas.draw_text(font, size, x, baseline, text);
                    x += font.text_width(text, size);
                }
                cursor += line_height;
            }
            cursor += paragraph.space_after.unwrap_or(0.0);
        }

        Ok(None)
    }
}

fn resolve_spans<'c>(
    paragraph: &Paragraph,
    defaults: &Defaults<'_>,
    context: &'c AssemblyContext<'_>,
) -> Result<Vec<(&'c EmbeddedFont, f32)>> {
    paragraph
        .spans
        .iter()
        .map(|span| {
            let font = context.font(
                span.font.as_deref().or(defaults.font),
                span.style.unwrap_or(defaults.style),
            )?;
            Ok((font, span.size.unwrap_or(defaults.size)))
        })
        .collect()
}

fn line_size(pieces: &[Piece<usize>], line: &Line, fonts: &[(&EmbeddedFont, f32)]) -> Option<f32> {
    line_words(pieces, line)
        .map(|span| fonts[span].1)
        .reduce(f32::max)
}

fn line_ascent(
    pieces: &[Piece<usize>],
    line: &Line,
    fonts: &[(&EmbeddedFont, f32)],
) -> Option<f32> {
    line_words(pieces, line)
        .map(|span| {
            let (font, size) = fonts[span];
            font.ascent(size)
        })
        .reduce(f32::max)
}

fn has_words<T>(pieces: &[Piece<T>]) -> bool {
    pieces.iter().any(|piece| matches!(piece, Piece::Word { .. }))
}

fn has_text(paragraph: &Paragraph) -> bool {
    paragraph
        .spans
        .iter()
        .any(|span| !span.text.trim().is_empty())
}

fn line_words<'p>(pieces: &'p [Piece<usize>], line: &Line) -> impl Iterator<Item = usize> + 'p {
    pieces[line.start..line.end]
        .iter()
        .filter_map(|piece| match piece {
            Piece::Word { style, .. } => Some(*style),
            Piece::Break => None,
        })
}

/// Rebuild a paragraph from a tail of its pieces, keeping span attributes
fn regroup(paragraph: &Paragraph, pieces: &[Piece<usize>]) -> Paragraph {
    let mut spans: Vec<Span> = Vec::new();
    let mut current: Option<(usize, String)> = None;
    let mut line_start = true;

    for piece in pieces {
        match piece {
            Piece::Word {
                text,
                style: span,
                joined,
            } => {
                let separator = if line_start || *joined { "" } else { " " };
                match current.take() {
                    Some((index, mut buffer)) if index == *span => {
                        buffer.push_str(separator);
                        buffer.push_str(text);
                        current = Some((index, buffer));
                    }
                    previous => {
                        if let Some((index, buffer)) = previous {
                            spans.push(with_text(&paragraph.spans[index], buffer));
                        }
                        current = Some((*span, format!("{separator}{text}")));
                    }
                }
                line_start = false;
            }
            Piece::Break => {
                if let Some((_, buffer)) = &mut current {
                    buffer.push('\n');
                }
                line_start = true;
            }
        }
    }
    if let Some((index, buffer)) = current {
        spans.push(with_text(&paragraph.spans[index], buffer));
    }

    Paragraph {
        spans,
        align: paragraph.align,
        space_after: paragraph.space_after,
    }
}

fn with_text(span: &Span, text: String) -> Span {
    Span {
        text,
        ..span.clone()
    }
}
