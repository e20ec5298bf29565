use super::wrap::{self, Align, Piece, Tokenizer};
use super::{RegionFiller, RegionInput};
use crate::constants::{DEFAULT_FONT_SIZE, DEFAULT_LEADING};
use crate::document::ComposedDocument;
use crate::page_data::LocationEntry;
use crate::registry::AssemblyContext;
use crate::render::Canvas;
use crate::types::*;

/// Plain text in a single font, wrapped to the region width.
///
/// Fields: `font`, `style`, `size`, `leading`, `align`. Lines that do not fit
/// above the bottom of the region are returned as overflow.
pub struct TextFiller;

impl RegionFiller for TextFiller {
    fn fill(
        &self,
        _document: &mut ComposedDocument,
        canvas: &mut Canvas,
        input: &RegionInput<'_>,
        context: &AssemblyContext<'_>,
    ) -> Result<Option<LocationEntry>> {
        let text = input.contents_str()?;
        let font = context.font(input.str_field("font")?, input.font_style()?)?;
        let size = input.f32_field("size")?.unwrap_or(DEFAULT_FONT_SIZE);
        let leading = input.f32_field("leading")?.unwrap_or(DEFAULT_LEADING);
        let align: Align = input.parse_field("align")?.unwrap_or_default();
        let bounds = input.bounds();

        let measure = |word: &str, _: &()| font.text_width(word, size);
        let space = font.text_width(" ", size);

        let mut tokenizer = Tokenizer::new();
        tokenizer.push(text, ());
        let pieces = wrap::split_long_words(tokenizer.finish(), bounds.width, measure);
        let lines = wrap::break_lines(&pieces, bounds.width, measure, |_| space);

        let line_height = size * leading;
        let capacity = lines_that_fit(bounds.height, line_height);
        let ascent = font.ascent(size);

        for (row, line) in lines.iter().take(capacity).enumerate() {
            let x = bounds.x + align.offset(bounds.width, line.width);
            let y = bounds.top() - ascent - row as f32 * line_height;
            let text = wrap::join_pieces(&pieces[line.start..line.end]);
            canvas.draw_text(font, size, x, y, &text);
        }

        let Some(first_unfit) = lines.get(capacity) else {
            return Ok(None);
        };
        let rest: Vec<Piece<()>> = wrap::remainder(&pieces, first_unfit.start);
        if rest.is_empty() {
            return Ok(None);
        }

        log::debug!(
            "region '{}': {} of {} lines fit",
            input.name(),
            capacity,
            lines.len()
        );
        Ok(Some(input.remainder(wrap::join_pieces(&rest))))
    }
}

/// Number of lines of `line_height` that fit in `height`
pub(crate) fn lines_that_fit(height: f32, line_height: f32) -> usize {
    if line_height <= 0.0 {
        return 0;
    }
    // Tolerate rounding in region heights given as exact multiples
    ((height + 0.01) / line_height).floor().max(0.0) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_that_fit() {
        assert_eq!(lines_that_fit(36.0, 12.0), 3);
        assert_eq!(lines_that_fit(35.9, 12.0), 2);
        assert_eq!(lines_that_fit(5.0, 12.0), 0);
        assert_eq!(lines_that_fit(-5.0, 12.0), 0);
    }
}
