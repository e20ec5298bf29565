//! Greedy line breaking shared by the text fillers
//!
//! Text is first split into [`Piece`]s: words carrying a style tag, and hard
//! breaks. Line breaking works on pieces so that a remainder can be rebuilt
//! from the first line that did not fit.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

impl Align {
    /// Horizontal offset of a line of `line_width` within `available`
    pub fn offset(self, available: f32, line_width: f32) -> f32 {
        let slack = (available - line_width).max(0.0);
        match self {
            Align::Left => 0.0,
            Align::Center => slack / 2.0,
            Align::Right => slack,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Piece<T> {
    /// `joined` words follow the previous word without a space
    Word { text: String, style: T, joined: bool },
    Break,
}

/// Splits styled runs of text into pieces
pub(crate) struct Tokenizer<T> {
    pieces: Vec<Piece<T>>,
    gap: bool,
}

impl<T: Clone> Tokenizer<T> {
    pub fn new() -> Self {
        Self {
            pieces: Vec::new(),
            gap: true,
        }
    }

    /// Append a run of text. Runs that meet without whitespace form one word.
    pub fn push(&mut self, text: &str, style: T) {
        for (index, line) in text.split('\n').enumerate() {
            if index > 0 {
                self.pieces.push(Piece::Break);
                self.gap = true;
            }
            if line.starts_with(char::is_whitespace) {
                self.gap = true;
            }

            let mut words = line.split_whitespace().peekable();
            if words.peek().is_none() {
                continue;
            }
            for (position, word) in words.enumerate() {
                let joined = position == 0 && !self.gap;
                self.pieces.push(Piece::Word {
                    text: word.to_string(),
                    style: style.clone(),
                    joined,
                });
            }
            self.gap = line.ends_with(char::is_whitespace);
        }
    }

    pub fn finish(self) -> Vec<Piece<T>> {
        self.pieces
    }
}

/// Split words wider than `max_width` into chunks that fit, character by
/// character. Chunks after the first are joined to the previous one.
pub(crate) fn split_long_words<T: Clone>(
    pieces: Vec<Piece<T>>,
    max_width: f32,
    measure: impl Fn(&str, &T) -> f32,
) -> Vec<Piece<T>> {
    let mut result = Vec::with_capacity(pieces.len());
    for piece in pieces {
        let Piece::Word {
            text,
            style,
            joined,
        } = &piece
        else {
            result.push(piece);
            continue;
        };
        if measure(text, style) <= max_width {
            result.push(piece);
            continue;
        }

        let mut chunk = String::new();
        let mut chunk_joined = *joined;
        for ch in text.chars() {
            chunk.push(ch);
            if chunk.chars().count() > 1 && measure(&chunk, style) > max_width {
                chunk.pop();
                result.push(Piece::Word {
                    text: std::mem::take(&mut chunk),
                    style: style.clone(),
                    joined: chunk_joined,
                });
                chunk_joined = true;
                chunk.push(ch);
            }
        }
        if !chunk.is_empty() {
            result.push(Piece::Word {
                text: chunk,
                style: style.clone(),
                joined: chunk_joined,
            });
        }
    }
    result
}

/// A line as a range of piece indices
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Line {
    pub start: usize,
    pub end: usize,
    pub width: f32,
}

/// Greedy line breaking.
///
/// Joined words are kept on one line unless the group is wider than a whole
/// line, in which case it may break between its pieces. A hard break ends the
/// current line; consecutive breaks produce empty lines.
pub(crate) fn break_lines<T>(
    pieces: &[Piece<T>],
    max_width: f32,
    measure: impl Fn(&str, &T) -> f32,
    space_width: impl Fn(&T) -> f32,
) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut width = 0.0_f32;
    let mut index = 0;

    while index < pieces.len() {
        let Piece::Word { style, joined, .. } = &pieces[index] else {
            lines.push(Line {
                start,
                end: index,
                width,
            });
            index += 1;
            start = index;
            width = 0.0;
            continue;
        };

        // Extent of the group of joined words starting here
        let mut group_end = index + 1;
        let mut group_width = word_width(&pieces[index], &measure);
        while let Some(next @ Piece::Word { joined: true, .. }) = pieces.get(group_end) {
            group_width += word_width(next, &measure);
            group_end += 1;
        }

        let gap = if index == start || *joined {
            0.0
        } else {
            space_width(style)
        };

        if index > start && width + gap + group_width > max_width {
            lines.push(Line {
                start,
                end: index,
                width,
            });
            start = index;
            width = 0.0;
            continue;
        }

        if group_width <= max_width || index > start {
            width += gap + group_width;
            index = group_end;
            continue;
        }

        // Group wider than a line: place its pieces one at a time
        for piece_index in index..group_end {
            let piece_width = word_width(&pieces[piece_index], &measure);
            if piece_index > start && width + piece_width > max_width {
                lines.push(Line {
                    start,
                    end: piece_index,
                    width,
                });
                start = piece_index;
                width = 0.0;
            }
            width += piece_width;
        }
        index = group_end;
    }

    if start < pieces.len() {
        lines.push(Line {
            start,
            end: pieces.len(),
            width,
        });
    }
    lines
}

fn word_width<T>(piece: &Piece<T>, measure: &impl Fn(&str, &T) -> f32) -> f32 {
    match piece {
        Piece::Word { text, style, .. } => measure(text, style),
        Piece::Break => 0.0,
    }
}

/// Pieces from `start` on, as the remainder of a text that did not fit.
/// Leading breaks are dropped and the first word starts fresh.
pub(crate) fn remainder<T: Clone>(pieces: &[Piece<T>], start: usize) -> Vec<Piece<T>> {
    let mut rest: Vec<Piece<T>> = pieces[start.min(pieces.len())..]
        .iter()
        .skip_while(|piece| matches!(piece, Piece::Break))
        .cloned()
        .collect();
    if let Some(Piece::Word { joined, .. }) = rest.first_mut() {
        *joined = false;
    }
    rest
}

/// Render pieces back to text, words separated by single spaces
pub(crate) fn join_pieces<T>(pieces: &[Piece<T>]) -> String {
    let mut text = String::new();
    let mut line_start = true;
    for piece in pieces {
        match piece {
            Piece::Word { text: word, joined, .. } => {
                if !line_start && !joined {
                    text.push(' ');
                }
                text.push_str(word);
                line_start = false;
            }
            Piece::Break => {
                text.push('\n');
                line_start = true;
            }
        }
    }
    text
}
