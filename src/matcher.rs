//! Lexical matcher for qualified identifiers.
//!
//! Finds whole-identifier occurrences of a target such as `a::b` in a text
//! buffer. Whitespace, line comments and block comments may appear on either
//! side of each `::` separator, so `a\n    :: /* x */ b` is one occurrence.
//! The matcher never looks at language structure: occurrences inside string
//! literals and comments are reported like any other.

use crate::ident::{is_ident_byte, QualifiedIdent, SEPARATOR};

/// A located occurrence of the target identifier.
///
/// The byte before `byte_start` and the byte at `byte_end` are never
/// identifier characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MatchSpan {
    /// Starting byte offset (inclusive)
    pub byte_start: usize,
    /// Ending byte offset (exclusive)
    pub byte_end: usize,
}

impl MatchSpan {
    pub fn new(byte_start: usize, byte_end: usize) -> Self {
        Self {
            byte_start,
            byte_end,
        }
    }

    /// The matched source text, including any interior trivia.
    pub fn text<'a>(&self, buffer: &'a str) -> &'a str {
        &buffer[self.byte_start..self.byte_end]
    }

    pub fn len(&self) -> usize {
        self.byte_end - self.byte_start
    }

    pub fn is_empty(&self) -> bool {
        self.byte_start == self.byte_end
    }
}

/// Lazy iterator over the occurrences of a target in a buffer.
///
/// A clone continues independently from the same position. Call
/// [`find_matches`] again to rescan from the beginning.
#[derive(Debug, Clone)]
pub struct Matches<'a> {
    buffer: &'a str,
    target: &'a QualifiedIdent,
    pos: usize,
}

/// Scan `buffer` left to right for occurrences of `target`.
pub fn find_matches<'a>(buffer: &'a str, target: &'a QualifiedIdent) -> Matches<'a> {
    Matches {
        buffer,
        target,
        pos: 0,
    }
}

/// Number of occurrences of `target` in `buffer`.
pub fn count_matches(buffer: &str, target: &QualifiedIdent) -> usize {
    find_matches(buffer, target).count()
}

impl Iterator for Matches<'_> {
    type Item = MatchSpan;

    fn next(&mut self) -> Option<MatchSpan> {
        let bytes = self.buffer.as_bytes();
        let first = self.target.first().as_bytes();

        while self.pos < bytes.len() {
            let start = self.pos;
            if !is_ident_byte(bytes[start]) {
                self.pos += 1;
                continue;
            }

            // No match can begin inside an identifier run, so resuming after
            // the run is the same as resuming one byte after `start`.
            let run_end = ident_run_end(bytes, start);
            self.pos = run_end;

            if start > 0 && is_ident_byte(bytes[start - 1]) {
                continue;
            }
            if &bytes[start..run_end] != first {
                continue;
            }

            if let Some(end) = self.extend(run_end) {
                self.pos = end;
                return Some(MatchSpan::new(start, end));
            }
        }

        None
    }
}

impl Matches<'_> {
    /// Consume the remaining `:: segment` pairs after the first segment.
    ///
    /// Returns the end offset of the final segment, or `None` if the
    /// candidate has to be abandoned.
    fn extend(&self, mut pos: usize) -> Option<usize> {
        let bytes = self.buffer.as_bytes();

        for segment in &self.target.segments()[1..] {
            pos = skip_trivia(bytes, pos)?;
            if !bytes[pos..].starts_with(SEPARATOR.as_bytes()) {
                return None;
            }
            pos = skip_trivia(bytes, pos + SEPARATOR.len())?;

            if pos >= bytes.len() || !is_ident_byte(bytes[pos]) {
                return None;
            }
            let run_end = ident_run_end(bytes, pos);
            if &bytes[pos..run_end] != segment.as_bytes() {
                return None;
            }
            pos = run_end;
        }

        Some(pos)
    }
}

fn ident_run_end(bytes: &[u8], start: usize) -> usize {
    bytes[start..]
        .iter()
        .position(|b| !is_ident_byte(*b))
        .map_or(bytes.len(), |offset| start + offset)
}

/// Skip whitespace, `//` comments and `/* */` comments.
///
/// An unterminated block comment is not trivia.
fn skip_trivia(bytes: &[u8], mut pos: usize) -> Option<usize> {
    loop {
        let rest = &bytes[pos..];
        match rest {
            [b, ..] if b.is_ascii_whitespace() || *b == b'\x0b' => pos += 1,
            [b'/', b'/', ..] => {
                pos = rest
                    .iter()
                    .position(|b| *b == b'\n')
                    .map_or(bytes.len(), |offset| pos + offset + 1);
            }
            [b'/', b'*', ..] => {
                let close = rest[2..].windows(2).position(|w| w == b"*/")?;
                pos += 2 + close + 2;
            }
            _ => return Some(pos),
        }
    }
}

/// 1-based line and column (in characters) of a byte offset.
pub fn locate(buffer: &str, offset: usize) -> (usize, usize) {
    let before = &buffer[..offset];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |idx| idx + 1);
    let column = before[line_start..].chars().count() + 1;
    (line, column)
}
