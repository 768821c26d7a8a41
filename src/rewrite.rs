//! Span replacement and the file writes behind it.

use crate::ident::QualifiedIdent;
use crate::matcher::{find_matches, MatchSpan};
use std::borrow::Cow;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RewriteError {
    #[error("Invalid byte range: [{byte_start}, {byte_end}) in buffer of length {len}")]
    InvalidByteRange {
        byte_start: usize,
        byte_end: usize,
        len: usize,
    },

    #[error("Span [{byte_start}, {byte_end}) overlaps or precedes the previous span ending at {previous_end}")]
    Unordered {
        byte_start: usize,
        byte_end: usize,
        previous_end: usize,
    },
}

/// Check that spans are in bounds, on char boundaries, sorted and
/// non-overlapping.
///
/// Spans produced by [`find_matches`] always pass; this is for callers that
/// build span lists by other means.
pub fn validate_spans(buffer: &str, spans: &[MatchSpan]) -> Result<(), RewriteError> {
    let mut previous_end = 0;
    for span in spans {
        if span.byte_start > span.byte_end
            || span.byte_end > buffer.len()
            || !buffer.is_char_boundary(span.byte_start)
            || !buffer.is_char_boundary(span.byte_end)
        {
            return Err(RewriteError::InvalidByteRange {
                byte_start: span.byte_start,
                byte_end: span.byte_end,
                len: buffer.len(),
            });
        }
        if span.byte_start < previous_end {
            return Err(RewriteError::Unordered {
                byte_start: span.byte_start,
                byte_end: span.byte_end,
                previous_end,
            });
        }
        previous_end = span.byte_end;
    }
    Ok(())
}

/// Replace every span with the rendered `replacement`, copying everything
/// else verbatim.
///
/// Spans must satisfy [`validate_spans`]. Spans that do not are left
/// untouched so the function stays total.
pub fn apply<I>(buffer: &str, matches: I, replacement: &QualifiedIdent) -> String
where
    I: IntoIterator<Item = MatchSpan>,
{
    let rendered = replacement.render();
    let mut out = String::with_capacity(buffer.len());
    let mut cursor = 0;

    for span in matches {
        if span.byte_start < cursor
            || span.byte_end < span.byte_start
            || span.byte_end > buffer.len()
            || !buffer.is_char_boundary(span.byte_start)
            || !buffer.is_char_boundary(span.byte_end)
        {
            continue;
        }
        out.push_str(&buffer[cursor..span.byte_start]);
        out.push_str(&rendered);
        cursor = span.byte_end;
    }

    out.push_str(&buffer[cursor..]);
    out
}

/// Result of rewriting one buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite<'a> {
    /// Borrowed when nothing matched.
    pub text: Cow<'a, str>,
    pub matches: usize,
}

impl Rewrite<'_> {
    pub fn is_changed(&self) -> bool {
        self.matches > 0
    }
}

/// A target/replacement pair applied to buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Renamer {
    target: QualifiedIdent,
    replacement: QualifiedIdent,
}

impl Renamer {
    pub fn new(target: QualifiedIdent, replacement: QualifiedIdent) -> Self {
        Self {
            target,
            replacement,
        }
    }

    pub fn target(&self) -> &QualifiedIdent {
        &self.target
    }

    pub fn replacement(&self) -> &QualifiedIdent {
        &self.replacement
    }

    pub fn rewrite<'a>(&self, buffer: &'a str) -> Rewrite<'a> {
        let spans: Vec<MatchSpan> = find_matches(buffer, &self.target).collect();
        if spans.is_empty() {
            return Rewrite {
                text: Cow::Borrowed(buffer),
                matches: 0,
            };
        }

        Rewrite {
            matches: spans.len(),
            text: Cow::Owned(apply(buffer, spans, &self.replacement)),
        }
    }
}

/// Atomic file write: tempfile + fsync + rename.
///
/// Either the full write succeeds or the destination is left as it was.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    // Same directory keeps the rename on one filesystem
    let parent = path.parent().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "Path has no parent directory")
    })?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}

/// Copy `from` to `to` byte for byte, keeping the modification time.
pub fn copy_verbatim(from: &Path, to: &Path) -> io::Result<u64> {
    let bytes = fs::copy(from, to)?;
    let metadata = fs::metadata(from)?;
    let mtime = filetime::FileTime::from_last_modification_time(&metadata);
    filetime::set_file_mtime(to, mtime)?;
    Ok(bytes)
}
