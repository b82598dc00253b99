//! Source files, positions, and ranges.
//!
//! Offsets are bytes into the (CRLF-normalised) file content. Line and column
//! are derived from a line-start index built once per file; both are 1-based.

use std::fs;
use std::io;
use std::path::Path;

/// A position in a source file: a byte offset plus its derived line/column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourcePos {
    pub offset: usize,
    pub line: u32,
    pub column: u32,
}

/// A span over source bytes. Half-open over `[begin.offset, end.offset)`,
/// inclusive over the derived positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceRange {
    pub begin: SourcePos,
    pub end: SourcePos,
}

impl SourceRange {
    pub fn new(begin: SourcePos, end: SourcePos) -> Self {
        debug_assert!(begin.offset <= end.offset);
        Self { begin, end }
    }

    /// Smallest range covering both `self` and `other`.
    pub fn merge(self, other: SourceRange) -> SourceRange {
        let begin = if self.begin.offset <= other.begin.offset {
            self.begin
        } else {
            other.begin
        };
        let end = if self.end.offset >= other.end.offset {
            self.end
        } else {
            other.end
        };
        SourceRange { begin, end }
    }

    pub fn len(&self) -> usize {
        self.end.offset - self.begin.offset
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A loaded source file with its line index.
#[derive(Debug, Clone)]
pub struct SourceFile {
    path: String,
    content: String,
    line_starts: Vec<usize>,
}

impl SourceFile {
    /// Read a file from disk, normalising CRLF line endings to LF.
    pub fn from_path(path: &Path) -> io::Result<SourceFile> {
        let raw = fs::read_to_string(path)?;
        Ok(Self::from_source(path.to_string_lossy().into_owned(), raw))
    }

    pub fn from_source(path: String, raw: impl Into<String>) -> SourceFile {
        let content = raw.into().replace("\r\n", "\n");
        let mut line_starts = vec![0];
        for (i, b) in content.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        SourceFile {
            path,
            content,
            line_starts,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Derive the full position for a byte offset.
    pub fn pos_at(&self, offset: usize) -> SourcePos {
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        SourcePos {
            offset,
            line: (line_idx + 1) as u32,
            column: (offset - self.line_starts[line_idx] + 1) as u32,
        }
    }

    /// Build a range from two byte offsets.
    pub fn range(&self, begin: usize, end: usize) -> SourceRange {
        SourceRange::new(self.pos_at(begin), self.pos_at(end))
    }

    /// The source text covered by a range.
    pub fn slice(&self, range: SourceRange) -> &str {
        &self.content[range.begin.offset..range.end.offset]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pos_at_derives_line_and_column() {
        let file = SourceFile::from_source("<test>".into(), "ab\ncd\n\nef");
        assert_eq!(file.pos_at(0), SourcePos { offset: 0, line: 1, column: 1 });
        assert_eq!(file.pos_at(1), SourcePos { offset: 1, line: 1, column: 2 });
        assert_eq!(file.pos_at(3), SourcePos { offset: 3, line: 2, column: 1 });
        assert_eq!(file.pos_at(6), SourcePos { offset: 6, line: 3, column: 1 });
        assert_eq!(file.pos_at(7), SourcePos { offset: 7, line: 4, column: 1 });
    }

    #[test]
    fn crlf_is_normalised_before_indexing() {
        let file = SourceFile::from_source("<test>".into(), "a\r\nb");
        assert_eq!(file.content(), "a\nb");
        assert_eq!(file.pos_at(2).line, 2);
    }

    #[test]
    fn merge_covers_both_ranges() {
        let file = SourceFile::from_source("<test>".into(), "abcdef");
        let a = file.range(0, 2);
        let b = file.range(4, 6);
        let merged = a.merge(b);
        assert_eq!(merged.begin.offset, 0);
        assert_eq!(merged.end.offset, 6);
    }
}
