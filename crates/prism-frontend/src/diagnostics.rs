//! Structured diagnostics with chained notes.
//!
//! Diagnostics are program output: the golden harness compares them
//! byte-for-byte, so the Display format must stay deterministic and
//! environment-independent.

use std::fmt;

use crate::source::SourceRange;

/// A secondary message attached to a diagnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub range: SourceRange,
    pub message: String,
}

/// A primary error message with a source range and any number of notes.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub range: SourceRange,
    pub message: String,
    pub notes: Vec<Note>,
}

impl Diagnostic {
    pub fn new(range: SourceRange, message: impl Into<String>) -> Diagnostic {
        Diagnostic {
            range,
            message: message.into(),
            notes: Vec::new(),
        }
    }

    pub fn with_note(mut self, range: SourceRange, message: impl Into<String>) -> Diagnostic {
        self.notes.push(Note {
            range,
            message: message.into(),
        });
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: error: {}",
            self.range.begin.line, self.range.begin.column, self.message
        )?;
        for note in &self.notes {
            write!(
                f,
                "\n{}:{}: note: {}",
                note.range.begin.line, note.range.begin.column, note.message
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceFile;

    #[test]
    fn display_chains_notes() {
        let file = SourceFile::from_source("<test>".into(), "a\nbc");
        let d = Diagnostic::new(file.range(2, 3), "something failed")
            .with_note(file.range(0, 1), "first declared here");
        assert_eq!(
            d.to_string(),
            "2:1: error: something failed\n1:1: note: first declared here"
        );
    }
}
