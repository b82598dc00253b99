//! Lowering errors.
//!
//! These cover the language surface the SPIR-V backend does not map yet
//! (vectors, structs, tuples, composite stores). A checked unit that stays
//! on scalar and function types never produces one.

use thiserror::Error;

use prism_frontend::{Diagnostic, SourceRange};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LowerError {
    #[error("type '{ty}' is not supported in SPIR-V emission")]
    UnsupportedType { ty: String, range: SourceRange },

    #[error("expression is not supported in SPIR-V emission")]
    UnsupportedExpr { range: SourceRange },

    #[error("assignment target is not supported in SPIR-V emission")]
    UnsupportedAssignTarget { range: SourceRange },

    #[error("multiple return values are not supported in SPIR-V emission")]
    UnsupportedMultiReturn { range: SourceRange },
}

impl LowerError {
    pub fn range(&self) -> SourceRange {
        match self {
            Self::UnsupportedType { range, .. }
            | Self::UnsupportedExpr { range }
            | Self::UnsupportedAssignTarget { range }
            | Self::UnsupportedMultiReturn { range } => *range,
        }
    }

    pub fn into_diagnostic(self) -> Diagnostic {
        Diagnostic::new(self.range(), self.to_string())
    }
}
