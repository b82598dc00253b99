//! Semantic analysis errors.
//!
//! Variants carry pre-rendered type names so the messages stay stable as
//! diagnostics output; `into_diagnostic` attaches the secondary notes.

use thiserror::Error;

use prism_frontend::{Diagnostic, SourceRange};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SemanticError {
    #[error("symbol '{name}' redefinition")]
    Redefinition {
        name: String,
        range: SourceRange,
        first: SourceRange,
    },

    #[error("symbol {name} has a cyclic dependency")]
    CyclicDependency { name: String, range: SourceRange },

    #[error("undeclared identifier")]
    UndeclaredIdentifier { range: SourceRange },

    #[error("invalid integer value")]
    InvalidIntLiteral { range: SourceRange },

    #[error("invalid float value")]
    InvalidFloatLiteral { range: SourceRange },

    #[error("variable declaration requires type or an initializer")]
    VarNeedsTypeOrInit { range: SourceRange },

    #[error("assignment mismatch: {wanted} variables but {got} values")]
    AssignCountMismatch {
        wanted: usize,
        got: usize,
        range: SourceRange,
    },

    #[error("type mismatch in variable declaration expected '{expected}', got '{found}'")]
    VarTypeMismatch {
        expected: String,
        found: String,
        range: SourceRange,
    },

    #[error("constant declaration requires an initializer")]
    ConstNeedsInit { range: SourceRange },

    #[error("constant declaration requires a constant expression")]
    ConstNeedsConstExpr { range: SourceRange },

    #[error("type mismatch in constant declaration expected '{expected}', got '{found}'")]
    ConstTypeMismatch {
        expected: String,
        found: String,
        range: SourceRange,
    },

    #[error("division by zero in constant expression")]
    ConstDivisionByZero { range: SourceRange },

    #[error("field '{name}' cannot be found in struct '{ty}'")]
    UnknownField {
        name: String,
        ty: String,
        range: SourceRange,
    },

    #[error("type '{ty}' does not support selector expr")]
    InvalidSelectorBase { ty: String, range: SourceRange },

    #[error("invalid swizzle '{swizzle}' for {width}-component vector '{ty}'")]
    InvalidSwizzle {
        swizzle: String,
        width: usize,
        ty: String,
        range: SourceRange,
    },

    #[error("type mismatch in binary expression, lhs is '{lhs}' and rhs is '{rhs}'")]
    BinaryTypeMismatch {
        lhs: String,
        rhs: String,
        range: SourceRange,
    },

    #[error("type '{ty}' doesn't support {capability}")]
    MissingCapability {
        ty: String,
        capability: &'static str,
        range: SourceRange,
    },

    #[error("shift operator should be integral type instead of '{ty}'")]
    ShiftNeedsIntegral { ty: String, range: SourceRange },

    #[error("shift operator should not be negative, but it has value '{value}'")]
    ShiftNegative { value: String, range: SourceRange },

    #[error("invalid call expression, expected function type but found '{ty}'")]
    CalleeNotFunction { ty: String, range: SourceRange },

    #[error("expected {wanted} arguments, but found {got}")]
    ArgumentCountMismatch {
        wanted: usize,
        got: usize,
        have: String,
        want: String,
        range: SourceRange,
    },

    #[error("incorrect argument type '{found}', expected '{expected}'")]
    ArgumentTypeMismatch {
        found: String,
        expected: String,
        range: SourceRange,
    },

    #[error("array type length should be constant")]
    ArrayLengthNotConstant { range: SourceRange },

    #[error("array type length should be integer")]
    ArrayLengthNotInteger { range: SourceRange },

    #[error("cannot embed type '{ty}'")]
    InvalidEmbeddedType { ty: String, range: SourceRange },

    #[error("field '{name}' redefinition")]
    FieldRedefinition {
        name: String,
        range: SourceRange,
        first: SourceRange,
    },

    #[error("composite literals are not supported yet")]
    CompositeLiteralUnsupported { range: SourceRange },

    #[error("index expressions are not supported yet")]
    IndexUnsupported { range: SourceRange },

    #[error("package-qualified types are not supported")]
    PackagesUnsupported { range: SourceRange },

    #[error("expression is not assignable")]
    NotAssignable { range: SourceRange },

    #[error("unexpected return statement")]
    ReturnOutsideFunction { range: SourceRange },

    #[error("incorrect return type '{found}', expected '{expected}'")]
    ReturnTypeMismatch {
        found: String,
        expected: String,
        range: SourceRange,
    },

    #[error("expected {wanted} return values, but found {got}")]
    ReturnCountMismatch {
        wanted: usize,
        got: usize,
        have: String,
        want: String,
        range: SourceRange,
    },

    #[error("break statement not within loop or switch")]
    MisplacedBreak { range: SourceRange },

    #[error("continue statement not within for loop")]
    MisplacedContinue { range: SourceRange },

    #[error("fallthrough statement not within switch")]
    MisplacedFallthrough { range: SourceRange },

    #[error("cannot fallthrough from the final case in a switch")]
    FallthroughInFinalCase { range: SourceRange },

    #[error("fallthrough statement must be the last statement in a case")]
    FallthroughNotLast { range: SourceRange },

    #[error("assignment operator {op} requires single value expressions")]
    CompoundAssignNotSingle { op: String, range: SourceRange },

    #[error("expression can not be used as variable name")]
    DefineNeedsIdentifier { range: SourceRange },

    #[error("type mismatch in assignment")]
    AssignTypeMismatch {
        lhs: String,
        rhs: String,
        range: SourceRange,
        lhs_range: SourceRange,
        rhs_range: SourceRange,
    },

    #[error("if condition should be boolean, but found '{ty}'")]
    IfCondNotBool { ty: String, range: SourceRange },

    #[error("for condition should be boolean, but found '{ty}'")]
    ForCondNotBool { ty: String, range: SourceRange },

    #[error("invalid switch tag type '{ty}'")]
    InvalidSwitchTag { ty: String, range: SourceRange },

    #[error("case value type '{ty}' is not comparable to switch tag type '{tag}'")]
    CaseTypeMismatch {
        ty: String,
        tag: String,
        range: SourceRange,
    },

    #[error("duplicate case value '{value}'")]
    DuplicateCaseValue {
        value: String,
        range: SourceRange,
        first: SourceRange,
    },
}

impl SemanticError {
    pub fn range(&self) -> SourceRange {
        use SemanticError::*;
        match self {
            Redefinition { range, .. }
            | CyclicDependency { range, .. }
            | UndeclaredIdentifier { range }
            | InvalidIntLiteral { range }
            | InvalidFloatLiteral { range }
            | VarNeedsTypeOrInit { range }
            | AssignCountMismatch { range, .. }
            | VarTypeMismatch { range, .. }
            | ConstNeedsInit { range }
            | ConstNeedsConstExpr { range }
            | ConstTypeMismatch { range, .. }
            | ConstDivisionByZero { range }
            | UnknownField { range, .. }
            | InvalidSelectorBase { range, .. }
            | InvalidSwizzle { range, .. }
            | BinaryTypeMismatch { range, .. }
            | MissingCapability { range, .. }
            | ShiftNeedsIntegral { range, .. }
            | ShiftNegative { range, .. }
            | CalleeNotFunction { range, .. }
            | ArgumentCountMismatch { range, .. }
            | ArgumentTypeMismatch { range, .. }
            | ArrayLengthNotConstant { range }
            | ArrayLengthNotInteger { range }
            | InvalidEmbeddedType { range, .. }
            | FieldRedefinition { range, .. }
            | CompositeLiteralUnsupported { range }
            | IndexUnsupported { range }
            | PackagesUnsupported { range }
            | NotAssignable { range }
            | ReturnOutsideFunction { range }
            | ReturnTypeMismatch { range, .. }
            | ReturnCountMismatch { range, .. }
            | MisplacedBreak { range }
            | MisplacedContinue { range }
            | MisplacedFallthrough { range }
            | FallthroughInFinalCase { range }
            | FallthroughNotLast { range }
            | CompoundAssignNotSingle { range, .. }
            | DefineNeedsIdentifier { range }
            | AssignTypeMismatch { range, .. }
            | IfCondNotBool { range, .. }
            | ForCondNotBool { range, .. }
            | InvalidSwitchTag { range, .. }
            | CaseTypeMismatch { range, .. }
            | DuplicateCaseValue { range, .. } => *range,
        }
    }

    pub fn into_diagnostic(self) -> Diagnostic {
        let message = self.to_string();
        let range = self.range();
        match self {
            SemanticError::Redefinition { first, .. } => {
                Diagnostic::new(range, message).with_note(first, "first declared here")
            }
            SemanticError::FieldRedefinition { first, .. } => {
                Diagnostic::new(range, message).with_note(first, "first declared here")
            }
            SemanticError::DuplicateCaseValue { first, .. } => Diagnostic::new(range, message)
                .with_note(first, "first case value declared here"),
            SemanticError::ArgumentCountMismatch {
                have, want, ..
            } => Diagnostic::new(range, message)
                .with_note(range, format!("have {have}, want {want}")),
            SemanticError::ReturnCountMismatch {
                have, want, ..
            } => Diagnostic::new(range, message)
                .with_note(range, format!("have {have}, want {want}")),
            SemanticError::AssignTypeMismatch {
                lhs,
                rhs,
                lhs_range,
                rhs_range,
                ..
            } => Diagnostic::new(range, message)
                .with_note(lhs_range, format!("LHS type is '{lhs}'"))
                .with_note(rhs_range, format!("RHS type is '{rhs}'")),
            _ => Diagnostic::new(range, message),
        }
    }
}
