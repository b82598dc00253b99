//! Token kinds and the token type produced by the scanner.

use crate::source::SourceRange;

/// Single source of truth for keyword-to-token mapping.
///
/// Each entry `"text" => Variant` generates:
/// - A match arm in `TokenKind::keyword_kind`: `"text" => Some(TokenKind::Variant)`
/// - A match arm in `TokenKind::as_str`:       `Self::Variant => "text"`
macro_rules! define_keywords {
    ( $( $text:literal => $variant:ident ),+ $(,)? ) => {
        impl TokenKind {
            /// Check if a string is a keyword and return its token kind.
            pub fn keyword_kind(text: &str) -> Option<TokenKind> {
                match text {
                    $( $text => Some(TokenKind::$variant), )+
                    _ => None,
                }
            }

            /// String representation for keyword tokens (used by `as_str`).
            fn keyword_as_str(&self) -> Option<&'static str> {
                match self {
                    $( Self::$variant => Some($text), )+
                    _ => None,
                }
            }
        }
    };
}

define_keywords! {
    "func"        => KwFunc,
    "var"         => KwVar,
    "const"       => KwConst,
    "type"        => KwType,
    "struct"      => KwStruct,
    "return"      => KwReturn,
    "if"          => KwIf,
    "else"        => KwElse,
    "for"         => KwFor,
    "switch"      => KwSwitch,
    "case"        => KwCase,
    "default"     => KwDefault,
    "break"       => KwBreak,
    "continue"    => KwContinue,
    "fallthrough" => KwFallthrough,
    "true"        => KwTrue,
    "false"       => KwFalse,
}

/// All token kinds in the Prism language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Literals
    Identifier,
    LiteralInt,
    LiteralFloat,
    LiteralString,
    LiteralRune,

    // Keywords
    KwFunc,
    KwVar,
    KwConst,
    KwType,
    KwStruct,
    KwReturn,
    KwIf,
    KwElse,
    KwFor,
    KwSwitch,
    KwCase,
    KwDefault,
    KwBreak,
    KwContinue,
    KwFallthrough,
    KwTrue,
    KwFalse,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqEq,
    BangEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    AmpAmp,
    PipePipe,
    Amp,
    Pipe,
    Caret,
    AmpCaret, // &^
    LessLess,
    GreaterGreater,
    Bang,
    Tilde,
    Eq,
    ColonEq,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    PercentEq,
    AmpEq,
    AmpCaretEq, // &^=
    PipeEq,
    CaretEq,
    LessLessEq,
    GreaterGreaterEq,
    PlusPlus,
    MinusMinus,

    // Delimiters
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Semicolon,
    Colon,

    // Special
    Eof,
    Invalid,
}

impl TokenKind {
    /// Surface spelling, used in error messages.
    pub fn as_str(&self) -> &'static str {
        if let Some(s) = self.keyword_as_str() {
            return s;
        }
        match self {
            Self::Identifier => "identifier",
            Self::LiteralInt => "integer",
            Self::LiteralFloat => "float",
            Self::LiteralString => "string",
            Self::LiteralRune => "rune",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Slash => "/",
            Self::Percent => "%",
            Self::EqEq => "==",
            Self::BangEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::AmpAmp => "&&",
            Self::PipePipe => "||",
            Self::Amp => "&",
            Self::Pipe => "|",
            Self::Caret => "^",
            Self::AmpCaret => "&^",
            Self::LessLess => "<<",
            Self::GreaterGreater => ">>",
            Self::Bang => "!",
            Self::Tilde => "~",
            Self::Eq => "=",
            Self::ColonEq => ":=",
            Self::PlusEq => "+=",
            Self::MinusEq => "-=",
            Self::StarEq => "*=",
            Self::SlashEq => "/=",
            Self::PercentEq => "%=",
            Self::AmpEq => "&=",
            Self::AmpCaretEq => "&^=",
            Self::PipeEq => "|=",
            Self::CaretEq => "^=",
            Self::LessLessEq => "<<=",
            Self::GreaterGreaterEq => ">>=",
            Self::PlusPlus => "++",
            Self::MinusMinus => "--",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::LBrace => "{",
            Self::RBrace => "}",
            Self::LBracket => "[",
            Self::RBracket => "]",
            Self::Comma => ",",
            Self::Dot => ".",
            Self::Semicolon => ";",
            Self::Colon => ":",
            Self::Eof => "end of file",
            Self::Invalid => "invalid token",
            _ => unreachable!("keyword variant not covered by define_keywords! macro"),
        }
    }

    /// Stable kind name for the `scan` command output.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Identifier => "Identifier",
            Self::LiteralInt => "LiteralInt",
            Self::LiteralFloat => "LiteralFloat",
            Self::LiteralString => "LiteralString",
            Self::LiteralRune => "LiteralRune",
            Self::KwFunc => "Func",
            Self::KwVar => "Var",
            Self::KwConst => "Const",
            Self::KwType => "Type",
            Self::KwStruct => "Struct",
            Self::KwReturn => "Return",
            Self::KwIf => "If",
            Self::KwElse => "Else",
            Self::KwFor => "For",
            Self::KwSwitch => "Switch",
            Self::KwCase => "Case",
            Self::KwDefault => "Default",
            Self::KwBreak => "Break",
            Self::KwContinue => "Continue",
            Self::KwFallthrough => "Fallthrough",
            Self::KwTrue => "True",
            Self::KwFalse => "False",
            Self::Plus => "Plus",
            Self::Minus => "Minus",
            Self::Star => "Star",
            Self::Slash => "Slash",
            Self::Percent => "Percent",
            Self::EqEq => "EqEq",
            Self::BangEq => "BangEq",
            Self::Lt => "Lt",
            Self::LtEq => "LtEq",
            Self::Gt => "Gt",
            Self::GtEq => "GtEq",
            Self::AmpAmp => "AmpAmp",
            Self::PipePipe => "PipePipe",
            Self::Amp => "Amp",
            Self::Pipe => "Pipe",
            Self::Caret => "Caret",
            Self::AmpCaret => "AmpCaret",
            Self::LessLess => "Shl",
            Self::GreaterGreater => "Shr",
            Self::Bang => "Bang",
            Self::Tilde => "Tilde",
            Self::Eq => "Assign",
            Self::ColonEq => "Define",
            Self::PlusEq => "PlusAssign",
            Self::MinusEq => "MinusAssign",
            Self::StarEq => "StarAssign",
            Self::SlashEq => "SlashAssign",
            Self::PercentEq => "PercentAssign",
            Self::AmpEq => "AmpAssign",
            Self::AmpCaretEq => "AmpCaretAssign",
            Self::PipeEq => "PipeAssign",
            Self::CaretEq => "CaretAssign",
            Self::LessLessEq => "ShlAssign",
            Self::GreaterGreaterEq => "ShrAssign",
            Self::PlusPlus => "PlusPlus",
            Self::MinusMinus => "MinusMinus",
            Self::LParen => "LParen",
            Self::RParen => "RParen",
            Self::LBrace => "LBrace",
            Self::RBrace => "RBrace",
            Self::LBracket => "LBracket",
            Self::RBracket => "RBracket",
            Self::Comma => "Comma",
            Self::Dot => "Dot",
            Self::Semicolon => "Semicolon",
            Self::Colon => "Colon",
            Self::Eof => "EOF",
            Self::Invalid => "Invalid",
        }
    }

    /// Binary operator precedence (Pratt parsing). 0 means "not a binary
    /// operator". Higher binds tighter.
    pub fn precedence(&self) -> u8 {
        match self {
            Self::PipePipe => 1,
            Self::AmpAmp => 2,
            Self::EqEq | Self::BangEq | Self::Lt | Self::LtEq | Self::Gt | Self::GtEq => 3,
            Self::Plus | Self::Minus | Self::Pipe | Self::Caret => 4,
            Self::Star
            | Self::Slash
            | Self::Percent
            | Self::LessLess
            | Self::GreaterGreater
            | Self::Amp
            | Self::AmpCaret => 5,
            _ => 0,
        }
    }

    /// Whether a newline after this token inserts a statement terminator.
    pub fn can_insert_terminator(&self) -> bool {
        matches!(
            self,
            Self::Identifier
                | Self::LiteralInt
                | Self::LiteralFloat
                | Self::LiteralString
                | Self::LiteralRune
                | Self::RParen
                | Self::RBracket
                | Self::RBrace
                | Self::KwReturn
                | Self::KwBreak
                | Self::KwContinue
                | Self::KwFallthrough
                | Self::KwTrue
                | Self::KwFalse
                | Self::PlusPlus
                | Self::MinusMinus
        )
    }

    /// Compound-assignment operators (`op=` and `:=`/`=` excluded).
    pub fn is_compound_assign(&self) -> bool {
        matches!(
            self,
            Self::PlusEq
                | Self::MinusEq
                | Self::StarEq
                | Self::SlashEq
                | Self::PercentEq
                | Self::AmpEq
                | Self::AmpCaretEq
                | Self::PipeEq
                | Self::CaretEq
                | Self::LessLessEq
                | Self::GreaterGreaterEq
        )
    }

    pub fn is_assign_op(&self) -> bool {
        matches!(self, Self::Eq | Self::ColonEq) || self.is_compound_assign()
    }
}

/// A token with its lexeme and location. The lexeme matches the source slice
/// of the range, except for synthetic terminators whose lexeme is `";"` over
/// a zero-width range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub range: SourceRange,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, range: SourceRange) -> Token {
        Token {
            kind,
            text: text.into(),
            range,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_round_trip_through_the_macro() {
        assert_eq!(TokenKind::keyword_kind("func"), Some(TokenKind::KwFunc));
        assert_eq!(TokenKind::keyword_kind("fallthrough"), Some(TokenKind::KwFallthrough));
        assert_eq!(TokenKind::keyword_kind("funcs"), None);
        assert_eq!(TokenKind::KwFunc.as_str(), "func");
    }

    #[test]
    fn precedence_matches_the_go_table() {
        assert_eq!(TokenKind::PipePipe.precedence(), 1);
        assert_eq!(TokenKind::AmpAmp.precedence(), 2);
        assert_eq!(TokenKind::EqEq.precedence(), 3);
        assert_eq!(TokenKind::Pipe.precedence(), 4);
        assert_eq!(TokenKind::AmpCaret.precedence(), 5);
        assert_eq!(TokenKind::Bang.precedence(), 0);
    }
}
