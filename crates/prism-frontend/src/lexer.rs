//! The scanner: bytes to tokens, with automatic terminator insertion.
//!
//! Before a newline, if the previously emitted token could end a statement, a
//! synthetic `;` token is emitted with a zero-width range at the newline. The
//! newline itself never becomes a token.

use std::iter::Peekable;
use std::str::CharIndices;

use crate::errors::LexError;
use crate::source::SourceFile;
use crate::token::{Token, TokenKind};

pub struct Scanner<'src> {
    file: &'src SourceFile,
    chars: Peekable<CharIndices<'src>>,
    start: usize,
    current: usize,
    last_kind: Option<TokenKind>,
    errors: Vec<LexError>,
}

impl<'src> Scanner<'src> {
    pub fn new(file: &'src SourceFile) -> Self {
        Scanner {
            file,
            chars: file.content().char_indices().peekable(),
            start: 0,
            current: 0,
            last_kind: None,
            errors: Vec::new(),
        }
    }

    /// Take all collected errors, leaving the internal list empty.
    pub fn take_errors(&mut self) -> Vec<LexError> {
        std::mem::take(&mut self.errors)
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Get the next token from the source.
    pub fn next_token(&mut self) -> Token {
        if let Some(terminator) = self.skip_whitespace() {
            return terminator;
        }

        self.start = self.current;

        let Some(c) = self.advance() else {
            return self.make_token(TokenKind::Eof);
        };

        match c {
            '(' => self.make_token(TokenKind::LParen),
            ')' => self.make_token(TokenKind::RParen),
            '{' => self.make_token(TokenKind::LBrace),
            '}' => self.make_token(TokenKind::RBrace),
            '[' => self.make_token(TokenKind::LBracket),
            ']' => self.make_token(TokenKind::RBracket),
            ',' => self.make_token(TokenKind::Comma),
            ';' => self.make_token(TokenKind::Semicolon),
            '~' => self.make_token(TokenKind::Tilde),
            ':' => {
                if self.match_char('=') {
                    self.make_token(TokenKind::ColonEq)
                } else {
                    self.make_token(TokenKind::Colon)
                }
            }
            '.' => {
                if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.scan_fraction_and_exponent()
                } else {
                    self.make_token(TokenKind::Dot)
                }
            }
            '+' => {
                if self.match_char('=') {
                    self.make_token(TokenKind::PlusEq)
                } else if self.match_char('+') {
                    self.make_token(TokenKind::PlusPlus)
                } else {
                    self.make_token(TokenKind::Plus)
                }
            }
            '-' => {
                if self.match_char('=') {
                    self.make_token(TokenKind::MinusEq)
                } else if self.match_char('-') {
                    self.make_token(TokenKind::MinusMinus)
                } else {
                    self.make_token(TokenKind::Minus)
                }
            }
            '*' => {
                if self.match_char('=') {
                    self.make_token(TokenKind::StarEq)
                } else {
                    self.make_token(TokenKind::Star)
                }
            }
            '%' => {
                if self.match_char('=') {
                    self.make_token(TokenKind::PercentEq)
                } else {
                    self.make_token(TokenKind::Percent)
                }
            }
            '=' => {
                if self.match_char('=') {
                    self.make_token(TokenKind::EqEq)
                } else {
                    self.make_token(TokenKind::Eq)
                }
            }
            '!' => {
                if self.match_char('=') {
                    self.make_token(TokenKind::BangEq)
                } else {
                    self.make_token(TokenKind::Bang)
                }
            }
            '<' => {
                if self.match_char('<') {
                    if self.match_char('=') {
                        self.make_token(TokenKind::LessLessEq)
                    } else {
                        self.make_token(TokenKind::LessLess)
                    }
                } else if self.match_char('=') {
                    self.make_token(TokenKind::LtEq)
                } else {
                    self.make_token(TokenKind::Lt)
                }
            }
            '>' => {
                if self.match_char('>') {
                    if self.match_char('=') {
                        self.make_token(TokenKind::GreaterGreaterEq)
                    } else {
                        self.make_token(TokenKind::GreaterGreater)
                    }
                } else if self.match_char('=') {
                    self.make_token(TokenKind::GtEq)
                } else {
                    self.make_token(TokenKind::Gt)
                }
            }
            '&' => {
                if self.match_char('&') {
                    self.make_token(TokenKind::AmpAmp)
                } else if self.match_char('^') {
                    if self.match_char('=') {
                        self.make_token(TokenKind::AmpCaretEq)
                    } else {
                        self.make_token(TokenKind::AmpCaret)
                    }
                } else if self.match_char('=') {
                    self.make_token(TokenKind::AmpEq)
                } else {
                    self.make_token(TokenKind::Amp)
                }
            }
            '|' => {
                if self.match_char('|') {
                    self.make_token(TokenKind::PipePipe)
                } else if self.match_char('=') {
                    self.make_token(TokenKind::PipeEq)
                } else {
                    self.make_token(TokenKind::Pipe)
                }
            }
            '^' => {
                if self.match_char('=') {
                    self.make_token(TokenKind::CaretEq)
                } else {
                    self.make_token(TokenKind::Caret)
                }
            }
            '/' => {
                // Comments are handled in skip_whitespace; reaching here
                // means a bare slash.
                if self.match_char('=') {
                    self.make_token(TokenKind::SlashEq)
                } else {
                    self.make_token(TokenKind::Slash)
                }
            }
            '"' => self.scan_string(),
            '\'' => self.scan_rune(),
            c if c.is_ascii_digit() => self.scan_number(c),
            c if c.is_ascii_alphabetic() || c == '_' => self.scan_identifier(),
            c => {
                self.errors.push(LexError::UnknownChar {
                    ch: c,
                    range: self.file.range(self.start, self.current),
                });
                self.make_token(TokenKind::Invalid)
            }
        }
    }

    /// Skip whitespace and comments. Returns a synthetic terminator token if
    /// a newline follows a statement-final token.
    fn skip_whitespace(&mut self) -> Option<Token> {
        loop {
            match self.peek() {
                Some(' ') | Some('\t') | Some('\r') => {
                    self.advance();
                }
                Some('\n') => {
                    let at = self.current;
                    self.advance();
                    if self
                        .last_kind
                        .is_some_and(|kind| kind.can_insert_terminator())
                    {
                        self.last_kind = Some(TokenKind::Semicolon);
                        return Some(Token::new(
                            TokenKind::Semicolon,
                            ";",
                            self.file.range(at, at),
                        ));
                    }
                }
                Some('/') => {
                    let mut lookahead = self.chars.clone();
                    lookahead.next();
                    match lookahead.peek().map(|&(_, c)| c) {
                        Some('/') => {
                            // Line comment; leave the newline for the
                            // terminator check above.
                            while self.peek().is_some_and(|c| c != '\n') {
                                self.advance();
                            }
                        }
                        Some('*') => {
                            let comment_start = self.current;
                            self.advance();
                            self.advance();
                            loop {
                                match self.advance() {
                                    Some('*') if self.peek() == Some('/') => {
                                        self.advance();
                                        break;
                                    }
                                    Some(_) => {}
                                    None => {
                                        self.errors.push(LexError::UnterminatedComment {
                                            range: self.file.range(comment_start, self.current),
                                        });
                                        self.start = comment_start;
                                        return Some(self.make_token(TokenKind::Invalid));
                                    }
                                }
                            }
                        }
                        _ => return None,
                    }
                }
                _ => return None,
            }
        }
    }

    fn scan_identifier(&mut self) -> Token {
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.advance();
        }
        let text = &self.file.content()[self.start..self.current];
        match TokenKind::keyword_kind(text) {
            Some(kind) => self.make_token(kind),
            None => self.make_token(TokenKind::Identifier),
        }
    }

    fn scan_number(&mut self, first: char) -> Token {
        if first == '0' {
            let radix = match self.peek() {
                Some('x') | Some('X') => Some(16),
                Some('b') | Some('B') => Some(2),
                Some('o') | Some('O') => Some(8),
                _ => None,
            };
            if let Some(radix) = radix {
                self.advance();
                let mut digits = 0;
                while self.peek().is_some_and(|c| c.is_digit(radix)) {
                    self.advance();
                    digits += 1;
                }
                if digits == 0 {
                    self.errors.push(LexError::MalformedNumber {
                        range: self.file.range(self.start, self.current),
                    });
                    return self.make_token(TokenKind::Invalid);
                }
                return self.make_token(TokenKind::LiteralInt);
            }
        }

        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }

        match self.peek() {
            Some('.') => {
                self.advance();
                self.scan_fraction_and_exponent()
            }
            Some('e') | Some('E') => self.scan_exponent(),
            _ => self.make_token(TokenKind::LiteralInt),
        }
    }

    /// Continue a float literal after the decimal point has been consumed.
    /// Accepts the forms `N.N`, `N.`, `.N`, and exponent suffixes.
    fn scan_fraction_and_exponent(&mut self) -> Token {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            return self.scan_exponent();
        }
        self.make_token(TokenKind::LiteralFloat)
    }

    fn scan_exponent(&mut self) -> Token {
        self.advance(); // e | E
        if matches!(self.peek(), Some('+') | Some('-')) {
            self.advance();
        }
        let mut digits = 0;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            digits += 1;
        }
        if digits == 0 {
            self.errors.push(LexError::MalformedNumber {
                range: self.file.range(self.start, self.current),
            });
            return self.make_token(TokenKind::Invalid);
        }
        self.make_token(TokenKind::LiteralFloat)
    }

    fn scan_string(&mut self) -> Token {
        loop {
            match self.peek() {
                Some('"') => {
                    self.advance();
                    return self.make_token(TokenKind::LiteralString);
                }
                Some('\\') => {
                    self.advance();
                    match self.advance() {
                        Some('n') | Some('t') | Some('r') | Some('"') | Some('\\')
                        | Some('0') => {}
                        Some(c) => {
                            self.errors.push(LexError::InvalidEscape {
                                ch: c,
                                range: self.file.range(self.start, self.current),
                            });
                            return self.make_token(TokenKind::Invalid);
                        }
                        None => {
                            self.errors.push(LexError::UnterminatedString {
                                range: self.file.range(self.start, self.current),
                            });
                            return self.make_token(TokenKind::Invalid);
                        }
                    }
                }
                Some('\n') | None => {
                    self.errors.push(LexError::UnterminatedString {
                        range: self.file.range(self.start, self.current),
                    });
                    return self.make_token(TokenKind::Invalid);
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
    }

    fn scan_rune(&mut self) -> Token {
        match self.advance() {
            Some('\\') => match self.advance() {
                Some('n') | Some('t') | Some('r') | Some('\'') | Some('"') | Some('\\')
                | Some('0') => {}
                Some(c) => {
                    self.errors.push(LexError::InvalidEscape {
                        ch: c,
                        range: self.file.range(self.start, self.current),
                    });
                    return self.make_token(TokenKind::Invalid);
                }
                None => {
                    self.errors.push(LexError::UnterminatedRune {
                        range: self.file.range(self.start, self.current),
                    });
                    return self.make_token(TokenKind::Invalid);
                }
            },
            Some('\'') | Some('\n') | None => {
                self.errors.push(LexError::UnterminatedRune {
                    range: self.file.range(self.start, self.current),
                });
                return self.make_token(TokenKind::Invalid);
            }
            Some(_) => {}
        }
        if self.peek() == Some('\'') {
            self.advance();
            self.make_token(TokenKind::LiteralRune)
        } else {
            self.errors.push(LexError::UnterminatedRune {
                range: self.file.range(self.start, self.current),
            });
            self.make_token(TokenKind::Invalid)
        }
    }

    fn make_token(&mut self, kind: TokenKind) -> Token {
        self.last_kind = Some(kind);
        let text = &self.file.content()[self.start..self.current];
        Token::new(kind, text, self.file.range(self.start, self.current))
    }

    fn advance(&mut self) -> Option<char> {
        let (i, c) = self.chars.next()?;
        self.current = i + c.len_utf8();
        Some(c)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }
}

/// Scan a whole file: an ordered token stream ending in `Eof` (or `Invalid`
/// on a scan failure), plus any errors.
pub fn scan_file(file: &SourceFile) -> (Vec<Token>, Vec<LexError>) {
    let mut scanner = Scanner::new(file);
    let mut tokens = Vec::new();
    loop {
        let token = scanner.next_token();
        let kind = token.kind;
        tokens.push(token);
        if kind == TokenKind::Eof || kind == TokenKind::Invalid {
            break;
        }
    }
    (tokens, scanner.take_errors())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let file = SourceFile::from_source("<test>".into(), src);
        let (tokens, errors) = scan_file(&file);
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn tokens_cover_their_source_text() {
        let file = SourceFile::from_source("<test>".into(), "foo + 42 <= 0x1F");
        let (tokens, errors) = scan_file(&file);
        assert!(errors.is_empty());
        for token in &tokens {
            if token.kind == TokenKind::Eof {
                continue;
            }
            assert_eq!(file.slice(token.range), token.text);
            assert!(token.range.begin.offset < token.range.end.offset);
        }
    }

    #[test]
    fn longest_match_wins() {
        use TokenKind::*;
        assert_eq!(
            kinds("<<= << <= < &^= &^ && &= &"),
            vec![LessLessEq, LessLess, LtEq, Lt, AmpCaretEq, AmpCaret, AmpAmp, AmpEq, Amp, Eof]
        );
    }

    #[test]
    fn terminator_inserted_after_value_final_tokens() {
        use TokenKind::*;
        assert_eq!(
            kinds("x\n1\n1.5\n)\n]\n}\nreturn\nbreak\ncontinue\nfallthrough\n++\n--\ntrue\n"),
            vec![
                Identifier, Semicolon, LiteralInt, Semicolon, LiteralFloat, Semicolon, RParen,
                Semicolon, RBracket, Semicolon, RBrace, Semicolon, KwReturn, Semicolon, KwBreak,
                Semicolon, KwContinue, Semicolon, KwFallthrough, Semicolon, PlusPlus, Semicolon,
                MinusMinus, Semicolon, KwTrue, Semicolon, Eof
            ]
        );
    }

    #[test]
    fn terminator_not_inserted_after_operators() {
        use TokenKind::*;
        assert_eq!(
            kinds("x +\ny"),
            vec![Identifier, Plus, Identifier, Eof]
        );
        assert_eq!(kinds("func\n{"), vec![KwFunc, LBrace, Eof]);
    }

    #[test]
    fn synthetic_terminator_is_zero_width() {
        let file = SourceFile::from_source("<test>".into(), "x\ny");
        let (tokens, _) = scan_file(&file);
        let semi = &tokens[1];
        assert_eq!(semi.kind, TokenKind::Semicolon);
        assert_eq!(semi.text, ";");
        assert_eq!(semi.range.begin.offset, semi.range.end.offset);
        assert_eq!(semi.range.begin.offset, 1);
    }

    #[test]
    fn number_literal_forms() {
        use TokenKind::*;
        assert_eq!(
            kinds("0 123 0x1F 0b1010 0o755 1.5 .5 1. 1e9 1.5e-3 2E+4"),
            vec![
                LiteralInt, LiteralInt, LiteralInt, LiteralInt, LiteralInt, LiteralFloat,
                LiteralFloat, LiteralFloat, LiteralFloat, LiteralFloat, LiteralFloat, Eof
            ]
        );
    }

    #[test]
    fn comments_do_not_emit_tokens() {
        use TokenKind::*;
        assert_eq!(kinds("a // note\nb /* c */ d"), vec![
            Identifier, Semicolon, Identifier, Identifier, Eof
        ]);
    }

    #[test]
    fn string_escapes_and_utf8_content() {
        use TokenKind::*;
        assert_eq!(kinds(r#""hi" "a\n\t\"b" "héllo""#), vec![
            LiteralString, LiteralString, LiteralString, Eof
        ]);
    }

    #[test]
    fn unterminated_string_stops_the_stream() {
        let file = SourceFile::from_source("<test>".into(), "\"abc");
        let (tokens, errors) = scan_file(&file);
        assert_eq!(tokens.last().unwrap().kind, TokenKind::Invalid);
        assert!(matches!(errors[0], LexError::UnterminatedString { .. }));
    }

    #[test]
    fn unknown_character_stops_the_stream() {
        let file = SourceFile::from_source("<test>".into(), "a @ b");
        let (tokens, errors) = scan_file(&file);
        assert_eq!(tokens.last().unwrap().kind, TokenKind::Invalid);
        assert!(matches!(errors[0], LexError::UnknownChar { ch: '@', .. }));
    }

    #[test]
    fn offsets_are_strictly_monotonic() {
        let file = SourceFile::from_source("<test>".into(), "a b\nc d\n");
        let (tokens, _) = scan_file(&file);
        for pair in tokens.windows(2) {
            assert!(pair[0].range.begin.offset <= pair[1].range.begin.offset);
        }
    }
}
