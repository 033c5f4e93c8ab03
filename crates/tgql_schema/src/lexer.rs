//! Scanner for type-expression strings.
//!
//! A type expression only ever contains a name, square brackets and bangs
//! (`[User!]!`), so the token set is tiny. Whitespace is not skipped: the
//! declaration syntax has none, and a space inside an expression is reported
//! as an unexpected character like any other.

use tgql_core::Span;

/// The kind of a token in a type expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// A type name such as `User` or `ID`.
    Name,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `!`
    Bang,
    /// Any character that cannot appear in a type expression.
    Unexpected,
    /// End of input.
    Eof,
}

/// A token with its location in the expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    #[must_use]
    pub const fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Returns the source text of this token.
    #[must_use]
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        self.span.slice(source)
    }
}

/// Byte scanner over one type expression.
pub struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: u32,
}

impl<'a> Lexer<'a> {
    #[must_use]
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
        }
    }

    /// Returns the source being scanned.
    #[must_use]
    pub fn source(&self) -> &'a str {
        self.source
    }

    /// Scans the next token. Returns `Eof` forever once the input is exhausted.
    pub fn next_token(&mut self) -> Token {
        let start = self.pos;
        let Some(c) = self.peek() else {
            return Token::new(TokenKind::Eof, Span::new(start, start));
        };

        let kind = match c {
            b'[' => {
                self.advance();
                TokenKind::LBracket
            }
            b']' => {
                self.advance();
                TokenKind::RBracket
            }
            b'!' => {
                self.advance();
                TokenKind::Bang
            }
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                self.scan_name();
                TokenKind::Name
            }
            _ => {
                self.skip_char();
                TokenKind::Unexpected
            }
        };

        Token::new(kind, Span::new(start, self.pos))
    }

    /// Scans every token up to and including `Eof`.
    #[must_use]
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::with_capacity(6);
        loop {
            let token = self.next_token();
            tokens.push(token);
            if token.kind == TokenKind::Eof {
                return tokens;
            }
        }
    }

    fn scan_name(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == b'_' {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Skips one full character so multi-byte input yields whole-char spans.
    fn skip_char(&mut self) {
        let width = self.source[self.pos as usize..]
            .chars()
            .next()
            .map_or(1, char::len_utf8);
        self.pos += width as u32;
    }

    #[inline]
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos as usize).copied()
    }

    #[inline]
    fn advance(&mut self) {
        self.pos += 1;
    }
}
