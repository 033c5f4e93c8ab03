//! Type-expression parsing.
//!
//! A type expression is the string form used throughout a schema
//! declaration: `String`, `Int!`, `[User!]!` and so on. Parsing reduces it to
//! the innermost *core* name plus one of six [`TypeVariant`]s.

use std::fmt;

use tgql_core::Span;

use crate::error::{SchemaError, SchemaResult};
use crate::lexer::{Lexer, Token, TokenKind};

/// Nullability and list wrapping of a type expression.
///
/// The leading word describes the items, a `Nullable` suffix describes the
/// list itself:
///
/// | expression | variant |
/// |---|---|
/// | `T` | `SimpleNullable` |
/// | `T!` | `Simple` |
/// | `[T!]!` | `List` |
/// | `[T!]` | `ListNullable` |
/// | `[T]!` | `NullableList` |
/// | `[T]` | `NullableListNullable` |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeVariant {
    Simple,
    SimpleNullable,
    List,
    ListNullable,
    NullableList,
    NullableListNullable,
}

impl TypeVariant {
    pub(crate) fn from_parts(list: bool, items_nullable: bool, nullable: bool) -> Self {
        match (list, items_nullable, nullable) {
            (false, _, false) => Self::Simple,
            (false, _, true) => Self::SimpleNullable,
            (true, false, false) => Self::List,
            (true, false, true) => Self::ListNullable,
            (true, true, false) => Self::NullableList,
            (true, true, true) => Self::NullableListNullable,
        }
    }

    /// True for the four list variants.
    #[must_use]
    pub const fn is_list(self) -> bool {
        !matches!(self, Self::Simple | Self::SimpleNullable)
    }

    /// True when the outermost value may be null.
    #[must_use]
    pub const fn is_nullable(self) -> bool {
        matches!(
            self,
            Self::SimpleNullable | Self::ListNullable | Self::NullableListNullable
        )
    }

    /// True when list items may be null. Always false for non-lists.
    #[must_use]
    pub const fn items_nullable(self) -> bool {
        matches!(self, Self::NullableList | Self::NullableListNullable)
    }

    /// The same wrapping with a nullable outermost value.
    #[must_use]
    pub fn nullable(self) -> Self {
        Self::from_parts(self.is_list(), self.items_nullable(), true)
    }

    /// Uppercase name as used in diagnostics, e.g. `NULLABLE-LIST`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Simple => "SIMPLE",
            Self::SimpleNullable => "SIMPLE-NULLABLE",
            Self::List => "LIST",
            Self::ListNullable => "LIST-NULLABLE",
            Self::NullableList => "NULLABLE-LIST",
            Self::NullableListNullable => "NULLABLE-LIST-NULLABLE",
        }
    }
}

impl fmt::Display for TypeVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed type expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeRef {
    /// The innermost type name.
    pub core: String,
    pub variant: TypeVariant,
    /// Location of `core` inside the source expression.
    pub core_span: Span,
}

impl TypeRef {
    /// Parses `expr`, reporting errors against `location` (e.g. `User.posts`).
    pub fn parse(expr: &str, location: &str) -> SchemaResult<Self> {
        Parser::new(expr, location).parse()
    }

    /// A bare reference to `core` with the given wrapping.
    #[must_use]
    pub fn named(core: impl Into<String>, variant: TypeVariant) -> Self {
        let core = core.into();
        let core_span = Span::new(0, core.len() as u32);
        Self {
            core,
            variant,
            core_span,
        }
    }

    /// The same reference with a nullable outermost value.
    #[must_use]
    pub fn into_nullable(mut self) -> Self {
        self.variant = self.variant.nullable();
        self
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outer = if self.variant.is_nullable() { "" } else { "!" };
        if self.variant.is_list() {
            let inner = if self.variant.items_nullable() { "" } else { "!" };
            write!(f, "[{}{inner}]{outer}", self.core)
        } else {
            write!(f, "{}{outer}", self.core)
        }
    }
}

/// Recursive-descent parser over the token stream of one expression.
struct Parser<'a> {
    source: &'a str,
    location: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, location: &'a str) -> Self {
        Self {
            source,
            location,
            tokens: Lexer::new(source).tokenize(),
            pos: 0,
        }
    }

    fn parse(mut self) -> SchemaResult<TypeRef> {
        let list = self.eat(TokenKind::LBracket);
        let name = self.expect_name(list)?;

        let mut items_nullable = true;
        if list {
            items_nullable = !self.eat(TokenKind::Bang);
            let token = self.peek();
            match token.kind {
                TokenKind::RBracket => self.bump(),
                TokenKind::Eof => {
                    let message = if items_nullable {
                        "Missing expected ']' or '!'"
                    } else {
                        "Missing expected ']'"
                    };
                    return Err(self.error(token.span, message));
                }
                _ => return Err(self.unexpected(token)),
            }
        }

        let nullable = !self.eat(TokenKind::Bang);

        let token = self.peek();
        match token.kind {
            TokenKind::Eof => Ok(TypeRef {
                core: name.text(self.source).to_owned(),
                variant: TypeVariant::from_parts(list, items_nullable, nullable),
                core_span: name.span,
            }),
            TokenKind::RBracket if !list => {
                Err(self.error(token.span, "Missing expected '[' at the beginning"))
            }
            _ => Err(self.unexpected(token)),
        }
    }

    fn expect_name(&mut self, list: bool) -> SchemaResult<Token> {
        let token = self.peek();
        match token.kind {
            TokenKind::Name => {
                self.bump();
                Ok(token)
            }
            TokenKind::Bang => Err(self.error(token.span, "Missing expected type before '!'")),
            TokenKind::RBracket if list => {
                Err(self.error(token.span, "Missing expected type before ']'"))
            }
            TokenKind::RBracket => {
                Err(self.error(token.span, "Missing expected '[' at the beginning"))
            }
            TokenKind::Eof if list => Err(self.error(token.span, "Missing expected ']' or '!'")),
            TokenKind::Eof => Err(self.error(token.span, "Missing expected type")),
            TokenKind::LBracket | TokenKind::Unexpected => Err(self.unexpected(token)),
        }
    }

    fn peek(&self) -> Token {
        // `tokenize` always ends with Eof, and `bump` never moves past it.
        self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn bump(&mut self) {
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.peek().kind == kind {
            self.bump();
            true
        } else {
            false
        }
    }

    fn unexpected(&self, token: Token) -> SchemaError {
        // Report only the first character of a run such as a stray name.
        let text = token.text(self.source);
        let c = text.chars().next().unwrap_or(' ');
        let span = Span::new(token.span.start, token.span.start + c.len_utf8() as u32);
        self.error(span, format!("Unexpected character '{c}'"))
    }

    fn error(&self, span: Span, message: impl Into<String>) -> SchemaError {
        SchemaError::syntax(self.location, self.source, span, message)
    }
}
