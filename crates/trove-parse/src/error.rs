//! Parse errors.

use std::fmt;

use trove_tokenizer::{LexError, LexErrorKind, Span, TokenKind};

use crate::ObjectId;

/// Error type returned by a transform callback.
pub type TransformError = Box<dyn std::error::Error + Send + Sync>;

/// Broad class of a [`ParseErrorKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Malformed token or escape sequence.
    Lexical,
    /// Token out of place, bracket or indentation trouble, nesting too deep.
    Structural,
    /// A map key that is not a bare atom.
    KeyType,
    /// Tag defined twice, or referenced but never defined.
    Reference,
    /// Raised by the transform callback.
    Hook,
}

/// What went wrong while parsing.
#[derive(Debug)]
pub enum ParseErrorKind {
    /// The tokenizer rejected the input.
    Lex(LexErrorKind),
    /// Unknown or malformed `\` escape in a quoted string.
    InvalidEscape(String),
    /// A token that cannot appear here.
    UnexpectedToken {
        /// What the grammar wanted at this point.
        expected: &'static str,
        /// What it got.
        found: TokenKind,
    },
    /// `{` closed by `]` or `[` closed by `}`.
    MismatchedBracket,
    /// Input ended inside a bracket table.
    UnclosedBracket,
    /// A line indented deeper than its section allows, or an entry dedented
    /// past the document's own indentation.
    BadIndentation,
    /// Nesting exceeded the configured limit.
    TooDeep(usize),
    /// A map key that is not a bare atom.
    InvalidKey,
    /// `$` not followed by a converter name.
    ExpectedConverterName,
    /// Tag or reference id that does not fit the id range.
    IdOutOfRange,
    /// `*0`: the anonymous id cannot be referenced.
    AnonymousReference,
    /// The same id was tagged twice.
    DuplicateTag(ObjectId),
    /// The id was referenced but never tagged.
    Unresolved(ObjectId),
    /// The transform callback failed.
    Transform(TransformError),
}

impl ParseErrorKind {
    /// The error class this kind belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ParseErrorKind::Lex(_) | ParseErrorKind::InvalidEscape(_) => ErrorCategory::Lexical,
            ParseErrorKind::UnexpectedToken { .. }
            | ParseErrorKind::MismatchedBracket
            | ParseErrorKind::UnclosedBracket
            | ParseErrorKind::BadIndentation
            | ParseErrorKind::TooDeep(_)
            | ParseErrorKind::ExpectedConverterName => ErrorCategory::Structural,
            ParseErrorKind::InvalidKey => ErrorCategory::KeyType,
            ParseErrorKind::IdOutOfRange
            | ParseErrorKind::AnonymousReference
            | ParseErrorKind::DuplicateTag(_)
            | ParseErrorKind::Unresolved(_) => ErrorCategory::Reference,
            ParseErrorKind::Transform(_) => ErrorCategory::Hook,
        }
    }
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseErrorKind::Lex(kind) => write!(f, "{}", kind),
            ParseErrorKind::InvalidEscape(seq) => write!(f, "invalid escape sequence '{}'", seq),
            ParseErrorKind::UnexpectedToken { expected, found } => {
                write!(f, "expected {}, found {}", expected, found.describe())
            }
            ParseErrorKind::MismatchedBracket => write!(f, "mismatched closing bracket"),
            ParseErrorKind::UnclosedBracket => write!(f, "unclosed bracket"),
            ParseErrorKind::BadIndentation => write!(f, "bad indentation"),
            ParseErrorKind::TooDeep(limit) => {
                write!(f, "nesting deeper than {} levels", limit)
            }
            ParseErrorKind::InvalidKey => write!(f, "map keys must be bare atoms"),
            ParseErrorKind::ExpectedConverterName => write!(f, "expected converter name after '$'"),
            ParseErrorKind::IdOutOfRange => write!(f, "object id out of range"),
            ParseErrorKind::AnonymousReference => write!(f, "cannot reference anonymous id *0"),
            ParseErrorKind::DuplicateTag(id) => write!(f, "duplicate tag &{}", id),
            ParseErrorKind::Unresolved(id) => write!(f, "unresolved reference *{}", id),
            ParseErrorKind::Transform(err) => write!(f, "{}", err),
        }
    }
}

/// A parse failure, located in the source.
#[derive(Debug)]
pub struct ParseError {
    /// 1-based line of the error.
    pub line: usize,
    /// The kind of error.
    pub kind: ParseErrorKind,
    /// Source location.
    pub span: Span,
}

impl ParseError {
    /// Create an error, computing its line from `source`.
    pub fn new(kind: ParseErrorKind, span: Span, source: &str) -> Self {
        Self::at_line(kind, span, span.line_in(source))
    }

    /// Create an error with an already known line.
    pub fn at_line(kind: ParseErrorKind, span: Span, line: usize) -> Self {
        Self { line, kind, span }
    }

    /// Wrap a tokenizer error, pointing at the offending character.
    pub(crate) fn lex(err: LexError, source: &str) -> Self {
        let end = (err.offset + 1).min(source.len() as u32).max(err.offset);
        Self::new(ParseErrorKind::Lex(err.kind), Span::new(err.offset, end), source)
    }

    /// The error class.
    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Line {} : {}", self.line, self.kind)
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ParseErrorKind::Transform(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}
