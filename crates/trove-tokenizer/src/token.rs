//! Token types for the trove lexer.

use crate::Span;

/// The kind of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Structural tokens
    /// `{` or `[`
    Open,
    /// `}` or `]`
    Close,
    /// `$`
    ConverterSigil,
    /// `:` or `=`
    MapSep,
    /// A run of `-` followed by whitespace, a line break, or end of input.
    ListSep,

    // Scalar tokens
    /// Quoted string without escapes: `"hello"`, `'hello'`
    String,
    /// Quoted string containing at least one `\` escape.
    EscapedString,
    /// Bare word or number: `hello`, `42`, `-1.5e3`, `true`
    Atom,

    // Layout
    /// Line break plus the indentation of the next content line.
    Newline,

    // Object references
    /// `&` followed by hex digits.
    Tag,
    /// `*` followed by hex digits.
    Ref,

    // Special tokens
    /// End of file
    Eof,
}

impl TokenKind {
    /// Whether this token is a scalar literal.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            TokenKind::String | TokenKind::EscapedString | TokenKind::Atom
        )
    }

    /// Human-readable name, used in error messages.
    pub fn describe(&self) -> &'static str {
        match self {
            TokenKind::Open => "opening bracket",
            TokenKind::Close => "closing bracket",
            TokenKind::ConverterSigil => "'$'",
            TokenKind::MapSep => "':'",
            TokenKind::ListSep => "list separator",
            TokenKind::String | TokenKind::EscapedString => "string",
            TokenKind::Atom => "atom",
            TokenKind::Newline => "end of line",
            TokenKind::Tag => "tag",
            TokenKind::Ref => "reference",
            TokenKind::Eof => "end of input",
        }
    }
}

/// A token with its kind, span, and source text slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'src> {
    /// The kind of token.
    pub kind: TokenKind,
    /// The span in the source text.
    pub span: Span,
    /// The source text of this token.
    pub text: &'src str,
}

impl<'src> Token<'src> {
    /// Create a new token.
    pub fn new(kind: TokenKind, span: Span, text: &'src str) -> Self {
        Self { kind, span, text }
    }

    /// Indentation width carried by a `Newline` token: the bytes after the
    /// last line break in its span. Zero for every other kind.
    pub fn indent(&self) -> usize {
        if self.kind != TokenKind::Newline {
            return 0;
        }
        match self.text.rfind('\n') {
            Some(pos) => self.text.len() - pos - 1,
            None => self.text.len(),
        }
    }

    /// Hex digits of a `Tag` or `Ref` token, without the sigil.
    pub fn id_digits(&self) -> Option<&'src str> {
        match self.kind {
            TokenKind::Tag | TokenKind::Ref => Some(&self.text[1..]),
            _ => None,
        }
    }

    /// Contents of a quoted string token, without the quotes.
    pub fn string_contents(&self) -> Option<&'src str> {
        match self.kind {
            TokenKind::String | TokenKind::EscapedString => {
                Some(&self.text[1..self.text.len() - 1])
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trove_testhelpers::test;

    #[test]
    fn test_indent() {
        let tok = Token::new(TokenKind::Newline, Span::new(3, 7), "\n   ");
        assert_eq!(tok.indent(), 3);
        let tok = Token::new(TokenKind::Newline, Span::new(3, 9), "\n\n    ");
        assert_eq!(tok.indent(), 4);
        // First line of a document has no preceding line break.
        let tok = Token::new(TokenKind::Newline, Span::new(0, 2), "  ");
        assert_eq!(tok.indent(), 2);
        let tok = Token::new(TokenKind::Atom, Span::new(0, 2), "ab");
        assert_eq!(tok.indent(), 0);
    }

    #[test]
    fn test_id_digits() {
        let tok = Token::new(TokenKind::Tag, Span::new(0, 3), "&1f");
        assert_eq!(tok.id_digits(), Some("1f"));
        let tok = Token::new(TokenKind::Atom, Span::new(0, 3), "&1x");
        assert_eq!(tok.id_digits(), None);
    }
}
