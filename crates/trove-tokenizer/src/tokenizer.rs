//! Tokenizer for the trove data notation.

use std::fmt;

use crate::{Span, Token, TokenKind};
use tracing::trace;

/// A tokenizer that produces tokens from trove source text.
#[derive(Clone)]
pub struct Tokenizer<'src> {
    /// The source text being tokenized.
    source: &'src str,
    /// The remaining source text (suffix of `source`).
    remaining: &'src str,
    /// Current byte position in `source`.
    pos: u32,
    /// Set until the first token has been produced; the first line's
    /// indentation is reported as a `Newline` token.
    line_start: bool,
    /// Set once `Eof` or an error has been returned by the iterator.
    done: bool,
}

/// Error produced while tokenizing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    /// What went wrong.
    pub kind: LexErrorKind,
    /// Byte offset where the offending token starts.
    pub offset: u32,
}

/// Kinds of lexical errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexErrorKind {
    /// A quoted string ran into a line break or end of input.
    UnterminatedString,
    /// The input buffer is not valid UTF-8.
    InvalidUtf8,
}

impl fmt::Display for LexErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexErrorKind::UnterminatedString => write!(f, "unterminated string"),
            LexErrorKind::InvalidUtf8 => write!(f, "invalid UTF-8"),
        }
    }
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at offset {}", self.kind, self.offset)
    }
}

impl std::error::Error for LexError {}

impl<'src> Tokenizer<'src> {
    /// Create a new tokenizer for the given source text.
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            remaining: source,
            pos: 0,
            line_start: true,
            done: false,
        }
    }

    /// Create a tokenizer over a byte buffer, validating it as UTF-8 first.
    pub fn from_bytes(bytes: &'src [u8]) -> Result<Self, LexError> {
        match std::str::from_utf8(bytes) {
            Ok(source) => Ok(Self::new(source)),
            Err(err) => Err(LexError {
                kind: LexErrorKind::InvalidUtf8,
                offset: err.valid_up_to() as u32,
            }),
        }
    }

    /// The full source text.
    #[inline]
    pub fn source(&self) -> &'src str {
        self.source
    }

    /// Peek at the next character without consuming it.
    #[inline]
    fn peek(&self) -> Option<char> {
        self.remaining.chars().next()
    }

    /// Peek at the nth character (0-indexed) without consuming.
    #[inline]
    fn peek_nth(&self, n: usize) -> Option<char> {
        self.remaining.chars().nth(n)
    }

    /// Advance by one character and return it.
    #[inline]
    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8() as u32;
        self.remaining = &self.remaining[c.len_utf8()..];
        Some(c)
    }

    /// Create a token from the given start position to current position.
    fn token(&self, kind: TokenKind, start: u32) -> Token<'src> {
        let span = Span::new(start, self.pos);
        let text = &self.source[start as usize..self.pos as usize];
        trace!("Token {:?} at {:?}: {:?}", kind, span, text);
        Token::new(kind, span, text)
    }

    fn error(&self, kind: LexErrorKind, offset: u32) -> LexError {
        trace!("Lex error {:?} at {}", kind, offset);
        LexError { kind, offset }
    }

    /// Get the next token.
    pub fn next_token(&mut self) -> Result<Token<'src>, LexError> {
        if self.line_start {
            self.line_start = false;
            let token = self.tokenize_layout(0);
            // A document starting directly with content has no leading layout.
            if token.kind == TokenKind::Eof || !token.span.is_empty() {
                return Ok(token);
            }
        }

        self.skip_blanks();

        let Some(c) = self.peek() else {
            return Ok(self.token(TokenKind::Eof, self.pos));
        };
        let start = self.pos;

        match c {
            // Structural tokens
            '{' | '[' => {
                self.advance();
                Ok(self.token(TokenKind::Open, start))
            }
            '}' | ']' => {
                self.advance();
                Ok(self.token(TokenKind::Close, start))
            }
            '$' => {
                self.advance();
                Ok(self.token(TokenKind::ConverterSigil, start))
            }
            ':' | '=' => {
                self.advance();
                Ok(self.token(TokenKind::MapSep, start))
            }

            '\n' => Ok(self.tokenize_layout(start)),

            '"' | '\'' => self.tokenize_quoted(c),

            '-' => Ok(self.tokenize_dashes()),

            _ => Ok(self.tokenize_atom()),
        }
    }

    /// Skip horizontal whitespace, commas and comments. Stops at a line break.
    fn skip_blanks(&mut self) {
        while let Some(c) = self.peek() {
            match c {
                c if is_blank(c) => {
                    self.advance();
                }
                '#' => self.skip_comment(),
                _ => break,
            }
        }
    }

    /// Consume a `#` comment up to (not including) the line break.
    fn skip_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
    }

    /// Tokenize line breaks, blank lines, comment-only lines, and the
    /// indentation of the next content line as one `Newline` token.
    ///
    /// The token starts at the last line break, so its length minus one is
    /// the indentation width. Trailing layout at end of input yields `Eof`.
    fn tokenize_layout(&mut self, mut start: u32) -> Token<'src> {
        loop {
            while let Some(c) = self.peek() {
                if c == ' ' || c == '\t' {
                    self.advance();
                } else {
                    break;
                }
            }
            match self.peek() {
                Some('\n') => {
                    start = self.pos;
                    self.advance();
                }
                Some('\r') if self.peek_nth(1) == Some('\n') => {
                    self.advance();
                    start = self.pos;
                    self.advance();
                }
                Some('#') => self.skip_comment(),
                None => return self.token(TokenKind::Eof, self.pos),
                Some(_) => return self.token(TokenKind::Newline, start),
            }
        }
    }

    /// Tokenize a quoted string: `"..."` or `'...'`.
    fn tokenize_quoted(&mut self, quote: char) -> Result<Token<'src>, LexError> {
        let start = self.pos;
        let mut kind = TokenKind::String;

        // Consume opening quote
        self.advance();

        loop {
            match self.peek() {
                None | Some('\n') => {
                    return Err(self.error(LexErrorKind::UnterminatedString, start));
                }
                Some('\\') => {
                    // Escape sequence - decoded later, but the escaped
                    // character must not end the scan.
                    kind = TokenKind::EscapedString;
                    self.advance();
                    if matches!(self.peek(), Some(c) if c != '\n') {
                        self.advance();
                    }
                }
                Some(c) if c == quote => {
                    self.advance();
                    break;
                }
                Some(_) => {
                    self.advance();
                }
            }
        }

        Ok(self.token(kind, start))
    }

    /// Tokenize a run of `-`: a list separator when followed by whitespace
    /// or end of input, otherwise the start of an atom such as `-12`.
    fn tokenize_dashes(&mut self) -> Token<'src> {
        let dashes = self.remaining.bytes().take_while(|&b| b == b'-').count();
        match self.remaining[dashes..].chars().next() {
            None => {}
            Some(c) if c == '\n' || is_blank(c) => {}
            Some(_) => return self.tokenize_atom(),
        }
        let start = self.pos;
        for _ in 0..dashes {
            self.advance();
        }
        self.token(TokenKind::ListSep, start)
    }

    /// Tokenize a bare atom, classifying `&hex` and `*hex` as tag/reference.
    fn tokenize_atom(&mut self) -> Token<'src> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if is_atom_char(c) {
                self.advance();
            } else {
                break;
            }
        }
        let text = &self.source[start as usize..self.pos as usize];
        let kind = match text.as_bytes() {
            [b'&', digits @ ..] if is_hex_run(digits) => TokenKind::Tag,
            [b'*', digits @ ..] if is_hex_run(digits) => TokenKind::Ref,
            _ => TokenKind::Atom,
        };
        self.token(kind, start)
    }
}

impl<'src> Iterator for Tokenizer<'src> {
    type Item = Result<Token<'src>, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_token() {
            Ok(token) if token.kind == TokenKind::Eof => {
                self.done = true;
                None
            }
            Ok(token) => Some(Ok(token)),
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

/// Horizontal whitespace; commas separate entries exactly like spaces.
fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | ',')
}

/// Check if a character can continue a bare atom.
fn is_atom_char(c: char) -> bool {
    !matches!(
        c,
        ' ' | '\t' | '\r' | '\n' | ',' | '{' | '}' | '[' | ']' | '$' | ':' | '=' | '"' | '\''
    )
}

fn is_hex_run(bytes: &[u8]) -> bool {
    !bytes.is_empty() && bytes.iter().all(u8::is_ascii_hexdigit)
}
