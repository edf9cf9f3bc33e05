//! Recursive-descent parser building tables from the token stream.

use tracing::debug;
use trove_tokenizer::{LexErrorKind, Span, Token, TokenKind, Tokenizer};
use trove_tree::{Table, Value};

use crate::literal::{self, LiteralError};
use crate::options::Transform;
use crate::refs::{ObjectId, RefCache};
use crate::{Document, Options, ParseError, ParseErrorKind};

#[cfg(test)]
mod tests;

/// How a run of entries is delimited.
#[derive(Debug, Clone, Copy)]
enum Body {
    /// Entries on lines indented by exactly `indent`.
    Section { indent: usize },
    /// Entries up to the bracket closing `open`. `indent` is the indentation
    /// of the line the bracket opens on.
    Bracket {
        indent: usize,
        open: Span,
        closer: char,
    },
}

/// Where a value sits, for deciding what a following line break means.
#[derive(Debug, Clone, Copy)]
struct Level {
    /// Indentation of the line holding the value.
    indent: usize,
    /// The value is an element of a `-` list; a `-` at `indent` starts the
    /// next element, not a nested list.
    list_item: bool,
}

impl Level {
    fn line(indent: usize) -> Self {
        Self {
            indent,
            list_item: false,
        }
    }
}

/// Parser state for one document.
pub(crate) struct Parser<'src, 't> {
    source: &'src str,
    tokenizer: Tokenizer<'src>,
    /// Token under the cursor.
    current: Token<'src>,
    /// Token after `current`, once peeked.
    lookahead: Option<Token<'src>>,
    refs: RefCache,
    list_mode: bool,
    transform: Option<Transform<'t>>,
    seed: Option<Table>,
    max_depth: usize,
    depth: usize,
}

impl<'src, 't> Parser<'src, 't> {
    pub(crate) fn new(
        mut tokenizer: Tokenizer<'src>,
        options: Options<'t>,
    ) -> Result<Self, ParseError> {
        let source = tokenizer.source();
        let current = tokenizer
            .next_token()
            .map_err(|err| ParseError::lex(err, source))?;
        Ok(Self {
            source,
            tokenizer,
            current,
            lookahead: None,
            refs: RefCache::new(),
            list_mode: options.list_mode,
            transform: options.transform,
            seed: options.seed,
            max_depth: options.max_depth,
            depth: 0,
        })
    }

    /// Parse the whole input.
    ///
    /// On failure every table created so far is cleared, so cycles among
    /// them do not outlive the error.
    pub(crate) fn parse(mut self) -> Result<Document, ParseError> {
        let root = self.seed.take().unwrap_or_default();
        match self.parse_document(&root) {
            Ok(()) => {
                debug!("Parsed document, {} tagged tables", self.refs.len());
                Ok(Document {
                    root: Value::Table(root),
                    refs: self.refs,
                })
            }
            Err(err) => {
                debug!("Parse failed: {}", err);
                self.refs.release();
                Err(err)
            }
        }
    }

    fn fetch(&mut self) -> Result<Token<'src>, ParseError> {
        let source = self.source;
        self.tokenizer
            .next_token()
            .map_err(|err| ParseError::lex(err, source))
    }

    /// Advance, returning the token that was current.
    fn bump(&mut self) -> Result<Token<'src>, ParseError> {
        let next = match self.lookahead.take() {
            Some(token) => token,
            None => self.fetch()?,
        };
        Ok(std::mem::replace(&mut self.current, next))
    }

    /// The token after the current one.
    fn peek_second(&mut self) -> Result<Token<'src>, ParseError> {
        match self.lookahead {
            Some(token) => Ok(token),
            None => {
                let token = self.fetch()?;
                self.lookahead = Some(token);
                Ok(token)
            }
        }
    }

    fn expect(
        &mut self,
        kind: TokenKind,
        expected: &'static str,
    ) -> Result<Token<'src>, ParseError> {
        let token = self.current;
        if token.kind != kind {
            return Err(self.unexpected(expected, token));
        }
        self.bump()
    }

    /// Skip line breaks, returning the indentation of the last one (or
    /// `indent` if there was none).
    fn skip_newlines(&mut self, mut indent: usize) -> Result<usize, ParseError> {
        while self.current.kind == TokenKind::Newline {
            indent = self.bump()?.indent();
        }
        Ok(indent)
    }

    fn error(&self, kind: ParseErrorKind, span: Span) -> ParseError {
        ParseError::new(kind, span, self.source)
    }

    fn error_at(&self, kind: ParseErrorKind, token: Token<'src>) -> ParseError {
        self.error(kind, location(token))
    }

    fn unexpected(&self, expected: &'static str, token: Token<'src>) -> ParseError {
        self.error_at(
            ParseErrorKind::UnexpectedToken {
                expected,
                found: token.kind,
            },
            token,
        )
    }

    /// Run `f` one nesting level deeper.
    fn nested<R>(
        &mut self,
        at: Token<'src>,
        f: impl FnOnce(&mut Self) -> Result<R, ParseError>,
    ) -> Result<R, ParseError> {
        if self.depth >= self.max_depth {
            return Err(self.error_at(ParseErrorKind::TooDeep(self.max_depth), at));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn parse_document(&mut self, root: &Table) -> Result<(), ParseError> {
        // An indented first line sets the indentation of the root section.
        let indent = if self.current.kind == TokenKind::Newline {
            self.bump()?.indent()
        } else {
            0
        };

        if self.current.kind != TokenKind::Eof {
            self.parse_body(root, Body::Section { indent })?;
        }

        let token = self.current;
        match token.kind {
            TokenKind::Eof => {}
            TokenKind::Newline if token.indent() != indent => {
                return Err(self.error_at(ParseErrorKind::BadIndentation, token));
            }
            TokenKind::Newline => {
                let next = self.peek_second()?;
                return Err(self.unexpected("list separator", next));
            }
            _ => return Err(self.unexpected("end of input", token)),
        }

        match self.refs.first_unsolved() {
            Some((id, span)) => Err(self.error(ParseErrorKind::Unresolved(id), span)),
            None => Ok(()),
        }
    }

    /// Whether the body at the cursor is a map, decided by its first entry
    /// having the shape `key:`.
    fn starts_map(&mut self) -> Result<bool, ParseError> {
        let token = self.current;
        let keyish = token.kind.is_scalar() || matches!(token.kind, TokenKind::Tag | TokenKind::Ref);
        if !keyish || self.peek_second()?.kind != TokenKind::MapSep {
            return Ok(false);
        }
        if token.kind != TokenKind::Atom {
            return Err(self.error_at(ParseErrorKind::InvalidKey, token));
        }
        Ok(true)
    }

    /// Parse the entries of a section or bracket body into `table`.
    fn parse_body(&mut self, table: &Table, body: Body) -> Result<(), ParseError> {
        let mut line_indent = match body {
            Body::Section { indent } => indent,
            Body::Bracket { indent, .. } => self.skip_newlines(indent)?,
        };

        let map = self.starts_map()?;
        if let Body::Section { indent } = body
            && !map
            && self.current.kind == TokenKind::ListSep
        {
            debug!("List of sections at indent {}", indent);
            return self.parse_sections(table, indent);
        }

        loop {
            if let Body::Bracket { open, closer, .. } = body {
                line_indent = self.skip_newlines(line_indent)?;
                let token = self.current;
                match token.kind {
                    TokenKind::Close => {
                        self.bump()?;
                        if !token.text.starts_with(closer) {
                            return Err(self.error_at(ParseErrorKind::MismatchedBracket, token));
                        }
                        return Ok(());
                    }
                    TokenKind::Eof => {
                        return Err(self.error(ParseErrorKind::UnclosedBracket, open));
                    }
                    _ => {}
                }
            }

            self.parse_entry(table, map, Level::line(line_indent))?;

            if let Body::Section { indent } = body {
                let token = self.current;
                match token.kind {
                    TokenKind::Newline if token.indent() == indent => {
                        self.bump()?;
                    }
                    TokenKind::Newline if token.indent() < indent => return Ok(()),
                    TokenKind::Newline => {
                        return Err(self.error_at(ParseErrorKind::BadIndentation, token));
                    }
                    TokenKind::Eof | TokenKind::Close => return Ok(()),
                    // Another entry on the same line.
                    _ => {}
                }
            }
        }
    }

    fn parse_entry(&mut self, table: &Table, map: bool, level: Level) -> Result<(), ParseError> {
        if !map {
            let value = self.parse_value(level)?;
            table.push(value);
            return Ok(());
        }

        let key = self.current;
        if key.kind != TokenKind::Atom {
            return Err(self.error_at(ParseErrorKind::InvalidKey, key));
        }
        self.bump()?;
        self.expect(TokenKind::MapSep, "':' after key")?;
        let value = self.parse_value(level)?;

        if self.list_mode {
            table.push(Value::String(key.text.to_string()));
            table.push(value);
        } else {
            table.insert_coalescing(key.text, value);
        }
        Ok(())
    }

    /// Parse the elements of a `-` list whose separators sit at `indent`.
    fn parse_sections(&mut self, table: &Table, indent: usize) -> Result<(), ParseError> {
        loop {
            self.expect(TokenKind::ListSep, "list separator")?;
            let element = self.parse_value(Level {
                indent,
                list_item: true,
            })?;
            table.push(element);

            let token = self.current;
            match token.kind {
                TokenKind::Newline if token.indent() == indent => {
                    if self.peek_second()?.kind != TokenKind::ListSep {
                        return Ok(());
                    }
                    self.bump()?;
                }
                TokenKind::Newline if token.indent() < indent => return Ok(()),
                TokenKind::Newline => {
                    return Err(self.error_at(ParseErrorKind::BadIndentation, token));
                }
                TokenKind::Eof | TokenKind::Close => return Ok(()),
                _ => return Err(self.unexpected("end of line", token)),
            }
        }
    }

    fn parse_value(&mut self, level: Level) -> Result<Value, ParseError> {
        let token = self.current;
        match token.kind {
            TokenKind::String | TokenKind::EscapedString | TokenKind::Atom => {
                self.bump()?;
                self.decode(token)
            }
            TokenKind::Ref => {
                self.bump()?;
                self.resolve(token)
            }
            TokenKind::Tag => self.parse_tagged(level),
            TokenKind::ConverterSigil => self.parse_converter(level),
            TokenKind::Open | TokenKind::Newline | TokenKind::Eof | TokenKind::Close => {
                self.parse_table(level, Table::new())
            }
            TokenKind::MapSep | TokenKind::ListSep => Err(self.unexpected("a value", token)),
        }
    }

    /// Parse a table-valued construct into `table`: a bracket, a deeper
    /// section, a `-` list at the same indentation, or nothing at all (an
    /// empty table).
    fn parse_table(&mut self, level: Level, table: Table) -> Result<Value, ParseError> {
        let token = self.current;
        let opens_list = token.kind == TokenKind::Newline
            && token.indent() == level.indent
            && !level.list_item
            && self.peek_second()?.kind == TokenKind::ListSep;

        match token.kind {
            TokenKind::Open => self.parse_bracket(level, table),
            TokenKind::Newline if token.indent() > level.indent => {
                self.bump()?;
                let indent = token.indent();
                debug!("Section at indent {}", indent);
                self.nested(token, |p| p.parse_body(&table, Body::Section { indent }))?;
                Ok(Value::Table(table))
            }
            TokenKind::Newline if opens_list => {
                self.bump()?;
                debug!("List of sections at indent {}", level.indent);
                self.nested(token, |p| p.parse_sections(&table, level.indent))?;
                Ok(Value::Table(table))
            }
            TokenKind::Newline | TokenKind::Eof | TokenKind::Close => Ok(Value::Table(table)),
            _ => Err(self.unexpected("a table", token)),
        }
    }

    fn parse_bracket(&mut self, level: Level, table: Table) -> Result<Value, ParseError> {
        let open = self.bump()?;
        let closer = if open.text == "[" { ']' } else { '}' };
        debug!("Bracket {} at {}", open.text, open.span.start);

        self.nested(open, |p| {
            p.parse_body(
                &table,
                Body::Bracket {
                    indent: level.indent,
                    open: open.span,
                    closer,
                },
            )
        })?;

        // Only square brackets go through the transform.
        if closer == ']' {
            self.apply_transform(table, open.span)
        } else {
            Ok(Value::Table(table))
        }
    }

    /// `$name value`: builds `[name, value]` and hands it to the transform.
    fn parse_converter(&mut self, level: Level) -> Result<Value, ParseError> {
        let sigil = self.bump()?;
        let name = self.current;
        if name.kind != TokenKind::Atom {
            return Err(self.error_at(ParseErrorKind::ExpectedConverterName, name));
        }
        self.bump()?;
        debug!("Converter ${}", name.text);

        let value = self.nested(name, |p| p.parse_value(level))?;
        let pair = Table::from_items(vec![Value::String(name.text.to_string()), value]);
        self.apply_transform(pair, sigil.span.extend(name.span))
    }

    fn parse_tagged(&mut self, level: Level) -> Result<Value, ParseError> {
        let tag = self.bump()?;
        let id = self.object_id(tag)?;
        let table = self
            .refs
            .define(id)
            .map_err(|kind| self.error_at(kind, tag))?;
        self.parse_table(level, table)
    }

    fn resolve(&mut self, token: Token<'src>) -> Result<Value, ParseError> {
        let id = self.object_id(token)?;
        if id.is_anonymous() {
            return Err(self.error_at(ParseErrorKind::AnonymousReference, token));
        }
        Ok(Value::Table(self.refs.reference(id, token.span)))
    }

    fn object_id(&self, token: Token<'src>) -> Result<ObjectId, ParseError> {
        token
            .id_digits()
            .and_then(ObjectId::from_hex)
            .ok_or_else(|| self.error_at(ParseErrorKind::IdOutOfRange, token))
    }

    fn decode(&self, token: Token<'src>) -> Result<Value, ParseError> {
        literal::decode(token).map_err(|err| match err {
            LiteralError::InvalidEscape { sequence, offset } => {
                let span = Span::new(offset, offset + sequence.len() as u32);
                self.error(ParseErrorKind::InvalidEscape(sequence), span)
            }
            LiteralError::InvalidUtf8 { .. } => {
                self.error_at(ParseErrorKind::Lex(LexErrorKind::InvalidUtf8), token)
            }
            LiteralError::NotAScalar(found) => self.error_at(
                ParseErrorKind::UnexpectedToken {
                    expected: "a scalar",
                    found,
                },
                token,
            ),
        })
    }

    fn apply_transform(&mut self, table: Table, span: Span) -> Result<Value, ParseError> {
        let Some(transform) = self.transform.as_mut() else {
            return Ok(Value::Table(table));
        };
        let result = transform(table);
        result.map_err(|err| self.error(ParseErrorKind::Transform(err), span))
    }
}

/// Where to report a problem with `token`. A line break token starts on the
/// previous line, so errors point at the start of the indented content.
fn location(token: Token<'_>) -> Span {
    if token.kind == TokenKind::Newline {
        Span::empty(token.span.end)
    } else {
        token.span
    }
}
