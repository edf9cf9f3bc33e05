//! Parse options.

use std::fmt;

use trove_tokenizer::{Span, Tokenizer};
use trove_tree::{Table, Value};

use crate::parser::Parser;
use crate::{Document, ParseError, ParseErrorKind, TransformError};

/// Default nesting limit.
pub const DEFAULT_MAX_DEPTH: usize = 256;

pub(crate) type Transform<'t> = Box<dyn FnMut(Table) -> Result<Value, TransformError> + 't>;

/// Options for parsing a trove document.
///
/// ```
/// use trove_parse::{Options, Value};
///
/// let doc = Options::new()
///     .transform(|table| Ok(Value::Int(table.len() as i64)))
///     .parse("size: [a b c]")
///     .unwrap();
/// assert_eq!(doc.get("size"), Some(Value::Int(3)));
/// ```
pub struct Options<'t> {
    /// Build map bodies as flat `[key, value, ...]` sequences.
    pub(crate) list_mode: bool,
    /// Called on every `[...]` table and every `$name value` pair.
    pub(crate) transform: Option<Transform<'t>>,
    /// Table the root section is parsed into.
    pub(crate) seed: Option<Table>,
    /// Maximum nesting of sections, brackets and converters.
    pub(crate) max_depth: usize,
}

impl Default for Options<'_> {
    fn default() -> Self {
        Self {
            list_mode: false,
            transform: None,
            seed: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl fmt::Debug for Options<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("list_mode", &self.list_mode)
            .field("transform", &self.transform.is_some())
            .field("seed", &self.seed)
            .field("max_depth", &self.max_depth)
            .finish()
    }
}

impl<'t> Options<'t> {
    /// Create new default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep map bodies as flat sequences of alternating keys and values,
    /// preserving order and repeated keys.
    pub fn pairs(mut self) -> Self {
        self.list_mode = true;
        self
    }

    /// Set the transform applied to bracket `[...]` tables and to
    /// `$name value` converter pairs. Its result replaces the table.
    pub fn transform(
        mut self,
        transform: impl FnMut(Table) -> Result<Value, TransformError> + 't,
    ) -> Self {
        self.transform = Some(Box::new(transform));
        self
    }

    /// Parse the root section into an existing table.
    pub fn seed(mut self, table: Table) -> Self {
        self.seed = Some(table);
        self
    }

    /// Set the nesting limit.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Parse a document. Accepts text or raw bytes; bytes must be UTF-8.
    pub fn parse(self, text: impl AsRef<[u8]>) -> Result<Document, ParseError> {
        let bytes = text.as_ref();
        let tokenizer = Tokenizer::from_bytes(bytes).map_err(|err| {
            let offset = err.offset as usize;
            let line = 1 + bytes[..offset].iter().filter(|&&b| b == b'\n').count();
            ParseError::at_line(
                ParseErrorKind::Lex(err.kind),
                Span::new(err.offset, err.offset + 1),
                line,
            )
        })?;
        Parser::new(tokenizer, self)?.parse()
    }
}
