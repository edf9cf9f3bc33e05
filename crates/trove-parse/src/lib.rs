//! Parser for the trove data notation.
//!
//! A trove document is a tree of keys and values written either as
//! indentation-delimited sections or as bracketed tables:
//!
//! ```text
//! # comments run to the end of the line
//! server:
//!   host: example.org
//!   ports: [80 443]
//! owner: &1 {name: "Ada", manager: *1}
//! points:
//! -
//!   x: 1
//! -
//!   x: 2
//! ```
//!
//! `&id` tags a table and `*id` refers back (or forward) to it, so parsed
//! documents can share tables and contain cycles. `$name value` builds the
//! pair `[name, value]` and passes it through the transform set on
//! [`Options`], as do `[...]` tables.
//!
//! ```
//! let doc = trove_parse::parse("owner: &1 {name: Ada, me: *1}").unwrap();
//! let owner = doc.get("owner").unwrap();
//! assert_eq!(doc.get("owner.me"), Some(owner));
//! ```

pub use trove_tokenizer::{Span, Token, TokenKind, Tokenizer};
pub use trove_tree::{Table, TableData, Value, can_be_bare, quote};

mod diagnostic;

mod error;
pub use error::{ErrorCategory, ParseError, ParseErrorKind, TransformError};

mod literal;
pub use literal::{LiteralError, decode};

mod options;
pub use options::{DEFAULT_MAX_DEPTH, Options};

mod parser;

mod refs;
pub use refs::{ObjectId, RefCache};

/// A parsed document.
#[derive(Debug)]
pub struct Document {
    /// The root table.
    pub root: Value,
    /// Every table tagged or referenced in the document, by id.
    pub refs: RefCache,
}

impl Document {
    /// Get a value by path, see [`Value::get`].
    pub fn get(&self, path: &str) -> Option<Value> {
        self.root.get(path)
    }

    /// The table tagged `&id` (with `id` read as hex in the source).
    pub fn tag(&self, id: u64) -> Option<Table> {
        ObjectId::new(id).and_then(|id| self.refs.get(id)).cloned()
    }
}

/// Parse a document, coalescing repeated keys.
pub fn parse(text: impl AsRef<[u8]>) -> Result<Document, ParseError> {
    Options::new().parse(text)
}

/// Parse a document, building every map body as a flat
/// `[key, value, key, value, ...]` sequence.
pub fn parse_as_pairs(text: impl AsRef<[u8]>) -> Result<Document, ParseError> {
    Options::new().pairs().parse(text)
}

/// Source text of every token, in order. Meant for debugging grammar
/// problems.
pub fn tokenize(text: &str) -> Result<Vec<&str>, ParseError> {
    Tokenizer::new(text)
        .map(|token| {
            token
                .map(|token| token.text)
                .map_err(|err| ParseError::lex(err, text))
        })
        .collect()
}
