//! A tokenizer for trove

mod span;
pub use span::Span;

mod token;
pub use token::{Token, TokenKind};

mod tokenizer;
pub use tokenizer::{LexError, LexErrorKind, Tokenizer};
