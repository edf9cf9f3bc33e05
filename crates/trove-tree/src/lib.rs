//! Value model for trove documents.
//!
//! Parsed documents are trees of [`Value`]s whose compound nodes are shared
//! [`Table`] handles. Tables may alias each other (and form cycles) through
//! the notation's tag/reference syntax, so a table is identified by its
//! handle, not its contents.

mod scalar;
mod table;
mod value;

pub use scalar::{can_be_bare, quote};
pub use table::{Table, TableData};
pub use value::Value;
