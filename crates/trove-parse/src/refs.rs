//! Tag/reference resolution.

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;
use trove_tokenizer::Span;
use trove_tree::Table;

use crate::ParseErrorKind;

/// Identifier of a tagged table, decoded from the hex digits of `&id` or
/// `*id`.
///
/// Id `0` is anonymous: every `&0` makes a fresh table and nothing can
/// refer back to it. It is stored as `u64::MAX` so it never collides with
/// an id an author picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(u64);

impl ObjectId {
    /// The anonymous id, written `&0`.
    pub const ANONYMOUS: ObjectId = ObjectId(u64::MAX);

    /// Id for an author-chosen value. `0` maps to [`ObjectId::ANONYMOUS`];
    /// `u64::MAX` is reserved and rejected.
    pub fn new(value: u64) -> Option<Self> {
        match value {
            0 => Some(Self::ANONYMOUS),
            u64::MAX => None,
            value => Some(ObjectId(value)),
        }
    }

    /// Decode the hex digits following `&` or `*`.
    pub fn from_hex(digits: &str) -> Option<Self> {
        u64::from_str_radix(digits, 16).ok().and_then(Self::new)
    }

    /// Whether this is the anonymous id.
    pub fn is_anonymous(self) -> bool {
        self == Self::ANONYMOUS
    }

    /// The id as written in the source (`0` for the anonymous id).
    pub fn value(self) -> u64 {
        if self.is_anonymous() { 0 } else { self.0 }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.value())
    }
}

/// Tables seen under an id, plus the ids that were referenced before being
/// tagged.
///
/// Tagged tables can point at each other, and reference-counted cycles are
/// never freed on their own. Call [`release`](RefCache::release) once the
/// parsed graph is no longer needed to break them.
#[derive(Debug, Default)]
pub struct RefCache {
    tables: BTreeMap<ObjectId, Table>,
    /// Ids referenced but not yet tagged, with their first reference.
    unsolved: BTreeMap<ObjectId, Span>,
}

impl RefCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The table tagged with `id`.
    pub fn get(&self, id: ObjectId) -> Option<&Table> {
        self.tables.get(&id)
    }

    /// All cached ids, in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.tables.keys().copied()
    }

    /// Number of cached tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Whether no table was tagged or referenced.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Empty every cached table and forget them, breaking reference cycles.
    pub fn release(&mut self) {
        for table in self.tables.values() {
            table.clear();
        }
        self.tables.clear();
        self.unsolved.clear();
    }

    /// The table to fill for a `&id` tag.
    ///
    /// Reuses the table handed out to earlier references; an id can only be
    /// tagged once.
    pub(crate) fn define(&mut self, id: ObjectId) -> Result<Table, ParseErrorKind> {
        if id.is_anonymous() {
            return Ok(Table::new());
        }
        if self.unsolved.remove(&id).is_some() {
            debug!("Tag &{} resolves earlier references", id);
            return self
                .tables
                .get(&id)
                .cloned()
                .ok_or(ParseErrorKind::Unresolved(id));
        }
        if self.tables.contains_key(&id) {
            return Err(ParseErrorKind::DuplicateTag(id));
        }
        debug!("Tag &{} defined", id);
        let table = Table::new();
        self.tables.insert(id, table.clone());
        Ok(table)
    }

    /// The table for a `*id` reference, allocating it (and remembering it
    /// as unsolved) when the tag has not been seen yet.
    pub(crate) fn reference(&mut self, id: ObjectId, span: Span) -> Table {
        if let Some(table) = self.tables.get(&id) {
            return table.clone();
        }
        debug!("Forward reference *{}", id);
        let table = Table::new();
        self.tables.insert(id, table.clone());
        self.unsolved.insert(id, span);
        table
    }

    /// The lowest id still waiting for its tag, with its first reference.
    pub(crate) fn first_unsolved(&self) -> Option<(ObjectId, Span)> {
        self.unsolved
            .iter()
            .next()
            .map(|(&id, &span)| (id, span))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trove_tree::Value;
    use trove_testhelpers::test;

    #[test]
    fn test_object_id_from_hex() {
        assert_eq!(ObjectId::from_hex("1f"), ObjectId::new(0x1f));
        assert_eq!(ObjectId::from_hex("0"), Some(ObjectId::ANONYMOUS));
        assert_eq!(ObjectId::from_hex("000"), Some(ObjectId::ANONYMOUS));
        assert_eq!(ObjectId::from_hex("ffffffffffffffff"), None);
        assert_eq!(ObjectId::from_hex("1ffffffffffffffff"), None);
        assert_eq!(ObjectId::ANONYMOUS.to_string(), "0");
        assert_eq!(ObjectId::from_hex("A0").unwrap().to_string(), "a0");
    }

    #[test]
    fn test_reference_then_define_shares_table() {
        let mut refs = RefCache::new();
        let id = ObjectId::from_hex("2").unwrap();

        let forward = refs.reference(id, Span::new(3, 5));
        assert_eq!(refs.first_unsolved(), Some((id, Span::new(3, 5))));

        let defined = refs.define(id).unwrap();
        assert!(defined.ptr_eq(&forward));
        assert_eq!(refs.first_unsolved(), None);

        let backward = refs.reference(id, Span::new(9, 11));
        assert!(backward.ptr_eq(&forward));
        assert_eq!(refs.len(), 1);
    }

    #[test]
    fn test_duplicate_tag() {
        let mut refs = RefCache::new();
        let id = ObjectId::from_hex("7").unwrap();
        refs.define(id).unwrap();
        assert!(matches!(
            refs.define(id),
            Err(ParseErrorKind::DuplicateTag(dup)) if dup == id
        ));
    }

    #[test]
    fn test_anonymous_is_never_cached() {
        let mut refs = RefCache::new();
        let a = refs.define(ObjectId::ANONYMOUS).unwrap();
        let b = refs.define(ObjectId::ANONYMOUS).unwrap();
        assert!(!a.ptr_eq(&b));
        assert!(refs.is_empty());
    }

    #[test]
    fn test_release_breaks_cycles() {
        let mut refs = RefCache::new();
        let id = ObjectId::from_hex("1").unwrap();
        let table = refs.define(id).unwrap();
        table.set("me", Value::Table(refs.reference(id, Span::empty(0))));

        refs.release();
        assert!(table.is_empty());
        assert!(refs.is_empty());
        assert_eq!(refs.ids().count(), 0);
    }
}
