//! Shared, mutable tables.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::Value;

/// Contents of a [`Table`].
///
/// A table has an array part (implicit integer keys starting at 1) and an
/// ordered string-keyed part. Sections and bracket bodies fill one or the
/// other; nothing stops a transform from producing both.
#[derive(Clone, Default, PartialEq)]
pub struct TableData {
    /// Array part, in order.
    pub items: Vec<Value>,
    /// Keyed part, in insertion order.
    pub entries: Vec<(String, Value)>,
}

/// A handle to a shared table.
///
/// Cloning the handle aliases the same table. Tagged tables can reference
/// each other in cycles; such cycles keep their tables alive until one of
/// them is [`clear`](Table::clear)ed.
#[derive(Clone, Default)]
pub struct Table(Rc<RefCell<TableData>>);

impl Table {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a sequence table from items.
    pub fn from_items(items: Vec<Value>) -> Self {
        Table(Rc::new(RefCell::new(TableData {
            items,
            entries: Vec::new(),
        })))
    }

    /// Create a keyed table from `(key, value)` pairs, keeping their order.
    pub fn from_entries<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        let table = Table::new();
        for (key, value) in entries {
            table.set(key, value);
        }
        table
    }

    /// Whether both handles point at the same table.
    pub fn ptr_eq(&self, other: &Table) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    /// Total number of items and keyed entries.
    pub fn len(&self) -> usize {
        let data = self.0.borrow();
        data.items.len() + data.entries.len()
    }

    /// Whether the table has no items and no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A table with items and no keyed entries.
    pub fn is_sequence(&self) -> bool {
        let data = self.0.borrow();
        data.entries.is_empty() && !data.items.is_empty()
    }

    /// Snapshot of the array part.
    pub fn items(&self) -> Vec<Value> {
        self.0.borrow().items.clone()
    }

    /// Snapshot of the keyed part.
    pub fn entries(&self) -> Vec<(String, Value)> {
        self.0.borrow().entries.clone()
    }

    /// Keys of the keyed part, in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.0
            .borrow()
            .entries
            .iter()
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Get the value stored under a key.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.0
            .borrow()
            .entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    /// Get an item by 1-based index.
    pub fn index(&self, index: usize) -> Option<Value> {
        let position = index.checked_sub(1)?;
        self.0.borrow().items.get(position).cloned()
    }

    /// Append an item.
    pub fn push(&self, value: Value) {
        self.0.borrow_mut().items.push(value);
    }

    /// Insert or replace the value under a key.
    pub fn set(&self, key: impl Into<String>, value: Value) {
        let key = key.into();
        let mut data = self.0.borrow_mut();
        if let Some(entry) = data.entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            data.entries.push((key, value));
        }
    }

    /// Insert under a key, aggregating repeated keys.
    ///
    /// A free key takes the value. A key holding a sequence gets the value
    /// appended. A key holding anything else is replaced by the two-element
    /// sequence `[old, new]`.
    pub fn insert_coalescing(&self, key: impl Into<String>, value: Value) {
        let key = key.into();
        // The existing value may be this very table, so no borrow may be
        // held across the mutation below.
        match self.get(&key) {
            None => self.set(key, value),
            Some(Value::Table(seq)) if seq.is_sequence() => {
                trace!("Appending repeated key {:?}", key);
                seq.push(value)
            }
            Some(old) => {
                trace!("Coalescing repeated key {:?}", key);
                self.set(key, Value::Table(Table::from_items(vec![old, value])))
            }
        }
    }

    /// Remove all items and entries, dropping the handles they hold.
    pub fn clear(&self) {
        let mut data = self.0.borrow_mut();
        data.items.clear();
        data.entries.clear();
    }
}

thread_local! {
    static VISITING: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Run `body` on the table contents, or on `None` when the table is
/// already being visited further up the stack (a cycle) or is mutably
/// borrowed.
pub(crate) fn visit<R>(table: &Table, body: impl FnOnce(Option<&TableData>) -> R) -> R {
    let addr = table.addr();
    if VISITING.with(|v| v.borrow().contains(&addr)) {
        return body(None);
    }
    let Ok(data) = table.0.try_borrow() else {
        return body(None);
    };
    VISITING.with(|v| v.borrow_mut().push(addr));
    let result = body(Some(&*data));
    VISITING.with(|v| v.borrow_mut().pop());
    result
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        // Revisiting a table means the comparison has gone around a cycle;
        // everything on the way matched.
        visit(self, |data| match (data, other.0.try_borrow()) {
            (None, _) => true,
            (Some(data), Ok(other)) => *data == *other,
            (Some(_), Err(_)) => false,
        })
    }
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        visit(self, |data| {
            let Some(data) = data else {
                return f.write_str("<cycle>");
            };
            if data.entries.is_empty() {
                f.debug_list().entries(&data.items).finish()
            } else {
                let mut map = f.debug_map();
                for (i, item) in data.items.iter().enumerate() {
                    map.entry(&(i + 1), item);
                }
                for (key, value) in &data.entries {
                    map.entry(key, value);
                }
                map.finish()
            }
        })
    }
}

impl fmt::Debug for TableData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableData")
            .field("items", &self.items)
            .field("entries", &self.entries)
            .finish()
    }
}
