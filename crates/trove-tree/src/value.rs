//! Dynamically typed values.

use std::fmt;

use crate::table::visit;
use crate::{Table, can_be_bare, quote};

/// A trove value.
#[derive(Clone, Default, PartialEq)]
pub enum Value {
    /// Absent value (`nil`).
    #[default]
    Nil,
    /// Boolean value.
    Bool(bool),
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit floating-point number.
    Float(f64),
    /// UTF-8 string.
    String(String),
    /// Shared table (map, sequence, or both).
    Table(Table),
}

impl Value {
    /// Returns `true` if this value is nil.
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Returns the boolean value if this is a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer if this is an `Int`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the float if this is a `Float`.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }

    /// Returns a reference to the string if this is a `String`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the table handle if this is a `Table`.
    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Value::Table(t) => Some(t),
            _ => None,
        }
    }

    /// Name of the value's type, for messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Table(_) => "table",
        }
    }

    /// Get a value by path.
    ///
    /// Path segments are separated by `.`.
    /// Use `[n]` for 1-based sequence indexing.
    pub fn get(&self, path: &str) -> Option<Value> {
        if path.is_empty() {
            return Some(self.clone());
        }

        let (segment, rest) = split_path(path);
        let table = self.as_table()?;

        let value = match segment
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
        {
            Some(index) => table.index(index.parse().ok()?)?,
            None => table.get(segment)?,
        };
        value.get(rest)
    }
}

fn split_path(path: &str) -> (&str, &str) {
    if path.starts_with('[')
        && let Some(end) = path.find(']')
    {
        let segment = &path[..=end];
        let rest = &path[end + 1..];
        let rest = rest.strip_prefix('.').unwrap_or(rest);
        return (segment, rest);
    }

    let dot_pos = path.find('.');
    let bracket_pos = path.find('[');

    match (dot_pos, bracket_pos) {
        (Some(d), Some(b)) if b < d => (&path[..b], &path[b..]),
        (Some(d), _) => (&path[..d], &path[d + 1..]),
        (None, Some(b)) => (&path[..b], &path[b..]),
        (None, None) => (path, ""),
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Table(t) => fmt::Debug::fmt(t, f),
        }
    }
}

/// Writes the value in the notation itself: atoms where they read back
/// unchanged, quoted strings otherwise, tables in brace form.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            // Debug keeps a fractional part (`1.0`) so floats stay floats.
            Value::Float(x) => write!(f, "{:?}", x),
            Value::String(s) if can_be_bare(s) => f.write_str(s),
            Value::String(s) => f.write_str(&quote(s)),
            Value::Table(t) => fmt::Display::fmt(t, f),
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        visit(self, |data| {
            let Some(data) = data else {
                return f.write_str("<cycle>");
            };
            f.write_str("{")?;
            let mut first = true;
            for item in &data.items {
                if !first {
                    f.write_str(" ")?;
                }
                first = false;
                write!(f, "{}", item)?;
            }
            for (key, value) in &data.entries {
                if !first {
                    f.write_str(" ")?;
                }
                first = false;
                if can_be_bare(key) {
                    write!(f, "{}: {}", key, value)?;
                } else {
                    write!(f, "{}: {}", quote(key), value)?;
                }
            }
            f.write_str("}")
        })
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<Table> for Value {
    fn from(t: Table) -> Self {
        Value::Table(t)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Table(Table::from_items(items))
    }
}
