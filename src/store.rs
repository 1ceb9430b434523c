//! Run-scoped value store.
//!
//! An append-only, insertion-ordered history of `id → value` entries plus a
//! derived index pointing every id at its most recent entry. Lookups are
//! last-write-wins: appending `x = "a"` then `x = "b"` makes `x` resolve to
//! `"b"`, while both entries stay in the history.

use std::collections::HashMap;
use std::fmt;

/// A stored value.
///
/// Multi-select answers are flattened to a comma-joined [`Value::Text`]
/// before they reach the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Text(String),
    Flag(bool),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Flag(flag) => write!(f, "{}", flag),
        }
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<bool> for Value {
    fn from(flag: bool) -> Self {
        Self::Flag(flag)
    }
}

/// One entry of the store history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub id: String,
    pub value: Value,
}

/// Read access to named values, as needed by templating and predicates.
pub trait Lookup {
    /// Current string form of `id`, if any value is stored under it.
    fn lookup(&self, id: &str) -> Option<String>;
}

/// Ordered, append-only value history with a last-write-wins index.
#[derive(Debug, Clone, Default)]
pub struct ValueStore {
    entries: Vec<Entry>,
    /// id → position of the latest entry for that id
    latest: HashMap<String, usize>,
}

impl ValueStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with `entries`, in order.
    pub fn seed<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut store = Self::new();
        for (id, value) in entries {
            store.append(id, value);
        }
        store
    }

    /// Append a new entry; an existing entry with the same id is shadowed, not replaced.
    pub fn append(&mut self, id: impl Into<String>, value: impl Into<Value>) {
        let id = id.into();
        self.latest.insert(id.clone(), self.entries.len());
        self.entries.push(Entry {
            id,
            value: value.into(),
        });
    }

    /// The current value for `id`, honouring last-write-wins.
    pub fn resolve(&self, id: &str) -> Option<&Value> {
        self.latest.get(id).map(|&index| &self.entries[index].value)
    }

    /// Full insertion-ordered history, shadowed entries included
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Lookup for ValueStore {
    fn lookup(&self, id: &str) -> Option<String> {
        self.resolve(id).map(ToString::to_string)
    }
}
