use std::collections::{HashMap, hash_map};

use crate::sql::types::Value;

/// Stable in-memory identity of a row within its table
pub type RowId = u64;

/// Hash index from column value to the owning row
///
/// Backs UNIQUE and PRIMARY KEY columns. NULL is never indexed, so the
/// index holds one entry per distinct non-null value among live rows.
#[derive(Debug, Default)]
pub struct HashIndex {
    entries: HashMap<Value, RowId>,
}

impl HashIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the row owning `value`, if any
    pub fn get(&self, value: &Value) -> Option<RowId> {
        self.entries.get(value).copied()
    }

    /// Maps `value` to `row`; NULL is ignored
    pub fn insert(&mut self, value: Value, row: RowId) {
        if !value.is_null() {
            self.entries.insert(value, row);
        }
    }

    /// Removes the entry for `value` if it belongs to `row`
    pub fn remove(&mut self, value: &Value, row: RowId) {
        if self.get(value) == Some(row) {
            self.entries.remove(value);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> hash_map::Iter<'_, Value, RowId> {
        self.entries.iter()
    }
}
