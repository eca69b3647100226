//! String literal interning.
//!
//! Duplicate string literals share one data-section entry; the emitter
//! iterates the map in first-intern order when laying out the table.

use alpha_common::{next_id, Id};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;

#[derive(Debug, Default)]
pub struct StringInternMap {
    by_value: FxHashMap<String, Id>,
    by_id: IndexMap<Id, String>,
}

impl StringInternMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `value`, returning the id shared by every equal literal.
    pub fn intern(&mut self, value: &str) -> Id {
        if let Some(&id) = self.by_value.get(value) {
            return id;
        }
        let id = next_id();
        self.by_value.insert(value.to_string(), id);
        self.by_id.insert(id, value.to_string());
        id
    }

    pub fn get(&self, id: Id) -> Option<&str> {
        self.by_id.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// `(id, value)` pairs in first-intern order.
    pub fn iter(&self) -> impl Iterator<Item = (Id, &str)> {
        self.by_id.iter().map(|(&id, value)| (id, value.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_literals_share_an_id() {
        let mut map = StringInternMap::new();
        let a = map.intern("hello");
        let b = map.intern("world");
        let c = map.intern("hello");
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(b), Some("world"));
    }
}
