//! Label interning and address tracking.

use indexmap::IndexMap;
use rustc_hash::FxHashMap;

/// Index of an interned label name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LabelId(u32);

impl LabelId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Interned label names plus, once addresses are applied, their offsets.
///
/// A label may be referenced before it is defined; definition happens at
/// most once.
#[derive(Debug, Default)]
pub struct LabelTable {
    names: IndexMap<String, LabelId>,
    addresses: FxHashMap<LabelId, u64>,
}

impl LabelTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `name`, returning the existing id when already known.
    pub fn intern(&mut self, name: &str) -> LabelId {
        if let Some(&id) = self.names.get(name) {
            return id;
        }
        let id = LabelId(self.names.len() as u32);
        self.names.insert(name.to_string(), id);
        id
    }

    pub fn name(&self, id: LabelId) -> &str {
        self.names
            .get_index(id.index())
            .map_or("", |(name, _)| name.as_str())
    }

    /// Record the address of `id`. Returns false when already defined.
    pub fn define(&mut self, id: LabelId, address: u64) -> bool {
        if self.addresses.contains_key(&id) {
            return false;
        }
        self.addresses.insert(id, address);
        true
    }

    pub fn address(&self, id: LabelId) -> Option<u64> {
        self.addresses.get(&id).copied()
    }

    pub fn is_defined(&self, id: LabelId) -> bool {
        self.addresses.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_idempotent() {
        let mut labels = LabelTable::new();
        let a = labels.intern("_start");
        let b = labels.intern("_start");
        assert_eq!(a, b);
        assert_eq!(labels.len(), 1);
        assert_eq!(labels.name(a), "_start");
    }

    #[test]
    fn definition_happens_at_most_once() {
        let mut labels = LabelTable::new();
        let id = labels.intern("loop_entry");
        assert!(!labels.is_defined(id));
        assert!(labels.define(id, 0x40));
        assert!(!labels.define(id, 0x80));
        assert_eq!(labels.address(id), Some(0x40));
    }
}
