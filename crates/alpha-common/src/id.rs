//! Stable id allocation.
//!
//! Every semantic element, source file, and interned string is keyed by an
//! [`Id`] drawn from a process-wide monotonically increasing pool. Ids are
//! never reused within a session.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};

/// A stable, process-unique id.
///
/// Ids are small (4 bytes), cheap to copy, and totally ordered by
/// allocation time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Id(u32);

impl Id {
    /// Wrap a raw id value.
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Id(raw)
    }

    /// Get the raw id value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A monotonically increasing id allocator.
///
/// The first allocated id is `1`; `0` is never handed out so it can serve
/// as a sentinel in serialized forms.
pub struct IdPool {
    next: AtomicU32,
}

impl IdPool {
    pub const fn new() -> Self {
        IdPool {
            next: AtomicU32::new(1),
        }
    }

    /// Allocate a fresh id. Never returns the same id twice.
    pub fn allocate(&self) -> Id {
        Id(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

static GLOBAL_POOL: IdPool = IdPool::new();

/// Allocate a fresh id from the process-wide pool.
pub fn next_id() -> Id {
    GLOBAL_POOL.allocate()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_increasing() {
        let a = next_id();
        let b = next_id();
        let c = next_id();
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn pool_starts_at_one() {
        let pool = IdPool::new();
        assert_eq!(pool.allocate().raw(), 1);
        assert_eq!(pool.allocate().raw(), 2);
    }
}
