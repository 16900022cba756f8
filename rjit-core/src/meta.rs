//! Per-Block Metadata
//!
//! A type-tagged key/value store that optimizers and code generators can hang
//! side data on: dependency graphs, branch prediction hints, layout notes.
//! Each entry owns its value; replacing or removing an entry drops the old
//! value, and destroying the owning block drops everything.

use std::any::Any;
use std::collections::HashMap;

/// Metadata tag values of 10000 or greater are reserved for internal use.
pub const META_RESERVED_BASE: i32 = 10_000;

/// Tag-indexed metadata map.
#[derive(Default)]
pub struct MetaMap {
    entries: HashMap<i32, Box<dyn Any>>,
}

impl MetaMap {
    /// Store `value` under `tag`, dropping any previous value for the tag.
    pub fn set<T: Any>(&mut self, tag: i32, value: T) {
        self.entries.insert(tag, Box::new(value));
    }

    /// Fetch the value stored under `tag`, if it exists and has type `T`.
    pub fn get<T: Any>(&self, tag: i32) -> Option<&T> {
        self.entries.get(&tag)?.downcast_ref::<T>()
    }

    /// Drop the value stored under `tag`. Does nothing for an absent tag.
    pub fn free(&mut self, tag: i32) {
        self.entries.remove(&tag);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for MetaMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetaMap").field("entries", &self.entries.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn set_get_free_roundtrip() {
        let mut meta = MetaMap::default();
        meta.set(7, 42u32);
        assert_eq!(meta.get::<u32>(7), Some(&42));
        assert_eq!(meta.get::<u64>(7), None);
        meta.free(7);
        assert_eq!(meta.get::<u32>(7), None);
    }

    #[test]
    fn replacing_an_entry_drops_the_old_value() {
        let witness = Rc::new(());
        let mut meta = MetaMap::default();
        meta.set(1, Rc::clone(&witness));
        assert_eq!(Rc::strong_count(&witness), 2);
        meta.set(1, 0u8);
        assert_eq!(Rc::strong_count(&witness), 1);
    }
}
