//! Insertion-ordered keyed table
//!
//! Patterns and couplings are looked up by key but iterated in creation
//! order: harmonic pairing, emergent intentions and state listings all
//! depend on that order. Entries are only ever removed all at once.

use indexmap::IndexMap;

#[derive(Debug, Clone)]
pub struct KeyedTable<V> {
    entries: IndexMap<String, V>,
}

impl<V> Default for KeyedTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> KeyedTable<V> {
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        self.entries.get_mut(key)
    }

    /// Entry at `index` in table order.
    pub fn get_index(&self, index: usize) -> Option<&V> {
        self.entries.get_index(index).map(|(_, v)| v)
    }

    pub fn get_index_mut(&mut self, index: usize) -> Option<&mut V> {
        self.entries.get_index_mut(index).map(|(_, v)| v)
    }

    /// Insert at the end, or replace in place if the key already exists.
    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        self.entries.insert(key.into(), value);
    }

    pub fn values(&self) -> indexmap::map::Values<'_, String, V> {
        self.entries.values()
    }

    pub fn values_mut(&mut self) -> indexmap::map::ValuesMut<'_, String, V> {
        self.entries.values_mut()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(table: &KeyedTable<i32>) -> Vec<i32> {
        table.values().copied().collect()
    }

    #[test]
    fn keeps_insertion_order() {
        let mut table = KeyedTable::new();
        table.insert("b", 2);
        table.insert("a", 1);
        table.insert("c", 3);
        assert_eq!(values(&table), vec![2, 1, 3]);
        assert_eq!(table.get_index(1), Some(&1));
    }

    #[test]
    fn insert_existing_key_replaces_in_place() {
        let mut table = KeyedTable::new();
        table.insert("a", 1);
        table.insert("b", 2);
        table.insert("a", 10);
        assert_eq!(table.len(), 2);
        assert_eq!(values(&table), vec![10, 2]);
        assert_eq!(table.get("a"), Some(&10));
    }

    #[test]
    fn get_mut_and_clear() {
        let mut table = KeyedTable::new();
        table.insert("a", 1);
        *table.get_mut("a").unwrap() += 5;
        *table.get_index_mut(0).unwrap() += 1;
        assert_eq!(table.get("a"), Some(&7));
        assert!(table.get_mut("missing").is_none());
        assert!(table.get_index_mut(3).is_none());
        table.clear();
        assert!(table.is_empty());
        assert!(!table.contains_key("a"));
    }
}
