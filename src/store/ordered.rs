use std::collections::HashMap;
use std::hash::Hash;

/// Map that iterates in insertion order. Overwriting a key keeps its
/// original position; removal shifts later entries down.
#[derive(Debug, Clone)]
pub struct OrderedMap<K, V> {
    entries: Vec<(K, V)>,
    index: HashMap<K, usize>,
}

impl<K, V> Default for OrderedMap<K, V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<K: Hash + Eq + Clone, V> OrderedMap<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.index.get(key).map(|&idx| &self.entries[idx].1)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        match self.index.get(key) {
            Some(&idx) => Some(&mut self.entries[idx].1),
            None => None,
        }
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Insert or overwrite, returning the previous value.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        if let Some(&idx) = self.index.get(&key) {
            return Some(std::mem::replace(&mut self.entries[idx].1, value));
        }
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push((key, value));
        None
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        let idx = self.index.remove(key)?;
        let (_, value) = self.entries.remove(idx);
        for (_, pos) in self.index.iter_mut() {
            if *pos > idx {
                *pos -= 1;
            }
        }
        Some(value)
    }

    /// Remove every entry for which `keep` returns false, returning the count removed.
    pub fn retain(&mut self, mut keep: impl FnMut(&K, &V) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(k, v)| keep(k, v));
        let removed = before - self.entries.len();
        if removed > 0 {
            self.index = self
                .entries
                .iter()
                .enumerate()
                .map(|(idx, (k, _))| (k.clone(), idx))
                .collect();
        }
        removed
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_survives_overwrite_and_remove() {
        let mut map = OrderedMap::new();
        map.insert("a", 1);
        map.insert("b", 2);
        map.insert("c", 3);
        assert_eq!(map.insert("a", 10), Some(1));
        assert_eq!(map.remove(&"b"), Some(2));
        map.insert("d", 4);

        let items: Vec<_> = map.iter().map(|(k, v)| (*k, *v)).collect();
        assert_eq!(items, vec![("a", 10), ("c", 3), ("d", 4)]);
        assert_eq!(map.get(&"d"), Some(&4));
    }

    #[test]
    fn test_retain_rebuilds_index() {
        let mut map = OrderedMap::new();
        for (idx, key) in ["w", "x", "y", "z"].into_iter().enumerate() {
            map.insert(key, idx);
        }
        let removed = map.retain(|_, v| v % 2 == 1);
        assert_eq!(removed, 2);
        assert_eq!(map.get(&"z"), Some(&3));
        assert!(!map.contains_key(&"w"));
        assert_eq!(map.keys().copied().collect::<Vec<_>>(), vec!["x", "z"]);
    }
}
