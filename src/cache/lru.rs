//! Fixed-capacity least-recently-used cache.
//!
//! Entries live in a slot arena and are threaded onto a doubly-linked
//! recency list through `prev`/`next` indices: `head` is the most recently
//! used entry, `tail` the least recently used one. Promotion, insertion and
//! eviction are all O(1).
//!
//! Values are usually handles to backend objects, so the cache never drops
//! an evicted value silently: [`LruCache::put`] and [`LruCache::clear`] take a
//! release callback that receives every value the cache gives up.
//!
//! # Example
//!
//! ```
//! use framegraph::cache::LruCache;
//!
//! let mut released = Vec::new();
//! let mut cache = LruCache::new(2);
//! cache.put(1, "a", |v| released.push(v));
//! cache.put(2, "b", |v| released.push(v));
//! cache.get(&1);
//! cache.put(3, "c", |v| released.push(v));
//!
//! assert_eq!(released, vec!["b"]);
//! assert_eq!(cache.keys().copied().collect::<Vec<_>>(), vec![3, 1]);
//! ```

use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug)]
struct Slot<K, V> {
    key: K,
    value: V,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Bounded cache ordered by recency of use.
#[derive(Debug)]
pub struct LruCache<K, V> {
    capacity: usize,
    map: HashMap<K, usize>,
    slots: Vec<Option<Slot<K, V>>>,
    /// Vacant slot indices available for reuse.
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl<K: Eq + Hash + Clone, V> LruCache<K, V> {
    /// Create an empty cache holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            map: HashMap::with_capacity(capacity),
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            head: None,
            tail: None,
        }
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of entries currently cached.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Whether `key` is cached. Does not change its recency.
    pub fn contains(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    /// Insert or update `key`, making it the most recently used entry.
    ///
    /// If the key is already present its value is replaced and the previous
    /// value is returned to the caller; `release` is not invoked for it.
    /// Otherwise, when the cache is full, the least recently used entry is
    /// evicted and handed to `release` before the new entry is inserted.
    ///
    /// # Panics
    ///
    /// Panics if the cache was created with a capacity of zero.
    pub fn put(&mut self, key: K, value: V, release: impl FnOnce(V)) -> Option<V> {
        assert!(self.capacity > 0, "LruCache capacity must be greater than zero");

        if let Some(&index) = self.map.get(&key) {
            let old = std::mem::replace(&mut self.slot_mut(index).value, value);
            self.promote(index);
            return Some(old);
        }

        if self.map.len() == self.capacity {
            if let Some(evicted) = self.pop_tail() {
                release(evicted);
            }
        }

        let slot = Slot {
            key: key.clone(),
            value,
            prev: None,
            next: None,
        };
        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index] = Some(slot);
                index
            }
            None => {
                self.slots.push(Some(slot));
                self.slots.len() - 1
            }
        };
        self.attach_front(index);
        self.map.insert(key, index);
        None
    }

    /// Look up `key`, promoting it to most recently used on a hit.
    pub fn get(&mut self, key: &K) -> Option<&mut V> {
        let index = *self.map.get(key)?;
        self.promote(index);
        Some(&mut self.slot_mut(index).value)
    }

    /// Look up `key` without touching the recency order.
    pub fn peek(&self, key: &K) -> Option<&V> {
        let index = *self.map.get(key)?;
        self.slots[index].as_ref().map(|slot| &slot.value)
    }

    /// Remove `key` and hand its value back to the caller.
    ///
    /// Unlike eviction, no release callback runs: the caller takes ownership.
    pub fn pop(&mut self, key: &K) -> Option<V> {
        let index = self.map.remove(key)?;
        self.detach(index);
        self.take_slot(index).map(|slot| slot.value)
    }

    /// Release every entry, most recently used first, and empty the cache.
    pub fn clear(&mut self, mut release: impl FnMut(V)) {
        let mut cursor = self.head;
        while let Some(index) = cursor {
            let Some(slot) = self.slots[index].take() else {
                break;
            };
            cursor = slot.next;
            release(slot.value);
        }
        self.map.clear();
        self.slots.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
    }

    /// Iterate over entries from most to least recently used.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            cache: self,
            cursor: self.head,
        }
    }

    /// Keys from most to least recently used.
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(key, _)| key)
    }

    fn slot(&self, index: usize) -> &Slot<K, V> {
        self.slots[index]
            .as_ref()
            .expect("LruCache list points at a vacant slot")
    }

    fn slot_mut(&mut self, index: usize) -> &mut Slot<K, V> {
        self.slots[index]
            .as_mut()
            .expect("LruCache list points at a vacant slot")
    }

    fn take_slot(&mut self, index: usize) -> Option<Slot<K, V>> {
        let slot = self.slots[index].take();
        if slot.is_some() {
            self.free.push(index);
        }
        slot
    }

    fn pop_tail(&mut self) -> Option<V> {
        let index = self.tail?;
        self.detach(index);
        let slot = self.take_slot(index)?;
        self.map.remove(&slot.key);
        Some(slot.value)
    }

    fn promote(&mut self, index: usize) {
        if self.head == Some(index) {
            return;
        }
        self.detach(index);
        self.attach_front(index);
    }

    /// Unlink `index` from the recency list, fixing up `head` and `tail`.
    fn detach(&mut self, index: usize) {
        let (prev, next) = {
            let slot = self.slot(index);
            (slot.prev, slot.next)
        };

        match prev {
            Some(p) => self.slot_mut(p).next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slot_mut(n).prev = prev,
            None => self.tail = prev,
        }

        let slot = self.slot_mut(index);
        slot.prev = None;
        slot.next = None;
    }

    fn attach_front(&mut self, index: usize) {
        let old_head = self.head;
        {
            let slot = self.slot_mut(index);
            slot.prev = None;
            slot.next = old_head;
        }
        match old_head {
            Some(h) => self.slot_mut(h).prev = Some(index),
            None => self.tail = Some(index),
        }
        self.head = Some(index);
    }
}

/// Iterator over cache entries in recency order.
pub struct Iter<'a, K, V> {
    cache: &'a LruCache<K, V>,
    cursor: Option<usize>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.cursor?;
        let slot = self.cache.slots[index].as_ref()?;
        self.cursor = slot.next;
        Some((&slot.key, &slot.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(cache: &LruCache<u32, u32>) -> Vec<u32> {
        cache.keys().copied().collect()
    }

    #[test]
    fn test_eviction_order() {
        let mut released = Vec::new();
        let mut cache = LruCache::new(3);

        cache.put(1, 10, |v| released.push(v));
        cache.put(2, 20, |v| released.push(v));
        cache.put(3, 30, |v| released.push(v));
        assert_eq!(cache.len(), 3);
        assert!(released.is_empty());

        cache.put(4, 40, |v| released.push(v));
        assert_eq!(released, vec![10]);
        assert!(!cache.contains(&1));

        assert_eq!(cache.get(&2).copied(), Some(20));
        cache.put(5, 50, |v| released.push(v));
        assert_eq!(released, vec![10, 30]);
        assert!(cache.contains(&4));
        assert_eq!(keys(&cache), vec![5, 2, 4]);
    }

    #[test]
    fn test_promote_from_tail_updates_tail() {
        let mut released = Vec::new();
        let mut cache = LruCache::new(3);
        cache.put(1, 10, |v| released.push(v));
        cache.put(2, 20, |v| released.push(v));
        cache.put(3, 30, |v| released.push(v));
        assert_eq!(keys(&cache), vec![3, 2, 1]);

        cache.get(&1);
        assert_eq!(keys(&cache), vec![1, 3, 2]);

        cache.put(4, 40, |v| released.push(v));
        assert_eq!(released, vec![20]);
        assert_eq!(keys(&cache), vec![4, 1, 3]);
    }

    #[test]
    fn test_promote_from_middle() {
        let mut cache = LruCache::new(3);
        cache.put(1, 10, |_| {});
        cache.put(2, 20, |_| {});
        cache.put(3, 30, |_| {});

        cache.get(&2);
        assert_eq!(keys(&cache), vec![2, 3, 1]);

        let mut released = Vec::new();
        cache.put(4, 40, |v| released.push(v));
        cache.put(5, 50, |v| released.push(v));
        assert_eq!(released, vec![10, 30]);
        assert_eq!(keys(&cache), vec![5, 4, 2]);
    }

    #[test]
    fn test_capacity_one() {
        let mut released = Vec::new();
        let mut cache = LruCache::new(1);
        cache.put(1, 10, |v| released.push(v));
        cache.put(2, 20, |v| released.push(v));

        assert_eq!(released, vec![10]);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.peek(&2), Some(&20));
    }

    #[test]
    #[should_panic(expected = "capacity must be greater than zero")]
    fn test_capacity_zero_put_panics() {
        let mut cache = LruCache::new(0);
        cache.put(1, 10, |_| {});
    }

    #[test]
    fn test_put_existing_replaces_without_release() {
        let mut released = Vec::new();
        let mut cache = LruCache::new(2);
        cache.put(1, 10, |v| released.push(v));
        cache.put(2, 20, |v| released.push(v));

        let old = cache.put(1, 11, |v| released.push(v));
        assert_eq!(old, Some(10));
        assert!(released.is_empty());
        assert_eq!(cache.len(), 2);
        assert_eq!(keys(&cache), vec![1, 2]);
        assert_eq!(cache.peek(&1), Some(&11));
    }

    #[test]
    fn test_get_miss_has_no_side_effects() {
        let mut cache = LruCache::new(2);
        cache.put(1, 10, |_| {});
        cache.put(2, 20, |_| {});

        assert!(cache.get(&3).is_none());
        assert_eq!(keys(&cache), vec![2, 1]);
    }

    #[test]
    fn test_peek_does_not_promote() {
        let mut cache = LruCache::new(2);
        cache.put(1, 10, |_| {});
        cache.put(2, 20, |_| {});

        assert_eq!(cache.peek(&1), Some(&10));
        assert_eq!(keys(&cache), vec![2, 1]);
    }

    #[test]
    fn test_pop_skips_release() {
        let mut released = Vec::new();
        let mut cache = LruCache::new(3);
        cache.put(1, 10, |v| released.push(v));
        cache.put(2, 20, |v| released.push(v));
        cache.put(3, 30, |v| released.push(v));

        assert_eq!(cache.pop(&2), Some(20));
        assert_eq!(cache.pop(&2), None);
        assert!(released.is_empty());
        assert_eq!(keys(&cache), vec![3, 1]);

        // Popping the tail must leave a consistent list.
        assert_eq!(cache.pop(&1), Some(10));
        cache.put(4, 40, |v| released.push(v));
        cache.put(5, 50, |v| released.push(v));
        assert!(released.is_empty());
        cache.put(6, 60, |v| released.push(v));
        assert_eq!(released, vec![30]);
    }

    #[test]
    fn test_clear_releases_in_mru_order() {
        let mut cache = LruCache::new(3);
        cache.put(1, 10, |_| {});
        cache.put(2, 20, |_| {});
        cache.put(3, 30, |_| {});
        cache.get(&1);

        let mut released = Vec::new();
        cache.clear(|v| released.push(v));
        assert_eq!(released, vec![10, 30, 20]);
        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), 3);
    }

    #[test]
    fn test_clear_then_repopulate_behaves_like_fresh() {
        let mut cache = LruCache::new(2);
        cache.put(1, 10, |_| {});
        cache.put(2, 20, |_| {});
        cache.clear(|_| {});

        let mut released = Vec::new();
        cache.put(3, 30, |v| released.push(v));
        cache.put(4, 40, |v| released.push(v));
        cache.put(5, 50, |v| released.push(v));

        assert_eq!(released, vec![30]);
        assert_eq!(keys(&cache), vec![5, 4]);
        assert!(cache.get(&1).is_none());
    }

    #[test]
    fn test_slots_are_reused() {
        let mut cache = LruCache::new(2);
        for i in 0..100u32 {
            cache.put(i, i * 10, |_| {});
        }
        assert_eq!(cache.len(), 2);
        assert!(cache.slots.len() <= 2);
        assert_eq!(keys(&cache), vec![99, 98]);
    }
}
