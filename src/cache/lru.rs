use std::collections::HashMap;
use std::num::NonZeroUsize;

// ============================================================================
// Least-Recently-Used Eviction Cache
// ============================================================================
//
// Fixed-capacity map from string keys to values. Recency is tracked with a
// doubly-linked list threaded through a slot arena, and a hash index maps each
// key to its slot, so get/set/evict are O(1).
//
// head = most recently used, tail = next eviction victim.
//
// The arena never grows past `capacity`: once full, the victim's slot is
// reused for the incoming entry.
//
// ============================================================================

struct Node<V> {
    key: String,
    value: V,
    prev: Option<usize>,
    next: Option<usize>,
}

pub struct LruCache<V> {
    capacity: NonZeroUsize,
    index: HashMap<String, usize>,
    nodes: Vec<Node<V>>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl<V> LruCache<V> {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            capacity,
            index: HashMap::with_capacity(capacity.get()),
            nodes: Vec::with_capacity(capacity.get()),
            head: None,
            tail: None,
        }
    }

    /// Insert or replace `key`, making it the most recently used entry.
    ///
    /// Returns `true` if the key was already present. When the key is new and
    /// the cache is full, the least recently used entry is evicted first.
    pub fn set(&mut self, key: impl Into<String>, value: V) -> bool {
        let key = key.into();

        if let Some(&slot) = self.index.get(&key) {
            self.nodes[slot].value = value;
            self.move_to_front(slot);
            return true;
        }

        let slot = if self.nodes.len() == self.capacity.get() {
            self.evict_into(key.clone(), value)
        } else {
            self.nodes.push(Node {
                key: key.clone(),
                value,
                prev: None,
                next: None,
            });
            self.nodes.len() - 1
        };

        self.attach_front(slot);
        self.index.insert(key, slot);
        false
    }

    /// Look up `key`, promoting it to most recently used on a hit.
    /// A miss leaves the cache untouched.
    pub fn get(&mut self, key: &str) -> Option<&V> {
        let slot = *self.index.get(key)?;
        self.move_to_front(slot);
        Some(&self.nodes[slot].value)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Drop the tail entry and overwrite its slot with the new entry.
    fn evict_into(&mut self, key: String, value: V) -> usize {
        // Full cache with capacity >= 1 always has a tail.
        let victim = match self.tail {
            Some(slot) => slot,
            None => unreachable!("full cache without a tail"),
        };
        self.detach(victim);

        let node = &mut self.nodes[victim];
        self.index.remove(&node.key);
        node.key = key;
        node.value = value;
        victim
    }

    fn move_to_front(&mut self, slot: usize) {
        if self.head == Some(slot) {
            return;
        }
        self.detach(slot);
        self.attach_front(slot);
    }

    fn detach(&mut self, slot: usize) {
        let (prev, next) = (self.nodes[slot].prev, self.nodes[slot].next);

        match prev {
            Some(p) => self.nodes[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.nodes[n].prev = prev,
            None => self.tail = prev,
        }

        self.nodes[slot].prev = None;
        self.nodes[slot].next = None;
    }

    fn attach_front(&mut self, slot: usize) {
        self.nodes[slot].prev = None;
        self.nodes[slot].next = self.head;

        if let Some(old_head) = self.head {
            self.nodes[old_head].prev = Some(slot);
        }
        self.head = Some(slot);

        if self.tail.is_none() {
            self.tail = Some(slot);
        }
    }
}

// Inspection helpers that never touch recency; only the tests need them.
#[cfg(test)]
impl<V> LruCache<V> {
    /// Look up `key` without changing its recency.
    pub fn peek(&self, key: &str) -> Option<&V> {
        self.index.get(key).map(|&slot| &self.nodes[slot].value)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Keys from most to least recently used.
    pub fn keys(&self) -> Keys<'_, V> {
        Keys {
            cache: self,
            cursor: self.head,
        }
    }
}

#[cfg(test)]
pub struct Keys<'a, V> {
    cache: &'a LruCache<V>,
    cursor: Option<usize>,
}

#[cfg(test)]
impl<'a, V> Iterator for Keys<'a, V> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let node = &self.cache.nodes[self.cursor?];
        self.cursor = node.next;
        Some(node.key.as_str())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn cache<V>(capacity: usize) -> LruCache<V> {
        LruCache::new(NonZeroUsize::new(capacity).unwrap())
    }

    #[test]
    fn test_set_and_get() {
        let mut lru = cache(2);

        assert!(!lru.set("a", 1));
        assert_eq!(lru.get("a"), Some(&1));

        assert!(lru.set("a", 2));
        assert_eq!(lru.get("a"), Some(&2));
        assert_eq!(lru.len(), 1);
    }

    #[test]
    fn test_evicts_least_recently_set() {
        let mut lru = cache(2);
        lru.set("a", 1);
        lru.set("b", 2);
        lru.set("c", 3);

        assert_eq!(lru.get("a"), None);
        assert_eq!(lru.get("b"), Some(&2));
        assert_eq!(lru.get("c"), Some(&3));
        assert_eq!(lru.len(), 2);
    }

    #[test]
    fn test_get_promotes_entry() {
        let mut lru = cache(2);
        lru.set("a", 1);
        lru.set("b", 2);
        lru.get("a");
        lru.set("c", 3);

        assert!(!lru.contains("b"));
        assert_eq!(lru.get("a"), Some(&1));
        assert_eq!(lru.get("c"), Some(&3));
    }

    #[test]
    fn test_replacing_value_promotes_entry() {
        let mut lru = cache(2);
        lru.set("a", 1);
        lru.set("b", 2);
        lru.set("a", 10);
        lru.set("c", 3);

        assert!(!lru.contains("b"));
        assert_eq!(lru.peek("a"), Some(&10));
    }

    #[test]
    fn test_miss_has_no_side_effect() {
        let mut lru = cache(3);
        lru.set("a", 1);
        lru.set("b", 2);
        let before: Vec<String> = lru.keys().map(str::to_string).collect();

        assert_eq!(lru.get("x"), None);

        let after: Vec<String> = lru.keys().map(str::to_string).collect();
        assert_eq!(before, after);
        assert_eq!(lru.len(), 2);
    }

    #[test]
    fn test_peek_does_not_promote() {
        let mut lru = cache(2);
        lru.set("a", 1);
        lru.set("b", 2);
        assert_eq!(lru.peek("a"), Some(&1));
        lru.set("c", 3);

        assert!(!lru.contains("a"));
    }

    #[test]
    fn test_capacity_one() {
        let mut lru = cache(1);
        lru.set("a", 1);
        lru.set("b", 2);

        assert_eq!(lru.keys().collect::<Vec<_>>(), vec!["b"]);
        assert_eq!(lru.get("b"), Some(&2));
        assert_eq!(lru.capacity(), 1);
    }

    #[test]
    fn test_keys_in_recency_order() {
        let mut lru = cache(3);
        lru.set("a", 1);
        lru.set("b", 2);
        lru.set("c", 3);
        lru.get("a");

        assert_eq!(lru.keys().collect::<Vec<_>>(), vec!["a", "c", "b"]);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Set(u8),
        Get(u8),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u8..12).prop_map(Op::Set),
            (0u8..12).prop_map(Op::Get),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(500))]

        /// The cache always holds exactly the `capacity` most recently touched
        /// keys (touch = set, or get on a resident key), in recency order.
        #[test]
        fn prop_retains_most_recently_touched(
            capacity in 1usize..6,
            ops in proptest::collection::vec(op_strategy(), 0..64),
        ) {
            let mut lru = cache(capacity);
            // Reference model: most recent first.
            let mut model: Vec<String> = Vec::new();

            for op in ops {
                match op {
                    Op::Set(k) => {
                        let key = k.to_string();
                        let existed = model.contains(&key);
                        prop_assert_eq!(lru.set(key.clone(), k), existed);

                        model.retain(|m| m != &key);
                        model.insert(0, key);
                        model.truncate(capacity);
                    }
                    Op::Get(k) => {
                        let key = k.to_string();
                        let hit = lru.get(&key).copied();
                        if model.contains(&key) {
                            prop_assert_eq!(hit, Some(k));
                            model.retain(|m| m != &key);
                            model.insert(0, key);
                        } else {
                            prop_assert_eq!(hit, None);
                        }
                    }
                }

                let keys: Vec<String> = lru.keys().map(str::to_string).collect();
                prop_assert_eq!(&keys, &model);
                prop_assert!(lru.len() <= capacity);
            }
        }
    }
}
