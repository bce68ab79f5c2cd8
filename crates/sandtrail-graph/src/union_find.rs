//! Keyed disjoint-set forest.
//!
//! Unlike `petgraph::unionfind::UnionFind`, which is indexed by dense
//! integers fixed at construction, this variant registers arbitrary
//! hashable keys on demand. Component bridging uses it over component
//! ids; callers doing Kruskal-style cycle detection rely on the boolean
//! returned by [`UnionFind::union`].

use std::collections::HashMap;
use std::hash::Hash;

/// Disjoint-set with path compression and union by rank.
#[derive(Debug, Clone)]
pub struct UnionFind<K> {
    parent: HashMap<K, K>,
    rank: HashMap<K, u32>,
}

impl<K: Clone + Eq + Hash> UnionFind<K> {
    /// Create an empty forest.
    #[must_use]
    pub fn new() -> Self {
        Self {
            parent: HashMap::new(),
            rank: HashMap::new(),
        }
    }

    /// Register `key` as a singleton set. No-op if already registered.
    pub fn make_set(&mut self, key: K) {
        if !self.parent.contains_key(&key) {
            self.parent.insert(key.clone(), key.clone());
            self.rank.insert(key, 0);
        }
    }

    /// Returns `true` if `key` has been registered.
    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.parent.contains_key(key)
    }

    /// Number of registered keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    /// Returns `true` if no keys are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Find the root of the set containing `key`, compressing the path.
    ///
    /// Returns `None` if `key` was never registered.
    pub fn find(&mut self, key: &K) -> Option<K> {
        let mut root = self.parent.get(key)?.clone();
        let mut walked = vec![key.clone()];
        loop {
            let next = self.parent.get(&root)?;
            if *next == root {
                break;
            }
            walked.push(root.clone());
            root = next.clone();
        }

        // Point every node on the walked path straight at the root.
        for node in walked {
            self.parent.insert(node, root.clone());
        }
        Some(root)
    }

    /// Merge the sets containing `a` and `b`.
    ///
    /// Unregistered keys are registered first. Returns `true` if two
    /// distinct sets were merged and `false` if `a` and `b` were already
    /// in the same set.
    pub fn union(&mut self, a: &K, b: &K) -> bool {
        self.make_set(a.clone());
        self.make_set(b.clone());

        let (Some(root_a), Some(root_b)) = (self.find(a), self.find(b)) else {
            return false;
        };
        if root_a == root_b {
            return false;
        }

        let rank_a = self.rank.get(&root_a).copied().unwrap_or(0);
        let rank_b = self.rank.get(&root_b).copied().unwrap_or(0);
        match rank_a.cmp(&rank_b) {
            std::cmp::Ordering::Less => {
                self.parent.insert(root_a, root_b);
            }
            std::cmp::Ordering::Greater => {
                self.parent.insert(root_b, root_a);
            }
            std::cmp::Ordering::Equal => {
                self.parent.insert(root_b, root_a.clone());
                self.rank.insert(root_a, rank_a + 1);
            }
        }
        true
    }
}

impl<K: Clone + Eq + Hash> Default for UnionFind<K> {
    fn default() -> Self {
        Self::new()
    }
}
