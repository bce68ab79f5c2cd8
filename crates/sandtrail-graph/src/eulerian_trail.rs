//! Hierholzer walk over an arbitrary edge list.
//!
//! The edge list may be a multigraph: parallel edges (duplicates added by
//! eulerization) are distinct edges, so traversal state is tracked per
//! edge index rather than per endpoint pair. The walk is iterative with
//! an explicit stack; dense mazes produce trails far deeper than a
//! recursive DFS could follow.

use std::collections::HashMap;
use std::hash::Hash;

use tracing::debug;

/// Dense `usize` ids for arbitrary hashable keys, in first-seen order.
#[derive(Debug, Clone)]
pub(crate) struct VertexIds<K> {
    ids: HashMap<K, usize>,
    keys: Vec<K>,
}

impl<K: Clone + Eq + Hash> VertexIds<K> {
    pub(crate) fn new() -> Self {
        Self {
            ids: HashMap::new(),
            keys: Vec::new(),
        }
    }

    /// The id of `key`, assigning the next free id if it is new.
    pub(crate) fn intern(&mut self, key: &K) -> usize {
        if let Some(&id) = self.ids.get(key) {
            return id;
        }
        let id = self.keys.len();
        self.ids.insert(key.clone(), id);
        self.keys.push(key.clone());
        id
    }

    pub(crate) fn get(&self, key: &K) -> Option<usize> {
        self.ids.get(key).copied()
    }

    pub(crate) fn key(&self, id: usize) -> &K {
        &self.keys[id]
    }

    pub(crate) fn len(&self) -> usize {
        self.keys.len()
    }
}

/// Result of walking an edge list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EulerianTrail<K> {
    /// Visited vertices; consecutive entries are traversed edges.
    pub path: Vec<K>,
    /// Vertices with odd degree (undirected) or unequal in/out degree
    /// (directed).
    pub odd_vertex_count: usize,
    /// `true` if the edge list is non-empty and the odd count is 0 or 2.
    pub parity_ok: bool,
    /// `true` if the walk consumed every edge. With bad parity the walk
    /// can still consume every edge while jumping between vertices that
    /// share no edge; see [`is_complete`](Self::is_complete).
    pub covers_all_edges: bool,
}

impl<K> EulerianTrail<K> {
    /// Returns `true` if the walk is a genuine Eulerian path or circuit.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.parity_ok && self.covers_all_edges
    }
}

/// Walk `edges` with Hierholzer's algorithm.
///
/// The walk starts at the first odd-degree vertex (undirected) or the
/// first vertex with more outgoing than incoming edges (directed), and
/// otherwise at the first vertex of the list. Bad parity or a
/// disconnected edge list is never an error: the walk covers what it can
/// reach and the flags on the result report how complete it is.
#[must_use]
pub fn eulerian_trail<K: Clone + Eq + Hash>(edges: &[(K, K)], directed: bool) -> EulerianTrail<K> {
    let mut ids = VertexIds::new();
    let mut adjacency: Vec<Vec<(usize, usize)>> = Vec::new();
    let mut out_degree: Vec<usize> = Vec::new();
    let mut in_degree: Vec<usize> = Vec::new();

    for (edge, (a, b)) in edges.iter().enumerate() {
        let ia = ids.intern(a);
        let ib = ids.intern(b);
        adjacency.resize_with(ids.len(), Vec::new);
        out_degree.resize(ids.len(), 0);
        in_degree.resize(ids.len(), 0);

        adjacency[ia].push((ib, edge));
        if !directed {
            adjacency[ib].push((ia, edge));
        }
        out_degree[ia] += 1;
        in_degree[ib] += 1;
    }

    let unbalanced = |v: usize| {
        if directed {
            out_degree[v] != in_degree[v]
        } else {
            (out_degree[v] + in_degree[v]) % 2 == 1
        }
    };
    let odd_vertex_count = (0..ids.len()).filter(|&v| unbalanced(v)).count();

    if edges.is_empty() {
        return EulerianTrail {
            path: Vec::new(),
            odd_vertex_count,
            parity_ok: false,
            covers_all_edges: false,
        };
    }

    let start = (0..ids.len())
        .find(|&v| {
            if directed {
                out_degree[v] > in_degree[v]
            } else {
                unbalanced(v)
            }
        })
        .unwrap_or(0);

    let mut used = vec![false; edges.len()];
    let mut cursor = vec![0; ids.len()];
    let mut stack = vec![start];
    let mut walk = Vec::with_capacity(edges.len() + 1);

    while let Some(&current) = stack.last() {
        let incident = &adjacency[current];
        let mut next = None;
        while cursor[current] < incident.len() {
            let (to, edge) = incident[cursor[current]];
            cursor[current] += 1;
            if !used[edge] {
                used[edge] = true;
                next = Some(to);
                break;
            }
        }

        match next {
            Some(to) => stack.push(to),
            None => {
                walk.push(current);
                stack.pop();
            }
        }
    }
    walk.reverse();

    let covers_all_edges = walk.len() == edges.len() + 1;
    let parity_ok = odd_vertex_count == 0 || odd_vertex_count == 2;
    debug!(
        edges = edges.len(),
        vertices = ids.len(),
        odd_vertex_count,
        parity_ok,
        covers_all_edges,
        "walked eulerian trail"
    );

    EulerianTrail {
        path: walk.into_iter().map(|v| ids.key(v).clone()).collect(),
        odd_vertex_count,
        parity_ok,
        covers_all_edges,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::edge_key;

    /// Every consecutive pair of `path` consumes one matching undirected
    /// edge, and every edge is consumed.
    fn uses_each_edge_once<K: Clone + Ord + Hash>(path: &[K], edges: &[(K, K)]) -> bool {
        let mut remaining: HashMap<(K, K), usize> = HashMap::new();
        for (a, b) in edges {
            *remaining.entry(edge_key(a, b)).or_default() += 1;
        }
        for step in path.windows(2) {
            match remaining.get_mut(&edge_key(&step[0], &step[1])) {
                Some(count) if *count > 0 => *count -= 1,
                _ => return false,
            }
        }
        remaining.values().all(|&count| count == 0)
    }

    #[test]
    fn triangle_is_a_circuit() {
        let edges = [("A", "B"), ("B", "C"), ("C", "A")];
        let trail = eulerian_trail(&edges, false);
        assert_eq!(trail.path.len(), 4);
        assert_eq!(trail.path.first(), trail.path.last());
        assert_eq!(trail.odd_vertex_count, 0);
        assert!(trail.is_complete());
        assert!(uses_each_edge_once(&trail.path, &edges));
    }

    #[test]
    fn path_starts_at_odd_vertex() {
        let edges = [("B", "C"), ("A", "B")];
        let trail = eulerian_trail(&edges, false);
        assert_eq!(trail.path, vec!["C", "B", "A"]);
        assert_eq!(trail.odd_vertex_count, 2);
        assert!(trail.is_complete());
    }

    #[test]
    fn parallel_edges_are_distinct() {
        let edges = [("A", "B"), ("A", "B"), ("B", "C"), ("C", "A")];
        let trail = eulerian_trail(&edges, false);
        assert_eq!(trail.path.len(), 5);
        assert!(trail.covers_all_edges);
        assert!(uses_each_edge_once(&trail.path, &edges));
    }

    #[test]
    fn figure_eight_splices_sub_circuit() {
        // Two triangles sharing vertex C.
        let edges = [
            ("A", "B"),
            ("B", "C"),
            ("C", "A"),
            ("C", "D"),
            ("D", "E"),
            ("E", "C"),
        ];
        let trail = eulerian_trail(&edges, false);
        assert!(trail.is_complete());
        assert!(uses_each_edge_once(&trail.path, &edges));
    }

    #[test]
    fn bad_parity_returns_partial_walk() {
        // Star with three leaves: four odd vertices.
        let edges = [("hub", "a"), ("hub", "b"), ("hub", "c")];
        let trail = eulerian_trail(&edges, false);
        assert_eq!(trail.odd_vertex_count, 4);
        assert!(!trail.parity_ok);
        assert!(!trail.is_complete());
        assert_eq!(trail.path.len(), edges.len() + 1);
        assert!(!uses_each_edge_once(&trail.path, &edges));
    }

    #[test]
    fn disconnected_edges_are_not_covered() {
        let edges = [("A", "B"), ("C", "D")];
        let trail = eulerian_trail(&edges, false);
        assert_eq!(trail.path, vec!["A", "B"]);
        assert!(!trail.covers_all_edges);
    }

    #[test]
    fn empty_edge_list() {
        let trail = eulerian_trail::<u32>(&[], false);
        assert!(trail.path.is_empty());
        assert!(!trail.parity_ok);
        assert!(!trail.covers_all_edges);
    }

    #[test]
    fn self_loop_is_walked() {
        let edges = [("A", "A"), ("A", "B")];
        let trail = eulerian_trail(&edges, false);
        assert_eq!(trail.odd_vertex_count, 2);
        assert!(trail.covers_all_edges);
    }

    #[test]
    fn directed_follows_edge_direction() {
        let edges = [(2_u32, 3_u32), (1, 2), (3, 1), (1, 4)];
        let trail = eulerian_trail(&edges, true);
        assert_eq!(trail.path, vec![1, 2, 3, 1, 4]);
        assert_eq!(trail.odd_vertex_count, 2);
        assert!(trail.is_complete());
    }

    #[test]
    fn directed_cycle_starts_at_first_vertex() {
        let edges = [(1_u32, 2_u32), (2, 3), (3, 1)];
        let trail = eulerian_trail(&edges, true);
        assert_eq!(trail.path, vec![1, 2, 3, 1]);
    }

    #[test]
    fn long_chain_does_not_overflow_stack() {
        let edges: Vec<(u32, u32)> = (0..200_000).map(|i| (i, i + 1)).collect();
        let trail = eulerian_trail(&edges, false);
        assert_eq!(trail.path.len(), edges.len() + 1);
        assert!(trail.is_complete());
    }

    #[test]
    fn vertex_ids_are_dense_and_stable() {
        let mut ids = VertexIds::new();
        assert_eq!(ids.intern(&"x"), 0);
        assert_eq!(ids.intern(&"y"), 1);
        assert_eq!(ids.intern(&"x"), 0);
        assert_eq!(ids.get(&"y"), Some(1));
        assert_eq!(ids.get(&"z"), None);
        assert_eq!(*ids.key(1), "y");
        assert_eq!(ids.len(), 2);
    }
}
