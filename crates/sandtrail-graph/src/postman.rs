//! Route-inspection parity fix.
//!
//! A trail can only cover every edge of a connected edge list if at most
//! two vertices have odd degree. [`eulerize_edges`] pairs the odd
//! vertices and appends a copy of every edge on each pair's connecting
//! path, which makes every degree even. Retracing an already-drawn groove
//! is invisible in sand, so the duplicates cost time but not quality.
//!
//! The pairing is approximate. Up to [`MAX_ODD_VERTICES_FOR_EXACT`] odd
//! vertices, all pairwise shortest paths are computed and the cheapest
//! pairs are taken greedily. Above that, each unmatched vertex is paired
//! with whichever unmatched vertex a breadth-first search reaches first.

use std::collections::VecDeque;
use std::fmt::Debug;
use std::hash::Hash;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::eulerian_trail::VertexIds;

/// Largest odd-vertex count matched from exact pairwise shortest paths.
pub const MAX_ODD_VERTICES_FOR_EXACT: usize = 30;

/// How odd vertices were paired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchingStrategy {
    /// Cheapest-first over all pairwise shortest paths.
    Greedy,
    /// Breadth-first search from each unmatched vertex to the nearest
    /// unmatched vertex.
    NearestNeighbor,
}

impl std::fmt::Display for MatchingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Greedy => f.write_str("greedy"),
            Self::NearestNeighbor => f.write_str("nearest_neighbor"),
        }
    }
}

/// Two odd vertices paired with the path whose edges get duplicated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match<K> {
    /// First odd vertex of the pair.
    pub a: K,
    /// Its partner.
    pub b: K,
    /// `a ..= b`.
    pub path: Vec<K>,
    /// Hops along `path`.
    pub cost: usize,
}

/// An edge list with its parity fixed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eulerized<K> {
    /// The original edges, in order, followed by the duplicates.
    pub edges: Vec<(K, K)>,
    /// Odd-degree vertices of the original list, in first-appearance order.
    pub odd_vertices: Vec<K>,
    /// The chosen pairs, in the order their paths were duplicated.
    pub matching: Vec<Match<K>>,
    /// Number of duplicate edges appended.
    pub duplicate_count: usize,
    /// `None` when no matching was attempted.
    pub strategy: Option<MatchingStrategy>,
}

/// Vertices with odd degree in `edges`, in first-appearance order.
///
/// A self-loop adds two to its vertex's degree.
#[must_use]
pub fn odd_vertices<K: Clone + Eq + Hash>(edges: &[(K, K)]) -> Vec<K> {
    let mut ids = VertexIds::new();
    let mut degree: Vec<usize> = Vec::new();
    for (a, b) in edges {
        for key in [a, b] {
            let id = ids.intern(key);
            degree.resize(ids.len(), 0);
            degree[id] += 1;
        }
    }
    degree
        .iter()
        .enumerate()
        .filter(|&(_, d)| d % 2 == 1)
        .map(|(id, _)| ids.key(id).clone())
        .collect()
}

/// Fix the parity of `edges` using `shortest_path` for exact matching.
///
/// See [`eulerize_edges_with`]; the exact-matching ceiling is
/// [`MAX_ODD_VERTICES_FOR_EXACT`].
pub fn eulerize_edges<K, F>(edges: &[(K, K)], shortest_path: F) -> Eulerized<K>
where
    K: Clone + Eq + Hash + Debug,
    F: FnMut(&K, &K) -> Option<Vec<K>>,
{
    eulerize_edges_with(edges, shortest_path, MAX_ODD_VERTICES_FOR_EXACT)
}

/// Fix the parity of `edges` by duplicating paths between paired odd
/// vertices.
///
/// With at most `max_exact` odd vertices, `shortest_path(a, b)` is called
/// for every odd pair and must return `a ..= b` or `None` when `b` is
/// unreachable; unreachable pairs are never matched. With more, pairing
/// uses breadth-first search over `edges` itself and `shortest_path` is
/// not called.
///
/// Original edges are never removed or reordered. On a connected edge
/// list the result has no odd vertices. Vertices that cannot be paired
/// (their component has no other unmatched odd vertex) stay odd.
pub fn eulerize_edges_with<K, F>(
    edges: &[(K, K)],
    mut shortest_path: F,
    max_exact: usize,
) -> Eulerized<K>
where
    K: Clone + Eq + Hash + Debug,
    F: FnMut(&K, &K) -> Option<Vec<K>>,
{
    let odd = odd_vertices(edges);
    let mut result = Eulerized {
        edges: edges.to_vec(),
        odd_vertices: odd.clone(),
        matching: Vec::new(),
        duplicate_count: 0,
        strategy: None,
    };

    if odd.is_empty() {
        return result;
    }
    if odd.len() % 2 == 1 {
        warn!(odd = odd.len(), "odd number of odd vertices, leaving edges unchanged");
        return result;
    }

    let (strategy, matching) = if odd.len() <= max_exact {
        (
            MatchingStrategy::Greedy,
            greedy_matching(&odd, &mut shortest_path),
        )
    } else {
        (
            MatchingStrategy::NearestNeighbor,
            nearest_neighbor_matching(edges, &odd),
        )
    };

    for pair in &matching {
        for hop in pair.path.windows(2) {
            result.edges.push((hop[0].clone(), hop[1].clone()));
            result.duplicate_count += 1;
        }
    }

    let unmatched = odd.len() - 2 * matching.len();
    if unmatched > 0 {
        warn!(unmatched, "some odd vertices have no reachable partner");
    }
    debug!(
        odd = odd.len(),
        pairs = matching.len(),
        duplicates = result.duplicate_count,
        %strategy,
        "eulerized edge list"
    );

    result.strategy = Some(strategy);
    result.matching = matching;
    result
}

/// Cheapest-first pairing over all pairwise shortest paths.
///
/// Ties are broken by the pair's position in `odd`, so the result does
/// not depend on hash order.
fn greedy_matching<K, F>(odd: &[K], shortest_path: &mut F) -> Vec<Match<K>>
where
    K: Clone + Eq + Debug,
    F: FnMut(&K, &K) -> Option<Vec<K>>,
{
    let mut pairs: Vec<(usize, usize, usize, Vec<K>)> = Vec::new();
    for (i, a) in odd.iter().enumerate() {
        for (j, b) in odd.iter().enumerate().skip(i + 1) {
            match shortest_path(a, b) {
                Some(path) if path.first() == Some(a) && path.last() == Some(b) => {
                    pairs.push((path.len() - 1, i, j, path));
                }
                _ => trace!(?a, ?b, "no usable path between odd vertices"),
            }
        }
    }
    pairs.sort_unstable_by_key(|&(cost, i, j, _)| (cost, i, j));

    let mut matched = vec![false; odd.len()];
    let mut matching = Vec::with_capacity(odd.len() / 2);
    for (cost, i, j, path) in pairs {
        if matched[i] || matched[j] {
            continue;
        }
        matched[i] = true;
        matched[j] = true;
        matching.push(Match {
            a: odd[i].clone(),
            b: odd[j].clone(),
            path,
            cost,
        });
        if matching.len() * 2 == odd.len() {
            break;
        }
    }
    matching
}

/// Pair each unmatched odd vertex, in order, with the first unmatched odd
/// vertex a hop-count BFS over `edges` reaches.
fn nearest_neighbor_matching<K>(edges: &[(K, K)], odd: &[K]) -> Vec<Match<K>>
where
    K: Clone + Eq + Hash + Debug,
{
    let mut ids = VertexIds::new();
    let mut adjacency: Vec<Vec<usize>> = Vec::new();
    for (a, b) in edges {
        let ia = ids.intern(a);
        let ib = ids.intern(b);
        adjacency.resize_with(ids.len(), Vec::new);
        if ia != ib {
            adjacency[ia].push(ib);
            adjacency[ib].push(ia);
        }
    }

    let n = ids.len();
    let mut available = vec![false; n];
    let odd_ids: Vec<usize> = odd.iter().filter_map(|k| ids.get(k)).collect();
    for &v in &odd_ids {
        available[v] = true;
    }

    // `seen[v] == generation` marks v as visited by the current search,
    // so the buffers are reused without clearing.
    let mut seen = vec![0_usize; n];
    let mut parent = vec![0_usize; n];
    let mut generation = 0;
    let mut queue = VecDeque::new();
    let mut matching = Vec::with_capacity(odd_ids.len() / 2);

    for &source in &odd_ids {
        if !available[source] {
            continue;
        }
        available[source] = false;
        generation += 1;
        queue.clear();
        queue.push_back(source);
        seen[source] = generation;

        let mut partner = None;
        while let Some(v) = queue.pop_front() {
            if available[v] {
                partner = Some(v);
                break;
            }
            for &w in &adjacency[v] {
                if seen[w] != generation {
                    seen[w] = generation;
                    parent[w] = v;
                    queue.push_back(w);
                }
            }
        }

        let Some(target) = partner else {
            trace!(vertex = ?ids.key(source), "no unmatched odd vertex reachable");
            continue;
        };
        available[target] = false;

        let mut path = vec![target];
        let mut current = target;
        while current != source {
            current = parent[current];
            path.push(current);
        }
        path.reverse();

        matching.push(Match {
            a: ids.key(source).clone(),
            b: ids.key(target).clone(),
            cost: path.len() - 1,
            path: path.into_iter().map(|v| ids.key(v).clone()).collect(),
        });
    }
    matching
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::eulerian_trail::eulerian_trail;
    use crate::graph::Graph;

    fn graph_of(edges: &[(u32, u32)]) -> Graph<u32> {
        let mut graph = Graph::new();
        for &(a, b) in edges {
            graph.add_edge(a, b);
        }
        graph
    }

    /// A spine `0..n` with a one-edge tooth hanging off every spine vertex.
    fn comb(n: u32) -> Vec<(u32, u32)> {
        let mut edges: Vec<(u32, u32)> = (0..n - 1).map(|i| (i, i + 1)).collect();
        edges.extend((0..n).map(|i| (i, 1000 + i)));
        edges
    }

    #[test]
    fn path_is_eulerized() {
        let edges = [("A", "B"), ("B", "C")];
        let mut graph = Graph::from_path(["A", "B", "C"]);
        let result = eulerize_edges(&edges, |a, b| graph.shortest_key_path(a, b));

        assert_eq!(result.odd_vertices, vec!["A", "C"]);
        assert_eq!(result.duplicate_count, 2);
        assert_eq!(result.strategy, Some(MatchingStrategy::Greedy));
        assert_eq!(result.matching.len(), 1);
        assert_eq!(result.matching[0].path, vec!["A", "B", "C"]);
        assert_eq!(result.matching[0].cost, 2);
        assert_eq!(&result.edges[..2], &edges);

        let trail = eulerian_trail(&result.edges, false);
        assert_eq!(trail.path.len(), result.edges.len() + 1);
        assert!(trail.is_complete());
    }

    #[test]
    fn eulerian_cycle_is_unchanged() {
        let edges = [("A", "B"), ("B", "C"), ("C", "D"), ("D", "A")];
        let result = eulerize_edges(&edges, |_, _| None);
        assert_eq!(result.edges, edges.to_vec());
        assert_eq!(result.duplicate_count, 0);
        assert!(result.odd_vertices.is_empty());
        assert!(result.matching.is_empty());
        assert_eq!(result.strategy, None);
    }

    #[test]
    fn star_pairs_leaves_through_hub() {
        let edges = [(0_u32, 1_u32), (0, 2), (0, 3), (0, 4)];
        let mut graph = graph_of(&edges);
        let result = eulerize_edges(&edges, |a, b| graph.shortest_key_path(a, b));

        assert_eq!(result.odd_vertices, vec![1, 2, 3, 4]);
        assert_eq!(result.matching.len(), 2);
        assert_eq!((result.matching[0].a, result.matching[0].b), (1, 2));
        assert_eq!((result.matching[1].a, result.matching[1].b), (3, 4));
        assert_eq!(result.duplicate_count, 4);
        assert!(odd_vertices(&result.edges).is_empty());
    }

    #[test]
    fn greedy_takes_cheapest_pairs_first() {
        // An H: two vertical strokes 0-1-2 and 3-4-5 joined by a 1-4 rung.
        let edges = [(0_u32, 1_u32), (1, 2), (3, 4), (4, 5), (1, 4)];
        let mut graph = graph_of(&edges);
        let result = eulerize_edges(&edges, |a, b| graph.shortest_key_path(a, b));

        assert_eq!(result.odd_vertices, vec![0, 1, 2, 3, 4, 5]);
        let pairs: Vec<(u32, u32)> = result.matching.iter().map(|m| (m.a, m.b)).collect();
        assert_eq!(pairs, vec![(0, 1), (3, 4), (2, 5)]);
        assert_eq!(result.matching[2].path, vec![2, 1, 4, 5]);
        assert_eq!(result.duplicate_count, 5);
        assert!(odd_vertices(&result.edges).is_empty());
    }

    #[test]
    fn unreachable_pairs_are_skipped() {
        let edges = [(1_u32, 2_u32), (3, 4)];
        let mut graph = graph_of(&edges);
        let result = eulerize_edges(&edges, |a, b| graph.shortest_key_path(a, b));

        let pairs: Vec<(u32, u32)> = result.matching.iter().map(|m| (m.a, m.b)).collect();
        assert_eq!(pairs, vec![(1, 2), (3, 4)]);
        assert!(odd_vertices(&result.edges).is_empty());
    }

    #[test]
    fn malformed_paths_are_ignored() {
        let edges = [("A", "B"), ("B", "C")];
        let result = eulerize_edges(&edges, |_, _| Some(vec!["Z"]));
        assert!(result.matching.is_empty());
        assert_eq!(result.duplicate_count, 0);
        assert_eq!(result.strategy, Some(MatchingStrategy::Greedy));
    }

    #[test]
    fn large_odd_set_uses_nearest_neighbor() {
        let edges = comb(40);
        let odd = odd_vertices(&edges);
        assert!(odd.len() > MAX_ODD_VERTICES_FOR_EXACT);

        let mut calls = 0;
        let result = eulerize_edges(&edges, |_, _| {
            calls += 1;
            None
        });
        assert_eq!(calls, 0);
        assert_eq!(result.strategy, Some(MatchingStrategy::NearestNeighbor));
        assert_eq!(result.matching.len() * 2, odd.len());
        assert!(odd_vertices(&result.edges).is_empty());

        let trail = eulerian_trail(&result.edges, false);
        assert!(trail.is_complete());
    }

    #[test]
    fn nearest_neighbor_paths_are_real_hops() {
        let edges = comb(40);
        let result = eulerize_edges_with(&edges, |_, _| None, 0);
        let graph = graph_of(&edges);
        for pair in &result.matching {
            assert_eq!(pair.path.first(), Some(&pair.a));
            assert_eq!(pair.path.last(), Some(&pair.b));
            assert_eq!(pair.cost, pair.path.len() - 1);
            for hop in pair.path.windows(2) {
                assert!(graph.has_edge(&hop[0], &hop[1]));
            }
        }
    }

    #[test]
    fn exact_ceiling_is_configurable() {
        let edges = [(0_u32, 1_u32), (1, 2)];
        let result = eulerize_edges_with(&edges, |_, _| None, 0);
        assert_eq!(result.strategy, Some(MatchingStrategy::NearestNeighbor));
        assert_eq!(result.matching[0].path, vec![0, 1, 2]);
    }

    #[test]
    fn nearest_neighbor_pairs_within_each_component() {
        // Star with three leaves plus a disjoint edge.
        let edges = [(0_u32, 1_u32), (0, 2), (0, 3), (5, 6)];
        let result = eulerize_edges_with(&edges, |_, _| None, 0);
        assert_eq!(result.matching.len(), 3);
        assert!(odd_vertices(&result.edges).is_empty());
    }

    #[test]
    fn odd_vertices_in_first_appearance_order() {
        let edges = [("C", "B"), ("B", "A"), ("B", "D")];
        assert_eq!(odd_vertices(&edges), vec!["C", "B", "A", "D"]);
        assert!(odd_vertices(&[("A", "A")]).is_empty());
        assert!(odd_vertices::<u32>(&[]).is_empty());
    }

    #[test]
    fn strategy_serializes_snake_case() {
        let json = serde_json::to_string(&MatchingStrategy::NearestNeighbor).unwrap();
        assert_eq!(json, r#""nearest_neighbor""#);
        assert_eq!(MatchingStrategy::Greedy.to_string(), "greedy");
    }
}
