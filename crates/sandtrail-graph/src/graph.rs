//! Weighted undirected graph over keyed nodes.
//!
//! Pattern generators feed endpoints and segments into a [`Graph`]; the
//! graph deduplicates nodes by key and edges by their unordered key pair,
//! answers shortest-path queries (memoised per instance), and partitions
//! or bridges connected components before the trail is walked.
//!
//! Storage is a `petgraph` [`UnGraph`] holding the original node payloads
//! and edge weights, plus a key → [`NodeIndex`] map. Nodes are never
//! removed, so node indices stay dense and double as vector offsets in
//! the search routines below.

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use tracing::{debug, trace, warn};

use crate::priority_queue::PriorityQueue;
use crate::types::{GraphNode, TrailError};
use crate::union_find::UnionFind;

/// Canonical key of the unordered edge between `a` and `b`.
///
/// `edge_key(a, b) == edge_key(b, a)` for all keys.
#[must_use]
pub fn edge_key<K: Ord + Clone>(a: &K, b: &K) -> (K, K) {
    if a <= b {
        (a.clone(), b.clone())
    } else {
        (b.clone(), a.clone())
    }
}

/// One adjacency entry: the node on the far side of an edge and the
/// edge's weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor<'a, N> {
    /// The adjacent node.
    pub node: &'a N,
    /// Weight of the connecting edge.
    pub weight: f64,
}

/// Weighted undirected graph with a symmetric shortest-path cache.
///
/// One instance is built per pattern, queried, walked and dropped. Every
/// topology change (a new node or a new edge) clears the path cache.
#[derive(Debug, Clone)]
pub struct Graph<N: GraphNode> {
    graph: UnGraph<N, f64>,
    index: HashMap<N::Key, NodeIndex>,
    edge_keys: HashSet<(N::Key, N::Key)>,
    path_cache: HashMap<(N::Key, N::Key), Vec<NodeIndex>>,
}

impl<N: GraphNode> Graph<N> {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            graph: UnGraph::default(),
            index: HashMap::new(),
            edge_keys: HashSet::new(),
            path_cache: HashMap::new(),
        }
    }

    /// Build a path graph linking each node to the next.
    #[must_use]
    pub fn from_path(nodes: impl IntoIterator<Item = N>) -> Self {
        let mut graph = Self::new();
        let mut previous: Option<N> = None;
        for node in nodes {
            match previous.take() {
                Some(prev) => {
                    graph.add_edge(prev, node.clone());
                }
                None => {
                    graph.add_node(node.clone());
                }
            }
            previous = Some(node);
        }
        graph
    }

    /// Number of distinct nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of distinct edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Returns `true` if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Returns `true` if a node with `key` exists.
    #[must_use]
    pub fn contains_node(&self, key: &N::Key) -> bool {
        self.index.contains_key(key)
    }

    /// The payload stored for `key`.
    #[must_use]
    pub fn get_node(&self, key: &N::Key) -> Option<&N> {
        self.index.get(key).map(|&ix| &self.graph[ix])
    }

    /// The first node, in insertion order, matching `predicate`.
    pub fn find_node(&self, mut predicate: impl FnMut(&N) -> bool) -> Option<&N> {
        self.graph.node_weights().find(|node| predicate(node))
    }

    /// All node payloads in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &N> {
        self.graph.node_weights()
    }

    /// All edges as key pairs, in insertion order and orientation.
    #[must_use]
    pub fn edges(&self) -> Vec<(N::Key, N::Key)> {
        self.graph
            .edge_references()
            .map(|e| (self.graph[e.source()].key(), self.graph[e.target()].key()))
            .collect()
    }

    /// Insert `node` unless a node with the same key exists.
    ///
    /// Returns `true` if the node was new. The first payload inserted for
    /// a key is the one kept.
    pub fn add_node(&mut self, node: N) -> bool {
        let before = self.graph.node_count();
        self.ensure_node(node);
        self.graph.node_count() > before
    }

    /// Insert an edge of weight `1.0` between `a` and `b`.
    ///
    /// See [`add_weighted_edge`](Self::add_weighted_edge).
    pub fn add_edge(&mut self, a: N, b: N) -> bool {
        self.add_weighted_edge(a, b, 1.0)
    }

    /// Insert an undirected edge between `a` and `b`, registering either
    /// endpoint that is not yet present.
    ///
    /// Returns `true` if the edge was new. Edges are unordered, so adding
    /// `b`–`a` after `a`–`b` is a no-op. Self-loops are ignored (their
    /// endpoint is still registered). Negative or non-finite weights are
    /// replaced by `1.0`.
    pub fn add_weighted_edge(&mut self, a: N, b: N, weight: f64) -> bool {
        let ia = self.ensure_node(a);
        let ib = self.ensure_node(b);
        self.insert_edge(ia, ib, weight)
    }

    /// Returns `true` if an edge joins `a` and `b`, in either order.
    #[must_use]
    pub fn has_edge(&self, a: &N::Key, b: &N::Key) -> bool {
        self.edge_keys.contains(&edge_key(a, b))
    }

    /// Nodes adjacent to `key`, with the connecting edge weights.
    ///
    /// Unknown keys have no neighbours.
    #[must_use]
    pub fn neighbors(&self, key: &N::Key) -> Vec<Neighbor<'_, N>> {
        self.index.get(key).map_or_else(Vec::new, |&ix| {
            self.graph
                .edges(ix)
                .map(|e| Neighbor {
                    node: &self.graph[e.target()],
                    weight: *e.weight(),
                })
                .collect()
        })
    }

    // -----------------------------------------------------------------------
    // Shortest paths
    // -----------------------------------------------------------------------

    /// Weighted shortest path from `start` to `end`, as node payloads.
    ///
    /// Results are memoised in both directions; every call returns a
    /// freshly allocated vector, never a view into the cache.
    ///
    /// # Errors
    ///
    /// Returns [`TrailError::UnknownNode`] if either key is absent and
    /// [`TrailError::Unreachable`] if no path connects them.
    pub fn dijkstra_shortest_path(
        &mut self,
        start: &N::Key,
        end: &N::Key,
    ) -> Result<Vec<N>, TrailError> {
        let path = self.shortest_index_path(start, end)?;
        Ok(self.payloads(&path))
    }

    /// Weighted shortest path from `start` to `end`, as keys.
    ///
    /// Shares the cache with [`dijkstra_shortest_path`](Self::dijkstra_shortest_path).
    /// Returns `None` when either key is unknown or the endpoints are
    /// disconnected.
    pub fn shortest_key_path(&mut self, start: &N::Key, end: &N::Key) -> Option<Vec<N::Key>> {
        match self.shortest_index_path(start, end) {
            Ok(path) => Some(path.iter().map(|&ix| self.graph[ix].key()).collect()),
            Err(err) => {
                debug!(%err, "shortest path unavailable");
                None
            }
        }
    }

    /// Fewest-hops path from `start` to `end`, ignoring weights.
    ///
    /// Not cached: a hop-count path is generally not the weighted shortest
    /// path, so it must not be served from the Dijkstra cache.
    ///
    /// # Errors
    ///
    /// Returns [`TrailError::UnknownNode`] if either key is absent and
    /// [`TrailError::Unreachable`] if no path connects them.
    pub fn bfs_shortest_path(&self, start: &N::Key, end: &N::Key) -> Result<Vec<N>, TrailError> {
        let from = self.node_index(start)?;
        let to = self.node_index(end)?;

        let mut prev: Vec<Option<NodeIndex>> = vec![None; self.graph.node_count()];
        let mut seen = vec![false; self.graph.node_count()];
        let mut queue = VecDeque::from([from]);
        seen[from.index()] = true;

        while let Some(current) = queue.pop_front() {
            if current == to {
                break;
            }
            for next in self.graph.neighbors(current) {
                if !seen[next.index()] {
                    seen[next.index()] = true;
                    prev[next.index()] = Some(current);
                    queue.push_back(next);
                }
            }
        }

        let path = backtrace(&prev, from, to).ok_or_else(|| TrailError::unreachable(start, end))?;
        Ok(self.payloads(&path))
    }

    /// Drop every memoised path.
    pub fn clear_cached_paths(&mut self) {
        self.path_cache.clear();
    }

    /// The memoised path from `start` to `end`, if one was computed since
    /// the last topology change.
    #[must_use]
    pub fn cached_shortest_path(&self, start: &N::Key, end: &N::Key) -> Option<Vec<N>> {
        self.path_cache
            .get(&(start.clone(), end.clone()))
            .map(|path| self.payloads(path))
    }

    /// Number of memoised directed paths (two per computed pair).
    #[must_use]
    pub fn cached_path_count(&self) -> usize {
        self.path_cache.len()
    }

    /// Memoise `path` for `start -> end` and its reverse for `end -> start`.
    fn cache_shortest_path(&mut self, start: &N::Key, end: &N::Key, path: &[NodeIndex]) {
        let mut reversed = path.to_vec();
        reversed.reverse();
        self.path_cache
            .insert((start.clone(), end.clone()), path.to_vec());
        self.path_cache.insert((end.clone(), start.clone()), reversed);
    }

    fn shortest_index_path(
        &mut self,
        start: &N::Key,
        end: &N::Key,
    ) -> Result<Vec<NodeIndex>, TrailError> {
        let from = self.node_index(start)?;
        let to = self.node_index(end)?;

        if let Some(cached) = self.path_cache.get(&(start.clone(), end.clone())) {
            return Ok(cached.clone());
        }

        let path = self
            .dijkstra(from, to)
            .ok_or_else(|| TrailError::unreachable(start, end))?;
        self.cache_shortest_path(start, end, &path);
        Ok(path)
    }

    /// Dijkstra from `from`, stopping once `to` is settled.
    fn dijkstra(&self, from: NodeIndex, to: NodeIndex) -> Option<Vec<NodeIndex>> {
        let n = self.graph.node_count();
        let mut dist = vec![f64::INFINITY; n];
        let mut prev: Vec<Option<NodeIndex>> = vec![None; n];
        let mut settled = vec![false; n];
        let mut queue = PriorityQueue::new();

        dist[from.index()] = 0.0;
        queue.enqueue(from, 0.0);

        while let Some((current, cost)) = queue.dequeue() {
            if settled[current.index()] {
                continue;
            }
            settled[current.index()] = true;
            if current == to {
                break;
            }
            for edge in self.graph.edges(current) {
                let next = edge.target();
                let candidate = cost + *edge.weight();
                if candidate < dist[next.index()] {
                    dist[next.index()] = candidate;
                    prev[next.index()] = Some(current);
                    queue.enqueue(next, candidate);
                }
            }
        }

        if !settled[to.index()] {
            return None;
        }
        backtrace(&prev, from, to)
    }

    // -----------------------------------------------------------------------
    // Components
    // -----------------------------------------------------------------------

    /// Partition all nodes into maximal connected subsets.
    ///
    /// Components are listed in order of their first node's insertion.
    #[must_use]
    pub fn find_components(&self) -> Vec<Vec<N::Key>> {
        self.component_indices()
            .into_iter()
            .map(|component| {
                component
                    .into_iter()
                    .map(|ix| self.graph[ix].key())
                    .collect()
            })
            .collect()
    }

    /// Connect every component using a caller-supplied distance.
    ///
    /// For each pair of components the closest node pair under `distance`
    /// is a candidate bridge; candidates are accepted shortest first while
    /// they join two components not yet connected (Kruskal over
    /// components). Each bridge's weight is its distance. Pairs whose
    /// distance is `NaN` are never bridged.
    ///
    /// This is quadratic in the node count; positioned nodes should use
    /// [`connect_components`](Self::connect_components) instead.
    ///
    /// Returns the number of bridges inserted.
    pub fn connect_components_by(&mut self, distance: impl Fn(&N, &N) -> f64) -> usize {
        let components = self.component_indices();
        if components.len() <= 1 {
            return 0;
        }

        let mut bridges: Vec<(f64, usize, usize, NodeIndex, NodeIndex)> = Vec::new();
        for (i, first) in components.iter().enumerate() {
            for (j, second) in components.iter().enumerate().skip(i + 1) {
                let mut best: Option<(f64, NodeIndex, NodeIndex)> = None;
                for &a in first {
                    for &b in second {
                        let d = distance(&self.graph[a], &self.graph[b]);
                        if d.is_nan() {
                            continue;
                        }
                        if best.is_none_or(|(best_d, _, _)| d < best_d) {
                            best = Some((d, a, b));
                        }
                    }
                }
                if let Some((d, a, b)) = best {
                    bridges.push((d, i, j, a, b));
                }
            }
        }

        bridges.sort_by(|x, y| x.0.total_cmp(&y.0));

        let mut uf = UnionFind::new();
        let mut added = 0;
        for (d, i, j, a, b) in bridges {
            if uf.union(&i, &j) && self.insert_edge(a, b, d) {
                added += 1;
            }
        }

        debug!(
            components = components.len(),
            bridges = added,
            "connected components by distance function"
        );
        added
    }

    /// Components as node indices, each in DFS discovery order.
    pub(crate) fn component_indices(&self) -> Vec<Vec<NodeIndex>> {
        let mut visited = vec![false; self.graph.node_count()];
        let mut components = Vec::new();

        for root in self.graph.node_indices() {
            if visited[root.index()] {
                continue;
            }
            let mut component = Vec::new();
            let mut stack = vec![root];
            while let Some(current) = stack.pop() {
                if visited[current.index()] {
                    continue;
                }
                visited[current.index()] = true;
                component.push(current);
                stack.extend(
                    self.graph
                        .neighbors(current)
                        .filter(|next| !visited[next.index()]),
                );
            }
            components.push(component);
        }

        components
    }

    /// Add an edge between two existing nodes.
    pub(crate) fn insert_edge(&mut self, a: NodeIndex, b: NodeIndex, weight: f64) -> bool {
        let ka = self.graph[a].key();
        let kb = self.graph[b].key();
        if ka == kb {
            trace!(key = ?ka, "ignoring self-loop");
            return false;
        }
        if !self.edge_keys.insert(edge_key(&ka, &kb)) {
            return false;
        }

        let weight = if weight.is_finite() && weight >= 0.0 {
            weight
        } else {
            warn!(weight, "replacing invalid edge weight with 1.0");
            1.0
        };
        self.graph.add_edge(a, b, weight);
        self.clear_cached_paths();
        true
    }

    fn ensure_node(&mut self, node: N) -> NodeIndex {
        let key = node.key();
        if let Some(&ix) = self.index.get(&key) {
            return ix;
        }
        let ix = self.graph.add_node(node);
        self.index.insert(key, ix);
        self.clear_cached_paths();
        ix
    }

    fn node_index(&self, key: &N::Key) -> Result<NodeIndex, TrailError> {
        self.index
            .get(key)
            .copied()
            .ok_or_else(|| TrailError::unknown_node(key))
    }

    fn payloads(&self, path: &[NodeIndex]) -> Vec<N> {
        path.iter().map(|&ix| self.graph[ix].clone()).collect()
    }
}

impl<N: GraphNode> Default for Graph<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Walk predecessor links back from `to`, returning `from ..= to`.
fn backtrace(prev: &[Option<NodeIndex>], from: NodeIndex, to: NodeIndex) -> Option<Vec<NodeIndex>> {
    let mut path = vec![to];
    let mut current = to;
    while current != from {
        current = prev[current.index()]?;
        path.push(current);
    }
    path.reverse();
    Some(path)
}
