//! Nearest-pair bridging of disconnected components.
//!
//! Borůvka rounds over an R\*-tree of all finite node positions:
//!
//! 1. Label every node with its component; a [`UnionFind`] over the labels
//!    tracks which components bridges have already merged.
//! 2. Each round, every node walks the tree's nearest-neighbour iterator
//!    until it meets a node of another group. The shortest such hit per
//!    group is that group's candidate bridge.
//! 3. Candidates are accepted shortest first, skipping any that would
//!    close a cycle, and the round repeats until no group finds a partner.
//!
//! The result is the minimum spanning tree over component distances, so
//! every bridge joins the nearest pair of nodes between the two groups it
//! merges. Each accepted bridge becomes an ordinary edge weighted by its
//! length.

use geo::Euclidean;
use geo::line_measures::Distance;
use petgraph::graph::NodeIndex;
use rstar::RTree;
use rstar::primitives::GeomWithData;
use tracing::{debug, trace, warn};

use crate::graph::Graph;
use crate::types::{GraphNode, Point, Positioned};
use crate::union_find::UnionFind;

type IndexedNode = GeomWithData<geo::Point<f64>, usize>;

const fn to_geo(p: Point) -> geo::Point<f64> {
    geo::Point(geo::Coord { x: p.x, y: p.y })
}

/// A candidate bridge between node `a` in component `comp_a` and node `b`
/// in component `comp_b`.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    distance: f64,
    a: usize,
    b: usize,
    comp_a: usize,
    comp_b: usize,
}

impl Candidate {
    /// The node pair with the smaller index first, for tie-breaking.
    fn ends(&self) -> (usize, usize) {
        (self.a.min(self.b), self.a.max(self.b))
    }
}

fn by_length(x: &Candidate, y: &Candidate) -> std::cmp::Ordering {
    x.distance
        .total_cmp(&y.distance)
        .then_with(|| x.ends().cmp(&y.ends()))
}

impl<N: GraphNode + Positioned> Graph<N> {
    /// Join all components with the shortest straight bridges.
    ///
    /// Bridges form a minimum spanning tree over the components: whenever
    /// two groups are joined, it is through their closest node pair.
    /// After this call [`find_components`](Self::find_components) returns
    /// a single component, unless some component has no node with finite
    /// coordinates; such components are left alone. Bridge weights are
    /// Euclidean lengths, so trails prefer short connecting strokes.
    /// Returns the number of bridges inserted.
    pub fn connect_components(&mut self) -> usize {
        let components = self.component_indices();
        let n = components.len();
        if n <= 1 {
            return 0;
        }

        let positions: Vec<Point> = self.nodes().map(Positioned::position).collect();
        let mut labels = vec![0; positions.len()];
        for (label, component) in components.iter().enumerate() {
            for ix in component {
                labels[ix.index()] = label;
            }
        }

        let indexed: Vec<IndexedNode> = positions
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_finite())
            .map(|(i, &p)| GeomWithData::new(to_geo(p), i))
            .collect();
        let drawable = {
            let mut seen = vec![false; n];
            for node in &indexed {
                seen[labels[node.data]] = true;
            }
            seen.iter().filter(|&&s| s).count()
        };
        if drawable < n {
            warn!(
                components = n - drawable,
                "some components have no finite position and stay disconnected"
            );
        }
        let tree = RTree::bulk_load(indexed);

        let mut uf = UnionFind::new();
        for label in 0..n {
            uf.make_set(label);
        }

        let mut added = 0;
        let mut rounds = 0;
        while added + 1 < drawable {
            let candidates = nearest_foreign_pairs(&tree, &positions, &labels, &mut uf);
            let accepted = self.accept_bridges(&mut uf, candidates);
            rounds += 1;
            trace!(round = rounds, bridges = accepted, "bridging round");
            if accepted == 0 {
                break;
            }
            added += accepted;
        }

        debug!(components = n, bridges = added, rounds, "connected components");
        added
    }

    /// Kruskal over component labels: insert each candidate that joins two
    /// groups not yet connected.
    fn accept_bridges(&mut self, uf: &mut UnionFind<usize>, candidates: Vec<Candidate>) -> usize {
        let mut added = 0;
        for candidate in candidates {
            if uf.union(&candidate.comp_a, &candidate.comp_b)
                && self.insert_edge(
                    NodeIndex::new(candidate.a),
                    NodeIndex::new(candidate.b),
                    candidate.distance,
                )
            {
                added += 1;
            }
        }
        added
    }
}

/// The shortest bridge out of every current group, sorted by length.
///
/// A node's nearest-neighbour walk stops at the first node of another
/// group, or as soon as the walk is already farther than the best bridge
/// its group has found.
fn nearest_foreign_pairs(
    tree: &RTree<IndexedNode>,
    positions: &[Point],
    labels: &[usize],
    uf: &mut UnionFind<usize>,
) -> Vec<Candidate> {
    let groups: Vec<usize> = (0..labels.iter().max().map_or(0, |&m| m + 1))
        .map(|label| uf.find(&label).unwrap_or(label))
        .collect();
    let group_of = |node: usize| groups[labels[node]];

    let mut best: Vec<Option<Candidate>> = vec![None; groups.len()];
    for (i, &p) in positions.iter().enumerate() {
        if !p.is_finite() {
            continue;
        }
        let group = group_of(i);
        let bound = best[group].map(|c| c.distance * c.distance);
        let query = to_geo(p);
        for (neighbor, distance_2) in tree.nearest_neighbor_iter_with_distance_2(&query) {
            if bound.is_some_and(|b| distance_2 > b) {
                break;
            }
            let j = neighbor.data;
            if group_of(j) == group {
                continue;
            }
            let candidate = Candidate {
                distance: Euclidean.distance(&query, neighbor.geom()),
                a: i,
                b: j,
                comp_a: labels[i],
                comp_b: labels[j],
            };
            if best[group].is_none_or(|c| by_length(&candidate, &c).is_lt()) {
                best[group] = Some(candidate);
            }
            break;
        }
    }

    let mut candidates: Vec<Candidate> = best.into_iter().flatten().collect();
    candidates.sort_by(by_length);
    candidates
}
