//! Incremental trail pipeline: advance stage-by-stage, inspecting each
//! intermediate result before continuing.
//!
//! ```rust
//! # use sandtrail_graph::{Pipeline, Point, Segment, TrailConfig, TrailError};
//! # fn run() -> Result<(), TrailError> {
//! let segments = vec![
//!     Segment::new(Point::new(0.0, 0.0), Point::new(1.0, 0.0)),
//!     Segment::new(Point::new(3.0, 0.0), Point::new(4.0, 0.0)),
//! ];
//! let walked = Pipeline::new(segments, TrailConfig::default())
//!     .build_graph()?
//!     .bridge()
//!     .eulerize()
//!     .walk();
//!
//! assert_eq!(walked.summary().bridge_count, 1);
//! let result = walked.into_result();
//! assert!(result.summary.covers_all_edges);
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next state, carrying
//! the graph and a [`TrailSummary`] that every stage fills in further.

use tracing::{debug, trace, warn};

use crate::eulerian_trail::{EulerianTrail, eulerian_trail};
use crate::graph::Graph;
use crate::postman::{self, Eulerized, Match};
use crate::types::{
    GraphNode, Point, Polyline, Positioned, Segment, TrailConfig, TrailError, TrailResult,
    TrailSummary, Vertex, VertexKey,
};

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
///
/// Call [`build_graph`](Self::build_graph) to advance.
#[must_use = "pipeline stages are consumed by advancing, call .build_graph() to continue"]
pub struct Pending {
    config: TrailConfig,
    segments: Vec<Segment>,
}

impl Pending {
    /// The input segments.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Validate the config and load every segment into a graph.
    ///
    /// Segments with a non-finite coordinate are skipped. A segment whose
    /// endpoints share a node (zero length, or shorter than the snap
    /// tolerance) contributes its node but no edge. Edges are weighted by
    /// segment length.
    ///
    /// # Errors
    ///
    /// Returns [`TrailError::InvalidConfig`] if the config fails
    /// [`TrailConfig::validate`].
    pub fn build_graph(self) -> Result<GraphBuilt, TrailError> {
        self.config.validate()?;

        let tolerance = self.config.snap_tolerance;
        let mut graph = Graph::new();
        let mut summary = TrailSummary {
            segment_count: self.segments.len(),
            ..TrailSummary::default()
        };

        for segment in &self.segments {
            if !segment.start.is_finite() || !segment.end.is_finite() {
                warn!(?segment, "skipping segment with non-finite coordinates");
                summary.skipped_segment_count += 1;
                continue;
            }

            let start = Vertex::new(segment.start, tolerance);
            let end = Vertex::new(segment.end, tolerance);
            if !graph.add_weighted_edge(start, end, segment.length()) && start.key() == end.key() {
                trace!(?segment, "degenerate segment kept as a dot");
                summary.skipped_segment_count += 1;
            }
        }

        summary.node_count = graph.node_count();
        summary.edge_count = graph.edge_count();
        summary.component_count = graph.find_components().len();
        debug!(
            segments = summary.segment_count,
            skipped = summary.skipped_segment_count,
            nodes = summary.node_count,
            edges = summary.edge_count,
            components = summary.component_count,
            "built segment graph"
        );

        Ok(GraphBuilt {
            config: self.config,
            graph,
            summary,
        })
    }
}

// ───────────────────────── Stage 1: GraphBuilt ───────────────────────

/// Pipeline state after loading segments into the graph.
///
/// Call [`bridge`](Self::bridge) to advance.
#[must_use = "pipeline stages are consumed by advancing, call .bridge() to continue"]
pub struct GraphBuilt {
    config: TrailConfig,
    graph: Graph<Vertex>,
    summary: TrailSummary,
}

impl GraphBuilt {
    /// The segment graph.
    #[must_use]
    pub const fn graph(&self) -> &Graph<Vertex> {
        &self.graph
    }

    /// Counts so far.
    #[must_use]
    pub const fn summary(&self) -> &TrailSummary {
        &self.summary
    }

    /// Join disconnected islands, if enabled and needed.
    pub fn bridge(mut self) -> Bridged {
        if self.config.connect_components && self.summary.component_count > 1 {
            self.summary.bridge_count = self.graph.connect_components();
        }
        Bridged {
            config: self.config,
            graph: self.graph,
            summary: self.summary,
        }
    }
}

// ───────────────────────── Stage 2: Bridged ──────────────────────────

/// Pipeline state after bridging components.
///
/// Call [`eulerize`](Self::eulerize) to advance.
#[must_use = "pipeline stages are consumed by advancing, call .eulerize() to continue"]
pub struct Bridged {
    config: TrailConfig,
    graph: Graph<Vertex>,
    summary: TrailSummary,
}

impl Bridged {
    /// The graph including any bridges.
    #[must_use]
    pub const fn graph(&self) -> &Graph<Vertex> {
        &self.graph
    }

    /// Counts so far.
    #[must_use]
    pub const fn summary(&self) -> &TrailSummary {
        &self.summary
    }

    /// Duplicate edges between odd vertices, if enabled, so the walk can
    /// cover everything.
    pub fn eulerize(mut self) -> Balanced {
        let edges = self.graph.edges();
        let balanced = if self.config.eulerize {
            let graph = &mut self.graph;
            postman::eulerize_edges_with(
                &edges,
                |a, b| graph.shortest_key_path(a, b),
                self.config.max_exact_matching_vertices,
            )
        } else {
            Eulerized {
                odd_vertices: postman::odd_vertices(&edges),
                edges,
                matching: Vec::new(),
                duplicate_count: 0,
                strategy: None,
            }
        };

        self.summary.odd_vertex_count = balanced.odd_vertices.len();
        self.summary.duplicate_count = balanced.duplicate_count;
        self.summary.matching_strategy = balanced.strategy;

        Balanced {
            config: self.config,
            graph: self.graph,
            summary: self.summary,
            balanced,
        }
    }
}

// ───────────────────────── Stage 3: Balanced ─────────────────────────

/// Pipeline state after the parity fix.
///
/// Call [`walk`](Self::walk) to advance.
#[must_use = "pipeline stages are consumed by advancing, call .walk() to continue"]
pub struct Balanced {
    config: TrailConfig,
    graph: Graph<Vertex>,
    summary: TrailSummary,
    balanced: Eulerized<VertexKey>,
}

impl Balanced {
    /// The edge list to walk: graph edges followed by duplicates.
    #[must_use]
    pub fn edges(&self) -> &[(VertexKey, VertexKey)] {
        &self.balanced.edges
    }

    /// The odd-vertex pairing that produced the duplicates.
    #[must_use]
    pub fn matching(&self) -> &[Match<VertexKey>] {
        &self.balanced.matching
    }

    /// Counts so far.
    #[must_use]
    pub const fn summary(&self) -> &TrailSummary {
        &self.summary
    }

    /// Walk the edge list and map the trail back to coordinates.
    ///
    /// Consecutive points closer than `dedup_epsilon` collapse into one.
    /// A graph with nodes but no edges yields its first node as a
    /// single-point polyline.
    pub fn walk(mut self) -> Walked {
        let trail = eulerian_trail(&self.balanced.edges, false);
        let epsilon = self.config.dedup_epsilon;

        let mut points: Vec<Point> = Vec::with_capacity(trail.path.len());
        for key in &trail.path {
            if let Some(vertex) = self.graph.get_node(key) {
                push_distinct(&mut points, vertex.position(), epsilon);
            }
        }
        if points.is_empty()
            && let Some(first) = self.graph.nodes().next()
        {
            points.push(first.position());
        }

        self.summary.parity_ok = trail.parity_ok;
        self.summary.covers_all_edges = trail.covers_all_edges;
        if !trail.is_complete() && !self.balanced.edges.is_empty() {
            warn!(
                odd = trail.odd_vertex_count,
                covers_all_edges = trail.covers_all_edges,
                "trail does not cover every segment exactly once"
            );
        }

        Walked {
            polyline: Polyline::new(points),
            trail,
            summary: self.summary,
        }
    }
}

// ───────────────────────── Stage 4: Walked ───────────────────────────

/// Pipeline state after walking: the final stage.
///
/// Call [`into_result`](Self::into_result) to extract the [`TrailResult`].
#[must_use = "call .into_result() to extract the TrailResult"]
pub struct Walked {
    polyline: Polyline,
    trail: EulerianTrail<VertexKey>,
    summary: TrailSummary,
}

impl Walked {
    /// The single continuous output path.
    #[must_use]
    pub const fn polyline(&self) -> &Polyline {
        &self.polyline
    }

    /// The walk as node keys, before duplicate points were collapsed.
    #[must_use]
    pub const fn trail(&self) -> &EulerianTrail<VertexKey> {
        &self.trail
    }

    /// Final counts.
    #[must_use]
    pub const fn summary(&self) -> &TrailSummary {
        &self.summary
    }

    /// Consume the pipeline and return the [`TrailResult`].
    #[must_use]
    pub fn into_result(self) -> TrailResult {
        TrailResult {
            polyline: self.polyline,
            summary: self.summary,
        }
    }
}

/// Entry point for the stage-by-stage API.
pub struct Pipeline;

impl Pipeline {
    /// Create a new pipeline in the [`Pending`] state.
    pub const fn new(segments: Vec<Segment>, config: TrailConfig) -> Pending {
        Pending { config, segments }
    }
}

/// Append `p` unless it lies within `epsilon` of the last point.
fn push_distinct(points: &mut Vec<Point>, p: Point, epsilon: f64) {
    if points.last().is_none_or(|last| last.distance(p) > epsilon) {
        points.push(p);
    }
}
