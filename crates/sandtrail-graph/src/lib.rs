//! sandtrail-graph: continuous-path graph engine for sand tables (sans-IO).
//!
//! Pattern generators emit unordered line segments; a sand table can only
//! draw one unbroken stroke. This crate turns the segments into that
//! stroke:
//!
//! segments -> graph (snapped endpoints, length-weighted edges) ->
//! bridge disconnected islands -> duplicate paths between odd vertices ->
//! Hierholzer walk -> polyline.
//!
//! The building blocks ([`Graph`], [`eulerian_trail`], [`eulerize_edges`],
//! [`UnionFind`], [`PriorityQueue`]) are generic over the node type and
//! usable on their own.

pub mod bridge;
pub mod diagnostics;
pub mod eulerian_trail;
pub mod graph;
pub mod pipeline;
pub mod postman;
pub mod priority_queue;
pub mod types;
pub mod union_find;

pub use eulerian_trail::{EulerianTrail, eulerian_trail};
pub use graph::{Graph, Neighbor, edge_key};
pub use pipeline::Pipeline;
pub use postman::{
    Eulerized, MAX_ODD_VERTICES_FOR_EXACT, Match, MatchingStrategy, eulerize_edges,
    eulerize_edges_with, odd_vertices,
};
pub use priority_queue::PriorityQueue;
pub use types::{
    GraphNode, Point, PointKey, Polyline, Positioned, Segment, TrailConfig, TrailError,
    TrailResult, TrailSummary, Vertex, VertexKey,
};
pub use union_find::UnionFind;

/// Turn `segments` into one continuous polyline.
///
/// Runs every stage of [`Pipeline`] in order. The path covers every
/// drawable segment when bridging and eulerization are enabled (the
/// default); [`TrailSummary::covers_all_edges`] reports whether it did.
/// Empty input yields an empty polyline.
///
/// # Errors
///
/// Returns [`TrailError::InvalidConfig`] if the config fails
/// [`TrailConfig::validate`].
pub fn continuous_path(
    segments: &[Segment],
    config: &TrailConfig,
) -> Result<TrailResult, TrailError> {
    Ok(Pipeline::new(segments.to_vec(), config.clone())
        .build_graph()?
        .bridge()
        .eulerize()
        .walk()
        .into_result())
}

/// Walk every edge of `graph`, retracing shortest paths where needed.
///
/// The graph's edges are eulerized with its own weighted shortest paths
/// and then walked. Disconnected graphs are walked from the first odd (or
/// first) vertex's component only; bridge them first with
/// [`Graph::connect_components`] or [`Graph::connect_components_by`].
pub fn graph_trail<N: GraphNode>(graph: &mut Graph<N>) -> EulerianTrail<N::Key> {
    let edges = graph.edges();
    let balanced = eulerize_edges(&edges, |a, b| graph.shortest_key_path(a, b));
    eulerian_trail(&balanced.edges, false)
}
