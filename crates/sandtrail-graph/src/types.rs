//! Shared types for the sandtrail graph engine.

use std::fmt::Debug;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::postman::MatchingStrategy;

/// A 2D point in pattern coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position.
    pub x: f64,
    /// Vertical position.
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    ///
    /// Avoids the square root for comparison purposes.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// Returns `true` if both coordinates are finite.
    #[must_use]
    pub const fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// A sequence of connected points forming a path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline(Vec<Point>);

impl Polyline {
    /// Create a new polyline from a vector of points.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Returns `true` if the polyline has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of points in the polyline.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns the first point, if any.
    #[must_use]
    pub fn first(&self) -> Option<&Point> {
        self.0.first()
    }

    /// Returns the last point, if any.
    #[must_use]
    pub fn last(&self) -> Option<&Point> {
        self.0.last()
    }

    /// Returns a slice of all points.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Consumes the polyline and returns the underlying vector of points.
    #[must_use]
    pub fn into_points(self) -> Vec<Point> {
        self.0
    }

    /// Total drawn length.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.0.windows(2).map(|w| w[0].distance(w[1])).sum()
    }
}

/// One straight wall, cell boundary or contour piece emitted by a
/// pattern generator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// First endpoint.
    pub start: Point,
    /// Second endpoint.
    pub end: Point,
}

impl Segment {
    /// Create a new segment.
    #[must_use]
    pub const fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    /// Euclidean length of the segment.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.start.distance(self.end)
    }
}

// ---------------------------------------------------------------------------
// Node identity
// ---------------------------------------------------------------------------

/// A value that can be stored as a graph node.
///
/// The key is the node's identity: two nodes with equal keys are the
/// same node, whatever else their payloads carry. Keys must be `Ord` so
/// that unordered edges can be stored under a canonical sorted pair.
pub trait GraphNode: Clone {
    /// Stable identity used for deduplication and lookups.
    type Key: Clone + Eq + Ord + Hash + Debug;

    /// The identity of this node.
    fn key(&self) -> Self::Key;
}

/// A node with planar coordinates, required for nearest-pair bridging.
pub trait Positioned {
    /// Where this node sits in the plane.
    fn position(&self) -> Point;
}

/// Bit-exact identity of a [`Point`].
///
/// `-0.0` is folded into `0.0` so the two zero signs share a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PointKey {
    x_bits: u64,
    y_bits: u64,
}

impl PointKey {
    /// Key for the exact coordinates of `p`.
    #[must_use]
    pub fn from_point(p: Point) -> Self {
        Self {
            x_bits: (p.x + 0.0).to_bits(),
            y_bits: (p.y + 0.0).to_bits(),
        }
    }
}

impl GraphNode for Point {
    type Key = PointKey;

    fn key(&self) -> PointKey {
        PointKey::from_point(*self)
    }
}

impl Positioned for Point {
    fn position(&self) -> Point {
        *self
    }
}

impl GraphNode for String {
    type Key = Self;

    fn key(&self) -> Self {
        self.clone()
    }
}

impl GraphNode for &'static str {
    type Key = Self;

    fn key(&self) -> Self {
        *self
    }
}

macro_rules! integer_graph_node {
    ($($t:ty),*) => {
        $(
            impl GraphNode for $t {
                type Key = Self;

                fn key(&self) -> Self {
                    *self
                }
            }
        )*
    };
}

integer_graph_node!(u32, u64, usize);

/// Identity of a [`Vertex`]: either bit-exact or snapped to a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VertexKey {
    /// Bit-exact coordinates.
    Exact(PointKey),
    /// Grid cell index after snapping to the tolerance.
    Snapped {
        /// Column index.
        x: i64,
        /// Row index.
        y: i64,
    },
}

/// A segment endpoint whose identity may be snapped to a grid, so
/// endpoints that almost coincide merge into one node while the node
/// keeps the coordinates it was first seen with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    position: Point,
    key: VertexKey,
}

impl Vertex {
    /// Create a vertex keyed on the grid cell of size `snap_tolerance`
    /// containing `position`. A tolerance of zero (or any non-positive
    /// or non-finite value) keys on the exact coordinates, as does a
    /// position whose cell index does not fit in an `i64`.
    #[must_use]
    pub fn new(position: Point, snap_tolerance: f64) -> Self {
        let cell = if snap_tolerance > 0.0 && snap_tolerance.is_finite() {
            grid_cell(position.x / snap_tolerance).zip(grid_cell(position.y / snap_tolerance))
        } else {
            None
        };
        let key = cell.map_or_else(
            || VertexKey::Exact(PointKey::from_point(position)),
            |(x, y)| VertexKey::Snapped { x, y },
        );
        Self { position, key }
    }

    /// Create a vertex keyed on its exact coordinates.
    #[must_use]
    pub fn exact(position: Point) -> Self {
        Self::new(position, 0.0)
    }
}

/// Round `scaled` to its grid cell index, or `None` if the index would
/// not fit in an `i64`.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn grid_cell(scaled: f64) -> Option<i64> {
    let cell = scaled.round();
    // i64::MAX rounds up to 2^63 as f64, which is already out of range.
    (cell >= i64::MIN as f64 && cell < i64::MAX as f64).then_some(cell as i64)
}

impl GraphNode for Vertex {
    type Key = VertexKey;

    fn key(&self) -> VertexKey {
        self.key
    }
}

impl Positioned for Vertex {
    fn position(&self) -> Point {
        self.position
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for turning a segment set into a continuous trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrailConfig {
    /// Side of the square grid cells endpoints are snapped to; endpoints
    /// in the same cell share a node.
    ///
    /// Two endpoints on either side of a cell boundary stay separate no
    /// matter how close they are. `0.0` keys nodes on their exact
    /// coordinates.
    pub snap_tolerance: f64,

    /// Whether to bridge disconnected islands with the shortest
    /// connecting segments before walking.
    pub connect_components: bool,

    /// Whether to duplicate edges along shortest paths between odd-degree
    /// vertices so the walk covers every segment.
    pub eulerize: bool,

    /// Largest odd-vertex count for which pairwise shortest paths are
    /// computed. Above it, nearest-neighbour BFS matching is used.
    pub max_exact_matching_vertices: usize,

    /// Consecutive output points closer than this are collapsed.
    pub dedup_epsilon: f64,
}

impl TrailConfig {
    /// Default snap tolerance (exact keys).
    pub const DEFAULT_SNAP_TOLERANCE: f64 = 0.0;

    /// Default for [`connect_components`](Self::connect_components).
    pub const DEFAULT_CONNECT_COMPONENTS: bool = true;

    /// Default for [`eulerize`](Self::eulerize).
    pub const DEFAULT_EULERIZE: bool = true;

    /// Default exact-matching ceiling.
    pub const DEFAULT_MAX_EXACT_MATCHING_VERTICES: usize =
        crate::postman::MAX_ODD_VERTICES_FOR_EXACT;

    /// Default duplicate-point epsilon.
    pub const DEFAULT_DEDUP_EPSILON: f64 = 1e-9;

    /// Check the numeric fields.
    ///
    /// # Errors
    ///
    /// Returns [`TrailError::InvalidConfig`] if `snap_tolerance` or
    /// `dedup_epsilon` is negative or not finite.
    pub fn validate(&self) -> Result<(), TrailError> {
        if !self.snap_tolerance.is_finite() || self.snap_tolerance < 0.0 {
            return Err(TrailError::InvalidConfig(format!(
                "snap_tolerance must be finite and >= 0, got {}",
                self.snap_tolerance
            )));
        }
        if !self.dedup_epsilon.is_finite() || self.dedup_epsilon < 0.0 {
            return Err(TrailError::InvalidConfig(format!(
                "dedup_epsilon must be finite and >= 0, got {}",
                self.dedup_epsilon
            )));
        }
        Ok(())
    }
}

impl Default for TrailConfig {
    fn default() -> Self {
        Self {
            snap_tolerance: Self::DEFAULT_SNAP_TOLERANCE,
            connect_components: Self::DEFAULT_CONNECT_COMPONENTS,
            eulerize: Self::DEFAULT_EULERIZE,
            max_exact_matching_vertices: Self::DEFAULT_MAX_EXACT_MATCHING_VERTICES,
            dedup_epsilon: Self::DEFAULT_DEDUP_EPSILON,
        }
    }
}

// ---------------------------------------------------------------------------
// Results and errors
// ---------------------------------------------------------------------------

/// Counts describing how a trail was produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrailSummary {
    /// Segments supplied by the caller.
    pub segment_count: usize,
    /// Segments dropped for non-finite coordinates or zero length.
    pub skipped_segment_count: usize,
    /// Distinct nodes after key deduplication.
    pub node_count: usize,
    /// Distinct edges before bridging.
    pub edge_count: usize,
    /// Connected components before bridging.
    pub component_count: usize,
    /// Bridging edges inserted.
    pub bridge_count: usize,
    /// Odd-degree vertices found by eulerization.
    pub odd_vertex_count: usize,
    /// Duplicate edges appended by eulerization.
    pub duplicate_count: usize,
    /// Matching strategy used, if any matching was needed.
    pub matching_strategy: Option<MatchingStrategy>,
    /// Whether the walked edge list had 0 or 2 odd vertices.
    pub parity_ok: bool,
    /// Whether the walk traversed every edge of the walked edge list.
    pub covers_all_edges: bool,
}

/// Result of turning a segment set into one continuous path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrailResult {
    /// The single continuous path.
    pub polyline: Polyline,
    /// How the path was produced.
    pub summary: TrailSummary,
}

/// Errors surfaced by the graph engine.
///
/// Node keys are carried in their `Debug` form so the error type does not
/// depend on the node type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrailError {
    /// A lookup referenced a key that was never added.
    #[error("node {key} is not in the graph")]
    UnknownNode {
        /// The missing key.
        key: String,
    },

    /// The two endpoints lie in different components.
    #[error("no path from {from} to {to}")]
    Unreachable {
        /// Start key.
        from: String,
        /// End key.
        to: String,
    },

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl TrailError {
    pub(crate) fn unknown_node(key: &impl Debug) -> Self {
        Self::UnknownNode {
            key: format!("{key:?}"),
        }
    }

    pub(crate) fn unreachable(from: &impl Debug, to: &impl Debug) -> Self {
        Self::Unreachable {
            from: format!("{from:?}"),
            to: format!("{to:?}"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn point_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance(b) - 5.0).abs() < 1e-12);
        assert!((a.distance_squared(b) - 25.0).abs() < 1e-12);
    }

    #[test]
    fn point_key_folds_negative_zero() {
        assert_eq!(
            Point::new(-0.0, 1.0).key(),
            Point::new(0.0, 1.0).key(),
        );
        assert_ne!(Point::new(0.0, 1.0).key(), Point::new(0.0, 1.5).key());
    }

    #[test]
    fn vertex_snapping_merges_nearby_points() {
        let a = Vertex::new(Point::new(1.0, 1.0), 0.5);
        let b = Vertex::new(Point::new(1.1, 0.95), 0.5);
        let c = Vertex::new(Point::new(2.0, 1.0), 0.5);
        assert_eq!(a.key(), b.key());
        assert_ne!(a.key(), c.key());
        assert_eq!(b.position(), Point::new(1.1, 0.95));
    }

    #[test]
    fn vertex_zero_tolerance_is_exact() {
        let a = Vertex::new(Point::new(1.0, 1.0), 0.0);
        assert_eq!(a.key(), VertexKey::Exact(PointKey::from_point(Point::new(1.0, 1.0))));
        assert_eq!(a, Vertex::exact(Point::new(1.0, 1.0)));
    }

    #[test]
    fn vertex_out_of_range_cell_keys_exactly() {
        // 1000 / 1e-16 overflows i64: distinct points must keep distinct keys.
        let a = Vertex::new(Point::new(1000.0, 0.0), 1e-16);
        let b = Vertex::new(Point::new(2000.0, 0.0), 1e-16);
        assert_ne!(a.key(), b.key());
        assert_eq!(a, Vertex::exact(Point::new(1000.0, 0.0)));

        let near_origin = Vertex::new(Point::new(1e-3, 0.0), 1e-16);
        assert!(matches!(near_origin.key(), VertexKey::Snapped { .. }));
    }

    #[test]
    fn grid_cell_bounds() {
        assert_eq!(grid_cell(2.4), Some(2));
        assert_eq!(grid_cell(-2.6), Some(-3));
        assert_eq!(grid_cell(1e19), None);
        assert_eq!(grid_cell(-1e19), None);
        assert_eq!(grid_cell(f64::NAN), None);
    }

    #[test]
    fn snapping_splits_across_cell_boundary() {
        let a = Vertex::new(Point::new(0.249_999, 0.0), 0.5);
        let b = Vertex::new(Point::new(0.250_001, 0.0), 0.5);
        assert_ne!(a.key(), b.key());
    }

    #[test]
    fn polyline_length() {
        let p = Polyline::new(vec![
            Point::new(0.0, 0.0),
            Point::new(3.0, 4.0),
            Point::new(3.0, 5.0),
        ]);
        assert!((p.length() - 6.0).abs() < 1e-12);
        assert!((Polyline::new(Vec::new()).length()).abs() < f64::EPSILON);
    }

    #[test]
    fn default_config_validates() {
        assert!(TrailConfig::default().validate().is_ok());
        assert_eq!(TrailConfig::default().max_exact_matching_vertices, 30);
    }

    #[test]
    fn negative_tolerance_rejected() {
        let config = TrailConfig {
            snap_tolerance: -1.0,
            ..TrailConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(TrailError::InvalidConfig(_))
        ));
    }

    #[test]
    fn nan_epsilon_rejected() {
        let config = TrailConfig {
            dedup_epsilon: f64::NAN,
            ..TrailConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_deserializes_with_missing_fields() {
        let config: TrailConfig = serde_json::from_str(r#"{"eulerize": false}"#).unwrap();
        assert!(!config.eulerize);
        assert_eq!(config.snap_tolerance, TrailConfig::DEFAULT_SNAP_TOLERANCE);
        assert!(config.connect_components);
    }

    #[test]
    fn error_messages() {
        let err = TrailError::unreachable(&"A", &"B");
        assert_eq!(err.to_string(), r#"no path from "A" to "B""#);
        let err = TrailError::unknown_node(&7_u32);
        assert_eq!(err.to_string(), "node 7 is not in the graph");
    }
}
