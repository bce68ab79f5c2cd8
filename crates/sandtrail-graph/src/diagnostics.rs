//! Trail diagnostics: timing and counts for each pipeline stage.
//!
//! [`continuous_path_with_diagnostics`] runs the same stages as
//! [`continuous_path`](crate::continuous_path) and records how long each
//! took. Timestamps come from a caller-supplied [`Clock`]; the default
//! [`SystemClock`] uses the `web-time` crate, which is
//! `performance.now()` on WASM and `std::time::Instant` on native.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::pipeline::Pipeline;
use crate::postman::MatchingStrategy;
use crate::types::{Segment, TrailConfig, TrailError, TrailResult, TrailSummary};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Source of timestamps for stage timing.
pub trait Clock {
    /// Opaque point in time.
    type Instant;

    /// The current time.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// [`Clock`] backed by [`web_time::Instant`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    type Instant = web_time::Instant;

    fn now(&self) -> web_time::Instant {
        web_time::Instant::now()
    }

    fn elapsed(&self, since: &web_time::Instant) -> Duration {
        since.elapsed()
    }
}

/// Diagnostics collected from a single trail run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrailDiagnostics {
    /// Stage 1: segment graph construction.
    pub build_graph: StageDiagnostics,
    /// Stage 2: component bridging (only when enabled).
    pub bridge: Option<StageDiagnostics>,
    /// Stage 3: parity fix (only when enabled).
    pub eulerize: Option<StageDiagnostics>,
    /// Stage 4: Hierholzer walk and coordinate mapping.
    pub walk: StageDiagnostics,
    /// Total wall-clock duration (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Counts across all stages.
    pub summary: TrailSummary,
}

/// Diagnostics for a single stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    BuildGraph {
        segment_count: usize,
        skipped_segment_count: usize,
        node_count: usize,
        edge_count: usize,
        component_count: usize,
    },
    Bridge {
        /// Components before bridging.
        component_count: usize,
        bridge_count: usize,
    },
    Eulerize {
        odd_vertex_count: usize,
        duplicate_count: usize,
        strategy: Option<MatchingStrategy>,
    },
    Walk {
        /// Vertices on the walk, before duplicate points collapsed.
        trail_length: usize,
        /// Points in the output polyline.
        point_count: usize,
        parity_ok: bool,
        covers_all_edges: bool,
    },
}

impl TrailDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Trail Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Segments: {} ({} skipped)",
            self.summary.segment_count, self.summary.skipped_segment_count,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<16} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);

        let mut stages = vec![("Build Graph", &self.build_graph)];
        if let Some(ref bridge) = self.bridge {
            stages.push(("Bridge", bridge));
        }
        if let Some(ref eulerize) = self.eulerize {
            stages.push(("Eulerize", eulerize));
        }
        stages.push(("Walk", &self.walk));

        for (name, diag) in &stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<16} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Parity ok: {}  |  Covers all edges: {}",
            self.summary.parity_ok, self.summary.covers_all_edges,
        ));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::BuildGraph {
            segment_count,
            node_count,
            edge_count,
            component_count,
            ..
        } => format!(
            "{segment_count} segments -> {node_count} nodes, {edge_count} edges, {component_count} components"
        ),
        StageMetrics::Bridge {
            component_count,
            bridge_count,
        } => format!("{component_count} components, {bridge_count} bridges"),
        StageMetrics::Eulerize {
            odd_vertex_count,
            duplicate_count,
            strategy,
        } => {
            let strategy = strategy.map_or_else(|| "none".to_string(), |s| s.to_string());
            format!("odd={odd_vertex_count} duplicates={duplicate_count} matching={strategy}")
        }
        StageMetrics::Walk {
            trail_length,
            point_count,
            parity_ok,
            covers_all_edges,
        } => format!(
            "trail={trail_length} points={point_count} parity_ok={parity_ok} covers={covers_all_edges}"
        ),
    }
}

/// Run the trail pipeline, timing each stage with `clock`.
///
/// # Errors
///
/// Returns [`TrailError::InvalidConfig`] if the config fails
/// [`TrailConfig::validate`].
pub fn continuous_path_with_diagnostics<C: Clock>(
    segments: &[Segment],
    config: &TrailConfig,
    clock: &C,
) -> Result<(TrailResult, TrailDiagnostics), TrailError> {
    let total_start = clock.now();

    let start = clock.now();
    let built = Pipeline::new(segments.to_vec(), config.clone()).build_graph()?;
    let build_graph = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::BuildGraph {
            segment_count: built.summary().segment_count,
            skipped_segment_count: built.summary().skipped_segment_count,
            node_count: built.summary().node_count,
            edge_count: built.summary().edge_count,
            component_count: built.summary().component_count,
        },
    };

    let start = clock.now();
    let bridged = built.bridge();
    let bridge = config.connect_components.then(|| StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Bridge {
            component_count: bridged.summary().component_count,
            bridge_count: bridged.summary().bridge_count,
        },
    });

    let start = clock.now();
    let balanced = bridged.eulerize();
    let eulerize = config.eulerize.then(|| StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Eulerize {
            odd_vertex_count: balanced.summary().odd_vertex_count,
            duplicate_count: balanced.summary().duplicate_count,
            strategy: balanced.summary().matching_strategy,
        },
    });

    let start = clock.now();
    let walked = balanced.walk();
    let walk = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Walk {
            trail_length: walked.trail().path.len(),
            point_count: walked.polyline().len(),
            parity_ok: walked.summary().parity_ok,
            covers_all_edges: walked.summary().covers_all_edges,
        },
    };

    let result = walked.into_result();
    let diagnostics = TrailDiagnostics {
        build_graph,
        bridge,
        eulerize,
        walk,
        total_duration: clock.elapsed(&total_start),
        summary: result.summary.clone(),
    };
    Ok((result, diagnostics))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::types::Point;

    /// Clock that advances one millisecond per reading.
    struct TickClock(Cell<u64>);

    impl Clock for TickClock {
        type Instant = u64;

        fn now(&self) -> u64 {
            let t = self.0.get();
            self.0.set(t + 1);
            t
        }

        fn elapsed(&self, since: &u64) -> Duration {
            Duration::from_millis(self.0.get() - since)
        }
    }

    fn islands() -> Vec<Segment> {
        vec![
            Segment::new(Point::new(0.0, 0.0), Point::new(1.0, 0.0)),
            Segment::new(Point::new(3.0, 0.0), Point::new(4.0, 0.0)),
        ]
    }

    #[test]
    fn duration_ms_converts_correctly() {
        let d = Duration::from_micros(1500);
        assert!((duration_ms(d) - 1.5).abs() < 1e-9);
    }

    #[test]
    fn collects_every_enabled_stage() {
        let clock = TickClock(Cell::new(0));
        let (result, diagnostics) =
            continuous_path_with_diagnostics(&islands(), &TrailConfig::default(), &clock)
                .unwrap();

        assert!(diagnostics.bridge.is_some());
        assert!(diagnostics.eulerize.is_some());
        assert_eq!(diagnostics.summary, result.summary);
        assert!(diagnostics.total_duration >= diagnostics.walk.duration);
        assert!(matches!(
            diagnostics.bridge.as_ref().map(|b| &b.metrics),
            Some(StageMetrics::Bridge {
                component_count: 2,
                bridge_count: 1
            })
        ));
    }

    #[test]
    fn disabled_stages_are_absent() {
        let config = TrailConfig {
            connect_components: false,
            eulerize: false,
            ..TrailConfig::default()
        };
        let (_, diagnostics) =
            continuous_path_with_diagnostics(&islands(), &config, &SystemClock).unwrap();
        assert!(diagnostics.bridge.is_none());
        assert!(diagnostics.eulerize.is_none());
        assert!(!diagnostics.summary.covers_all_edges);
    }

    #[test]
    fn invalid_config_propagates() {
        let config = TrailConfig {
            dedup_epsilon: -1.0,
            ..TrailConfig::default()
        };
        let result = continuous_path_with_diagnostics(&islands(), &config, &SystemClock);
        assert!(matches!(result, Err(TrailError::InvalidConfig(_))));
    }

    #[test]
    fn report_produces_nonempty_string() {
        let (_, diagnostics) =
            continuous_path_with_diagnostics(&islands(), &TrailConfig::default(), &SystemClock)
                .unwrap();
        let report = diagnostics.report();
        assert!(report.contains("Trail Diagnostics Report"));
        assert!(report.contains("Bridge"));
        assert!(report.contains("matching=greedy"));
    }

    #[test]
    fn serializes_durations_as_seconds() {
        let clock = TickClock(Cell::new(0));
        let (_, diagnostics) =
            continuous_path_with_diagnostics(&islands(), &TrailConfig::default(), &clock)
                .unwrap();
        let json = serde_json::to_value(&diagnostics).unwrap();
        assert!(json["total_duration"].as_f64().unwrap() > 0.0);

        let back: TrailDiagnostics = serde_json::from_value(json).unwrap();
        let drift = back.total_duration.as_secs_f64() - diagnostics.total_duration.as_secs_f64();
        assert!(drift.abs() < 1e-9);
    }

    #[test]
    fn negative_duration_is_rejected() {
        let json = serde_json::json!({
            "duration": -1.0,
            "metrics": { "Bridge": { "component_count": 1, "bridge_count": 0 } },
        });
        assert!(serde_json::from_value::<StageDiagnostics>(json).is_err());
    }
}
