//! sandtrail-bench: CLI tool for trail engine parameter experimentation and
//! diagnostics.
//!
//! Generates a synthetic segment pattern (or loads one from JSON), runs the
//! trail pipeline with configurable parameters, and prints per-stage
//! diagnostics. Useful for:
//!
//! - Comparing greedy and nearest-neighbour matching on the same input
//! - Tuning snap tolerance on noisy generator output
//! - Measuring per-stage durations as the pattern grows
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin sandtrail-bench -- [OPTIONS] [PATTERN]
//! ```
//!
//! Set `RUST_LOG=sandtrail_graph=debug` to see stage logs on stderr.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use sandtrail_graph::diagnostics::{SystemClock, TrailDiagnostics};
use sandtrail_graph::{Point, Segment, TrailConfig};
use tracing_subscriber::EnvFilter;

/// Trail engine parameter experimentation and diagnostics for sandtrail.
///
/// Turns a segment set into a single continuous stroke and prints detailed
/// per-stage timing and count diagnostics.
#[derive(Parser)]
#[command(name = "sandtrail-bench", version)]
struct Cli {
    /// Synthetic pattern to generate.
    #[arg(value_enum, default_value_t = Pattern::Grid)]
    pattern: Pattern,

    /// Pattern size (grid cells per side, island count, comb teeth or
    /// star arms).
    #[arg(long, default_value_t = 16, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    size: usize,

    /// Load segments from a JSON file instead of generating a pattern.
    ///
    /// The file must hold an array of `{"start": {"x", "y"}, "end": {"x", "y"}}`.
    #[arg(long)]
    segments_json: Option<PathBuf>,

    /// Endpoint snap tolerance (0 keys nodes on exact coordinates).
    #[arg(long, default_value_t = TrailConfig::DEFAULT_SNAP_TOLERANCE)]
    snap_tolerance: f64,

    /// Leave disconnected islands unbridged.
    #[arg(long)]
    no_connect: bool,

    /// Skip odd-vertex pairing (the walk may then miss segments).
    #[arg(long)]
    no_eulerize: bool,

    /// Largest odd-vertex count matched greedily by shortest path.
    #[arg(long, default_value_t = TrailConfig::DEFAULT_MAX_EXACT_MATCHING_VERTICES)]
    max_exact_matching_vertices: usize,

    /// Consecutive output points closer than this are collapsed.
    #[arg(long, default_value_t = TrailConfig::DEFAULT_DEDUP_EPSILON)]
    dedup_epsilon: f64,

    /// Write the output polyline as JSON to this file.
    #[arg(long)]
    polyline_json: Option<PathBuf>,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Output diagnostics as JSON instead of human-readable report.
    #[arg(long)]
    json: bool,

    /// Full trail config as a JSON string.
    ///
    /// When provided, all other config flags are ignored. Missing fields
    /// take their defaults.
    #[arg(long)]
    config_json: Option<String>,
}

/// Synthetic segment pattern selection.
#[derive(Clone, Copy, ValueEnum)]
enum Pattern {
    /// Square lattice of unit cells: many odd border vertices.
    Grid,
    /// Separate unit squares scattered on a diagonal.
    Islands,
    /// A spine with a tooth at every vertex: far more odd vertices than
    /// the exact-matching ceiling.
    Comb,
    /// Spokes from a shared hub with a short dash beyond each tip.
    Star,
}

fn seg(x0: f64, y0: f64, x1: f64, y1: f64) -> Segment {
    Segment::new(Point::new(x0, y0), Point::new(x1, y1))
}

/// Generate the segments for `pattern` at the given size.
#[allow(clippy::cast_precision_loss)]
fn generate(pattern: Pattern, size: usize) -> Vec<Segment> {
    let n = size as f64;
    let mut segments = Vec::new();
    match pattern {
        Pattern::Grid => {
            for i in 0..=size {
                for j in 0..size {
                    let (fi, fj) = (i as f64, j as f64);
                    segments.push(seg(fi, fj, fi, fj + 1.0));
                    segments.push(seg(fj, fi, fj + 1.0, fi));
                }
            }
        }
        Pattern::Islands => {
            for k in 0..size {
                let x = k as f64 * 3.0;
                let y = (k % 4) as f64 * 2.5;
                segments.push(seg(x, y, x + 1.0, y));
                segments.push(seg(x + 1.0, y, x + 1.0, y + 1.0));
                segments.push(seg(x + 1.0, y + 1.0, x, y + 1.0));
                segments.push(seg(x, y + 1.0, x, y));
            }
        }
        Pattern::Comb => {
            for i in 0..size {
                let x = i as f64;
                segments.push(seg(x, 0.0, x + 1.0, 0.0));
                segments.push(seg(x, 0.0, x, 1.0 + (i % 3) as f64));
            }
        }
        Pattern::Star => {
            for k in 0..size {
                let angle = std::f64::consts::TAU * k as f64 / n;
                let (sin, cos) = angle.sin_cos();
                segments.push(seg(0.0, 0.0, 10.0 * cos, 10.0 * sin));
                segments.push(seg(11.0 * cos, 11.0 * sin, 12.0 * cos, 12.0 * sin));
            }
        }
    }
    segments
}

/// Build a [`TrailConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored. Otherwise, a config is
/// assembled from the individual flags.
fn config_from_cli(cli: &Cli) -> Result<TrailConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(TrailConfig {
        snap_tolerance: cli.snap_tolerance,
        connect_components: !cli.no_connect,
        eulerize: !cli.no_eulerize,
        max_exact_matching_vertices: cli.max_exact_matching_vertices,
        dedup_epsilon: cli.dedup_epsilon,
    })
}

/// Load segments from `--segments-json`, or generate the chosen pattern.
fn segments_from_cli(cli: &Cli) -> Result<Vec<Segment>, String> {
    let Some(ref path) = cli.segments_json else {
        return Ok(generate(cli.pattern, cli.size));
    };
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("Error reading {}: {e}", path.display()))?;
    serde_json::from_str(&text).map_err(|e| format!("Error parsing {}: {e}", path.display()))
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "sandtrail_graph=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let segments = match segments_from_cli(&cli) {
        Ok(s) => s,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    eprintln!("Segments: {}", segments.len());
    eprintln!("Config: {config:#?}");
    eprintln!("Runs: {}", cli.runs);
    eprintln!();

    let mut all_diagnostics = Vec::with_capacity(cli.runs);

    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        match sandtrail_graph::diagnostics::continuous_path_with_diagnostics(
            &segments,
            &config,
            &SystemClock,
        ) {
            Ok((result, diagnostics)) => {
                if cli.json {
                    match serde_json::to_string_pretty(&diagnostics) {
                        Ok(json) => println!("{json}"),
                        Err(e) => {
                            eprintln!("Error serializing diagnostics: {e}");
                            return ExitCode::FAILURE;
                        }
                    }
                } else {
                    println!("{}", diagnostics.report());
                }

                // Write the polyline on the first run only.
                if run == 0
                    && let Some(ref path) = cli.polyline_json
                {
                    match serde_json::to_string(&result.polyline) {
                        Ok(json) => match std::fs::write(path, &json) {
                            Ok(()) => eprintln!(
                                "Polyline written to {} ({} points)",
                                path.display(),
                                result.polyline.len(),
                            ),
                            Err(e) => eprintln!("Error writing {}: {e}", path.display()),
                        },
                        Err(e) => eprintln!("Error serializing polyline: {e}"),
                    }
                }

                all_diagnostics.push(diagnostics);
            }
            Err(e) => {
                eprintln!("Trail error: {e}");
                return ExitCode::FAILURE;
            }
        }

        if cli.runs > 1 {
            eprintln!();
        }
    }

    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    ExitCode::SUCCESS
}

/// Function pointer type for extracting a stage duration from diagnostics.
type StageExtractor = fn(&TrailDiagnostics) -> Option<std::time::Duration>;

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[TrailDiagnostics]) {
    println!();
    println!(
        "Summary ({} runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    if all_diagnostics.is_empty() {
        println!("Warning: no diagnostics to summarize");
        return;
    }

    let durations: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| d.total_duration.as_secs_f64() * 1000.0)
        .collect();

    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;

    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    println!();
    println!("{:<24} {:>12}", "Stage", "Mean (ms)");
    println!("{}", "-".repeat(40));

    let stage_extractors: &[(&str, StageExtractor)] = &[
        ("Build Graph", |d| Some(d.build_graph.duration)),
        ("Bridge", |d| d.bridge.as_ref().map(|s| s.duration)),
        ("Eulerize", |d| d.eulerize.as_ref().map(|s| s.duration)),
        ("Walk", |d| Some(d.walk.duration)),
    ];

    for (name, extractor) in stage_extractors {
        let stage_durations: Vec<f64> = all_diagnostics
            .iter()
            .filter_map(extractor)
            .map(|dur| dur.as_secs_f64() * 1000.0)
            .collect();

        if stage_durations.is_empty() {
            continue;
        }

        let stage_mean = stage_durations.iter().sum::<f64>() / stage_durations.len() as f64;
        println!("{name:<24} {stage_mean:>10.3}ms");
    }
}
