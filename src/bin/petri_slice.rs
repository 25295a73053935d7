//! Command line driver for the slicer.
//!
//! Loads a net declaration, runs one analysis query and prints the result.
//!
//! ## Configuration
//!
//! Query parameters come from `--query FILE` (JSON, see `AnalysisQuery`)
//! and/or command line flags; flags extend the pattern lists of the file.
//!
//! Environment variables:
//! - `RUST_LOG`: Log level filter (default: info)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: pretty)
//!
//! Logs go to stderr; results go to stdout.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --features cli --bin petri_slice -- net.json --mode chop \
//!     --seed '^request$' --target '^response$' --dot chop.dot
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use petri_slicer::{
    write_dot, AnalysisMode, AnalysisQuery, Direction, DotOptions, PetriGraph, TraceSink, TextSink,
};

#[derive(Parser)]
#[command(name = "petri_slice")]
#[command(about = "Slice, chop, trace and reduce place/transition dependency graphs")]
struct Args {
    /// Path to a net declaration (JSON)
    #[arg(value_name = "NET")]
    net: PathBuf,

    /// Query file (JSON); flags below extend it
    #[arg(long, value_name = "FILE")]
    query: Option<PathBuf>,

    /// Analysis to run
    #[arg(long, value_enum)]
    mode: Option<Mode>,

    /// Follow predecessor edges for slices and traces
    #[arg(long)]
    backward: bool,

    /// Seed label pattern (repeatable)
    #[arg(long = "seed", value_name = "PATTERN")]
    seeds: Vec<String>,

    /// Chop target label pattern (repeatable)
    #[arg(long = "target", value_name = "PATTERN")]
    targets: Vec<String>,

    /// Stop label pattern (repeatable)
    #[arg(long, value_name = "PATTERN")]
    stop: Vec<String>,

    /// Exclude label pattern (repeatable)
    #[arg(long, value_name = "PATTERN")]
    exclude: Vec<String>,

    /// Never collapse nodes matching this pattern (repeatable)
    #[arg(long, value_name = "PATTERN")]
    retain: Vec<String>,

    /// Always collapse nodes matching this pattern (repeatable)
    #[arg(long, value_name = "PATTERN")]
    forced_trivial: Vec<String>,

    /// Keep label pattern for filter mode (repeatable)
    #[arg(long, value_name = "PATTERN")]
    keep: Vec<String>,

    /// Show trivial places instead of collapsing them
    #[arg(long)]
    keep_trivial: bool,

    /// Write the resulting nodes as a Graphviz file
    #[arg(long, value_name = "FILE")]
    dot: Option<PathBuf>,

    /// Print the full report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum Mode {
    Slice,
    Chop,
    Trace,
    Filter,
}

impl From<Mode> for AnalysisMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Slice => AnalysisMode::Slice,
            Mode::Chop => AnalysisMode::Chop,
            Mode::Trace => AnalysisMode::Trace,
            Mode::Filter => AnalysisMode::Filter,
        }
    }
}

/// Initialize the tracing subscriber with JSON or pretty format
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "petri_slice=info,petri_slicer=info".into());

    if log_format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .flatten_event(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

fn build_query(args: &Args) -> Result<AnalysisQuery, Box<dyn std::error::Error>> {
    let mut query = match &args.query {
        Some(path) => AnalysisQuery::from_path(path)?,
        None => AnalysisQuery::default(),
    };

    if let Some(mode) = args.mode {
        query.mode = mode.into();
    }
    if args.backward {
        query.direction = Direction::Backward;
    }
    if args.keep_trivial {
        query.skip_trivial = false;
    }
    query.seeds.extend(args.seeds.iter().cloned());
    query.targets.extend(args.targets.iter().cloned());
    query.stop.extend(args.stop.iter().cloned());
    query.exclude.extend(args.exclude.iter().cloned());
    query.retain.extend(args.retain.iter().cloned());
    query.forced_trivial.extend(args.forced_trivial.iter().cloned());
    query.keep.extend(args.keep.iter().cloned());
    Ok(query)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_tracing();

    let graph = match PetriGraph::from_path(&args.net) {
        Ok(graph) => graph,
        Err(e) => {
            tracing::error!(error = %e, path = %args.net.display(), "Failed to load net");
            return Err(e.into());
        }
    };
    info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        fingerprint = %graph.fingerprint(),
        "Net loaded"
    );

    let query = build_query(&args)?;
    info!(mode = ?query.mode, query_hash = %query.params_hash(), "Running query");
    let report = query.run(&graph)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if report.mode == AnalysisMode::Trace {
        let mut sink = TextSink::new(true);
        for record in report.trace.iter().cloned() {
            sink.record(record);
        }
        println!("{}", sink.into_text());
    } else {
        for n in &report.nodes {
            println!("{}\t{}", n, graph.label(n)?);
        }
    }

    if let Some(path) = &args.dot {
        let options = DotOptions {
            highlight: report.highlight.clone(),
            skip_trivial: query.skip_trivial,
        };
        let shown = match &report.subgraph {
            Some(_) => graph.restrict(&report.nodes),
            None => graph.clone(),
        };
        let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
        write_dot(&mut file, &shown, &report.nodes, &options)?;
        info!(path = %path.display(), nodes = report.nodes.len(), "DOT written");
    }

    Ok(())
}
