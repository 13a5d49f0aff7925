use anyhow::{bail, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};

use seggraph::config::{
    AssemblyGraphConfig, AssemblyPathConfig, ExtensionPolicy, SegmentClusteringConfig,
    SnippetClusteringConfig, SnippetClusteringStrategy,
};
use seggraph::input::{read_marker_graph_file, read_oriented_reads_file};
use seggraph::{AssemblyGraph, Direction, SegmentId};

/// seggraph - Assembly graph of segments and links from a marker graph and long reads
///
/// Builds segments from linear chains of the marker graph, follows every
/// oriented read through them and creates links supported by enough reads.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Marker graph edges: edge_id, source, target, coverage (tab separated, .gz ok)
    #[clap(short = 'm', long = "marker-graph")]
    marker_graph: String,

    /// Oriented reads: read_id, strand, marker_count, crossings (tab separated, .gz ok)
    #[clap(short = 'r', long = "reads")]
    reads: String,

    /// Output GFA file
    #[clap(short = 'o', long = "output")]
    output: Option<String>,

    /// Minimum number of oriented reads supporting a link
    #[clap(short = 'c', long = "min-link-coverage", default_value = "2")]
    min_link_coverage: u64,

    /// Cluster segments by read composition and write segment_id, cluster_id to this file
    #[clap(long = "clusters")]
    clusters: Option<String>,

    /// Maximum link distance between clustered segments
    #[clap(long = "cluster-max-distance", default_value = "6")]
    cluster_max_distance: u64,

    /// Minimum number of common oriented reads for a segment pair
    #[clap(long = "cluster-min-common", default_value = "6")]
    cluster_min_common: u64,

    /// Maximum unexplained fraction on either side of a segment pair
    #[clap(long = "cluster-max-unexplained", default_value = "0.1")]
    cluster_max_unexplained: f64,

    /// Minimum number of segments in a reported cluster (at least 2)
    #[clap(
        long = "cluster-min-size",
        default_value = "2",
        value_parser = clap::value_parser!(u64).range(2..)
    )]
    cluster_min_size: u64,

    /// Analyze the snippets of the oriented reads on these segments (comma separated)
    #[clap(long = "subgraph", value_delimiter = ',')]
    subgraph: Vec<SegmentId>,

    /// Snippet clustering strategy: direct or graph
    #[clap(long = "snippet-strategy", default_value = "graph")]
    snippet_strategy: SnippetClusteringStrategy,

    /// Snippet containment window
    #[clap(long = "snippet-window", default_value = "2")]
    snippet_window: usize,

    /// Segments of a snippet allowed to be missing from a containing snippet
    #[clap(long = "snippet-max-mismatch", default_value = "0")]
    snippet_max_mismatch: usize,

    /// Minimum snippet coverage for a segment to stay in a snippet cluster
    #[clap(long = "snippet-min-coverage", default_value = "3")]
    snippet_min_coverage: u64,

    /// Create an assembly path starting at this segment
    #[clap(long = "path-start")]
    path_start: Option<SegmentId>,

    /// Assembly path direction: forward or backward
    #[clap(long = "path-direction", default_value = "forward")]
    path_direction: Direction,

    /// Assembly path extension policy: unique or best-coverage
    #[clap(long = "policy", default_value = "unique")]
    policy: ExtensionPolicy,

    /// Quiet mode (warnings only, no progress output)
    #[clap(long = "quiet")]
    quiet: bool,

    /// Number of threads for parallel processing
    #[clap(short = 't', long = "threads", default_value = "8")]
    threads: usize,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.quiet { "warn" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_secs()
        .init();

    if args.output.is_none()
        && args.clusters.is_none()
        && args.subgraph.is_empty()
        && args.path_start.is_none()
    {
        log::warn!("No output requested; the graph will be built and discarded");
    }

    // Set up rayon thread pool
    rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads)
        .build_global()?;

    // Progress indicator
    let progress = if !args.quiet {
        let pb = ProgressBar::new_spinner();
        pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        Some(pb)
    } else {
        None
    };
    let set_message = |msg: &'static str| {
        if let Some(ref pb) = progress {
            pb.set_message(msg);
        }
    };

    set_message("Reading marker graph...");
    let marker_graph = read_marker_graph_file(&args.marker_graph)?;
    log::info!(
        "Marker graph: {} vertices, {} edges",
        marker_graph.vertex_count(),
        marker_graph.edge_count()
    );

    set_message("Reading oriented reads...");
    let reads = read_oriented_reads_file(&args.reads)?;
    log::info!("{} reads, {} oriented reads", reads.read_count(), reads.len());

    set_message("Building assembly graph...");
    let graph_config = AssemblyGraphConfig {
        min_link_coverage: args.min_link_coverage,
    };
    let mut graph = AssemblyGraph::new(&marker_graph, &reads, &graph_config)?;
    drop(reads);

    if let Some(ref path) = args.output {
        set_message("Writing GFA...");
        graph.write_gfa_file(path)?;
    }

    if let Some(ref path) = args.clusters {
        set_message("Clustering segments...");
        let config = SegmentClusteringConfig {
            max_distance: args.cluster_max_distance,
            min_link_coverage: args.min_link_coverage,
            min_common_count: args.cluster_min_common,
            max_unexplained_fraction: args.cluster_max_unexplained,
            min_cluster_size: args.cluster_min_size as usize,
        };
        graph.cluster_segments(&config)?;
        graph.write_segment_clusters(path)?;
    }

    if let Some(ref pb) = progress {
        pb.finish_and_clear();
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if !args.subgraph.is_empty() {
        let config = SnippetClusteringConfig {
            strategy: args.snippet_strategy,
            window: args.snippet_window,
            max_mismatch: args.snippet_max_mismatch,
            min_cluster_coverage: args.snippet_min_coverage,
        };
        let clusters = graph.analyze_subgraph(&args.subgraph, &config)?;
        writeln!(out, "#cluster\tcoverage\tsegments")?;
        for (cluster_id, cluster) in clusters.iter().enumerate() {
            let segments: Vec<String> = cluster
                .segments
                .iter()
                .map(|(segment_id, coverage)| format!("{segment_id}:{coverage}"))
                .collect();
            writeln!(out, "{}\t{}\t{}", cluster_id, cluster.coverage(), segments.join(","))?;
        }
    }

    if let Some(start) = args.path_start {
        if start as usize >= graph.segment_count() {
            bail!(
                "Path start segment {} does not exist, the graph has {} segments",
                start,
                graph.segment_count()
            );
        }
        let config = AssemblyPathConfig {
            min_link_coverage: args.min_link_coverage,
            policy: args.policy,
        };
        let path = graph.create_assembly_path(start, args.path_direction, &config);
        let path: Vec<String> = path.iter().map(|s| s.to_string()).collect();
        writeln!(out, "{}", path.join(","))?;
    }

    Ok(())
}
