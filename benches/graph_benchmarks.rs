/// Performance benchmarks for assembly graph construction and analysis
///
/// Run with: cargo bench
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::{rngs::StdRng, Rng, SeedableRng};

use seggraph::config::{AssemblyGraphConfig, SegmentClusteringConfig};
use seggraph::marker_graph::{
    MarkerGraph, MarkerGraphEdge, MarkerGraphEdgeCrossing, OrientedReadMarkers, OrientedReads,
};
use seggraph::AssemblyGraph;

const CHAIN_LENGTH: u64 = 8;

/// A chain of bubbles. Each bubble has two branches of `CHAIN_LENGTH` edges
/// between junction vertices. Returns the graph and, for each bubble, the
/// edge ids of both branches.
fn bubble_chain(bubble_count: u64) -> (MarkerGraph, Vec<[Vec<u64>; 2]>) {
    let mut edges = Vec::new();
    let mut branches = Vec::new();
    let mut next_vertex = 1u64;
    let mut junction = 0u64;

    for _ in 0..bubble_count {
        let end = next_vertex;
        next_vertex += 1;
        let mut bubble: [Vec<u64>; 2] = [Vec::new(), Vec::new()];
        for branch in bubble.iter_mut() {
            let mut vertex = junction;
            for k in 0..CHAIN_LENGTH {
                let target = if k + 1 == CHAIN_LENGTH {
                    end
                } else {
                    next_vertex += 1;
                    next_vertex - 1
                };
                branch.push(edges.len() as u64);
                edges.push(MarkerGraphEdge {
                    source: vertex,
                    target,
                    coverage: 10,
                });
                vertex = target;
            }
        }
        branches.push(bubble);
        junction = end;
    }

    let graph = MarkerGraph::new(next_vertex as usize, edges).expect("valid marker graph");
    (graph, branches)
}

/// Reads spanning random runs of bubbles, choosing a random branch in each
fn random_reads(branches: &[[Vec<u64>; 2]], read_count: usize, seed: u64) -> OrientedReads {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut reads = Vec::with_capacity(read_count * 2);
    for _ in 0..read_count {
        let first = rng.gen_range(0..branches.len());
        let last = (first + rng.gen_range(1..6)).min(branches.len());
        let mut crossings = Vec::new();
        let mut ordinal = rng.gen_range(0..5u32);
        for bubble in &branches[first..last] {
            for &edge_id in &bubble[rng.gen_range(0..2)] {
                crossings.push(MarkerGraphEdgeCrossing {
                    edge_id,
                    ordinals: [ordinal, ordinal + 1],
                });
                ordinal += 1;
            }
        }
        reads.push(OrientedReadMarkers {
            marker_count: ordinal + 1 + rng.gen_range(0..5u32),
            crossings,
        });
        reads.push(OrientedReadMarkers::default());
    }
    OrientedReads::new(reads).expect("even number of oriented reads")
}

fn bench_graph_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("assembly_graph");
    group.sample_size(10);

    for bubble_count in [100u64, 1000] {
        let (graph, branches) = bubble_chain(bubble_count);
        let reads = random_reads(&branches, bubble_count as usize * 10, 42);
        group.throughput(Throughput::Elements(reads.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("build", bubble_count),
            &(graph, reads),
            |b, (graph, reads)| {
                b.iter(|| {
                    AssemblyGraph::new(
                        black_box(graph),
                        black_box(reads),
                        &AssemblyGraphConfig::default(),
                    )
                    .expect("assembly graph")
                })
            },
        );
    }
    group.finish();
}

fn bench_segment_clustering(c: &mut Criterion) {
    let mut group = c.benchmark_group("segment_clustering");
    group.sample_size(10);

    let (graph, branches) = bubble_chain(200);
    let reads = random_reads(&branches, 2000, 7);
    let mut assembly_graph =
        AssemblyGraph::new(&graph, &reads, &AssemblyGraphConfig::default()).expect("assembly graph");
    let config = SegmentClusteringConfig::default();

    group.bench_function("cluster_segments", |b| {
        b.iter(|| assembly_graph.cluster_segments(black_box(&config)).expect("clusters"))
    });
    group.finish();
}

criterion_group!(benches, bench_graph_construction, bench_segment_clustering);
criterion_main!(benches);
