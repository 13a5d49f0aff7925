
use pretty_assertions::assert_eq;
use seggraph::config::{
    AssemblyPathConfig, ExtensionPolicy, SegmentClusteringConfig, SnippetClusteringConfig,
    SnippetClusteringStrategy,
};
use seggraph::{Direction, OrientedReadId};
use test_utils::*;

#[test]
fn test_segment_pair_unexplained_reads() {
    let graph = bubble_graph();
    let mut assembly_graph = build(&graph, bubble_reads(6, 4), 2);
    assembly_graph.store_segment_oriented_read_information();

    let info0 = assembly_graph.segment_oriented_read_information(0).unwrap().clone();
    let info1 = assembly_graph.segment_oriented_read_information(1).unwrap().clone();
    let info3 = assembly_graph.segment_oriented_read_information(3).unwrap().clone();

    // Top read 2 starts at marker 2
    assert_eq!(info1.infos[2].oriented_read_id, OrientedReadId::new(2, 0));
    assert_eq!(info1.infos[2].average_offset, 4);

    let pair = assembly_graph.analyze_segment_pair(0, 1, &info0, &info1).unwrap();
    assert_eq!(pair.total_count, [10, 6]);
    assert_eq!(pair.common_count, 6);
    assert_eq!(pair.offset, Some(2));
    assert_eq!(pair.unexplained_count, [4, 0]);
    assert_eq!(pair.short_count, [0, 0]);
    assert!((pair.max_unexplained_fraction().unwrap() - 0.4).abs() < 1e-12);
    assert!((pair.jaccard().unwrap() - 0.6).abs() < 1e-12);

    let pair = assembly_graph.analyze_segment_pair(0, 3, &info0, &info3).unwrap();
    assert_eq!(pair.common_count, 10);
    assert_eq!(pair.offset, Some(4));
    assert_eq!(pair.unexplained_count, [0, 0]);
    assert_eq!(pair.jaccard(), Some(1.0));

    assembly_graph.clear_segment_oriented_read_information();
    assert!(assembly_graph.segment_oriented_read_information(0).is_none());
}

#[test]
fn test_segment_pair_short_reads() {
    let graph = bubble_graph();
    let mut walks = bubble_reads(6, 4);
    // Ends right after the first edge, too short to reach segment 1
    walks.push(walk(&[0], 0, 0));
    let assembly_graph = build(&graph, walks, 2);

    let info0 = assembly_graph.get_oriented_reads_on_segment(0);
    let info1 = assembly_graph.get_oriented_reads_on_segment(1);
    let pair = assembly_graph.analyze_segment_pair(0, 1, &info0, &info1).unwrap();
    assert_eq!(pair.total_count, [11, 6]);
    assert_eq!(pair.unexplained_count, [4, 0]);
    assert_eq!(pair.short_count, [1, 0]);
    pair.check().unwrap();
}

#[test]
fn test_segment_pair_without_common_reads() {
    let graph = bubble_graph();
    let assembly_graph = build(&graph, bubble_reads(6, 4), 2);

    let info1 = assembly_graph.get_oriented_reads_on_segment(1);
    let info2 = assembly_graph.get_oriented_reads_on_segment(2);
    let pair = assembly_graph.analyze_segment_pair(1, 2, &info1, &info2).unwrap();
    assert_eq!(pair.total_count, [6, 4]);
    assert_eq!(pair.common_count, 0);
    assert_eq!(pair.offset, None);
    assert_eq!(pair.max_unexplained_fraction(), None);
}

#[test]
fn test_cluster_segments() {
    let graph = bubble_graph();
    let mut assembly_graph = build(&graph, bubble_reads(6, 4), 2);
    let config = SegmentClusteringConfig::default();

    let clusters = assembly_graph.cluster_segments(&config).unwrap();
    assert_eq!(clusters, vec![vec![0, 3]]);
    assert_eq!(assembly_graph.cluster_id(0), Some(0));
    assert_eq!(assembly_graph.cluster_id(3), Some(0));
    assert_eq!(assembly_graph.cluster_id(1), None);
    assert_eq!(assembly_graph.cluster_id(2), None);

    // Read tables built for the run are released
    assert!(assembly_graph.segment_oriented_read_information(0).is_none());

    // Same result on a second run
    assert_eq!(assembly_graph.cluster_segments(&config).unwrap(), clusters);
}

#[test]
fn test_cluster_segments_loose_thresholds() {
    let graph = bubble_graph();
    let mut assembly_graph = build(&graph, bubble_reads(6, 4), 2);
    let config = SegmentClusteringConfig {
        min_common_count: 4,
        max_unexplained_fraction: 0.7,
        ..Default::default()
    };
    let clusters = assembly_graph.cluster_segments(&config).unwrap();
    assert_eq!(clusters, vec![vec![0, 1, 2, 3]]);
}

#[test]
fn test_cluster_segments_rejects_singleton_clusters() {
    let graph = bubble_graph();
    let mut assembly_graph = build(&graph, bubble_reads(6, 4), 2);
    let config = SegmentClusteringConfig {
        min_cluster_size: 1,
        ..Default::default()
    };
    assert!(assembly_graph.cluster_segments(&config).is_err());
    assert_eq!(assembly_graph.cluster_id(0), None);

    let config = SegmentClusteringConfig {
        min_cluster_size: 3,
        ..Default::default()
    };
    assert!(assembly_graph.cluster_segments(&config).unwrap().is_empty());
}

#[test]
fn test_find_segment_pairs_requires_stored_information() {
    let graph = bubble_graph();
    let mut assembly_graph = build(&graph, bubble_reads(6, 4), 2);
    let config = SegmentClusteringConfig::default();
    assert!(assembly_graph.find_segment_pairs(0, &config).is_err());

    assembly_graph.store_segment_oriented_read_information();
    assert_eq!(assembly_graph.find_segment_pairs(0, &config).unwrap(), vec![3]);
    assert!(assembly_graph.find_segment_pairs(1, &config).unwrap().is_empty());
}

#[test]
fn test_write_segment_clusters() {
    let graph = bubble_graph();
    let mut assembly_graph = build(&graph, bubble_reads(6, 4), 2);
    assembly_graph
        .cluster_segments(&SegmentClusteringConfig::default())
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clusters.tsv");
    assembly_graph.write_segment_clusters(&path).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(text, "#segment_id\tcluster_id\n0\t0\n3\t0\n");
}

#[test]
fn test_find_snippets() {
    let graph = bubble_graph();
    let assembly_graph = build(&graph, bubble_reads(6, 4), 2);

    let snippets = assembly_graph.find_snippets(&[1, 3]).unwrap();
    assert_eq!(snippets.len(), 10);
    assert_eq!(snippets[0].oriented_read_id, OrientedReadId::new(0, 0));
    assert_eq!(snippets[0].segment_ids, vec![1, 3]);
    assert_eq!(snippets[0].first_position, 1);
    assert_eq!(snippets[0].last_position(), 2);
    // Bottom reads only touch segment 3
    assert_eq!(snippets[9].segment_ids, vec![3]);
    assert_eq!(snippets[9].first_position, 2);

    assert!(assembly_graph.find_snippets(&[4]).is_err());
}

#[test]
fn test_find_snippets_splits_non_consecutive_positions() {
    let graph = loop_graph();
    let walks = (0..3).map(|i| walk(&LOOP_WALK, i, 0)).collect();
    let assembly_graph = build(&graph, walks, 2);

    // Compressed pseudopath 0 1 2 1 3: segment 1 twice, not adjacent
    let snippets = assembly_graph.find_snippets(&[1]).unwrap();
    assert_eq!(snippets.len(), 6);
    assert_eq!(snippets[0].first_position, 1);
    assert_eq!(snippets[1].first_position, 3);

    let snippets = assembly_graph.find_snippets(&[1, 2]).unwrap();
    assert_eq!(snippets.len(), 3);
    assert_eq!(snippets[0].segment_ids, vec![1, 2, 1]);
}

#[test]
fn test_analyze_subgraph_bubble() {
    let graph = bubble_graph();
    let assembly_graph = build(&graph, bubble_reads(6, 4), 2);

    for strategy in [SnippetClusteringStrategy::Direct, SnippetClusteringStrategy::Graph] {
        let config = SnippetClusteringConfig {
            strategy,
            ..Default::default()
        };
        let clusters = assembly_graph.analyze_subgraph(&[0, 1, 2, 3], &config).unwrap();
        assert_eq!(clusters.len(), 2, "strategy {strategy}");
        assert_eq!(clusters[0].coverage(), 6);
        assert_eq!(clusters[0].get_segments(), vec![0, 1, 3]);
        assert_eq!(clusters[0].segments, vec![(0, 6), (1, 6), (3, 6)]);
        assert_eq!(clusters[1].coverage(), 4);
        assert_eq!(clusters[1].get_segments(), vec![0, 2, 3]);
    }
}

#[test]
fn test_analyze_subgraph_leaves_out_shared_snippets() {
    // Five more reads stop inside segment 0, which both branches contain
    let graph = bubble_graph();
    let mut walks = bubble_reads(6, 4);
    walks.extend((0..5).map(|i| walk(&[0, 1], i, 0)));
    let assembly_graph = build(&graph, walks, 2);

    let subgraph = [0, 1, 2, 3];
    assert_eq!(assembly_graph.find_snippets(&subgraph).unwrap().len(), 15);

    for strategy in [SnippetClusteringStrategy::Direct, SnippetClusteringStrategy::Graph] {
        let config = SnippetClusteringConfig {
            strategy,
            ..Default::default()
        };
        let clusters = assembly_graph.analyze_subgraph(&subgraph, &config).unwrap();
        let coverages: Vec<u64> = clusters.iter().map(|c| c.coverage()).collect();
        assert_eq!(coverages, vec![6, 4], "strategy {strategy}");
        assert!(
            clusters
                .iter()
                .flat_map(|c| &c.snippets)
                .all(|snippet| snippet.segment_ids != vec![0]),
            "strategy {strategy}"
        );
    }
}

#[test]
fn test_analyze_subgraph_min_cluster_coverage() {
    let graph = bubble_graph();
    let assembly_graph = build(&graph, bubble_reads(6, 2), 2);
    let config = SnippetClusteringConfig::default();

    let clusters = assembly_graph.analyze_subgraph(&[0, 1, 2, 3], &config).unwrap();
    assert_eq!(clusters.len(), 2);
    // Two snippets are not enough to keep their segments
    assert_eq!(clusters[1].coverage(), 2);
    assert!(clusters[1].segments.is_empty());
}

#[test]
fn test_analyze_subgraph_rejects_zero_window() {
    let graph = bubble_graph();
    let assembly_graph = build(&graph, bubble_reads(6, 4), 2);
    let config = SnippetClusteringConfig {
        window: 0,
        ..Default::default()
    };
    assert!(assembly_graph.analyze_subgraph(&[0, 1], &config).is_err());
}

#[test]
fn test_assembly_path_policies() {
    let graph = bubble_graph();
    let assembly_graph = build(&graph, bubble_reads(6, 4), 2);

    let unique = AssemblyPathConfig::default();
    assert_eq!(assembly_graph.create_assembly_path(0, Direction::Forward, &unique), vec![0]);
    assert_eq!(assembly_graph.create_assembly_path(1, Direction::Forward, &unique), vec![1, 3]);

    let best = AssemblyPathConfig {
        policy: ExtensionPolicy::BestCoverage,
        ..Default::default()
    };
    assert_eq!(
        assembly_graph.create_assembly_path(0, Direction::Forward, &best),
        vec![0, 1, 3]
    );
    // Backward paths come out in forward order
    assert_eq!(
        assembly_graph.create_assembly_path(3, Direction::Backward, &best),
        vec![0, 1, 3]
    );

    let strict = AssemblyPathConfig {
        min_link_coverage: 5,
        policy: ExtensionPolicy::Unique,
    };
    assert_eq!(
        assembly_graph.create_assembly_path(0, Direction::Forward, &strict),
        vec![0, 1, 3]
    );
}

#[test]
fn test_assembly_path_best_coverage_tie_stops() {
    let graph = bubble_graph();
    let assembly_graph = build(&graph, bubble_reads(5, 5), 2);
    let best = AssemblyPathConfig {
        policy: ExtensionPolicy::BestCoverage,
        ..Default::default()
    };
    assert_eq!(assembly_graph.create_assembly_path(0, Direction::Forward, &best), vec![0]);
}

#[test]
fn test_assembly_path_skips_back_segments() {
    let graph = loop_graph();
    let walks = (0..3).map(|i| walk(&LOOP_WALK, i, 0)).collect();
    let assembly_graph = build(&graph, walks, 2);
    let config = AssemblyPathConfig::default();

    assert_eq!(
        assembly_graph.create_assembly_path(0, Direction::Forward, &config),
        vec![0, 1, 3]
    );
    assert_eq!(
        assembly_graph.create_assembly_path(3, Direction::Backward, &config),
        vec![0, 1, 3]
    );
}

#[test]
fn test_segments_by_coverage() {
    // Raise the coverage of the bottom branch
    let mut edges = bubble_graph().edges().to_vec();
    edges[4].coverage = 20;
    edges[5].coverage = 20;
    let graph = seggraph::MarkerGraph::new(8, edges).unwrap();

    let assembly_graph = build(&graph, bubble_reads(6, 4), 2);
    assert_eq!(assembly_graph.segments_by_coverage(), vec![2, 0, 1, 3]);
}

#[test]
fn test_gfa_output() {
    let graph = bubble_graph();
    let assembly_graph = build(&graph, bubble_reads(6, 4), 5);

    let mut buffer = Vec::new();
    assembly_graph.write_gfa(&mut buffer).unwrap();
    let text = String::from_utf8(buffer).unwrap();

    let expected = "\
H\tVN:Z:1.0
S\t0\t*\tLN:i:2\tDP:f:10.00
S\t1\t*\tLN:i:2\tDP:f:10.00
S\t2\t*\tLN:i:2\tDP:f:10.00
S\t3\t*\tLN:i:2\tDP:f:10.00
L\t0\t+\t1\t+\t0M\tRC:i:6\tSP:f:0.0
L\t1\t+\t3\t+\t0M\tRC:i:6\tSP:f:0.0
";
    assert_eq!(text, expected);
}

#[test]
fn test_gfa_file() {
    let graph = linear_graph();
    let assembly_graph = build(&graph, vec![walk(&[0, 1, 2, 3, 4], 0, 0)], 2);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("graph.gfa");
    assembly_graph.write_gfa_file(&path).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(text.lines().count(), 2);
    assert!(text.contains("S\t0\t*\tLN:i:5\tDP:f:10.00"));
}
