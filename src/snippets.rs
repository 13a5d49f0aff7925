//! Local analysis of a subgraph of the assembly graph.
//!
//! The oriented reads that visit a set of segments are cut into snippets:
//! maximal runs of consecutive compressed pseudopath positions on segments of
//! the set. Snippets are then clustered so that each cluster describes one
//! consistent route through the subgraph (for example one copy of a repeat or
//! one side of a bubble).

use anyhow::{bail, Result};
use indexmap::IndexMap;
use petgraph::algo::condensation;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use petgraph::Direction::Incoming;
use std::collections::{BTreeMap, BTreeSet};

use crate::assembly_graph::AssemblyGraph;
use crate::config::{SnippetClusteringConfig, SnippetClusteringStrategy};
use crate::marker_graph::OrientedReadId;
use crate::segments::SegmentId;

/// Consecutive positions of the compressed pseudopath of one oriented read.
/// A read has more than one snippet on a subgraph only if it goes around a
/// cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedPseudoPathSnippet {
    pub oriented_read_id: OrientedReadId,
    /// Segments encountered
    pub segment_ids: Vec<SegmentId>,
    /// Position in the compressed pseudopath of the first segment
    pub first_position: u64,
}

impl CompressedPseudoPathSnippet {
    pub fn last_position(&self) -> u64 {
        self.first_position + self.segment_ids.len() as u64 - 1
    }
}

/// A set of snippets and the segments they visit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnippetCluster {
    /// Groups of identical snippets in this cluster
    pub snippet_group_indexes: Vec<usize>,
    pub snippets: Vec<CompressedPseudoPathSnippet>,
    /// (segment, number of snippets visiting it), sorted by segment id
    pub segments: Vec<(SegmentId, u64)>,
}

impl SnippetCluster {
    pub fn coverage(&self) -> u64 {
        self.snippets.len() as u64
    }

    pub fn get_segments(&self) -> Vec<SegmentId> {
        self.segments.iter().map(|&(segment_id, _)| segment_id).collect()
    }

    /// Count, for every segment, the snippets that visit it
    pub fn construct_segments(&mut self) {
        let mut coverage: BTreeMap<SegmentId, u64> = BTreeMap::new();
        for snippet in &self.snippets {
            let distinct: BTreeSet<SegmentId> = snippet.segment_ids.iter().copied().collect();
            for segment_id in distinct {
                *coverage.entry(segment_id).or_insert(0) += 1;
            }
        }
        self.segments = coverage.into_iter().collect();
    }

    /// Remove segments with coverage less than `min_cluster_coverage`
    pub fn cleanup_segments(&mut self, min_cluster_coverage: u64) {
        self.segments
            .retain(|&(_, coverage)| coverage >= min_cluster_coverage);
    }
}

/// True if `short` is an ordered subsequence of `long`, up to
/// `max_mismatch` segments of `short` that cannot be found. Once a segment
/// is matched, the next one must be found among the following `window`
/// positions of `long`. At least one segment must match.
pub fn is_approximate_subsequence(
    short: &[SegmentId],
    long: &[SegmentId],
    window: usize,
    max_mismatch: usize,
) -> bool {
    let mut mismatch_count = 0;
    let mut next = 0;
    let mut anchored = false;

    for segment_id in short {
        let end = if anchored {
            (next + window).min(long.len())
        } else {
            long.len()
        };
        let found = if next < end {
            long[next..end].iter().position(|s| s == segment_id)
        } else {
            None
        };
        match found {
            Some(k) => {
                next += k + 1;
                anchored = true;
            }
            None => {
                mismatch_count += 1;
                if mismatch_count > max_mismatch {
                    return false;
                }
            }
        }
    }
    anchored
}

/// A vertex of the snippet containment graph: one or more snippet groups
#[derive(Debug, Clone, Default)]
struct SnippetGraphVertex {
    snippet_group_indexes: Vec<usize>,
    cluster_id: Option<usize>,
}

impl AssemblyGraph {
    /// Find the snippets of all oriented reads on a set of segments,
    /// sorted by oriented read then position
    pub fn find_snippets(&self, segment_ids: &[SegmentId]) -> Result<Vec<CompressedPseudoPathSnippet>> {
        let segment_set: BTreeSet<SegmentId> = segment_ids.iter().copied().collect();
        if let Some(&bad) = segment_set.iter().find(|&&s| s as usize >= self.segment_count()) {
            bail!(
                "Segment {} does not exist, the graph has {} segments",
                bad,
                self.segment_count()
            );
        }

        let mut positions: BTreeMap<OrientedReadId, Vec<u64>> = BTreeMap::new();
        for &segment_id in &segment_set {
            for &(oriented_read_id, position) in self.segment_compressed_pseudo_path_info(segment_id) {
                positions.entry(oriented_read_id).or_default().push(position);
            }
        }

        let mut snippets = Vec::new();
        for (oriented_read_id, mut read_positions) in positions {
            read_positions.sort_unstable();
            let path = self.compressed_pseudo_path(oriented_read_id);

            let mut begin = 0;
            for i in 1..=read_positions.len() {
                if i == read_positions.len() || read_positions[i] != read_positions[i - 1] + 1 {
                    snippets.push(CompressedPseudoPathSnippet {
                        oriented_read_id,
                        segment_ids: read_positions[begin..i]
                            .iter()
                            .map(|&p| path[p as usize].segment_id)
                            .collect(),
                        first_position: read_positions[begin],
                    });
                    begin = i;
                }
            }
        }
        Ok(snippets)
    }

    /// Cluster the snippets of a subgraph with the configured strategy.
    /// Clusters are sorted by decreasing coverage.
    pub fn analyze_subgraph(
        &self,
        segment_ids: &[SegmentId],
        config: &SnippetClusteringConfig,
    ) -> Result<Vec<SnippetCluster>> {
        if config.window == 0 {
            bail!("Snippet comparison window must be at least 1");
        }
        let snippets = self.find_snippets(segment_ids)?;

        // Group identical snippets, in order of first appearance
        let mut groups: IndexMap<Vec<SegmentId>, Vec<usize>> = IndexMap::new();
        for (i, snippet) in snippets.iter().enumerate() {
            groups.entry(snippet.segment_ids.clone()).or_default().push(i);
        }
        log::debug!(
            "Subgraph of {} segments: {} snippets in {} groups",
            segment_ids.len(),
            snippets.len(),
            groups.len()
        );

        let cluster_groups = match config.strategy {
            SnippetClusteringStrategy::Direct => cluster_snippet_groups_direct(&groups, config),
            SnippetClusteringStrategy::Graph => cluster_snippet_groups_graph(&groups, config),
        };

        let mut clusters: Vec<SnippetCluster> = cluster_groups
            .into_iter()
            .map(|mut group_indexes| {
                group_indexes.sort_unstable();
                let mut snippet_indexes: Vec<usize> = group_indexes
                    .iter()
                    .flat_map(|&g| groups[g].iter().copied())
                    .collect();
                snippet_indexes.sort_unstable();

                let mut cluster = SnippetCluster {
                    snippet_group_indexes: group_indexes,
                    snippets: snippet_indexes.iter().map(|&i| snippets[i].clone()).collect(),
                    segments: Vec::new(),
                };
                cluster.construct_segments();
                cluster.cleanup_segments(config.min_cluster_coverage);
                cluster
            })
            .collect();

        let clustered: usize = clusters.iter().map(|c| c.snippets.len()).sum();
        if clustered < snippets.len() {
            log::debug!(
                "{} of {} snippets are not in any cluster",
                snippets.len() - clustered,
                snippets.len()
            );
        }

        clusters.sort_by(|a, b| {
            b.coverage()
                .cmp(&a.coverage())
                .then_with(|| a.snippet_group_indexes.cmp(&b.snippet_group_indexes))
        });
        Ok(clusters)
    }
}

fn group_coverage(groups: &IndexMap<Vec<SegmentId>, Vec<usize>>, g: usize) -> usize {
    groups[g].len()
}

/// Longest snippet groups first; each group joins the single cluster whose
/// representative contains it, starts a new cluster if none does, and is left
/// out if several do.
fn cluster_snippet_groups_direct(
    groups: &IndexMap<Vec<SegmentId>, Vec<usize>>,
    config: &SnippetClusteringConfig,
) -> Vec<Vec<usize>> {
    let keys: Vec<&[SegmentId]> = groups.keys().map(|k| k.as_slice()).collect();
    let mut order: Vec<usize> = (0..groups.len()).collect();
    order.sort_by(|&a, &b| {
        keys[b]
            .len()
            .cmp(&keys[a].len())
            .then_with(|| group_coverage(groups, b).cmp(&group_coverage(groups, a)))
            .then_with(|| a.cmp(&b))
    });

    // (representative group, member groups)
    let mut clusters: Vec<(usize, Vec<usize>)> = Vec::new();
    let mut ambiguous = 0;
    for g in order {
        let candidates: Vec<usize> = clusters
            .iter()
            .enumerate()
            .filter(|(_, (representative, _))| {
                is_approximate_subsequence(
                    keys[g],
                    keys[*representative],
                    config.window,
                    config.max_mismatch,
                )
            })
            .map(|(i, _)| i)
            .collect();

        match candidates.as_slice() {
            [] => clusters.push((g, vec![g])),
            [c] => clusters[*c].1.push(g),
            _ => ambiguous += 1,
        }
    }
    if ambiguous > 0 {
        log::debug!("{} snippet groups matched more than one cluster", ambiguous);
    }

    clusters.into_iter().map(|(_, members)| members).collect()
}

/// Build the containment graph over snippet groups, condense its strongly
/// connected components, and give each source vertex of the resulting DAG a
/// cluster made of itself and the descendants no other source reaches.
fn cluster_snippet_groups_graph(
    groups: &IndexMap<Vec<SegmentId>, Vec<usize>>,
    config: &SnippetClusteringConfig,
) -> Vec<Vec<usize>> {
    let mut graph: DiGraph<SnippetGraphVertex, ()> = DiGraph::new();
    let vertices: Vec<NodeIndex> = (0..groups.len())
        .map(|g| {
            graph.add_node(SnippetGraphVertex {
                snippet_group_indexes: vec![g],
                cluster_id: None,
            })
        })
        .collect();

    // Edge x -> y if the snippets of y are contained in the snippets of x
    for (x, (long, _)) in groups.iter().enumerate() {
        for (y, (short, _)) in groups.iter().enumerate() {
            if x != y && is_approximate_subsequence(short, long, config.window, config.max_mismatch) {
                graph.add_edge(vertices[x], vertices[y], ());
            }
        }
    }

    // The graph can have cycles caused by repeats or errors.
    let condensed = condensation(graph, true);
    let mut dag = condensed.map(
        |_, merged| SnippetGraphVertex {
            snippet_group_indexes: merged
                .iter()
                .flat_map(|v| v.snippet_group_indexes.iter().copied())
                .collect(),
            cluster_id: None,
        },
        |_, _| (),
    );

    let coverage = |v: &SnippetGraphVertex| -> usize {
        v.snippet_group_indexes
            .iter()
            .map(|&g| group_coverage(groups, g))
            .sum()
    };

    let mut sources: Vec<NodeIndex> = dag
        .node_indices()
        .filter(|&v| dag.neighbors_directed(v, Incoming).next().is_none())
        .collect();
    sources.sort_by(|&a, &b| {
        coverage(&dag[b])
            .cmp(&coverage(&dag[a]))
            .then_with(|| dag[a].snippet_group_indexes.iter().min().cmp(&dag[b].snippet_group_indexes.iter().min()))
    });

    // How many sources reach each vertex
    let mut reached_by = vec![0usize; dag.node_count()];
    let mut descendants: Vec<Vec<NodeIndex>> = Vec::with_capacity(sources.len());
    for &source in &sources {
        let mut found = Vec::new();
        let mut dfs = Dfs::new(&dag, source);
        while let Some(v) = dfs.next(&dag) {
            reached_by[v.index()] += 1;
            found.push(v);
        }
        descendants.push(found);
    }

    let mut clusters = Vec::new();
    for found in descendants {
        let cluster_id = clusters.len();
        let mut members = Vec::new();
        for v in found {
            if reached_by[v.index()] == 1 {
                dag[v].cluster_id = Some(cluster_id);
                members.extend(dag[v].snippet_group_indexes.iter().copied());
            }
        }
        clusters.push(members);
    }

    let unassigned = dag
        .node_weights()
        .filter(|v| v.cluster_id.is_none())
        .count();
    if unassigned > 0 {
        log::debug!(
            "{} condensed snippet graph vertices are reachable from more than one source",
            unassigned
        );
    }
    clusters
}
