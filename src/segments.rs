//! Segment construction: every maximal branch-free chain of marker graph
//! edges becomes one segment.

use anyhow::{bail, Result};
use rayon::prelude::*;

use crate::marker_graph::{MarkerGraph, MarkerGraphEdgeId};
use crate::vector_of_vectors::VectorOfVectors;

pub type SegmentId = u64;

/// Find the marker graph paths of all segments, indexed by segment id.
///
/// A chain starts at any edge whose source vertex is not linear and extends
/// forward through linear vertices. Edges left over after that belong to
/// isolated cycles made entirely of linear vertices; each such cycle becomes
/// one segment starting at its lowest edge id. Segment ids follow the id of
/// the first edge of each chain.
pub fn create_segment_paths(marker_graph: &MarkerGraph) -> Result<VectorOfVectors<MarkerGraphEdgeId>> {
    let edge_count = marker_graph.edge_count();
    let mut visited = vec![false; edge_count];
    let mut paths: Vec<Vec<MarkerGraphEdgeId>> = Vec::new();

    for start in 0..edge_count as MarkerGraphEdgeId {
        if visited[start as usize] {
            continue;
        }
        if marker_graph.is_linear(marker_graph.edge(start).source) {
            continue;
        }
        paths.push(walk_chain(marker_graph, start, &mut visited)?);
    }

    // Isolated cycles
    let mut cycle_count = 0;
    for start in 0..edge_count as MarkerGraphEdgeId {
        if !visited[start as usize] {
            paths.push(walk_chain(marker_graph, start, &mut visited)?);
            cycle_count += 1;
        }
    }
    if cycle_count > 0 {
        log::debug!("Found {} segments that are isolated cycles", cycle_count);
    }

    let paths = VectorOfVectors::from_vecs(paths);
    check_segment_paths(marker_graph, &paths)?;
    Ok(paths)
}

/// Follow a chain forward from `start` through linear vertices
fn walk_chain(
    marker_graph: &MarkerGraph,
    start: MarkerGraphEdgeId,
    visited: &mut [bool],
) -> Result<Vec<MarkerGraphEdgeId>> {
    let mut path = vec![start];
    visited[start as usize] = true;

    let mut vertex = marker_graph.edge(start).target;
    while marker_graph.is_linear(vertex) {
        let next = marker_graph.out_edges(vertex)[0];
        if next == start {
            break;
        }
        if visited[next as usize] {
            bail!(
                "Marker graph edge {} reached twice while walking the chain starting at edge {}",
                next,
                start
            );
        }
        visited[next as usize] = true;
        path.push(next);
        vertex = marker_graph.edge(next).target;
    }
    Ok(path)
}

/// Every consecutive edge pair must be joined by a vertex with in-degree and
/// out-degree exactly one.
pub fn check_segment_paths(
    marker_graph: &MarkerGraph,
    paths: &VectorOfVectors<MarkerGraphEdgeId>,
) -> Result<()> {
    for (segment_id, path) in paths.iter().enumerate() {
        if path.is_empty() {
            bail!("Segment {} has an empty marker graph path", segment_id);
        }
        for pair in path.windows(2) {
            let vertex = marker_graph.edge(pair[0]).target;
            if marker_graph.edge(pair[1]).source != vertex {
                bail!(
                    "Segment {} is discontinuous between marker graph edges {} and {}",
                    segment_id,
                    pair[0],
                    pair[1]
                );
            }
            if !marker_graph.is_linear(vertex) {
                bail!(
                    "Segment {} has interior vertex {} with in-degree {} and out-degree {}",
                    segment_id,
                    vertex,
                    marker_graph.in_degree(vertex),
                    marker_graph.out_degree(vertex)
                );
            }
        }
    }
    Ok(())
}

/// Average marker graph edge coverage of each segment path
pub fn compute_segment_coverage(
    marker_graph: &MarkerGraph,
    paths: &VectorOfVectors<MarkerGraphEdgeId>,
) -> Vec<f32> {
    (0..paths.len())
        .into_par_iter()
        .map(|segment_id| {
            let path = &paths[segment_id];
            if path.is_empty() {
                return 0.0;
            }
            let sum: u64 = path
                .iter()
                .map(|&edge_id| marker_graph.edge(edge_id).coverage)
                .sum();
            (sum as f64 / path.len() as f64) as f32
        })
        .collect()
}
