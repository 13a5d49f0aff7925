//! Pseudopaths: the sequence of segments each oriented read passes through.
//!
//! The raw pseudopath of an oriented read has one entry per marker graph edge
//! the read crosses, located by segment and position in the segment. The
//! compressed pseudopath keeps one entry per run of consecutive raw entries on
//! the same segment. A segment can appear more than once in a compressed
//! pseudopath when the read goes around a cycle.

use anyhow::{bail, Result};
use std::cmp::Ordering;

use crate::edge_table::MarkerGraphEdgeTable;
use crate::marker_graph::{OrientedReadId, OrientedReads};
use crate::segments::SegmentId;
use crate::vector_of_vectors::VectorOfVectors;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PseudoPathEntry {
    pub segment_id: SegmentId,
    /// Position of the marker graph edge in the segment path
    pub position: u32,
    /// Read ordinals at the source and target of the marker graph edge
    pub ordinals: [u32; 2],
}

impl PartialOrd for PseudoPathEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PseudoPathEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ordinals
            .cmp(&other.ordinals)
            .then_with(|| self.segment_id.cmp(&other.segment_id))
            .then_with(|| self.position.cmp(&other.position))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompressedPseudoPathEntry {
    pub segment_id: SegmentId,
    /// First and last raw entry of the run
    pub pseudo_path_entries: [PseudoPathEntry; 2],
    /// Index range of the run in the raw pseudopath, end exclusive
    pub begin: u32,
    pub end: u32,
}

impl CompressedPseudoPathEntry {
    pub fn first(&self) -> &PseudoPathEntry {
        &self.pseudo_path_entries[0]
    }

    pub fn last(&self) -> &PseudoPathEntry {
        &self.pseudo_path_entries[1]
    }
}

/// Compute the raw pseudopaths of all oriented reads, indexed by
/// `OrientedReadId::value`. Counts per read, allocates, fills, then sorts
/// each read's entries by ordinal and checks they strictly increase.
pub fn compute_pseudo_paths(
    reads: &OrientedReads,
    edge_table: &MarkerGraphEdgeTable,
) -> Result<VectorOfVectors<PseudoPathEntry>> {
    let mut pseudo_paths = VectorOfVectors::build_parallel(
        reads.len(),
        |i| {
            let read = reads.get(OrientedReadId::from_value(i as u32));
            let mut count = 0;
            for crossing in &read.crossings {
                if edge_table.get(crossing.edge_id).is_none() {
                    bail!(
                        "Oriented read {} crosses marker graph edge {} which has no segment",
                        OrientedReadId::from_value(i as u32),
                        crossing.edge_id
                    );
                }
                count += 1;
            }
            Ok(count)
        },
        |i, entries| {
            let read = reads.get(OrientedReadId::from_value(i as u32));
            if entries.len() != read.crossings.len() {
                bail!(
                    "Pseudopath of oriented read {} sized for {} entries but has {} crossings",
                    OrientedReadId::from_value(i as u32),
                    entries.len(),
                    read.crossings.len()
                );
            }
            for (entry, crossing) in entries.iter_mut().zip(&read.crossings) {
                let Some(location) = edge_table.get(crossing.edge_id) else {
                    bail!("Marker graph edge {} has no segment", crossing.edge_id);
                };
                *entry = PseudoPathEntry {
                    segment_id: location.segment_id,
                    position: location.position,
                    ordinals: crossing.ordinals,
                };
            }
            Ok(())
        },
    )?;

    sort_pseudo_paths(&mut pseudo_paths);
    check_pseudo_paths(&pseudo_paths)?;
    Ok(pseudo_paths)
}

pub fn sort_pseudo_paths(pseudo_paths: &mut VectorOfVectors<PseudoPathEntry>) {
    pseudo_paths.par_for_each_mut(|_, entries| entries.sort_unstable());
}

/// First ordinals must strictly increase along each pseudopath
pub fn check_pseudo_paths(pseudo_paths: &VectorOfVectors<PseudoPathEntry>) -> Result<()> {
    for (i, entries) in pseudo_paths.iter().enumerate() {
        for pair in entries.windows(2) {
            if pair[1].ordinals[0] <= pair[0].ordinals[0] {
                bail!(
                    "Pseudopath of oriented read {} is not ordered: ordinal {} on segment {} follows ordinal {} on segment {}",
                    OrientedReadId::from_value(i as u32),
                    pair[1].ordinals[0],
                    pair[1].segment_id,
                    pair[0].ordinals[0],
                    pair[0].segment_id
                );
            }
        }
    }
    Ok(())
}

/// Number of runs of equal segment ids
fn count_runs(pseudo_path: &[PseudoPathEntry]) -> usize {
    if pseudo_path.is_empty() {
        return 0;
    }
    1 + pseudo_path
        .windows(2)
        .filter(|pair| pair[0].segment_id != pair[1].segment_id)
        .count()
}

/// Compress one pseudopath into runs of entries on the same segment
pub fn compress_pseudo_path(pseudo_path: &[PseudoPathEntry]) -> Vec<CompressedPseudoPathEntry> {
    let mut compressed = Vec::with_capacity(count_runs(pseudo_path));
    let mut begin = 0;
    for i in 1..=pseudo_path.len() {
        if i == pseudo_path.len() || pseudo_path[i].segment_id != pseudo_path[begin].segment_id {
            compressed.push(CompressedPseudoPathEntry {
                segment_id: pseudo_path[begin].segment_id,
                pseudo_path_entries: [pseudo_path[begin], pseudo_path[i - 1]],
                begin: begin as u32,
                end: i as u32,
            });
            begin = i;
        }
    }
    compressed
}

pub fn compute_compressed_pseudo_paths(
    pseudo_paths: &VectorOfVectors<PseudoPathEntry>,
) -> Result<VectorOfVectors<CompressedPseudoPathEntry>> {
    VectorOfVectors::build_parallel(
        pseudo_paths.len(),
        |i| Ok(count_runs(&pseudo_paths[i])),
        |i, slice| {
            let compressed = compress_pseudo_path(&pseudo_paths[i]);
            slice.copy_from_slice(&compressed);
            Ok(())
        },
    )
}

/// For each segment, the (oriented read, position in compressed pseudopath)
/// pairs where it appears, sorted.
pub fn compute_segment_compressed_pseudo_path_info(
    segment_count: usize,
    compressed_pseudo_paths: &VectorOfVectors<CompressedPseudoPathEntry>,
) -> Result<VectorOfVectors<(OrientedReadId, u64)>> {
    let items = compressed_pseudo_paths
        .iter()
        .enumerate()
        .flat_map(|(i, path)| {
            path.iter().enumerate().map(move |(position, entry)| {
                (
                    entry.segment_id as usize,
                    (OrientedReadId::from_value(i as u32), position as u64),
                )
            })
        });
    let mut info = VectorOfVectors::from_keyed(segment_count, items)?;
    info.par_for_each_mut(|_, v| v.sort_unstable());
    Ok(info)
}
