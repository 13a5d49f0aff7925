/// Marker graph edge table: for every marker graph edge, the segment that
/// contains it and its position in that segment's path.
///
/// Filled in parallel by segment; slots are disjoint because each edge belongs
/// to exactly one segment. After the fill the table is frozen into plain
/// values and every slot is checked.
use anyhow::{bail, Result};
use rayon::prelude::*;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use crate::marker_graph::MarkerGraphEdgeId;
use crate::segments::SegmentId;
use crate::vector_of_vectors::VectorOfVectors;

const UNSET: u64 = u64::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeLocation {
    pub segment_id: SegmentId,
    pub position: u32,
}

#[derive(Debug, Clone)]
pub struct MarkerGraphEdgeTable {
    locations: Vec<EdgeLocation>,
}

impl MarkerGraphEdgeTable {
    pub fn new(edge_count: usize, paths: &VectorOfVectors<MarkerGraphEdgeId>) -> Result<Self> {
        // Size phase: one slot per edge, known up front
        let segment_ids: Vec<AtomicU64> = (0..edge_count).map(|_| AtomicU64::new(UNSET)).collect();
        let positions: Vec<AtomicU32> = (0..edge_count).map(|_| AtomicU32::new(0)).collect();

        // Fill phase
        (0..paths.len()).into_par_iter().try_for_each(|segment_id| -> Result<()> {
            for (position, &edge_id) in paths[segment_id].iter().enumerate() {
                let Some(slot) = segment_ids.get(edge_id as usize) else {
                    bail!(
                        "Segment {} references marker graph edge {} beyond the {} edges of the graph",
                        segment_id,
                        edge_id,
                        edge_count
                    );
                };
                let previous = slot.swap(segment_id as u64, Ordering::Relaxed);
                if previous != UNSET {
                    bail!(
                        "Marker graph edge {} belongs to both segment {} and segment {}",
                        edge_id,
                        previous,
                        segment_id
                    );
                }
                positions[edge_id as usize].store(position as u32, Ordering::Relaxed);
            }
            Ok(())
        })?;

        // Freeze and check
        let mut locations = Vec::with_capacity(edge_count);
        for (edge_id, (segment_id, position)) in segment_ids
            .into_iter()
            .zip(positions)
            .enumerate()
        {
            let segment_id = segment_id.into_inner();
            if segment_id == UNSET {
                bail!("Marker graph edge {} is not on any segment", edge_id);
            }
            locations.push(EdgeLocation {
                segment_id,
                position: position.into_inner(),
            });
        }

        Ok(MarkerGraphEdgeTable { locations })
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn get(&self, edge_id: MarkerGraphEdgeId) -> Option<EdgeLocation> {
        self.locations.get(edge_id as usize).copied()
    }
}
