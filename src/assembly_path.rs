//! Greedy assembly path extension

use ordered_float::OrderedFloat;
use std::collections::HashSet;

use crate::assembly_graph::{AssemblyGraph, Direction};
use crate::config::{AssemblyPathConfig, ExtensionPolicy};
use crate::segments::SegmentId;

impl AssemblyGraph {
    /// Create an assembly path starting at `segment_id` and extending in
    /// `direction`. Back-segments are never stepped into. Extension stops
    /// when the next segment is ambiguous under the configured policy or
    /// was already visited. The path is returned in forward order, so a
    /// backward path ends with `segment_id`.
    pub fn create_assembly_path(
        &self,
        segment_id: SegmentId,
        direction: Direction,
        config: &AssemblyPathConfig,
    ) -> Vec<SegmentId> {
        let mut path = vec![segment_id];
        let mut visited = HashSet::new();
        visited.insert(segment_id);

        let mut current = segment_id;
        while let Some(next) = self.next_path_segment(current, direction, config) {
            if !visited.insert(next) {
                break;
            }
            path.push(next);
            current = next;
        }

        if direction == Direction::Backward {
            path.reverse();
        }
        path
    }

    fn next_path_segment(
        &self,
        segment_id: SegmentId,
        direction: Direction,
        config: &AssemblyPathConfig,
    ) -> Option<SegmentId> {
        let link_ids = match direction {
            Direction::Forward => self.links_by_source(segment_id),
            Direction::Backward => self.links_by_target(segment_id),
        };

        // (neighbour, link coverage)
        let candidates: Vec<(SegmentId, u64)> = link_ids
            .iter()
            .map(|&link_id| {
                let link = self.link(link_id);
                let neighbour = match direction {
                    Direction::Forward => link.segment_id1,
                    Direction::Backward => link.segment_id0,
                };
                (neighbour, self.link_coverage(link_id))
            })
            .filter(|&(neighbour, coverage)| {
                coverage >= config.min_link_coverage && !self.is_back_segment(neighbour)
            })
            .collect();

        match config.policy {
            ExtensionPolicy::Unique => match candidates.as_slice() {
                [(neighbour, _)] => Some(*neighbour),
                _ => None,
            },
            ExtensionPolicy::BestCoverage => {
                let best = candidates.iter().map(|&(_, c)| c).max()?;
                let mut top = candidates.iter().filter(|&&(_, c)| c == best);
                let (neighbour, _) = *top.next()?;
                if top.next().is_some() {
                    return None;
                }
                Some(neighbour)
            }
        }
    }

    /// Segment ids ordered by decreasing average coverage, the usual seeds
    /// for path extension
    pub fn segments_by_coverage(&self) -> Vec<SegmentId> {
        let mut segment_ids: Vec<SegmentId> = (0..self.segment_count() as SegmentId).collect();
        segment_ids.sort_by_key(|&s| (std::cmp::Reverse(OrderedFloat(self.segment_coverage(s))), s));
        segment_ids
    }
}
