//! Transitions between segments and the links created from them.
//!
//! If an oriented read enters segment 1 immediately after leaving segment 0 we
//! say there is a transition 0->1. A link 0->1 is created when there are
//! enough such transitions.

use anyhow::{bail, Result};
use rayon::prelude::*;
use std::collections::BTreeMap;

use crate::marker_graph::OrientedReadId;
use crate::pseudo_path::{CompressedPseudoPathEntry, PseudoPathEntry};
use crate::segments::SegmentId;
use crate::vector_of_vectors::VectorOfVectors;

pub type LinkId = u64;
pub type SegmentPair = (SegmentId, SegmentId);

/// The last pseudopath entry on the segment being left and the first entry
/// on the segment being entered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Transition {
    pub leaving: PseudoPathEntry,
    pub entering: PseudoPathEntry,
}

impl Transition {
    pub fn new(leaving: PseudoPathEntry, entering: PseudoPathEntry) -> Self {
        Transition { leaving, entering }
    }
}

pub type Transitions = Vec<(OrientedReadId, Transition)>;
pub type TransitionMap = BTreeMap<SegmentPair, Transitions>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Link {
    pub segment_id0: SegmentId,
    pub segment_id1: SegmentId,
}

/// Find all transitions, keyed by segment pair.
///
/// Each rayon worker fills a private map for the reads it processes; the
/// private maps are merged on the calling thread afterwards and each bucket
/// is sorted so the result does not depend on scheduling.
pub fn find_transitions(
    compressed_pseudo_paths: &VectorOfVectors<CompressedPseudoPathEntry>,
) -> Result<TransitionMap> {
    let worker_maps: Vec<TransitionMap> = (0..compressed_pseudo_paths.len())
        .into_par_iter()
        .try_fold(TransitionMap::new, |mut map, i| -> Result<TransitionMap> {
            let oriented_read_id = OrientedReadId::from_value(i as u32);
            for pair in compressed_pseudo_paths[i].windows(2) {
                let (previous, next) = (&pair[0], &pair[1]);
                if previous.segment_id == next.segment_id {
                    continue;
                }
                let transition = Transition::new(*previous.last(), *next.first());
                if transition.entering.ordinals[0] < transition.leaving.ordinals[1] {
                    bail!(
                        "Oriented read {} moves backward from segment {} (ordinal {}) to segment {} (ordinal {})",
                        oriented_read_id,
                        previous.segment_id,
                        transition.leaving.ordinals[1],
                        next.segment_id,
                        transition.entering.ordinals[0]
                    );
                }
                map.entry((previous.segment_id, next.segment_id))
                    .or_default()
                    .push((oriented_read_id, transition));
            }
            Ok(map)
        })
        .collect::<Result<Vec<_>>>()?;

    let mut transition_map = TransitionMap::new();
    for worker_map in worker_maps {
        for (segment_pair, transitions) in worker_map {
            transition_map
                .entry(segment_pair)
                .or_default()
                .extend(transitions);
        }
    }
    for transitions in transition_map.values_mut() {
        transitions.sort_unstable();
    }
    Ok(transition_map)
}

/// Create a link for each segment pair with at least `min_coverage`
/// transitions. Returns the links and, indexed by link id, their transitions.
pub fn create_links(
    transition_map: &TransitionMap,
    min_coverage: u64,
) -> (Vec<Link>, VectorOfVectors<(OrientedReadId, Transition)>) {
    let mut links = Vec::new();
    let mut link_transitions = Vec::new();
    for (&(segment_id0, segment_id1), transitions) in transition_map {
        if (transitions.len() as u64) < min_coverage {
            continue;
        }
        links.push(Link {
            segment_id0,
            segment_id1,
        });
        link_transitions.push(transitions.clone());
    }
    (links, VectorOfVectors::from_vecs(link_transitions))
}

/// Links by source segment and by target segment
pub fn create_connectivity(
    segment_count: usize,
    links: &[Link],
) -> Result<(VectorOfVectors<LinkId>, VectorOfVectors<LinkId>)> {
    let links_by_source = VectorOfVectors::from_keyed(
        segment_count,
        links
            .iter()
            .enumerate()
            .map(|(link_id, link)| (link.segment_id0 as usize, link_id as LinkId)),
    )?;
    let links_by_target = VectorOfVectors::from_keyed(
        segment_count,
        links
            .iter()
            .enumerate()
            .map(|(link_id, link)| (link.segment_id1 as usize, link_id as LinkId)),
    )?;
    Ok((links_by_source, links_by_target))
}

/// A back-segment has exactly one incoming and one outgoing link, and both
/// go to/from the same segment. This is the signature of a short repeat.
pub fn flag_back_segments(
    links: &[Link],
    links_by_source: &VectorOfVectors<LinkId>,
    links_by_target: &VectorOfVectors<LinkId>,
) -> Vec<bool> {
    (0..links_by_source.len())
        .map(|segment_id| {
            let outgoing = &links_by_source[segment_id];
            let incoming = &links_by_target[segment_id];
            if outgoing.len() != 1 || incoming.len() != 1 {
                return false;
            }
            let next = links[outgoing[0] as usize].segment_id1;
            let previous = links[incoming[0] as usize].segment_id0;
            next == previous && next != segment_id as SegmentId
        })
        .collect()
}

/// Estimated number of markers between the end of segment 0 and the
/// beginning of segment 1, averaged over the transitions of a link.
/// Negative values mean the two segments overlap.
pub fn link_separation(
    transitions: &[(OrientedReadId, Transition)],
    path_length0: u64,
) -> Option<f64> {
    if transitions.is_empty() {
        return None;
    }
    let sum: f64 = transitions
        .iter()
        .map(|(_, t)| {
            debug_assert!(t.entering.ordinals[0] >= t.leaving.ordinals[1]);
            let separation = (t.entering.ordinals[0] as i64 - t.leaving.ordinals[1] as i64)
                - (path_length0 as i64 - 1 - t.leaving.position as i64)
                - t.entering.position as i64;
            separation as f64
        })
        .sum();
    Some(sum / transitions.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pseudo_path::compress_pseudo_path;

    fn entry(segment_id: u64, position: u32, ordinals: [u32; 2]) -> PseudoPathEntry {
        PseudoPathEntry {
            segment_id,
            position,
            ordinals,
        }
    }

    fn link(segment_id0: u64, segment_id1: u64) -> Link {
        Link {
            segment_id0,
            segment_id1,
        }
    }

    #[test]
    fn test_find_transitions() {
        let read0 = compress_pseudo_path(&[
            entry(0, 0, [0, 1]),
            entry(0, 1, [1, 2]),
            entry(1, 0, [3, 4]),
        ]);
        let read1 = compress_pseudo_path(&[entry(0, 1, [0, 1]), entry(1, 0, [1, 2])]);
        let paths = VectorOfVectors::from_vecs(vec![read0, vec![], read1]);

        let map = find_transitions(&paths).unwrap();
        assert_eq!(map.len(), 1);
        let transitions = &map[&(0, 1)];
        assert_eq!(transitions.len(), 2);
        assert_eq!(transitions[0].0, OrientedReadId::from_value(0));
        assert_eq!(transitions[0].1.leaving, entry(0, 1, [1, 2]));
        assert_eq!(transitions[0].1.entering, entry(1, 0, [3, 4]));
    }

    #[test]
    fn test_backward_transition_is_fatal() {
        let mut read = compress_pseudo_path(&[entry(0, 0, [0, 5]), entry(1, 0, [6, 7])]);
        read[1].pseudo_path_entries[0].ordinals = [3, 7];
        let paths = VectorOfVectors::from_vecs(vec![read]);
        assert!(find_transitions(&paths).is_err());
    }

    #[test]
    fn test_create_links_threshold() {
        let mut map = TransitionMap::new();
        let t = Transition::default();
        map.insert((0, 1), vec![(OrientedReadId::from_value(0), t); 3]);
        map.insert((1, 2), vec![(OrientedReadId::from_value(0), t); 1]);

        let (links, transitions) = create_links(&map, 2);
        assert_eq!(links, vec![link(0, 1)]);
        assert_eq!(transitions.size(0), 3);
    }

    #[test]
    fn test_back_segments() {
        // 0 -> 1 -> 0 makes 1 a back-segment of 0; 0 also has another
        // outgoing link so 0 is not flagged.
        let links = vec![link(0, 1), link(1, 0), link(0, 2)];
        let (by_source, by_target) = create_connectivity(3, &links).unwrap();
        let flags = flag_back_segments(&links, &by_source, &by_target);
        assert_eq!(flags, vec![false, true, false]);
    }

    #[test]
    fn test_two_incoming_never_back_segment() {
        let links = vec![link(0, 2), link(1, 2), link(2, 0)];
        let (by_source, by_target) = create_connectivity(3, &links).unwrap();
        let flags = flag_back_segments(&links, &by_source, &by_target);
        assert!(!flags[2]);
    }

    #[test]
    fn test_link_separation() {
        // Segment 0 has 4 edges. The read leaves it at position 2 (one edge
        // before the end) and enters segment 1 at position 1.
        let transition = Transition::new(entry(0, 2, [10, 11]), entry(1, 1, [15, 16]));
        let transitions = vec![(OrientedReadId::from_value(0), transition)];
        // (15 - 11) - (4 - 1 - 2) - 1 = 2
        assert_eq!(link_separation(&transitions, 4), Some(2.0));
        assert_eq!(link_separation(&[], 4), None);
    }
}
