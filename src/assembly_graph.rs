//! The assembly graph: segments and links.
//!
//! A segment corresponds to a linear sequence of marker graph edges without
//! branches. Links are created from read transitions between segments.
//! Segments and links are immutable once the graph is built.

use anyhow::{anyhow, Result};
use std::collections::{BTreeSet, VecDeque};
use std::str::FromStr;
use std::time::Instant;

use crate::config::AssemblyGraphConfig;
use crate::edge_table::{EdgeLocation, MarkerGraphEdgeTable};
use crate::links::{self, Link, LinkId, Transition};
use crate::marker_graph::{MarkerGraph, MarkerGraphEdgeId, OrientedReadId, OrientedReads};
use crate::pseudo_path::{self, CompressedPseudoPathEntry};
use crate::segment_pairs::SegmentOrientedReadInformation;
use crate::segments::{self, SegmentId};
use crate::vector_of_vectors::VectorOfVectors;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl FromStr for Direction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "forward" | "f" => Ok(Direction::Forward),
            "backward" | "b" => Ok(Direction::Backward),
            _ => Err(anyhow!("Invalid direction '{s}'. Use: forward or backward")),
        }
    }
}

pub struct AssemblyGraph {
    pub(crate) paths: VectorOfVectors<MarkerGraphEdgeId>,
    pub(crate) segment_coverage: Vec<f32>,
    pub(crate) edge_table: MarkerGraphEdgeTable,

    /// Indexed by `OrientedReadId::value`
    pub(crate) compressed_pseudo_paths: VectorOfVectors<CompressedPseudoPathEntry>,
    pub(crate) oriented_read_lengths: Vec<u32>,

    /// For each segment, (oriented read, position in its compressed pseudopath)
    pub(crate) segment_compressed_pseudo_path_info: VectorOfVectors<(OrientedReadId, u64)>,

    pub(crate) links: Vec<Link>,
    /// Indexed by link id
    pub(crate) transitions: VectorOfVectors<(OrientedReadId, Transition)>,
    pub(crate) links_by_source: VectorOfVectors<LinkId>,
    pub(crate) links_by_target: VectorOfVectors<LinkId>,
    pub(crate) is_back_segment: Vec<bool>,

    /// Only present while an analysis needs it
    pub(crate) segment_oriented_read_information: Option<Vec<SegmentOrientedReadInformation>>,

    /// Set by segment clustering
    pub(crate) cluster_ids: Vec<Option<u64>>,
}

impl AssemblyGraph {
    pub fn new(
        marker_graph: &MarkerGraph,
        reads: &OrientedReads,
        config: &AssemblyGraphConfig,
    ) -> Result<Self> {
        let start = Instant::now();
        reads.validate(marker_graph)?;

        let paths = segments::create_segment_paths(marker_graph)?;
        let segment_coverage = segments::compute_segment_coverage(marker_graph, &paths);
        log::info!(
            "Found {} segments from {} marker graph edges",
            paths.len(),
            marker_graph.edge_count()
        );

        let edge_table = MarkerGraphEdgeTable::new(marker_graph.edge_count(), &paths)?;

        let pseudo_paths = pseudo_path::compute_pseudo_paths(reads, &edge_table)?;
        let compressed_pseudo_paths = pseudo_path::compute_compressed_pseudo_paths(&pseudo_paths)?;
        log::debug!(
            "Pseudopaths: {} entries, {} compressed entries for {} oriented reads",
            pseudo_paths.total_size(),
            compressed_pseudo_paths.total_size(),
            reads.len()
        );
        drop(pseudo_paths);

        let empty_reads = compressed_pseudo_paths
            .iter()
            .filter(|path| path.is_empty())
            .count();
        if empty_reads > 0 {
            log::warn!("{} oriented reads do not visit any segment", empty_reads);
        }

        let segment_compressed_pseudo_path_info =
            pseudo_path::compute_segment_compressed_pseudo_path_info(
                paths.len(),
                &compressed_pseudo_paths,
            )?;

        let transition_map = links::find_transitions(&compressed_pseudo_paths)?;
        let (links, transitions) = links::create_links(&transition_map, config.min_link_coverage);
        log::info!(
            "Created {} links from {} segment pairs with transitions (minimum coverage {})",
            links.len(),
            transition_map.len(),
            config.min_link_coverage
        );
        drop(transition_map);

        let (links_by_source, links_by_target) = links::create_connectivity(paths.len(), &links)?;
        let is_back_segment = links::flag_back_segments(&links, &links_by_source, &links_by_target);
        log::info!(
            "Flagged {} back-segments",
            is_back_segment.iter().filter(|&&b| b).count()
        );

        let segment_count = paths.len();
        log::info!(
            "Assembly graph created in {:.2}s",
            start.elapsed().as_secs_f64()
        );

        Ok(AssemblyGraph {
            paths,
            segment_coverage,
            edge_table,
            compressed_pseudo_paths,
            oriented_read_lengths: reads.marker_counts(),
            segment_compressed_pseudo_path_info,
            links,
            transitions,
            links_by_source,
            links_by_target,
            is_back_segment,
            segment_oriented_read_information: None,
            cluster_ids: vec![None; segment_count],
        })
    }

    pub fn segment_count(&self) -> usize {
        self.paths.len()
    }

    /// Marker graph edges of a segment
    pub fn path(&self, segment_id: SegmentId) -> &[MarkerGraphEdgeId] {
        &self.paths[segment_id as usize]
    }

    pub fn path_length(&self, segment_id: SegmentId) -> u64 {
        self.paths.size(segment_id as usize) as u64
    }

    pub fn segment_coverage(&self, segment_id: SegmentId) -> f32 {
        self.segment_coverage[segment_id as usize]
    }

    pub fn edge_table(&self) -> &MarkerGraphEdgeTable {
        &self.edge_table
    }

    pub fn edge_location(&self, edge_id: MarkerGraphEdgeId) -> Option<EdgeLocation> {
        self.edge_table.get(edge_id)
    }

    pub fn oriented_read_count(&self) -> usize {
        self.compressed_pseudo_paths.len()
    }

    pub fn oriented_read_length(&self, oriented_read_id: OrientedReadId) -> u32 {
        self.oriented_read_lengths[oriented_read_id.value() as usize]
    }

    pub fn compressed_pseudo_path(&self, oriented_read_id: OrientedReadId) -> &[CompressedPseudoPathEntry] {
        &self.compressed_pseudo_paths[oriented_read_id.value() as usize]
    }

    /// Where a segment appears in compressed pseudopaths
    pub fn segment_compressed_pseudo_path_info(&self, segment_id: SegmentId) -> &[(OrientedReadId, u64)] {
        &self.segment_compressed_pseudo_path_info[segment_id as usize]
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn link(&self, link_id: LinkId) -> &Link {
        &self.links[link_id as usize]
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn link_coverage(&self, link_id: LinkId) -> u64 {
        self.transitions.size(link_id as usize) as u64
    }

    pub fn link_transitions(&self, link_id: LinkId) -> &[(OrientedReadId, Transition)] {
        &self.transitions[link_id as usize]
    }

    pub fn link_separation(&self, link_id: LinkId) -> Option<f64> {
        let link = self.link(link_id);
        links::link_separation(self.link_transitions(link_id), self.path_length(link.segment_id0))
    }

    pub fn links_by_source(&self, segment_id: SegmentId) -> &[LinkId] {
        &self.links_by_source[segment_id as usize]
    }

    pub fn links_by_target(&self, segment_id: SegmentId) -> &[LinkId] {
        &self.links_by_target[segment_id as usize]
    }

    pub fn is_back_segment(&self, segment_id: SegmentId) -> bool {
        self.is_back_segment[segment_id as usize]
    }

    /// Neighbours in the given direction, through links with at least
    /// `min_link_coverage` transitions
    pub fn children_or_parents(
        &self,
        segment_id: SegmentId,
        direction: Direction,
        min_link_coverage: u64,
    ) -> Vec<SegmentId> {
        let link_ids = match direction {
            Direction::Forward => self.links_by_source(segment_id),
            Direction::Backward => self.links_by_target(segment_id),
        };
        link_ids
            .iter()
            .filter(|&&link_id| self.link_coverage(link_id) >= min_link_coverage)
            .map(|&link_id| {
                let link = self.link(link_id);
                match direction {
                    Direction::Forward => link.segment_id1,
                    Direction::Backward => link.segment_id0,
                }
            })
            .collect()
    }

    pub fn children(&self, segment_id: SegmentId, min_link_coverage: u64) -> Vec<SegmentId> {
        self.children_or_parents(segment_id, Direction::Forward, min_link_coverage)
    }

    pub fn parents(&self, segment_id: SegmentId, min_link_coverage: u64) -> Vec<SegmentId> {
        self.children_or_parents(segment_id, Direction::Backward, min_link_coverage)
    }

    /// Segments reachable from `segment_id` in at most `max_distance` links,
    /// excluding `segment_id` itself. Sorted.
    pub fn find_descendants(
        &self,
        segment_id: SegmentId,
        max_distance: u64,
        min_link_coverage: u64,
    ) -> Vec<SegmentId> {
        let mut found = BTreeSet::new();
        let mut queue = VecDeque::new();
        queue.push_back((segment_id, 0u64));
        found.insert(segment_id);

        while let Some((current, distance)) = queue.pop_front() {
            if distance == max_distance {
                continue;
            }
            for child in self.children(current, min_link_coverage) {
                if found.insert(child) {
                    queue.push_back((child, distance + 1));
                }
            }
        }

        found.remove(&segment_id);
        found.into_iter().collect()
    }

    /// Distinct oriented reads on a segment, sorted
    pub fn oriented_reads_on_segment(&self, segment_id: SegmentId) -> Vec<OrientedReadId> {
        let mut reads: Vec<OrientedReadId> = self
            .segment_compressed_pseudo_path_info(segment_id)
            .iter()
            .map(|&(oriented_read_id, _)| oriented_read_id)
            .collect();
        reads.dedup();
        reads
    }

    /// Cluster assigned by the last segment clustering run
    pub fn cluster_id(&self, segment_id: SegmentId) -> Option<u64> {
        self.cluster_ids[segment_id as usize]
    }
}
