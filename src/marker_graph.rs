//! Input collaborators: the marker graph and the oriented reads that traverse it.
//!
//! Both are produced by the marker/alignment layer upstream. Everything here is
//! addressed by dense integer ids.

use anyhow::{bail, ensure, Result};
use std::fmt;

use crate::vector_of_vectors::VectorOfVectors;

pub type VertexId = u64;
pub type MarkerGraphEdgeId = u64;

/// A read paired with a strand, stored as `read_id * 2 + strand`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OrientedReadId(u32);

impl OrientedReadId {
    /// Largest read id that still has both strands representable
    pub const MAX_READ_ID: u32 = u32::MAX >> 1;

    /// For ids known to be in range; see `checked_new` for untrusted input
    pub fn new(read_id: u32, strand: u32) -> Self {
        debug_assert!(strand < 2 && read_id <= Self::MAX_READ_ID);
        OrientedReadId((read_id << 1) | (strand & 1))
    }

    pub fn checked_new(read_id: u32, strand: u32) -> Result<Self> {
        ensure!(strand < 2, "Strand must be 0 or 1, got {}", strand);
        ensure!(
            read_id <= Self::MAX_READ_ID,
            "Read id {} is too large, the maximum is {}",
            read_id,
            Self::MAX_READ_ID
        );
        Ok(OrientedReadId(read_id * 2 + strand))
    }

    pub fn from_value(value: u32) -> Self {
        OrientedReadId(value)
    }

    pub fn read_id(&self) -> u32 {
        self.0 >> 1
    }

    pub fn strand(&self) -> u32 {
        self.0 & 1
    }

    /// Index used by every per-oriented-read table
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for OrientedReadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.read_id(), self.strand())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerGraphEdge {
    pub source: VertexId,
    pub target: VertexId,
    pub coverage: u64,
}

/// The marker graph, with per-vertex adjacency
#[derive(Debug, Clone)]
pub struct MarkerGraph {
    vertex_count: usize,
    edges: Vec<MarkerGraphEdge>,
    edges_by_source: VectorOfVectors<MarkerGraphEdgeId>,
    edges_by_target: VectorOfVectors<MarkerGraphEdgeId>,
}

impl MarkerGraph {
    /// Build the graph. Edge ids are the indices into `edges`.
    pub fn new(vertex_count: usize, edges: Vec<MarkerGraphEdge>) -> Result<Self> {
        for (edge_id, edge) in edges.iter().enumerate() {
            ensure!(
                (edge.source as usize) < vertex_count && (edge.target as usize) < vertex_count,
                "Marker graph edge {} references vertex {}->{} but the graph has {} vertices",
                edge_id,
                edge.source,
                edge.target,
                vertex_count
            );
        }

        let edges_by_source = VectorOfVectors::from_keyed(
            vertex_count,
            edges
                .iter()
                .enumerate()
                .map(|(id, e)| (e.source as usize, id as MarkerGraphEdgeId)),
        )?;
        let edges_by_target = VectorOfVectors::from_keyed(
            vertex_count,
            edges
                .iter()
                .enumerate()
                .map(|(id, e)| (e.target as usize, id as MarkerGraphEdgeId)),
        )?;

        Ok(MarkerGraph {
            vertex_count,
            edges,
            edges_by_source,
            edges_by_target,
        })
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edge(&self, edge_id: MarkerGraphEdgeId) -> &MarkerGraphEdge {
        &self.edges[edge_id as usize]
    }

    pub fn edges(&self) -> &[MarkerGraphEdge] {
        &self.edges
    }

    pub fn out_edges(&self, vertex_id: VertexId) -> &[MarkerGraphEdgeId] {
        &self.edges_by_source[vertex_id as usize]
    }

    pub fn in_edges(&self, vertex_id: VertexId) -> &[MarkerGraphEdgeId] {
        &self.edges_by_target[vertex_id as usize]
    }

    pub fn out_degree(&self, vertex_id: VertexId) -> usize {
        self.edges_by_source.size(vertex_id as usize)
    }

    pub fn in_degree(&self, vertex_id: VertexId) -> usize {
        self.edges_by_target.size(vertex_id as usize)
    }

    /// A vertex a branch-free chain passes straight through
    pub fn is_linear(&self, vertex_id: VertexId) -> bool {
        self.in_degree(vertex_id) == 1 && self.out_degree(vertex_id) == 1
    }
}

/// One traversal of a marker graph edge by an oriented read.
/// The read has marker `ordinals[0]` at the edge source and `ordinals[1]`
/// at the edge target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerGraphEdgeCrossing {
    pub edge_id: MarkerGraphEdgeId,
    pub ordinals: [u32; 2],
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrientedReadMarkers {
    /// Length of the oriented read in markers
    pub marker_count: u32,
    /// Crossings in increasing ordinal order
    pub crossings: Vec<MarkerGraphEdgeCrossing>,
}

/// Marker-level traversals for all oriented reads, indexed by `OrientedReadId::value`
#[derive(Debug, Clone, Default)]
pub struct OrientedReads {
    reads: Vec<OrientedReadMarkers>,
}

impl OrientedReads {
    /// `reads` must hold both strands of every read: index `read_id * 2 + strand`
    pub fn new(reads: Vec<OrientedReadMarkers>) -> Result<Self> {
        ensure!(
            reads.len() % 2 == 0,
            "Expected an even number of oriented reads, got {}",
            reads.len()
        );
        Ok(OrientedReads { reads })
    }

    pub fn len(&self) -> usize {
        self.reads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reads.is_empty()
    }

    pub fn read_count(&self) -> usize {
        self.reads.len() / 2
    }

    pub fn get(&self, oriented_read_id: OrientedReadId) -> &OrientedReadMarkers {
        &self.reads[oriented_read_id.value() as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = (OrientedReadId, &OrientedReadMarkers)> {
        self.reads
            .iter()
            .enumerate()
            .map(|(i, r)| (OrientedReadId::from_value(i as u32), r))
    }

    /// Lengths in markers, indexed by `OrientedReadId::value`
    pub fn marker_counts(&self) -> Vec<u32> {
        self.reads.iter().map(|r| r.marker_count).collect()
    }

    /// Check crossings against the marker graph: edges must exist, ordinals
    /// must lie inside the read and increase along it.
    pub fn validate(&self, marker_graph: &MarkerGraph) -> Result<()> {
        for (oriented_read_id, read) in self.iter() {
            let mut previous: Option<&MarkerGraphEdgeCrossing> = None;
            for crossing in &read.crossings {
                if crossing.edge_id as usize >= marker_graph.edge_count() {
                    bail!(
                        "Oriented read {} crosses marker graph edge {} which does not exist",
                        oriented_read_id,
                        crossing.edge_id
                    );
                }
                if crossing.ordinals[0] >= crossing.ordinals[1]
                    || crossing.ordinals[1] >= read.marker_count
                {
                    bail!(
                        "Oriented read {} has invalid ordinals {:?} on marker graph edge {} (read length {} markers)",
                        oriented_read_id,
                        crossing.ordinals,
                        crossing.edge_id,
                        read.marker_count
                    );
                }
                if let Some(p) = previous {
                    if crossing.ordinals[0] < p.ordinals[1] {
                        bail!(
                            "Oriented read {} moves backward from ordinal {} to ordinal {} at marker graph edge {}",
                            oriented_read_id,
                            p.ordinals[1],
                            crossing.ordinals[0],
                            crossing.edge_id
                        );
                    }
                }
                previous = Some(crossing);
            }
        }
        Ok(())
    }
}
