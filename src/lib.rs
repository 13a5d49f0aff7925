// Library exports for seggraph
pub mod assembly_graph;
pub mod assembly_path;
pub mod clustering;
pub mod config;
pub mod edge_table;
pub mod gfa;
pub mod input;
pub mod links;
pub mod marker_graph;
pub mod pseudo_path;
pub mod segment_pairs;
pub mod segments;
pub mod snippets;
pub mod union_find;
pub mod vector_of_vectors;

pub use assembly_graph::{AssemblyGraph, Direction};
pub use marker_graph::{MarkerGraph, OrientedReadId, OrientedReads};
pub use segments::SegmentId;
