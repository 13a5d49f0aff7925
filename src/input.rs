use anyhow::{anyhow, bail, Context, Result};
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::marker_graph::{
    MarkerGraph, MarkerGraphEdge, MarkerGraphEdgeCrossing, OrientedReadId, OrientedReadMarkers,
    OrientedReads, VertexId,
};

/// Open a file, decompressing it if the extension is .gz
pub fn open_input<P: AsRef<Path>>(path: P) -> Result<Box<dyn BufRead>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;

    let is_compressed = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext == "gz")
        .unwrap_or(false);

    if is_compressed {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

fn parse_field<T: std::str::FromStr>(fields: &[&str], i: usize, name: &str) -> Result<T> {
    let field = fields
        .get(i)
        .ok_or_else(|| anyhow!("Missing {} field", name))?;
    field
        .parse()
        .map_err(|_| anyhow!("Invalid {} '{}'", name, field))
}

/// Read a marker graph: one `edge_id source target coverage` line per edge,
/// tab separated, edge ids dense from 0 in any order. Lines starting with #
/// are ignored. Vertex ids may be sparse; they are renumbered densely in
/// increasing order.
pub fn read_marker_graph<R: BufRead>(reader: R) -> Result<MarkerGraph> {
    let mut edges: Vec<(usize, usize, MarkerGraphEdge)> = Vec::new();

    for (line_number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        let (edge_id, edge) = (|| -> Result<(usize, MarkerGraphEdge)> {
            let edge_id: usize = parse_field(&fields, 0, "edge id")?;
            let edge = MarkerGraphEdge {
                source: parse_field(&fields, 1, "source vertex")?,
                target: parse_field(&fields, 2, "target vertex")?,
                coverage: parse_field(&fields, 3, "coverage")?,
            };
            Ok((edge_id, edge))
        })()
        .with_context(|| format!("Marker graph line {}", line_number + 1))?;
        edges.push((edge_id, line_number + 1, edge));
    }

    edges.sort_by_key(|&(edge_id, line_number, _)| (edge_id, line_number));
    for (expected, &(edge_id, line_number, _)) in edges.iter().enumerate() {
        if edge_id < expected {
            bail!(
                "Marker graph edge {} is defined twice (line {})",
                edge_id,
                line_number
            );
        }
        if edge_id > expected {
            bail!("Marker graph edge {} is missing", expected);
        }
    }

    let mut vertices: Vec<VertexId> = edges
        .iter()
        .flat_map(|(_, _, edge)| [edge.source, edge.target])
        .collect();
    vertices.sort_unstable();
    vertices.dedup();
    let renumber = |vertex: VertexId| vertices.partition_point(|&v| v < vertex) as VertexId;

    let edges = edges
        .iter()
        .map(|(_, _, edge)| MarkerGraphEdge {
            source: renumber(edge.source),
            target: renumber(edge.target),
            coverage: edge.coverage,
        })
        .collect();

    MarkerGraph::new(vertices.len(), edges)
}

fn parse_crossings(field: &str) -> Result<Vec<MarkerGraphEdgeCrossing>> {
    if field == "*" || field.is_empty() {
        return Ok(Vec::new());
    }
    field
        .split(',')
        .map(|item| {
            let parts: Vec<&str> = item.split(':').collect();
            if parts.len() != 3 {
                bail!("Invalid crossing '{}', expected edge:ordinal0:ordinal1", item);
            }
            Ok(MarkerGraphEdgeCrossing {
                edge_id: parse_field(&parts, 0, "crossing edge id")?,
                ordinals: [
                    parse_field(&parts, 1, "crossing ordinal")?,
                    parse_field(&parts, 2, "crossing ordinal")?,
                ],
            })
        })
        .collect()
}

/// Read oriented reads: one `read_id strand marker_count crossings` line per
/// oriented read, tab separated. Crossings are `edge:ordinal0:ordinal1`
/// separated by commas, or `*`. Read ids are dense from 0: every read has at
/// least one line, and a strand without a line gets no markers.
pub fn read_oriented_reads<R: BufRead>(reader: R) -> Result<OrientedReads> {
    let mut lines: Vec<(OrientedReadId, usize, OrientedReadMarkers)> = Vec::new();

    for (line_number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        let (oriented_read_id, markers) = (|| -> Result<(OrientedReadId, OrientedReadMarkers)> {
            let read_id: u32 = parse_field(&fields, 0, "read id")?;
            let strand: u32 = parse_field(&fields, 1, "strand")?;
            let oriented_read_id = OrientedReadId::checked_new(read_id, strand)?;
            let marker_count = parse_field(&fields, 2, "marker count")?;
            let crossings = parse_crossings(fields.get(3).copied().unwrap_or("*"))?;
            Ok((
                oriented_read_id,
                OrientedReadMarkers {
                    marker_count,
                    crossings,
                },
            ))
        })()
        .with_context(|| format!("Oriented reads line {}", line_number + 1))?;
        lines.push((oriented_read_id, line_number + 1, markers));
    }

    lines.sort_by_key(|&(oriented_read_id, line_number, _)| (oriented_read_id, line_number));

    let mut reads: Vec<OrientedReadMarkers> = Vec::with_capacity(lines.len() * 2);
    for (oriented_read_id, line_number, markers) in lines {
        let value = oriented_read_id.value() as usize;
        if value < reads.len() {
            bail!(
                "Oriented read {} is defined twice (line {})",
                oriented_read_id,
                line_number
            );
        }
        let next_read = (reads.len() + 1) / 2;
        if oriented_read_id.read_id() as usize > next_read {
            bail!("Read {} has no oriented reads", next_read);
        }
        reads.resize(value, OrientedReadMarkers::default());
        reads.push(markers);
    }
    // Both strands of every read are present
    if reads.len() % 2 == 1 {
        reads.push(OrientedReadMarkers::default());
    }

    OrientedReads::new(reads)
}

pub fn read_marker_graph_file<P: AsRef<Path>>(path: P) -> Result<MarkerGraph> {
    let path = path.as_ref();
    read_marker_graph(open_input(path)?)
        .with_context(|| format!("Failed to read marker graph from {}", path.display()))
}

pub fn read_oriented_reads_file<P: AsRef<Path>>(path: P) -> Result<OrientedReads> {
    let path = path.as_ref();
    read_oriented_reads(open_input(path)?)
        .with_context(|| format!("Failed to read oriented reads from {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_marker_graph() {
        let text = "#edge\tsource\ttarget\tcoverage\n1\t1\t2\t7\n0\t0\t1\t5\n";
        let graph = read_marker_graph(text.as_bytes()).unwrap();
        assert_eq!(graph.vertex_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.edge(0).coverage, 5);
        assert_eq!(graph.edge(1).target, 2);
    }

    #[test]
    fn test_read_marker_graph_errors() {
        assert!(read_marker_graph("0\t0\t1\n".as_bytes()).is_err());
        assert!(read_marker_graph("1\t0\t1\t3\n".as_bytes()).is_err());
        assert!(read_marker_graph("0\t0\t1\t3\n0\t1\t2\t3\n".as_bytes()).is_err());
    }

    #[test]
    fn test_huge_edge_id_is_missing_edges_not_allocation() {
        for text in [
            "0\t0\t1\t3\n4000000000\t1\t2\t1\n",
            "0\t0\t1\t3\n18446744073709551615\t1\t2\t1\n",
        ] {
            let message = format!("{:#}", read_marker_graph(text.as_bytes()).unwrap_err());
            assert!(message.contains("edge 1 is missing"), "{message}");
        }
    }

    #[test]
    fn test_duplicate_edge_names_line() {
        let text = "1\t1\t2\t3\n0\t0\t1\t3\n1\t2\t3\t3\n";
        let message = format!("{:#}", read_marker_graph(text.as_bytes()).unwrap_err());
        assert!(message.contains("edge 1 is defined twice (line 3)"), "{message}");
    }

    #[test]
    fn test_sparse_vertex_ids_are_renumbered() {
        let text = "0\t10\t18446744073709551615\t4\n1\t18446744073709551615\t500\t4\n";
        let graph = read_marker_graph(text.as_bytes()).unwrap();
        assert_eq!(graph.vertex_count(), 3);
        assert_eq!((graph.edge(0).source, graph.edge(0).target), (0, 2));
        assert_eq!((graph.edge(1).source, graph.edge(1).target), (2, 1));
        assert_eq!(graph.out_edges(2), &[1]);
    }

    #[test]
    fn test_read_oriented_reads() {
        let text = "0\t0\t5\t0:0:1,1:1:2\n1\t1\t3\t*\n";
        let reads = read_oriented_reads(text.as_bytes()).unwrap();
        assert_eq!(reads.len(), 4);
        let r = reads.get(OrientedReadId::new(0, 0));
        assert_eq!(r.marker_count, 5);
        assert_eq!(r.crossings[1], MarkerGraphEdgeCrossing { edge_id: 1, ordinals: [1, 2] });
        assert_eq!(reads.get(OrientedReadId::new(1, 1)).marker_count, 3);
        assert_eq!(reads.get(OrientedReadId::new(0, 1)).marker_count, 0);
    }

    #[test]
    fn test_read_oriented_reads_errors() {
        assert!(read_oriented_reads("0\t2\t5\t*\n".as_bytes()).is_err());
        assert!(read_oriented_reads("0\t0\t5\t0:1\n".as_bytes()).is_err());
    }

    #[test]
    fn test_read_id_past_oriented_range() {
        let text = "0\t0\t5\t*\n2147483648\t0\t9\t*\n";
        let message = format!("{:#}", read_oriented_reads(text.as_bytes()).unwrap_err());
        assert!(message.contains("line 2"), "{message}");
        assert!(message.contains("too large"), "{message}");
    }

    #[test]
    fn test_sparse_read_ids_are_rejected() {
        let message = format!(
            "{:#}",
            read_oriented_reads("4000\t0\t1\t*\n".as_bytes()).unwrap_err()
        );
        assert!(message.contains("Read 0 has no oriented reads"), "{message}");

        let message = format!(
            "{:#}",
            read_oriented_reads("0\t1\t3\t*\n2\t0\t3\t*\n".as_bytes()).unwrap_err()
        );
        assert!(message.contains("Read 1 has no oriented reads"), "{message}");
    }

    #[test]
    fn test_duplicate_oriented_read() {
        let text = "0\t0\t5\t*\n1\t0\t3\t*\n0\t0\t6\t*\n";
        let message = format!("{:#}", read_oriented_reads(text.as_bytes()).unwrap_err());
        assert!(message.contains("Oriented read 0-0 is defined twice (line 3)"), "{message}");
    }

    #[test]
    fn test_single_strand_reads_get_both_strands() {
        let text = "1\t0\t4\t*\n0\t0\t5\t*\n";
        let reads = read_oriented_reads(text.as_bytes()).unwrap();
        assert_eq!(reads.len(), 4);
        assert_eq!(reads.get(OrientedReadId::new(1, 0)).marker_count, 4);
        assert_eq!(reads.get(OrientedReadId::new(1, 1)).marker_count, 0);
    }
}
