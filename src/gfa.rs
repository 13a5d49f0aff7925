/// GFA 1.0 output of the assembly graph
///
/// One `S` line per segment with a `*` placeholder sequence, the path length
/// in marker graph edges (`LN:i`) and the average coverage (`DP:f`). One `L`
/// line per link with its coverage (`RC:i`) and estimated separation in
/// markers (`SP:f`).
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::assembly_graph::AssemblyGraph;
use crate::links::LinkId;
use crate::segments::SegmentId;

impl AssemblyGraph {
    pub fn write_gfa<W: Write>(&self, writer: &mut W) -> Result<()> {
        writeln!(writer, "H\tVN:Z:1.0")?;

        for segment_id in 0..self.segment_count() as SegmentId {
            writeln!(
                writer,
                "S\t{}\t*\tLN:i:{}\tDP:f:{:.2}",
                segment_id,
                self.path_length(segment_id),
                self.segment_coverage(segment_id)
            )?;
        }

        for link_id in 0..self.link_count() as LinkId {
            let link = self.link(link_id);
            write!(
                writer,
                "L\t{}\t+\t{}\t+\t0M\tRC:i:{}",
                link.segment_id0,
                link.segment_id1,
                self.link_coverage(link_id)
            )?;
            if let Some(separation) = self.link_separation(link_id) {
                write!(writer, "\tSP:f:{:.1}", separation)?;
            }
            writeln!(writer)?;
        }
        Ok(())
    }

    pub fn write_gfa_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("Failed to create GFA file {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        self.write_gfa(&mut writer)?;
        writer.flush()?;
        log::info!(
            "Wrote {} segments and {} links to {}",
            self.segment_count(),
            self.link_count(),
            path.display()
        );
        Ok(())
    }
}
