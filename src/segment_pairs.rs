//! Read-composition comparison of two segments.
//!
//! Each segment gets a table of the oriented reads on it, each with the
//! average offset of the segment start in the read's marker coordinates.
//! Comparing two such tables estimates the offset between the segments and
//! tells which reads should have appeared on both but did not.

use anyhow::{bail, Result};
use rayon::prelude::*;
use std::cmp::Ordering;

use crate::assembly_graph::AssemblyGraph;
use crate::marker_graph::OrientedReadId;
use crate::segments::SegmentId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentOrientedReadInfo {
    pub oriented_read_id: OrientedReadId,
    /// Average ordinal, in the read, of the beginning of the segment
    pub average_offset: i32,
}

/// The oriented reads on one segment, sorted by oriented read id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentOrientedReadInformation {
    pub infos: Vec<SegmentOrientedReadInfo>,
}

/// Result of comparing two segments
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentPairInformation {
    /// Oriented reads on each segment
    pub total_count: [u64; 2],

    /// Oriented reads on both segments. When zero nothing else is valid.
    pub common_count: u64,

    /// Offset of segment 1 relative to segment 0, in markers
    pub offset: Option<i64>,

    /// Reads on one segment only which, given the offset, should also
    /// have been on the other
    pub unexplained_count: [u64; 2],

    /// Reads on one segment only which are too short to reach the other
    pub short_count: [u64; 2],
}

impl SegmentPairInformation {
    /// Every read on a side is either common, unexplained or short
    pub fn check(&self) -> Result<()> {
        for i in 0..2 {
            if self.common_count + self.unexplained_count[i] + self.short_count[i]
                != self.total_count[i]
            {
                bail!(
                    "Inconsistent segment pair counts on side {}: common {} + unexplained {} + short {} != total {}",
                    i,
                    self.common_count,
                    self.unexplained_count[i],
                    self.short_count[i],
                    self.total_count[i]
                );
            }
        }
        Ok(())
    }

    /// Fraction of unexplained reads on side `i`, not counting short reads
    pub fn unexplained_fraction(&self, i: usize) -> Option<f64> {
        if self.common_count == 0 {
            return None;
        }
        Some(
            self.unexplained_count[i] as f64
                / (self.common_count + self.unexplained_count[i]) as f64,
        )
    }

    pub fn max_unexplained_fraction(&self) -> Option<f64> {
        Some(self.unexplained_fraction(0)?.max(self.unexplained_fraction(1)?))
    }

    /// Jaccard similarity, not counting short reads
    pub fn jaccard(&self) -> Option<f64> {
        if self.common_count == 0 {
            return None;
        }
        Some(
            self.common_count as f64
                / (self.common_count + self.unexplained_count[0] + self.unexplained_count[1])
                    as f64,
        )
    }
}

/// Offset of segment 1 relative to segment 0 averaged over common reads,
/// with the number of common reads. None when there are no common reads.
pub fn estimate_offset(
    info0: &SegmentOrientedReadInformation,
    info1: &SegmentOrientedReadInformation,
) -> Option<(i64, u64)> {
    let mut sum = 0i64;
    let mut common = 0u64;
    for_each_joined(info0, info1, |a, b| {
        if let (Some(a), Some(b)) = (a, b) {
            sum += b.average_offset as i64 - a.average_offset as i64;
            common += 1;
        }
    });
    if common == 0 {
        return None;
    }
    Some(((sum as f64 / common as f64).round() as i64, common))
}

/// Merge-join two sorted tables by oriented read id
fn for_each_joined<F>(
    info0: &SegmentOrientedReadInformation,
    info1: &SegmentOrientedReadInformation,
    mut f: F,
) where
    F: FnMut(Option<&SegmentOrientedReadInfo>, Option<&SegmentOrientedReadInfo>),
{
    let (a, b) = (&info0.infos, &info1.infos);
    let (mut i, mut j) = (0, 0);
    while i < a.len() || j < b.len() {
        let ordering = match (a.get(i), b.get(j)) {
            (Some(x), Some(y)) => x.oriented_read_id.cmp(&y.oriented_read_id),
            (Some(_), None) => Ordering::Less,
            _ => Ordering::Greater,
        };
        match ordering {
            Ordering::Less => {
                f(Some(&a[i]), None);
                i += 1;
            }
            Ordering::Greater => {
                f(None, Some(&b[j]));
                j += 1;
            }
            Ordering::Equal => {
                f(Some(&a[i]), Some(&b[j]));
                i += 1;
                j += 1;
            }
        }
    }
}

/// True if a segment of `segment_length` edges starting at read ordinal
/// `begin` shares at least one edge slot with a read of `read_length` markers
fn overlaps_read(begin: i64, segment_length: i64, read_length: i64) -> bool {
    begin < read_length - 1 && begin + segment_length > 0
}

impl AssemblyGraph {
    /// Build the read table of one segment from its compressed pseudopath
    /// occurrences. For each occurrence both the first and last raw entry
    /// give an estimate `ordinal - position` of where the segment begins in
    /// the read; a read visiting the segment more than once averages them all.
    pub fn get_oriented_reads_on_segment(&self, segment_id: SegmentId) -> SegmentOrientedReadInformation {
        let occurrences = self.segment_compressed_pseudo_path_info(segment_id);
        let mut infos = Vec::new();

        let mut i = 0;
        while i < occurrences.len() {
            let oriented_read_id = occurrences[i].0;
            let mut sum = 0i64;
            let mut n = 0i64;
            while i < occurrences.len() && occurrences[i].0 == oriented_read_id {
                let entry = &self.compressed_pseudo_path(oriented_read_id)[occurrences[i].1 as usize];
                for raw in &entry.pseudo_path_entries {
                    sum += raw.ordinals[0] as i64 - raw.position as i64;
                    n += 1;
                }
                i += 1;
            }
            infos.push(SegmentOrientedReadInfo {
                oriented_read_id,
                average_offset: (sum as f64 / n as f64).round() as i32,
            });
        }

        SegmentOrientedReadInformation { infos }
    }

    /// Build the read tables of all segments in parallel
    pub fn store_segment_oriented_read_information(&mut self) {
        let information: Vec<SegmentOrientedReadInformation> = (0..self.segment_count())
            .into_par_iter()
            .map(|segment_id| self.get_oriented_reads_on_segment(segment_id as SegmentId))
            .collect();
        log::debug!(
            "Stored oriented read information for {} segments",
            information.len()
        );
        self.segment_oriented_read_information = Some(information);
    }

    pub fn clear_segment_oriented_read_information(&mut self) {
        self.segment_oriented_read_information = None;
    }

    pub fn segment_oriented_read_information(
        &self,
        segment_id: SegmentId,
    ) -> Option<&SegmentOrientedReadInformation> {
        self.segment_oriented_read_information
            .as_ref()
            .map(|v| &v[segment_id as usize])
    }

    /// Compare the reads of two segments.
    ///
    /// A read present on one side only is unexplained when, placed with the
    /// estimated offset, it would cross at least one edge of the other
    /// segment; otherwise it is short.
    pub fn analyze_segment_pair(
        &self,
        segment_id0: SegmentId,
        segment_id1: SegmentId,
        info0: &SegmentOrientedReadInformation,
        info1: &SegmentOrientedReadInformation,
    ) -> Result<SegmentPairInformation> {
        let mut pair = SegmentPairInformation {
            total_count: [info0.infos.len() as u64, info1.infos.len() as u64],
            ..Default::default()
        };

        let Some((offset, common_count)) = estimate_offset(info0, info1) else {
            return Ok(pair);
        };
        pair.offset = Some(offset);
        pair.common_count = common_count;

        let length0 = self.path_length(segment_id0) as i64;
        let length1 = self.path_length(segment_id1) as i64;

        for_each_joined(info0, info1, |a, b| match (a, b) {
            (Some(a), None) => {
                let read_length = self.oriented_read_length(a.oriented_read_id) as i64;
                let begin1 = a.average_offset as i64 + offset;
                if overlaps_read(begin1, length1, read_length) {
                    pair.unexplained_count[0] += 1;
                } else {
                    pair.short_count[0] += 1;
                }
            }
            (None, Some(b)) => {
                let read_length = self.oriented_read_length(b.oriented_read_id) as i64;
                let begin0 = b.average_offset as i64 - offset;
                if overlaps_read(begin0, length0, read_length) {
                    pair.unexplained_count[1] += 1;
                } else {
                    pair.short_count[1] += 1;
                }
            }
            _ => {}
        });

        pair.check().map_err(|e| {
            e.context(format!(
                "Analyzing segment pair {} {}",
                segment_id0, segment_id1
            ))
        })?;
        Ok(pair)
    }
}
