//! Segment clustering by read composition.
//!
//! Two segments are paired when they share enough oriented reads and few
//! reads on either side are unexplained. Connected pairs form clusters.

use anyhow::{anyhow, Context, Result};
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::assembly_graph::AssemblyGraph;
use crate::config::SegmentClusteringConfig;
use crate::segments::SegmentId;
use crate::union_find::UnionFind;

impl AssemblyGraph {
    /// Descendants of `segment_id0` within `config.max_distance` that pair
    /// with it. Requires stored segment read information.
    pub fn find_segment_pairs(
        &self,
        segment_id0: SegmentId,
        config: &SegmentClusteringConfig,
    ) -> Result<Vec<SegmentId>> {
        let information = self
            .segment_oriented_read_information
            .as_ref()
            .ok_or_else(|| anyhow!("Segment oriented read information is not stored"))?;
        let info0 = &information[segment_id0 as usize];

        let mut segment_ids1 = Vec::new();
        for segment_id1 in
            self.find_descendants(segment_id0, config.max_distance, config.min_link_coverage)
        {
            let info1 = &information[segment_id1 as usize];
            let pair = self.analyze_segment_pair(segment_id0, segment_id1, info0, info1)?;
            if pair.common_count < config.min_common_count {
                continue;
            }
            let Some(max_unexplained) = pair.max_unexplained_fraction() else {
                continue;
            };
            if max_unexplained <= config.max_unexplained_fraction {
                segment_ids1.push(segment_id1);
            }
        }
        Ok(segment_ids1)
    }

    /// Cluster segments and record each segment's cluster id.
    ///
    /// Returns the clusters, each sorted, largest first. Clusters smaller than
    /// `config.min_cluster_size` are discarded and their segments stay
    /// unclustered. Read tables are built for the run if not already stored
    /// and released afterwards.
    pub fn cluster_segments(&mut self, config: &SegmentClusteringConfig) -> Result<Vec<Vec<SegmentId>>> {
        config.validate()?;
        let stored_here = self.segment_oriented_read_information.is_none();
        if stored_here {
            self.store_segment_oriented_read_information();
        }
        let clusters = self.find_segment_clusters(config);
        if stored_here {
            self.clear_segment_oriented_read_information();
        }
        let clusters = clusters?;

        self.cluster_ids = vec![None; self.segment_count()];
        for (cluster_id, cluster) in clusters.iter().enumerate() {
            for &segment_id in cluster {
                self.cluster_ids[segment_id as usize] = Some(cluster_id as u64);
            }
        }
        log::info!(
            "Found {} segment clusters covering {} segments",
            clusters.len(),
            clusters.iter().map(|c| c.len()).sum::<usize>()
        );
        Ok(clusters)
    }

    fn find_segment_clusters(&self, config: &SegmentClusteringConfig) -> Result<Vec<Vec<SegmentId>>> {
        // Each worker keeps its own pairs, lower segment id first
        let worker_pairs: Vec<Vec<(SegmentId, SegmentId)>> = (0..self.segment_count())
            .into_par_iter()
            .try_fold(Vec::new, |mut pairs, segment_id0| -> Result<Vec<(SegmentId, SegmentId)>> {
                let segment_id0 = segment_id0 as SegmentId;
                for segment_id1 in self.find_segment_pairs(segment_id0, config)? {
                    pairs.push((segment_id0.min(segment_id1), segment_id0.max(segment_id1)));
                }
                Ok(pairs)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut pairs: Vec<(SegmentId, SegmentId)> = worker_pairs.into_iter().flatten().collect();
        pairs.sort_unstable();
        pairs.dedup();
        log::debug!("Found {} segment pairs for clustering", pairs.len());

        let mut union_find = UnionFind::new(self.segment_count());
        for &(segment_id0, segment_id1) in &pairs {
            union_find.union(segment_id0 as usize, segment_id1 as usize);
        }

        let mut clusters: Vec<Vec<SegmentId>> = union_find
            .sets()
            .into_iter()
            .filter(|set| set.len() >= config.min_cluster_size)
            .map(|set| set.into_iter().map(|s| s as SegmentId).collect())
            .collect();
        clusters.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a[0].cmp(&b[0])));
        Ok(clusters)
    }

    /// Write `segment_id  cluster_id` for every clustered segment
    pub fn write_segment_clusters<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("Failed to create cluster file {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "#segment_id\tcluster_id")?;
        for (segment_id, cluster_id) in self.cluster_ids.iter().enumerate() {
            if let Some(cluster_id) = cluster_id {
                writeln!(writer, "{}\t{}", segment_id, cluster_id)?;
            }
        }
        writer.flush()?;
        Ok(())
    }
}
