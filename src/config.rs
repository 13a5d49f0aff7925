/// Configuration values for graph construction and analysis
///
/// Plain values handed to the operations that use them. The CLI fills these
/// from its flags; library users construct them directly.
use anyhow::{anyhow, ensure, Result};
use std::fmt;
use std::str::FromStr;

/// Graph construction
#[derive(Debug, Clone)]
pub struct AssemblyGraphConfig {
    pub min_link_coverage: u64, // --min-link-coverage
}

impl Default for AssemblyGraphConfig {
    fn default() -> Self {
        AssemblyGraphConfig {
            min_link_coverage: 2,
        }
    }
}

/// Segment clustering by read composition
#[derive(Debug, Clone)]
pub struct SegmentClusteringConfig {
    pub max_distance: u64,              // --cluster-max-distance
    pub min_link_coverage: u64,         // links followed when searching descendants
    pub min_common_count: u64,          // --cluster-min-common
    pub max_unexplained_fraction: f64,  // --cluster-max-unexplained
    pub min_cluster_size: usize,        // --cluster-min-size
}

impl Default for SegmentClusteringConfig {
    fn default() -> Self {
        SegmentClusteringConfig {
            max_distance: 6,
            min_link_coverage: 2,
            min_common_count: 6,
            max_unexplained_fraction: 0.1,
            min_cluster_size: 2,
        }
    }
}

impl SegmentClusteringConfig {
    /// A cluster is a group of segments, so smaller sizes are rejected
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.min_cluster_size >= 2,
            "Minimum cluster size must be at least 2, got {}",
            self.min_cluster_size
        );
        Ok(())
    }
}

/// How snippets of a local subgraph are grouped into clusters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnippetClusteringStrategy {
    /// Greedy comparison of snippet segment sequences
    Direct,
    /// Containment graph over snippet groups, condensed to a DAG
    Graph,
}

impl FromStr for SnippetClusteringStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "direct" => Ok(SnippetClusteringStrategy::Direct),
            "graph" => Ok(SnippetClusteringStrategy::Graph),
            _ => Err(anyhow!(
                "Invalid snippet clustering strategy '{s}'. Use: direct or graph"
            )),
        }
    }
}

impl fmt::Display for SnippetClusteringStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnippetClusteringStrategy::Direct => write!(f, "direct"),
            SnippetClusteringStrategy::Graph => write!(f, "graph"),
        }
    }
}

/// Local subgraph analysis
#[derive(Debug, Clone)]
pub struct SnippetClusteringConfig {
    pub strategy: SnippetClusteringStrategy,
    /// After a segment of the shorter snippet is matched, the next one must
    /// be found within this many positions of the longer snippet
    pub window: usize,
    /// Segments of the shorter snippet allowed to be missing from the longer one
    pub max_mismatch: usize,
    /// Segments touched by fewer snippets of a cluster are dropped from it
    pub min_cluster_coverage: u64,
}

impl Default for SnippetClusteringConfig {
    fn default() -> Self {
        SnippetClusteringConfig {
            strategy: SnippetClusteringStrategy::Graph,
            window: 2,
            max_mismatch: 0,
            min_cluster_coverage: 3,
        }
    }
}

/// Which link to follow when extending an assembly path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionPolicy {
    /// Follow a link only when it is the only candidate
    Unique,
    /// Follow the candidate with the strictly highest link coverage
    BestCoverage,
}

impl FromStr for ExtensionPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "unique" => Ok(ExtensionPolicy::Unique),
            "best" | "best-coverage" => Ok(ExtensionPolicy::BestCoverage),
            _ => Err(anyhow!(
                "Invalid extension policy '{s}'. Use: unique or best-coverage"
            )),
        }
    }
}

impl fmt::Display for ExtensionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtensionPolicy::Unique => write!(f, "unique"),
            ExtensionPolicy::BestCoverage => write!(f, "best-coverage"),
        }
    }
}

/// Greedy assembly path extension
#[derive(Debug, Clone)]
pub struct AssemblyPathConfig {
    pub min_link_coverage: u64,
    pub policy: ExtensionPolicy,
}

impl Default for AssemblyPathConfig {
    fn default() -> Self {
        AssemblyPathConfig {
            min_link_coverage: 2,
            policy: ExtensionPolicy::Unique,
        }
    }
}
