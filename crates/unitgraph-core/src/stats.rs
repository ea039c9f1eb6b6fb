//! Summary statistics over a graph snapshot

use serde::{Deserialize, Serialize};

use crate::graph::MetadataGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GraphStatistics {
    pub units: usize,
    pub ad_hoc_units: usize,
    pub files: usize,
    /// Declared dependency entries across all units.
    pub import_edges: usize,
    /// Files kept with more than one owner after disambiguation.
    pub multi_owner_files: usize,
}

impl MetadataGraph {
    pub fn statistics(&self) -> GraphStatistics {
        let mut stats = GraphStatistics {
            units: self.len(),
            ..Default::default()
        };
        for (id, meta) in self.units() {
            if self.is_ad_hoc(id) {
                stats.ad_hoc_units += 1;
            }
            stats.import_edges += meta.deps_by_path.len();
        }
        for (_, owners) in self.files() {
            stats.files += 1;
            if owners.len() > 1 {
                stats.multi_owner_files += 1;
            }
        }
        stats
    }
}
