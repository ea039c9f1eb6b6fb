//! Graph diff computation for incremental updates

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::graph::MetadataGraph;
use crate::model::UnitId;

/// What changed between two graph snapshots, for broadcasting to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDiff {
    /// Monotonically increasing diff sequence number.
    pub sequence: u64,
    /// Units present only in the new graph.
    pub added_units: Vec<UnitId>,
    /// Units present only in the old graph.
    pub removed_units: Vec<UnitId>,
    /// Units present in both whose metadata changed.
    pub modified_units: Vec<UnitId>,
    /// Files whose owner list changed.
    pub reassigned_files: Vec<PathBuf>,
}

impl GraphDiff {
    /// Create an empty diff with given sequence number.
    pub fn new(sequence: u64) -> Self {
        GraphDiff {
            sequence,
            added_units: Vec::new(),
            removed_units: Vec::new(),
            modified_units: Vec::new(),
            reassigned_files: Vec::new(),
        }
    }

    /// Compare two snapshots. All lists come out sorted.
    pub fn between(old: &MetadataGraph, new: &MetadataGraph) -> Self {
        let mut diff = GraphDiff::new(0);

        for (id, meta) in new.units() {
            match old.metadata(id) {
                None => diff.added_units.push(id.clone()),
                Some(prev) if !Arc::ptr_eq(prev, meta) && prev != meta => {
                    diff.modified_units.push(id.clone())
                }
                Some(_) => {}
            }
        }
        for (id, _) in old.units() {
            if !new.contains(id) {
                diff.removed_units.push(id.clone());
            }
        }

        let mut files = BTreeSet::new();
        for (file, owners) in new.files() {
            if old.file_owners(file) != owners {
                files.insert(file.to_path_buf());
            }
        }
        for (file, _) in old.files() {
            if new.file_owners(file).is_empty() {
                files.insert(file.to_path_buf());
            }
        }
        diff.reassigned_files = files.into_iter().collect();

        diff.added_units.sort();
        diff.removed_units.sort();
        diff.modified_units.sort();
        diff
    }

    /// Check if this diff is empty (no changes).
    pub fn is_empty(&self) -> bool {
        self.added_units.is_empty()
            && self.removed_units.is_empty()
            && self.modified_units.is_empty()
            && self.reassigned_files.is_empty()
    }

}

/// Diff state for incremental updates.
pub struct DiffEngine {
    sequence: u64,
}

impl DiffEngine {
    pub fn new() -> Self {
        DiffEngine { sequence: 0 }
    }

    /// Compute the difference between two graph states.
    /// Returns a GraphDiff with the sequence number incremented.
    pub fn compute_diff(&mut self, old: &MetadataGraph, new: &MetadataGraph) -> GraphDiff {
        let mut diff = GraphDiff::between(old, new);
        self.sequence += 1;
        diff.sequence = self.sequence;
        diff
    }

    /// Get current sequence number.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl Default for DiffEngine {
    fn default() -> Self {
        Self::new()
    }
}
