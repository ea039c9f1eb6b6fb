//! Test utilities for unitgraph-core

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::{CommandLineArguments, MetadataGraph, UnitId, UnitMetadata, UnitUpdate, Updates};

/// Shorthand for building a `UnitId`.
pub fn id(s: &str) -> UnitId {
    UnitId::new(s)
}

/// Build a shared graph from units using the default classifier.
pub fn graph_of(units: impl IntoIterator<Item = UnitMetadata>) -> Arc<MetadataGraph> {
    Arc::new(MetadataGraph::from_units(units, Arc::new(CommandLineArguments)))
}

/// The chain A <- B <- C (B imports A, C imports B), one file each.
pub fn chain_graph() -> Arc<MetadataGraph> {
    graph_of([
        UnitMetadata::new("a").with_files(["/src/a/f1.go"]),
        UnitMetadata::new("b").with_dep("example.com/a", "a").with_files(["/src/b/f2.go"]),
        UnitMetadata::new("c").with_dep("example.com/b", "b").with_files(["/src/c/f3.go"]),
    ])
}

/// Sorted ids of a closure result, for terse assertions.
pub fn closure_ids<V>(closure: &HashMap<UnitId, V>) -> BTreeSet<String> {
    closure.keys().map(|id| id.0.clone()).collect()
}

pub fn names(ids: &[&str]) -> BTreeSet<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

pub fn upsert(meta: UnitMetadata) -> (UnitId, UnitUpdate) {
    (meta.id.clone(), UnitUpdate::upsert(meta))
}

pub fn remove(s: &str) -> (UnitId, UnitUpdate) {
    (id(s), UnitUpdate::Remove)
}

pub fn updates<const N: usize>(entries: [(UnitId, UnitUpdate); N]) -> Updates {
    entries.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_graph() {
        let graph = chain_graph();
        assert_eq!(graph.len(), 3);
        assert_eq!(graph.imported_by(&id("a")), &[id("b")]);
    }
}
