//! Graphviz export of the forward import graph

use std::collections::HashMap;

use petgraph::dot::Dot;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::graph::MetadataGraph;
use crate::model::UnitId;

/// Forward import graph (importer -> imported), edges labelled with the
/// import path. Dependencies without metadata still get a node.
pub fn import_graph(graph: &MetadataGraph) -> DiGraph<UnitId, String> {
    let mut out = DiGraph::new();
    let mut index: HashMap<UnitId, NodeIndex> = HashMap::new();

    let mut units: Vec<_> = graph.units().collect();
    units.sort_by(|a, b| a.0.cmp(b.0));

    for (id, _) in &units {
        let idx = out.add_node((*id).clone());
        index.insert((*id).clone(), idx);
    }
    for (id, meta) in &units {
        let from = index[*id];
        for (import_path, dep) in &meta.deps_by_path {
            let to = *index
                .entry(dep.clone())
                .or_insert_with(|| out.add_node(dep.clone()));
            out.add_edge(from, to, import_path.clone());
        }
    }
    out
}

/// Render the import graph in DOT format.
pub fn to_dot(graph: &MetadataGraph) -> String {
    let g = import_graph(graph);
    format!("{}", Dot::new(&g))
}
