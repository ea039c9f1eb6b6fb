//! Unitgraph Core: immutable dependency graph over compilation units

pub mod cache;
pub mod classify;
pub mod diff;
pub mod export;
pub mod graph;
pub mod model;
pub mod stats;


#[cfg(test)]
pub mod test_utils;

pub use model::{UnitId, UnitMetadata, UnitUpdate, Updates};
pub use classify::{AdHocClassifier, CommandLineArguments, PatternClassifier, COMMAND_LINE_ARGUMENTS};
pub use graph::MetadataGraph;
pub use diff::{DiffEngine, GraphDiff};
pub use stats::GraphStatistics;
pub use export::{import_graph, to_dot};
pub use cache::{CACHE_DIR, GRAPH_CACHE, cache_dir, graph_cache_path, ensure_cache_dir, save_graph, load_graph, clear_cache};
