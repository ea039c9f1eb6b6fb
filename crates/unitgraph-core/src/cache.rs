//! On-disk snapshot of graph metadata

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::classify::AdHocClassifier;
use crate::graph::MetadataGraph;
use crate::model::UnitMetadata;

/// Cache directory: .unitgraph/
pub const CACHE_DIR: &str = ".unitgraph";

/// Graph cache file
pub const GRAPH_CACHE: &str = "cache.json";

/// Bumped whenever the snapshot layout changes.
pub const CACHE_FORMAT: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct CachedSnapshot {
    format: u32,
    version: String,
    cached_at: String,
    units: Vec<UnitMetadata>,
}

/// Get cache directory path
pub fn cache_dir(root: &Path) -> PathBuf {
    root.join(CACHE_DIR)
}

/// Get graph cache file path
pub fn graph_cache_path(root: &Path) -> PathBuf {
    root.join(CACHE_DIR).join(GRAPH_CACHE)
}

/// Ensure cache directory exists
pub fn ensure_cache_dir(root: &Path) -> std::io::Result<()> {
    let cache = cache_dir(root);
    if !cache.exists() {
        std::fs::create_dir_all(&cache)?;
    }
    Ok(())
}

/// Write the graph's unit metadata to the cache. Derived indexes are not
/// stored; they are rebuilt on load.
pub fn save_graph(graph: &MetadataGraph, root: &Path) -> anyhow::Result<()> {
    ensure_cache_dir(root)?;
    let path = graph_cache_path(root);

    let mut units: Vec<UnitMetadata> = graph.units().map(|(_, m)| (**m).clone()).collect();
    units.sort_by(|a, b| a.id.cmp(&b.id));

    let snapshot = CachedSnapshot {
        format: CACHE_FORMAT,
        version: env!("CARGO_PKG_VERSION").to_string(),
        cached_at: chrono::Utc::now().to_rfc3339(),
        units,
    };

    let json_str = serde_json::to_string_pretty(&snapshot)?;
    std::fs::write(&path, json_str)?;

    tracing::debug!("Graph cache saved: {} ({} units)", path.display(), graph.len());
    Ok(())
}

/// Load a graph from the cache. Returns `None` when there is no cache or it
/// was written in another format.
pub fn load_graph(
    root: &Path,
    classifier: Arc<dyn AdHocClassifier>,
) -> anyhow::Result<Option<MetadataGraph>> {
    let path = graph_cache_path(root);
    if !path.exists() {
        return Ok(None);
    }

    let json_str = std::fs::read_to_string(&path)?;
    let snapshot: CachedSnapshot = serde_json::from_str(&json_str)?;
    if snapshot.format != CACHE_FORMAT {
        tracing::warn!(
            "Ignoring graph cache {} with format {} (expected {})",
            path.display(),
            snapshot.format,
            CACHE_FORMAT
        );
        return Ok(None);
    }

    tracing::debug!(
        "Graph cache loaded from: {} (written {})",
        path.display(),
        snapshot.cached_at
    );
    Ok(Some(MetadataGraph::from_units(snapshot.units, classifier)))
}

/// Clear cache directory
pub fn clear_cache(root: &Path) -> std::io::Result<()> {
    let cache = cache_dir(root);
    if cache.exists() {
        std::fs::remove_dir_all(&cache)?;
    }
    Ok(())
}
