//! Single-writer publish point for graph snapshots

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, error, info};
use unitgraph_core::{DiffEngine, GraphDiff, MetadataGraph, UnitId, Updates};

/// Buffered messages per subscriber before it starts lagging.
const BROADCAST_CAPACITY: usize = 256;

/// Messages sent to subscribers, tagged by `type`.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Message<'a> {
    GraphDiff { diff: &'a GraphDiff },
    Invalidated {
        files: &'a [PathBuf],
        units: &'a BTreeSet<UnitId>,
    },
}

/// Holds the current graph snapshot. Readers take a cheap `Arc` clone and
/// keep using it while updates publish newer snapshots behind them.
pub struct Session {
    graph: RwLock<Arc<MetadataGraph>>,
    diff_engine: Mutex<DiffEngine>,
    diff_tx: broadcast::Sender<String>,
}

impl Session {
    pub fn new(graph: Arc<MetadataGraph>) -> Self {
        let (diff_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            graph: RwLock::new(graph),
            diff_engine: Mutex::new(DiffEngine::new()),
            diff_tx,
        }
    }

    /// The snapshot as of now.
    pub async fn current(&self) -> Arc<MetadataGraph> {
        Arc::clone(&*self.graph.read().await)
    }

    /// Subscribe to JSON messages describing published changes.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.diff_tx.subscribe()
    }

    /// Current diff sequence number.
    pub async fn sequence(&self) -> u64 {
        self.diff_engine.lock().await.sequence()
    }

    /// Apply a batch of updates and publish the result. Returns `None` when
    /// the batch left the graph untouched.
    pub async fn apply(&self, updates: &Updates) -> Option<GraphDiff> {
        let mut graph = self.graph.write().await;
        let next = graph.clone_with_updates(updates);
        if Arc::ptr_eq(&next, &*graph) {
            debug!("Update batch was a no-op");
            return None;
        }

        let diff = self.diff_engine.lock().await.compute_diff(&graph, &next);
        *graph = next;
        drop(graph);

        info!(
            "Published graph #{}: +{} -{} ~{} units, {} files reassigned",
            diff.sequence,
            diff.added_units.len(),
            diff.removed_units.len(),
            diff.modified_units.len(),
            diff.reassigned_files.len()
        );
        self.broadcast(&Message::GraphDiff { diff: &diff });
        Some(diff)
    }

    /// Units whose results are stale after `files` changed on disk.
    pub async fn invalidate(&self, files: &[PathBuf]) -> BTreeSet<UnitId> {
        let graph = self.current().await;
        let affected = graph.affected_by_files(files.iter().map(PathBuf::as_path));
        if !affected.is_empty() {
            debug!("{} files invalidated {} units", files.len(), affected.len());
            self.broadcast(&Message::Invalidated {
                files,
                units: &affected,
            });
        }
        affected
    }

    fn broadcast(&self, message: &Message<'_>) {
        match serde_json::to_string(message) {
            // no receivers is fine
            Ok(text) => {
                let _ = self.diff_tx.send(text);
            }
            Err(e) => error!("Failed to serialize broadcast message: {}", e),
        }
    }
}
