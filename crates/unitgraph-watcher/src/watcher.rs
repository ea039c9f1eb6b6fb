//! Filesystem watcher implementation

use anyhow::Result;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, error, info, warn};
use unitgraph_core::Updates;
use unitgraph_loader::{Config, ManifestCache, ManifestMatcher};

use crate::session::Session;

/// Events emitted by the file watcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// File or directory created
    Created(PathBuf),
    /// File or directory modified
    Modified(PathBuf),
    /// File or directory removed
    Removed(PathBuf),
}

impl WatchEvent {
    pub fn path(&self) -> &Path {
        match self {
            WatchEvent::Created(path) | WatchEvent::Modified(path) | WatchEvent::Removed(path) => path,
        }
    }
}

/// File system watcher feeding repository changes into a channel
pub struct FileWatcher {
    watcher: RecommendedWatcher,
    event_rx: mpsc::UnboundedReceiver<WatchEvent>,
    root_path: PathBuf,
}

impl FileWatcher {
    /// Create a new file watcher for the given root path. Paths the matcher
    /// ignores never reach the channel.
    pub fn new(root_path: impl AsRef<Path>, matcher: ManifestMatcher) -> Result<Self> {
        let root_path = root_path.as_ref().to_path_buf();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let watcher = notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
            match res {
                Ok(event) => {
                    debug!("File system event: {:?}", event);
                    Self::handle_notify_event(event, &matcher, &event_tx);
                }
                Err(e) => {
                    error!("File system watch error: {}", e);
                }
            }
        })?;

        Ok(Self {
            watcher,
            event_rx,
            root_path,
        })
    }

    /// Handle a notify event and convert to our watch events
    fn handle_notify_event(
        event: notify::Event,
        matcher: &ManifestMatcher,
        event_tx: &mpsc::UnboundedSender<WatchEvent>,
    ) {
        let make: fn(PathBuf) -> WatchEvent = match event.kind {
            notify::EventKind::Create(_) => WatchEvent::Created,
            notify::EventKind::Modify(_) => WatchEvent::Modified,
            notify::EventKind::Remove(_) => WatchEvent::Removed,
            _ => return,
        };
        for path in event.paths {
            if matcher.is_ignored(&path) {
                continue;
            }
            if let Err(e) = event_tx.send(make(path)) {
                warn!("Failed to send watch event: {}", e);
            }
        }
    }

    /// Watch a directory recursively
    pub fn watch_directory(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        info!("Watching directory: {:?}", path);

        self.watcher.watch(path, RecursiveMode::Recursive)?;
        Ok(())
    }

    /// Get the event receiver
    pub fn event_receiver(&mut self) -> &mut mpsc::UnboundedReceiver<WatchEvent> {
        &mut self.event_rx
    }
}

/// Watcher service routing file events into the session: manifest changes
/// become graph updates, source changes become invalidations.
pub struct WatcherService {
    watcher: Arc<RwLock<FileWatcher>>,
    matcher: ManifestMatcher,
    manifests: Arc<ManifestCache>,
    session: Arc<Session>,
}

impl WatcherService {
    pub fn new(
        root_path: impl AsRef<Path>,
        config: &Config,
        manifests: Arc<ManifestCache>,
        session: Arc<Session>,
    ) -> Result<Self> {
        let root_path = root_path.as_ref();
        let matcher = ManifestMatcher::new(root_path, config)?;
        let watcher = FileWatcher::new(root_path, matcher.clone())?;
        Ok(Self {
            watcher: Arc::new(RwLock::new(watcher)),
            matcher,
            manifests,
            session,
        })
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Start watching the repository root
    pub async fn start_watching(&self) -> Result<()> {
        let mut watcher = self.watcher.write().await;
        let root_path = watcher.root_path.clone();

        watcher.watch_directory(&root_path)?;

        info!("Started watching repository: {:?}", root_path);
        Ok(())
    }

    /// Process file system events until the channel closes. Events already
    /// queued are handled together as one batch.
    pub async fn process_events(&self) -> Result<()> {
        let mut watcher = self.watcher.write().await;
        let event_rx = watcher.event_receiver();

        while let Some(event) = event_rx.recv().await {
            let mut batch = vec![event];
            while let Ok(event) = event_rx.try_recv() {
                batch.push(event);
            }
            self.handle_batch(batch).await?;
        }

        Ok(())
    }

    /// Route a batch of events. Manifest updates are merged into a single
    /// graph update; every other path is invalidated.
    pub async fn handle_batch(&self, events: Vec<WatchEvent>) -> Result<()> {
        let mut updates = Updates::new();
        let mut changed_files = Vec::new();

        for event in events {
            debug!("Processing watch event: {:?}", event);
            let path = event.path();
            if self.matcher.is_manifest(path) {
                updates.extend(self.handle_manifest_event(&event));
            } else if !changed_files.iter().any(|p: &PathBuf| p == path) {
                changed_files.push(path.to_path_buf());
            }
        }

        if !updates.is_empty() {
            self.session.apply(&updates).await;
        }
        if !changed_files.is_empty() {
            let affected = self.session.invalidate(&changed_files).await;
            if !affected.is_empty() {
                info!("{} files changed, {} units invalidated", changed_files.len(), affected.len());
            }
        }
        Ok(())
    }

    fn handle_manifest_event(&self, event: &WatchEvent) -> Updates {
        let path = event.path();
        // renames surface as modifications of a path that no longer exists
        let gone = matches!(event, WatchEvent::Removed(_)) || !path.exists();
        if gone {
            info!("Manifest removed: {:?}", path);
            return self.manifests.forget(path);
        }

        info!("Manifest changed: {:?}", path);
        match self.manifests.reload(path) {
            Ok(updates) => updates,
            Err(e) => {
                // keep the last good content until the manifest parses again
                warn!("Failed to reload manifest: {}", e);
                Updates::new()
            }
        }
    }
}
