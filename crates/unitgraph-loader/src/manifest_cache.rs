//! Per-manifest unit tracking for incremental reloads

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use unitgraph_core::{UnitId, UnitMetadata, UnitUpdate, Updates};

use crate::config::Config;
use crate::discover::discover_manifests;
use crate::error::LoadError;
use crate::manifest::load_manifest;

/// Remembers which units each manifest declared, so a reload can be turned
/// into a minimal batch of upserts and tombstones. Thread-safe for
/// concurrent access.
#[derive(Debug, Default)]
pub struct ManifestCache {
    manifests: DashMap<PathBuf, Vec<Arc<UnitMetadata>>>,
}

impl ManifestCache {
    pub fn new() -> Self {
        ManifestCache {
            manifests: DashMap::new(),
        }
    }

    /// Discover and load every manifest under `root`. The returned batch
    /// upserts every unit found.
    pub fn load_all(&self, root: &Path, config: &Config) -> Result<Updates, LoadError> {
        let mut updates = Updates::new();
        for path in discover_manifests(root, config)? {
            updates.extend(self.reload(&path)?);
        }
        tracing::info!(
            "Loaded {} units from {} manifests",
            self.unit_count(),
            self.manifests.len()
        );
        Ok(updates)
    }

    /// Re-read one manifest and diff it against what it declared before.
    pub fn reload(&self, path: &Path) -> Result<Updates, LoadError> {
        let units = load_manifest(path)?;
        Ok(self.replace(path, units))
    }

    /// Record `units` as the content of manifest `path` and return the
    /// updates that bring a graph in line with it.
    pub fn replace(&self, path: &Path, units: Vec<UnitMetadata>) -> Updates {
        let previous: HashMap<UnitId, Arc<UnitMetadata>> = self
            .manifests
            .get(path)
            .map(|entry| entry.value().iter().map(|m| (m.id.clone(), Arc::clone(m))).collect())
            .unwrap_or_default();

        let current: Vec<Arc<UnitMetadata>> = units.into_iter().map(Arc::new).collect();
        let mut updates = Updates::new();

        for unit in &current {
            match previous.get(&unit.id) {
                Some(prev) if prev == unit => {}
                _ => {
                    updates.insert(unit.id.clone(), UnitUpdate::Upsert(Arc::clone(unit)));
                }
            }
        }

        let still_declared: Vec<&UnitId> = current.iter().map(|m| &m.id).collect();
        let dropped: Vec<Arc<UnitMetadata>> = previous
            .into_values()
            .filter(|m| !still_declared.contains(&&m.id))
            .collect();

        self.manifests.insert(path.to_path_buf(), current);

        for unit in dropped {
            if let Some(update) = self.fallback(path, &unit) {
                updates.insert(unit.id.clone(), update);
            }
        }

        tracing::debug!("Manifest {} produced {} updates", path.display(), updates.len());
        updates
    }

    /// Drop a deleted manifest. Units only it declared are tombstoned; units
    /// another manifest still declares fall back to that declaration.
    pub fn forget(&self, path: &Path) -> Updates {
        let Some((_, units)) = self.manifests.remove(path) else {
            return Updates::new();
        };
        units
            .iter()
            .filter_map(|m| Some((m.id.clone(), self.fallback(path, m)?)))
            .collect()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.manifests.contains_key(path)
    }

    /// Number of tracked manifests.
    pub fn len(&self) -> usize {
        self.manifests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.manifests.is_empty()
    }

    /// Units declared across all manifests.
    pub fn unit_count(&self) -> usize {
        self.manifests.iter().map(|entry| entry.value().len()).sum()
    }

    /// What the graph should hold once manifest `path` stops declaring
    /// `dropped`. Another manifest's declaration takes over, picked from the
    /// lowest manifest path; with none left the unit is tombstoned. `None`
    /// when the surviving declaration is identical to the dropped one.
    fn fallback(&self, path: &Path, dropped: &UnitMetadata) -> Option<UnitUpdate> {
        let survivor = self
            .manifests
            .iter()
            .filter(|entry| entry.key() != path)
            .filter_map(|entry| {
                let unit = entry.value().iter().find(|m| m.id == dropped.id)?;
                Some((entry.key().clone(), Arc::clone(unit)))
            })
            .min_by(|a, b| a.0.cmp(&b.0));

        match survivor {
            None => Some(UnitUpdate::Remove),
            Some((_, unit)) if *unit == *dropped => None,
            Some((other, unit)) => {
                tracing::debug!("Unit {} now taken from {}", unit.id, other.display());
                Some(UnitUpdate::Upsert(unit))
            }
        }
    }
}
