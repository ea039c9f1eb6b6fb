//! Immutable metadata graph over compilation units.
//!
//! A [`MetadataGraph`] is never mutated once built. Updates produce a new
//! graph through [`MetadataGraph::clone_with_updates`], which rebuilds the
//! derived reverse-import and file-ownership indexes from the metadata map.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::classify::{AdHocClassifier, CommandLineArguments};
use crate::model::{UnitId, UnitMetadata, UnitUpdate, Updates};

/// The unit graph: per-unit metadata plus indexes derived from it.
pub struct MetadataGraph {
    metadata: HashMap<UnitId, Arc<UnitMetadata>>,
    /// Dependency -> units importing it. Sorted, deduplicated.
    imported_by: HashMap<UnitId, Vec<UnitId>>,
    /// File -> owning units, filtered so real units mask ad-hoc ones.
    file_owners: HashMap<PathBuf, Vec<UnitId>>,
    classifier: Arc<dyn AdHocClassifier>,
}

impl std::fmt::Debug for MetadataGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataGraph")
            .field("unit_count", &self.metadata.len())
            .field("file_count", &self.file_owners.len())
            .finish()
    }
}

impl MetadataGraph {
    /// Empty graph classifying ad-hoc units with [`CommandLineArguments`].
    pub fn new() -> Self {
        Self::with_classifier(Arc::new(CommandLineArguments))
    }

    /// Empty graph using the given ad-hoc classifier.
    pub fn with_classifier(classifier: Arc<dyn AdHocClassifier>) -> Self {
        MetadataGraph {
            metadata: HashMap::new(),
            imported_by: HashMap::new(),
            file_owners: HashMap::new(),
            classifier,
        }
    }

    /// Build a graph from an initial full load.
    pub fn from_units<I>(units: I, classifier: Arc<dyn AdHocClassifier>) -> Self
    where
        I: IntoIterator<Item = UnitMetadata>,
    {
        let metadata = units
            .into_iter()
            .map(|m| (m.id.clone(), Arc::new(m)))
            .collect();
        Self::build(metadata, classifier)
    }

    fn build(
        metadata: HashMap<UnitId, Arc<UnitMetadata>>,
        classifier: Arc<dyn AdHocClassifier>,
    ) -> Self {
        let imported_by = build_imported_by(&metadata);
        let file_owners = build_file_owners(&metadata, classifier.as_ref());
        tracing::debug!(
            units = metadata.len(),
            files = file_owners.len(),
            "Built metadata graph"
        );
        MetadataGraph {
            metadata,
            imported_by,
            file_owners,
            classifier,
        }
    }

    /// The classifier this graph (and every clone of it) uses.
    pub fn classifier(&self) -> &Arc<dyn AdHocClassifier> {
        &self.classifier
    }

    pub fn is_ad_hoc(&self, id: &UnitId) -> bool {
        self.classifier.is_ad_hoc(id)
    }

    /// Metadata for `id`, or `None` if the unit was never loaded or was removed.
    pub fn metadata(&self, id: &UnitId) -> Option<&Arc<UnitMetadata>> {
        self.metadata.get(id)
    }

    pub fn contains(&self, id: &UnitId) -> bool {
        self.metadata.contains_key(id)
    }

    /// Number of units.
    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    /// Iterate over all units in unspecified order.
    pub fn units(&self) -> impl Iterator<Item = (&UnitId, &Arc<UnitMetadata>)> {
        self.metadata.iter()
    }

    /// Units that directly import `id`.
    pub fn imported_by(&self, id: &UnitId) -> &[UnitId] {
        self.imported_by.get(id).map_or(&[], Vec::as_slice)
    }

    /// Units owning `file`. Empty when no unit declares it.
    pub fn file_owners(&self, file: &Path) -> &[UnitId] {
        self.file_owners.get(file).map_or(&[], Vec::as_slice)
    }

    /// Iterate over every file with at least one owner.
    pub fn files(&self) -> impl Iterator<Item = (&Path, &[UnitId])> {
        self.file_owners
            .iter()
            .map(|(path, owners)| (path.as_path(), owners.as_slice()))
    }

    /// Produce a new graph with `updates` applied.
    ///
    /// An empty batch returns the receiver itself, so `Arc::ptr_eq` on the
    /// result tells whether anything changed. The receiver is left untouched
    /// and remains valid for every other holder.
    pub fn clone_with_updates(self: &Arc<Self>, updates: &Updates) -> Arc<Self> {
        if updates.is_empty() {
            return Arc::clone(self);
        }

        let mut metadata = self.metadata.clone();
        for (id, update) in updates {
            match update {
                UnitUpdate::Upsert(m) => {
                    // metadata is always stored under its own id
                    if *id != m.id {
                        tracing::warn!("Upsert keyed {} carries unit {}; storing under the latter", id, m.id);
                    }
                    metadata.insert(m.id.clone(), Arc::clone(m));
                }
                UnitUpdate::Remove => {
                    metadata.remove(id);
                }
            }
        }

        tracing::debug!(
            updates = updates.len(),
            before = self.metadata.len(),
            after = metadata.len(),
            "Cloning metadata graph"
        );
        Arc::new(Self::build(metadata, Arc::clone(&self.classifier)))
    }

    /// Metadata of every seed plus every unit that transitively imports a
    /// seed, keyed by id. Seeds without metadata are skipped.
    pub fn reverse_reflexive_transitive_closure<'a, I>(
        &'a self,
        ids: I,
    ) -> HashMap<UnitId, Arc<UnitMetadata>>
    where
        I: IntoIterator<Item = &'a UnitId>,
    {
        let mut seen: HashMap<UnitId, Arc<UnitMetadata>> = HashMap::new();
        let mut to_visit: Vec<&'a UnitId> = ids.into_iter().collect();

        while let Some(id) = to_visit.pop() {
            if seen.contains_key(id) {
                continue;
            }
            let Some(m) = self.metadata.get(id) else {
                continue;
            };
            seen.insert(id.clone(), Arc::clone(m));
            to_visit.extend(self.imported_by(id));
        }

        seen
    }

    /// Union of the owners of `files`.
    pub fn units_for_files<'a, I>(&self, files: I) -> BTreeSet<UnitId>
    where
        I: IntoIterator<Item = &'a Path>,
    {
        files
            .into_iter()
            .flat_map(|file| self.file_owners(file).iter().cloned())
            .collect()
    }

    /// Every unit that needs re-analysis after `files` changed: their owners
    /// and everything importing those owners.
    pub fn affected_by_files<'a, I>(&self, files: I) -> BTreeSet<UnitId>
    where
        I: IntoIterator<Item = &'a Path>,
    {
        let owners = self.units_for_files(files);
        self.reverse_reflexive_transitive_closure(&owners)
            .into_keys()
            .collect()
    }
}

impl Default for MetadataGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Reverse the per-unit dependency maps.
fn build_imported_by(metadata: &HashMap<UnitId, Arc<UnitMetadata>>) -> HashMap<UnitId, Vec<UnitId>> {
    let mut imported_by: HashMap<UnitId, Vec<UnitId>> = HashMap::new();
    for (id, m) in metadata {
        for dep in m.dependencies() {
            imported_by.entry(dep.clone()).or_default().push(id.clone());
        }
    }
    for importers in imported_by.values_mut() {
        importers.sort();
        importers.dedup();
    }
    imported_by
}

/// Index every unit's file set, then keep the preferred owners per file.
fn build_file_owners(
    metadata: &HashMap<UnitId, Arc<UnitMetadata>>,
    classifier: &dyn AdHocClassifier,
) -> HashMap<PathBuf, Vec<UnitId>> {
    let mut owners: HashMap<PathBuf, Vec<UnitId>> = HashMap::new();
    for (id, m) in metadata {
        for file in m.file_set() {
            owners.entry(file.to_path_buf()).or_default().push(id.clone());
        }
    }
    for ids in owners.values_mut() {
        select_owners(ids, classifier);
    }
    owners
}

/// Order owners real-first then by id, and cut the list at the first ad-hoc
/// unit past position 0. Real owners therefore hide every ad-hoc owner, and
/// an ad-hoc unit survives only at the head of an all-ad-hoc list.
pub(crate) fn select_owners(ids: &mut Vec<UnitId>, classifier: &dyn AdHocClassifier) {
    ids.sort_by_cached_key(|id| (classifier.is_ad_hoc(id), id.clone()));
    if let Some(pos) = ids.iter().skip(1).position(|id| classifier.is_ad_hoc(id)) {
        ids.truncate(pos + 1);
    }
}
