//! Core data structures for the unit graph

use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Opaque name of a compilation unit. Ordered lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct UnitId(pub String);

impl UnitId {
    pub fn new(id: impl Into<String>) -> Self {
        UnitId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UnitId {
    fn from(id: &str) -> Self {
        UnitId(id.to_string())
    }
}

impl From<String> for UnitId {
    fn from(id: String) -> Self {
        UnitId(id)
    }
}

impl Borrow<str> for UnitId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Structural metadata for one unit, as reported by the build system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct UnitMetadata {
    pub id: UnitId,
    /// Package name, informational only.
    #[serde(default)]
    pub name: String,
    /// Import path, informational only.
    #[serde(default)]
    pub path: String,
    /// Imported path -> imported unit.
    #[serde(default, rename = "deps")]
    pub deps_by_path: BTreeMap<String, UnitId>,
    #[serde(default)]
    pub compiled_files: Vec<PathBuf>,
    #[serde(default)]
    pub files: Vec<PathBuf>,
}

impl UnitMetadata {
    pub fn new(id: impl Into<UnitId>) -> Self {
        UnitMetadata {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Declare a dependency, keyed by the path it is imported as.
    pub fn with_dep(mut self, import_path: impl Into<String>, dep: impl Into<UnitId>) -> Self {
        self.deps_by_path.insert(import_path.into(), dep.into());
        self
    }

    pub fn with_files<I, P>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.files.extend(files.into_iter().map(Into::into));
        self
    }

    pub fn with_compiled_files<I, P>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.compiled_files.extend(files.into_iter().map(Into::into));
        self
    }

    /// Identifiers of every declared dependency.
    pub fn dependencies(&self) -> impl Iterator<Item = &UnitId> {
        self.deps_by_path.values()
    }

    /// Union of compiled and plain files, deduplicated.
    pub fn file_set(&self) -> BTreeSet<&Path> {
        self.compiled_files
            .iter()
            .chain(self.files.iter())
            .map(PathBuf::as_path)
            .collect()
    }
}

/// A single change applied by [`crate::MetadataGraph::clone_with_updates`].
#[derive(Debug, Clone, PartialEq)]
pub enum UnitUpdate {
    /// Insert or replace the unit's metadata.
    Upsert(Arc<UnitMetadata>),
    /// Tombstone: remove the unit.
    Remove,
}

impl UnitUpdate {
    pub fn upsert(metadata: UnitMetadata) -> Self {
        UnitUpdate::Upsert(Arc::new(metadata))
    }
}

/// A batch of updates keyed by unit.
pub type Updates = HashMap<UnitId, UnitUpdate>;
