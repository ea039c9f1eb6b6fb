//! Manifest discovery

use std::path::{Path, PathBuf};

use globset::GlobSet;
use ignore::WalkBuilder;

use crate::config::Config;
use crate::error::LoadError;

/// Matches paths against the configured manifest and ignore globs, relative
/// to the repository root.
#[derive(Debug, Clone)]
pub struct ManifestMatcher {
    root: PathBuf,
    manifests: GlobSet,
    ignored: GlobSet,
}

impl ManifestMatcher {
    pub fn new(root: &Path, config: &Config) -> Result<Self, LoadError> {
        Ok(Self {
            root: root.to_path_buf(),
            manifests: config.manifest_set()?,
            ignored: config.ignore_set()?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        self.ignored.is_match(self.relative(path))
    }

    pub fn is_manifest(&self, path: &Path) -> bool {
        let rel = self.relative(path);
        !self.ignored.is_match(rel) && self.manifests.is_match(rel)
    }
}

/// Walk `root` and return every manifest file, sorted.
pub fn discover_manifests(root: &Path, config: &Config) -> Result<Vec<PathBuf>, LoadError> {
    let matcher = ManifestMatcher::new(root, config)?;
    let mut found = Vec::new();

    for entry in WalkBuilder::new(root).build() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Cannot read entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        if matcher.is_manifest(entry.path()) {
            found.push(entry.path().to_path_buf());
        }
    }

    found.sort();
    tracing::debug!("Discovered {} manifests under {}", found.len(), root.display());
    Ok(found)
}
