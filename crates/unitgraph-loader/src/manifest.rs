//! Manifest parsing
//!
//! A manifest is either a JSON array of unit records or a stream of
//! concatenated JSON objects (the shape `go list -json` style tools emit).
//! Each record deserializes straight into [`UnitMetadata`].

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use unitgraph_core::UnitMetadata;

use crate::error::LoadError;

/// Read and parse the manifest at `path`.
pub fn load_manifest(path: &Path) -> Result<Vec<UnitMetadata>, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let base = path.parent().unwrap_or_else(|| Path::new(""));
    let units = parse_manifest(&text, path, base)?;
    tracing::debug!("Parsed {} units from {}", units.len(), path.display());
    Ok(units)
}

/// Parse manifest text. Relative file paths are resolved against `base`.
/// `origin` only labels errors.
pub fn parse_manifest(text: &str, origin: &Path, base: &Path) -> Result<Vec<UnitMetadata>, LoadError> {
    let json_err = |source| LoadError::Json {
        path: origin.to_path_buf(),
        source,
    };

    let mut units: Vec<UnitMetadata> = if text.trim_start().starts_with('[') {
        serde_json::from_str(text).map_err(json_err)?
    } else {
        serde_json::Deserializer::from_str(text)
            .into_iter::<UnitMetadata>()
            .collect::<Result<_, _>>()
            .map_err(json_err)?
    };

    let mut seen = HashSet::new();
    for unit in &mut units {
        if unit.id.as_str().is_empty() {
            return Err(LoadError::MissingId {
                path: origin.to_path_buf(),
            });
        }
        if !seen.insert(unit.id.clone()) {
            return Err(LoadError::DuplicateUnit {
                path: origin.to_path_buf(),
                id: unit.id.clone(),
            });
        }
        resolve_paths(&mut unit.compiled_files, base);
        resolve_paths(&mut unit.files, base);
    }

    Ok(units)
}

fn resolve_paths(files: &mut [PathBuf], base: &Path) {
    for file in files {
        if file.is_relative() {
            *file = base.join(&*file);
        }
    }
}
