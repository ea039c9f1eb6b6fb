//! Loader error types

use std::path::PathBuf;

use unitgraph_core::UnitId;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", .path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid glob pattern: {0}")]
    Glob(#[from] globset::Error),

    #[error("invalid ad-hoc pattern: {0}")]
    Pattern(#[from] regex::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read manifest {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid manifest {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("manifest {} declares unit {id} more than once", .path.display())]
    DuplicateUnit { path: PathBuf, id: UnitId },

    #[error("manifest {} contains a unit with an empty id", .path.display())]
    MissingId { path: PathBuf },

    #[error(transparent)]
    Config(#[from] ConfigError),
}
