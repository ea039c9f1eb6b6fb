//! Unit metadata loading from build-system manifests

pub mod config;
pub mod discover;
pub mod error;
pub mod manifest;
pub mod manifest_cache;


pub use config::{Config, CONFIG_FILE};
pub use discover::{discover_manifests, ManifestMatcher};
pub use error::{ConfigError, LoadError};
pub use manifest::{load_manifest, parse_manifest};
pub use manifest_cache::ManifestCache;
