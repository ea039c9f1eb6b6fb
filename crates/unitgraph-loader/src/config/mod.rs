//! `unitgraph.toml` configuration

use std::path::Path;
use std::sync::Arc;

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use unitgraph_core::{AdHocClassifier, CommandLineArguments, PatternClassifier};

use crate::error::ConfigError;

/// Config file looked up at the repository root.
pub const CONFIG_FILE: &str = "unitgraph.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Globs (relative to the root) selecting manifest files.
    pub manifests: Vec<String>,
    /// Globs the watcher and discovery skip.
    pub ignore: Vec<String>,
    /// Regex marking ad-hoc units. Defaults to the command-line-arguments marker.
    pub ad_hoc_pattern: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            manifests: vec!["**/units.json".to_string()],
            ignore: vec![
                "**/target/**".to_string(),
                "**/.git/**".to_string(),
                "**/node_modules/**".to_string(),
                "**/.unitgraph/**".to_string(),
            ],
            ad_hoc_pattern: None,
        }
    }
}

impl Config {
    /// Load `explicit` if given, else `<root>/unitgraph.toml` when present,
    /// else defaults.
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let path = root.join(CONFIG_FILE);
                if !path.exists() {
                    tracing::debug!("No {} under {}, using defaults", CONFIG_FILE, root.display());
                    return Ok(Config::default());
                }
                path
            }
        };

        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let config = toml::from_str(&text).map_err(|source| ConfigError::Toml {
            path: path.clone(),
            source,
        })?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn classifier(&self) -> Result<Arc<dyn AdHocClassifier>, ConfigError> {
        let classifier: Arc<dyn AdHocClassifier> = match &self.ad_hoc_pattern {
            Some(pattern) => Arc::new(PatternClassifier::new(pattern)?),
            None => Arc::new(CommandLineArguments),
        };
        Ok(classifier)
    }

    pub fn manifest_set(&self) -> Result<GlobSet, ConfigError> {
        build_glob_set(&self.manifests)
    }

    pub fn ignore_set(&self) -> Result<GlobSet, ConfigError> {
        build_glob_set(&self.ignore)
    }
}

fn build_glob_set(patterns: &[String]) -> Result<GlobSet, ConfigError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
