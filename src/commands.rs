//! CLI command implementations

use anyhow::Context;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use unitgraph_core::{MetadataGraph, UnitId};
use unitgraph_loader::{Config, ManifestCache};
use unitgraph_watcher::{Session, WatcherService};

/// Flags shared by every command.
pub struct Options {
    pub root: PathBuf,
    pub config: Option<PathBuf>,
    pub cached: bool,
}

/// A loaded repository: its config, manifest state and graph snapshot.
struct Loaded {
    root: PathBuf,
    config: Config,
    manifests: Arc<ManifestCache>,
    graph: Arc<MetadataGraph>,
}

fn load(opts: &Options, allow_cache: bool) -> anyhow::Result<Loaded> {
    let root = opts
        .root
        .canonicalize()
        .with_context(|| format!("Repository root {} not found", opts.root.display()))?;
    tracing::debug!("Repository root: {}", root.display());

    let config = Config::load(&root, opts.config.as_deref())?;
    let classifier = config.classifier()?;
    let manifests = Arc::new(ManifestCache::new());

    if allow_cache && opts.cached {
        if let Some(graph) = unitgraph_core::load_graph(&root, Arc::clone(&classifier))? {
            tracing::info!("Using cached graph ({} units)", graph.len());
            return Ok(Loaded {
                root,
                config,
                manifests,
                graph: Arc::new(graph),
            });
        }
        tracing::info!("No usable cache, reading manifests");
    }

    let updates = manifests.load_all(&root, &config)?;
    let graph = Arc::new(MetadataGraph::with_classifier(classifier)).clone_with_updates(&updates);

    Ok(Loaded {
        root,
        config,
        manifests,
        graph,
    })
}

pub fn index(opts: &Options) -> anyhow::Result<()> {
    let loaded = load(opts, false)?;
    tracing::info!("Indexing repository: {}", loaded.root.display());

    let stats = loaded.graph.statistics();
    println!("units:             {}", stats.units);
    println!("ad-hoc units:      {}", stats.ad_hoc_units);
    println!("files:             {}", stats.files);
    println!("import edges:      {}", stats.import_edges);
    println!("multi-owner files: {}", stats.multi_owner_files);

    unitgraph_core::save_graph(&loaded.graph, &loaded.root)?;
    tracing::info!("Cache written to {}", unitgraph_core::graph_cache_path(&loaded.root).display());
    Ok(())
}

/// Files on the command line are taken relative to the repository root.
fn resolve(root: &Path, file: &Path) -> PathBuf {
    if file.is_absolute() {
        file.to_path_buf()
    } else {
        root.join(file)
    }
}

pub fn owners(opts: &Options, files: &[PathBuf]) -> anyhow::Result<()> {
    let loaded = load(opts, true)?;

    for file in files {
        let path = resolve(&loaded.root, file);
        let owners = loaded.graph.file_owners(&path);
        if owners.is_empty() {
            println!("{}: (no owners)", file.display());
        } else {
            let names: Vec<&str> = owners.iter().map(UnitId::as_str).collect();
            println!("{}: {}", file.display(), names.join(" "));
        }
    }
    Ok(())
}

pub fn affected(opts: &Options, targets: &[String], as_files: bool) -> anyhow::Result<()> {
    let loaded = load(opts, true)?;

    let affected: BTreeSet<UnitId> = if as_files {
        let paths: Vec<PathBuf> = targets
            .iter()
            .map(|t| resolve(&loaded.root, Path::new(t)))
            .collect();
        loaded.graph.affected_by_files(paths.iter().map(PathBuf::as_path))
    } else {
        let ids: Vec<UnitId> = targets.iter().map(|t| UnitId::new(t.as_str())).collect();
        for id in ids.iter().filter(|id| !loaded.graph.contains(id)) {
            tracing::warn!("Unknown unit: {}", id);
        }
        loaded
            .graph
            .reverse_reflexive_transitive_closure(&ids)
            .into_keys()
            .collect()
    };

    for id in affected {
        println!("{}", id);
    }
    Ok(())
}

pub fn dot(opts: &Options) -> anyhow::Result<()> {
    let loaded = load(opts, true)?;
    print!("{}", unitgraph_core::to_dot(&loaded.graph));
    Ok(())
}

pub async fn watch(opts: &Options) -> anyhow::Result<()> {
    let loaded = load(opts, false)?;
    tracing::info!("Loaded {} units", loaded.graph.len());

    let session = Arc::new(Session::new(loaded.graph));
    let service = WatcherService::new(&loaded.root, &loaded.config, loaded.manifests, Arc::clone(&session))?;

    // Print every published change
    let mut rx = session.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(message) => println!("{}", message),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Dropped {} messages", skipped);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    service.start_watching().await?;

    // Process events (this runs indefinitely)
    service.process_events().await?;

    Ok(())
}

pub fn clear(opts: &Options) -> anyhow::Result<()> {
    tracing::info!("Clearing cache for: {}", opts.root.display());

    unitgraph_core::clear_cache(&opts.root)?;

    tracing::info!("Cache cleared");
    Ok(())
}
