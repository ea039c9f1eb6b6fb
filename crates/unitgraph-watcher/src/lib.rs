//! File watching and snapshot publication for the unit graph

pub mod session;
pub mod watcher;


pub use session::Session;
pub use watcher::{FileWatcher, WatchEvent, WatcherService};
