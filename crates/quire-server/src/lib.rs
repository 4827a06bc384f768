//! Development server for quire sites.
//!
//! Serves the output directory over HTTP while a file watcher feeds a
//! debounced, single-flight rebuild scheduler.

pub mod scheduler;
pub mod server;
pub mod watcher;

pub use scheduler::{debounce, RebuildHandle, RebuildScheduler, Request};
pub use server::{serve, DevServer, DevServerConfig, ServerError};
pub use watcher::{FileWatcher, WatchError, WatchEvent, WatchFilter};
