//! HTTP serving of the output tree.

use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use axum::http::{header, HeaderValue};
use axum::middleware::map_response;
use axum::response::Response;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

use crate::scheduler::{watch_and_rebuild, RebuildScheduler};
use crate::watcher::{FileWatcher, WatchError, WatchFilter};

/// Configuration for the development server.
#[derive(Debug, Clone)]
pub struct DevServerConfig {
    /// Directory served over HTTP
    pub output_dir: PathBuf,

    /// Directories watched for changes
    pub watch_paths: Vec<PathBuf>,

    /// Path components that never trigger a rebuild
    pub ignore: Vec<String>,

    /// Quiet window before a burst of changes triggers a rebuild
    pub quiet: Duration,

    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Open browser on start
    pub open: bool,
}

impl Default for DevServerConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("out"),
            watch_paths: vec![
                PathBuf::from("src"),
                PathBuf::from("templates"),
                PathBuf::from("static"),
            ],
            ignore: vec!["node_modules".to_string(), "target".to_string()],
            quiet: Duration::from_millis(1000),
            host: "127.0.0.1".to_string(),
            port: 9000,
            open: false,
        }
    }
}

/// Errors that can occur with the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid address {0}")]
    InvalidAddress(String),

    #[error("Failed to bind to {addr}: {source}")]
    Bind { addr: SocketAddr, source: io::Error },

    #[error("Server error: {0}")]
    Serve(#[source] io::Error),

    #[error(transparent)]
    Watch(#[from] WatchError),
}

/// Development server: watch, rebuild, serve.
pub struct DevServer {
    config: DevServerConfig,
}

impl DevServer {
    pub fn new(config: DevServerConfig) -> Self {
        Self { config }
    }

    /// Serve the output directory and run `rebuild` after each settled burst
    /// of source changes. Runs until the server stops.
    pub async fn start<F>(self, rebuild: F) -> Result<(), ServerError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let listener = bind(&self.config.host, self.config.port).await?;

        let filter = WatchFilter::new(
            self.config.watch_paths.clone(),
            Some(self.config.output_dir.clone()),
            self.config.ignore.clone(),
        );
        let (watcher, events) = FileWatcher::new(&self.config.watch_paths, filter)?;

        let scheduler = RebuildScheduler::spawn(rebuild);
        let handle = scheduler.handle();
        let quiet = self.config.quiet;
        let watch = tokio::spawn(async move {
            watch_and_rebuild(events, quiet, handle).await;
            // Keep watcher alive
            drop(watcher);
        });

        let result = serve_on(listener, &self.config.output_dir, self.config.open).await;

        // The watch task holds a rebuild handle; the worker only stops once it is gone.
        watch.abort();
        if let Err(e) = watch.await {
            if !e.is_cancelled() {
                tracing::error!("Watch task failed: {}", e);
            }
        }
        scheduler.shutdown().await;
        result
    }
}

/// Router serving files under `root`.
///
/// Slugs usually carry no extension, so anything served as an opaque byte
/// stream is labelled as HTML.
pub fn router(root: &Path) -> Router {
    Router::new()
        .fallback_service(ServeDir::new(root))
        .layer(map_response(extensionless_as_html))
}

async fn extensionless_as_html(mut response: Response) -> Response {
    let opaque = response
        .headers()
        .get(header::CONTENT_TYPE)
        .is_some_and(|v| v == "application/octet-stream");
    if opaque {
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        );
    }
    response
}

/// Bind the listening socket.
pub async fn bind(host: &str, port: u16) -> Result<TcpListener, ServerError> {
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .map_err(|_| ServerError::InvalidAddress(format!("{}:{}", host, port)))?;

    TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })
}

/// Serve `root` until the server stops.
pub async fn serve(root: &Path, host: &str, port: u16, open: bool) -> Result<(), ServerError> {
    let listener = bind(host, port).await?;
    serve_on(listener, root, open).await
}

async fn serve_on(listener: TcpListener, root: &Path, open: bool) -> Result<(), ServerError> {
    let addr = listener.local_addr().map_err(ServerError::Serve)?;
    tracing::info!("Serving {} at http://{}", root.display(), addr);

    if open {
        let url = format!("http://{}", addr);
        if let Err(e) = open::that(&url) {
            tracing::warn!("Failed to open browser: {}", e);
        }
    }

    axum::serve(listener, router(root))
        .await
        .map_err(ServerError::Serve)
}
