//! Development command: build, then rebuild on change while serving.

use anyhow::Result;
use quire_server::{DevServer, DevServerConfig};

use crate::config::Settings;

/// Run the dev server.
pub async fn run(settings: Settings, port: Option<u16>, open: bool) -> Result<()> {
    let builder = quire_static::SiteBuilder::new(settings.build.clone());

    // A broken template set or source root at startup is fatal.
    let (builder, _) = super::build::build(builder).await?;

    let build = &settings.build;
    let config = DevServerConfig {
        output_dir: build.output_dir.clone(),
        watch_paths: vec![
            build.source_dir.clone(),
            build.templates_dir.clone(),
            build.static_dir.clone(),
        ],
        ignore: settings.ignore.clone(),
        quiet: settings.quiet,
        host: settings.host.clone(),
        port: port.unwrap_or(settings.port),
        open,
    };

    tracing::info!("Watching for changes");

    DevServer::new(config)
        .start(move || {
            if let Err(e) = builder.build() {
                tracing::error!("Rebuild failed: {}", e);
            }
        })
        .await?;

    Ok(())
}
