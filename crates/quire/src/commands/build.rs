//! One-shot site build.

use anyhow::{Context, Result};
use quire_static::{BuildReport, SiteBuilder};

use crate::config::Settings;

/// Run the build command.
pub async fn run(settings: Settings) -> Result<()> {
    tracing::info!("Building site...");

    let builder = SiteBuilder::new(settings.build);
    let report = build(builder).await?.1;

    tracing::info!("Output: {}", report.output_dir.display());

    Ok(())
}

/// Run a full pass off the async runtime, handing the builder back.
pub async fn build(builder: SiteBuilder) -> Result<(SiteBuilder, BuildReport)> {
    tokio::task::spawn_blocking(move || {
        let report = builder.build();
        (builder, report)
    })
    .await
    .context("Build task failed")
    .and_then(|(builder, report)| Ok((builder, report?)))
}
