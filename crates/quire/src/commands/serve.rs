//! Preview server command.

use anyhow::Result;

use crate::config::Settings;

/// Run the serve command.
pub async fn run(settings: Settings, port: Option<u16>, open: bool) -> Result<()> {
    let dir = &settings.build.output_dir;
    if !dir.exists() {
        anyhow::bail!(
            "Directory not found: {}. Run 'quire build' first.",
            dir.display()
        );
    }

    let port = port.unwrap_or(settings.port);
    quire_server::serve(dir, &settings.host, port, open).await?;

    Ok(())
}
