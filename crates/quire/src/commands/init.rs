//! Scaffold a new site.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use quire_static::STARTER_TEMPLATE;

use crate::config::CONFIG_FILE;

/// Run the init command in the current directory.
pub async fn run(yes: bool) -> Result<()> {
    scaffold(Path::new("."), yes)?;

    tracing::info!("Initialization complete!");
    tracing::info!("Run 'quire' to build, watch and serve the site.");

    Ok(())
}

/// Files written by `init`, relative to the site root.
const FILES: &[(&str, &str)] = &[
    (CONFIG_FILE, DEFAULT_CONFIG),
    ("templates/default.html", STARTER_TEMPLATE),
    ("src/index.md", DEFAULT_INDEX),
];

fn scaffold(root: &Path, yes: bool) -> Result<()> {
    for (name, contents) in FILES {
        let path = root.join(name);
        if path.exists() && !yes {
            tracing::warn!("{} already exists. Use --yes to overwrite.", name);
            continue;
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("Failed to write {}", name))?;
        tracing::info!("Created {}", name);
    }

    fs::create_dir_all(root.join("static")).context("Failed to create static directory")?;

    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# quire configuration

[site]
name = "Site Name"
tagline = ""
# Absolute URL of the published site, used by the feed
base_url = "http://localhost"
recent_posts = 5

[paths]
source = "src"
output = "out"
templates = "templates"
static = "static"

[watch]
quiet_ms = 1000
ignore = ["node_modules", "target"]

[server]
host = "127.0.0.1"
port = 9000
"#;

const DEFAULT_INDEX: &str = r#"Title: Welcome
Index: true

# Welcome

This page lives at `src/index.md`. Every Markdown file under `src/` becomes
a page named after the file, and `Index: true` also publishes it as the
folder's `index.html`.

Front matter is a block of `Key: value` lines ended by a blank line.
Useful keys are `Title`, `Date`, `Slug`, `Template`, `Description` and
`Author`.
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{load_config, GlobalArgs};
    use quire_static::SiteBuilder;
    use tempfile::tempdir;

    #[test]
    fn scaffolded_site_builds() {
        let temp = tempdir().unwrap();
        scaffold(temp.path(), false).unwrap();

        let mut settings = load_config(Some(&temp.path().join(CONFIG_FILE)))
            .unwrap()
            .resolve(&GlobalArgs::default());
        let build = &mut settings.build;
        build.source_dir = temp.path().join(&build.source_dir);
        build.output_dir = temp.path().join(&build.output_dir);
        build.templates_dir = temp.path().join(&build.templates_dir);
        build.static_dir = temp.path().join(&build.static_dir);

        let report = SiteBuilder::new(settings.build.clone()).build().unwrap();

        assert_eq!(report.pages, 1);
        let index = fs::read_to_string(settings.build.output_dir.join("index.html")).unwrap();
        assert!(index.contains("<h1>Welcome</h1>"));
    }

    #[test]
    fn keeps_existing_files_without_yes() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("src")).unwrap();
        fs::write(temp.path().join("src/index.md"), "Title: Mine\n\nmine\n").unwrap();

        scaffold(temp.path(), false).unwrap();
        assert_eq!(
            fs::read_to_string(temp.path().join("src/index.md")).unwrap(),
            "Title: Mine\n\nmine\n"
        );

        scaffold(temp.path(), true).unwrap();
        assert_eq!(
            fs::read_to_string(temp.path().join("src/index.md")).unwrap(),
            DEFAULT_INDEX
        );
    }
}
