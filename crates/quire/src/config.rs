//! quire.toml loading and command-line overrides.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use quire_static::{BuildConfig, SiteMeta};
use serde::Deserialize;

/// Default configuration file name.
pub const CONFIG_FILE: &str = "quire.toml";

/// Flags shared by every command. Each one overrides the config file.
#[derive(Debug, Default, Args)]
pub struct GlobalArgs {
    /// Path to the config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Site name
    #[arg(short = 'n', long, global = true)]
    pub site_name: Option<String>,

    /// Site tag line
    #[arg(short = 't', long, global = true)]
    pub tag_line: Option<String>,

    /// Number of recent posts in templates and the feed
    #[arg(short = 'r', long, global = true)]
    pub recent_posts: Option<usize>,

    /// Base URL for absolute links
    #[arg(short = 'b', long, global = true)]
    pub base_url: Option<String>,

    /// Source directory
    #[arg(short = 's', long, global = true)]
    pub src: Option<PathBuf>,

    /// Output directory
    #[arg(short = 'o', long, global = true)]
    pub out: Option<PathBuf>,

    /// Template directory
    #[arg(short = 'a', long, global = true)]
    pub template: Option<PathBuf>,

    /// Static assets directory
    #[arg(long = "static", global = true)]
    pub static_dir: Option<PathBuf>,
}

/// Configuration file structure (quire.toml).
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    site: SiteSection,
    #[serde(default)]
    paths: PathsSection,
    #[serde(default)]
    watch: WatchSection,
    #[serde(default)]
    server: ServerSection,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SiteSection {
    name: String,
    tagline: String,
    base_url: String,
    recent_posts: usize,
}

impl Default for SiteSection {
    fn default() -> Self {
        let meta = SiteMeta::default();
        Self {
            name: meta.name,
            tagline: meta.tagline,
            base_url: meta.base_url,
            recent_posts: 5,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct PathsSection {
    source: PathBuf,
    output: PathBuf,
    templates: PathBuf,
    #[serde(rename = "static")]
    static_dir: PathBuf,
}

impl Default for PathsSection {
    fn default() -> Self {
        let build = BuildConfig::default();
        Self {
            source: build.source_dir,
            output: build.output_dir,
            templates: build.templates_dir,
            static_dir: build.static_dir,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct WatchSection {
    quiet_ms: u64,
    ignore: Vec<String>,
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            quiet_ms: 1000,
            ignore: vec!["node_modules".to_string(), "target".to_string()],
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ServerSection {
    host: String,
    port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9000,
        }
    }
}

/// Fully resolved settings for one invocation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub build: BuildConfig,
    pub quiet: Duration,
    pub ignore: Vec<String>,
    pub host: String,
    pub port: u16,
}

/// Load the config file.
///
/// A missing default file yields defaults; a missing file named with
/// `--config`, or any malformed file, is an error.
pub fn load_config(explicit: Option<&Path>) -> Result<ConfigFile> {
    let path = explicit.unwrap_or_else(|| Path::new(CONFIG_FILE));
    if !path.exists() {
        if explicit.is_some() {
            anyhow::bail!("Config file not found: {}", path.display());
        }
        return Ok(ConfigFile::default());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config: ConfigFile =
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))?;
    tracing::info!("Loaded config from {}", path.display());
    Ok(config)
}

impl ConfigFile {
    /// Apply command-line overrides.
    pub fn resolve(self, args: &GlobalArgs) -> Settings {
        let site = SiteMeta {
            name: args.site_name.clone().unwrap_or(self.site.name),
            tagline: args.tag_line.clone().unwrap_or(self.site.tagline),
            base_url: args.base_url.clone().unwrap_or(self.site.base_url),
        };

        let build = BuildConfig {
            source_dir: args.src.clone().unwrap_or(self.paths.source),
            output_dir: args.out.clone().unwrap_or(self.paths.output),
            templates_dir: args.template.clone().unwrap_or(self.paths.templates),
            static_dir: args.static_dir.clone().unwrap_or(self.paths.static_dir),
            site,
            recent_posts: args.recent_posts.unwrap_or(self.site.recent_posts),
            ..Default::default()
        };

        Settings {
            build,
            quiet: Duration::from_millis(self.watch.quiet_ms),
            ignore: self.watch.ignore,
            host: self.server.host,
            port: self.server.port,
        }
    }
}
