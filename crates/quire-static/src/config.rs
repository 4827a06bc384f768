//! Build configuration threaded through every stage of a pass.

use std::path::PathBuf;

/// Site-wide values exposed to templates and the feed.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SiteMeta {
    /// Site name
    pub name: String,
    /// Short tag line shown under the name
    pub tagline: String,
    /// Absolute base URL of the published site
    pub base_url: String,
}

impl Default for SiteMeta {
    fn default() -> Self {
        Self {
            name: "Site Name".to_string(),
            tagline: String::new(),
            base_url: "http://localhost".to_string(),
        }
    }
}

/// Configuration for one pipeline run.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Markdown source root
    pub source_dir: PathBuf,

    /// Output root, mirrors `source_dir`
    pub output_dir: PathBuf,

    /// Template root
    pub templates_dir: PathBuf,

    /// Static assets merged into the mirrored tree
    pub static_dir: PathBuf,

    /// Site metadata
    pub site: SiteMeta,

    /// Number of most recent pages handed to templates and the feed
    pub recent_posts: usize,

    /// Feed file, relative to the output root. `None` disables the feed.
    pub feed_path: Option<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("src"),
            output_dir: PathBuf::from("out"),
            templates_dir: PathBuf::from("templates"),
            static_dir: PathBuf::from("static"),
            site: SiteMeta::default(),
            recent_posts: 5,
            feed_path: Some("rss.xml".to_string()),
        }
    }
}

impl BuildConfig {
    /// Feed path, if a feed is written on this pass.
    pub fn feed_file(&self) -> Option<&str> {
        match self.feed_path.as_deref() {
            Some(path) if self.recent_posts > 0 && !path.is_empty() => Some(path),
            _ => None,
        }
    }

    /// Public URL of the feed.
    pub fn feed_url(&self) -> Option<String> {
        self.feed_file()
            .map(|path| format!("{}/{}", self.site.base_url.trim_end_matches('/'), path))
    }
}
