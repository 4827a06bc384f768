//! Site builder: one full pipeline pass.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use crate::assemble::assemble_pages;
use crate::config::BuildConfig;
use crate::feed::render_feed;
use crate::order::{build_site_map, link_pages, recent_pages, sort_pages};
use crate::reconcile::OutputReconciler;
use crate::render::{
    render_page, MarkdownRenderer, PageLink, PassData, PulldownMarkdown, SiteView,
    TemplateRenderer,
};
use crate::scan::{overlay_static, scan_tree, ScanError};
use crate::templates::{TemplateEngine, TemplateError};
use crate::tree::{FolderId, PageId, Site};

/// Result of a build pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Pages rendered
    pub pages: usize,

    /// Pass-through files copied
    pub copied: usize,

    /// Stale output files deleted
    pub deleted: usize,

    /// Pages skipped because of page-scoped errors
    pub skipped: usize,

    /// Total build time in milliseconds
    pub duration_ms: u64,

    /// Output directory
    pub output_dir: PathBuf,
}

/// Errors that abort a pass.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Templates(#[from] TemplateError),
}

/// Static site builder.
pub struct SiteBuilder {
    config: BuildConfig,
    markdown: Box<dyn MarkdownRenderer>,
}

impl SiteBuilder {
    /// Create a builder using pulldown-cmark for Markdown.
    pub fn new(config: BuildConfig) -> Self {
        Self {
            config,
            markdown: Box::new(PulldownMarkdown),
        }
    }

    /// Replace the Markdown capability.
    pub fn with_markdown(mut self, markdown: impl MarkdownRenderer + 'static) -> Self {
        self.markdown = Box::new(markdown);
        self
    }

    /// Compile the template directory and run a full pass.
    pub fn build(&self) -> Result<BuildReport, BuildError> {
        let templates = TemplateEngine::load(&self.config.templates_dir)?;
        self.build_with(&templates)
    }

    /// Run a full pass with an already prepared template capability.
    pub fn build_with(&self, templates: &dyn TemplateRenderer) -> Result<BuildReport, BuildError> {
        let start = Instant::now();

        let mut site = scan_tree(&self.config.source_dir, Some(&self.config.output_dir))?;
        overlay_static(&mut site, &self.config.static_dir);

        let skipped = assemble_pages(&mut site, &self.config.source_dir);
        sort_pages(&mut site);
        link_pages(&mut site);

        let recent = recent_pages(&site, self.config.recent_posts);
        let pass = PassData {
            site: SiteView::from_config(&self.config),
            sitemap: build_site_map(&site),
            recent: recent.iter().map(|id| PageLink::new(&site, *id)).collect(),
        };

        let feed = self.feed(&site, &recent);

        let mut generator = Generator {
            config: &self.config,
            markdown: self.markdown.as_ref(),
            templates,
            pass: &pass,
            feed: feed.as_ref().map(|(name, xml)| (name.as_str(), xml.as_str())),
            report: BuildReport {
                skipped,
                output_dir: self.config.output_dir.clone(),
                ..Default::default()
            },
        };
        generator.folder(&mut site, Site::ROOT);

        let mut report = generator.report;
        report.duration_ms = start.elapsed().as_millis() as u64;

        tracing::info!(
            "Built {} pages, copied {} files, deleted {} stale files, skipped {} in {}ms",
            report.pages,
            report.copied,
            report.deleted,
            report.skipped,
            report.duration_ms
        );

        Ok(report)
    }

    /// Feed file name and contents, when enabled.
    fn feed(&self, site: &Site, recent: &[PageId]) -> Option<(String, String)> {
        let name = self.config.feed_file()?;
        if name.contains(['/', '\\']) {
            tracing::warn!("Feed path {:?} must be a file name, feed disabled", name);
            return None;
        }
        let url = self.config.feed_url()?;
        Some((
            name.to_string(),
            render_feed(site, &self.config.site, &url, recent),
        ))
    }
}

/// Walks the tree writing output for one pass.
struct Generator<'a> {
    config: &'a BuildConfig,
    markdown: &'a dyn MarkdownRenderer,
    templates: &'a dyn TemplateRenderer,
    pass: &'a PassData,
    feed: Option<(&'a str, &'a str)>,
    report: BuildReport,
}

impl Generator<'_> {
    fn folder(&mut self, site: &mut Site, folder: FolderId) {
        let out_dir = self.config.output_dir.join(&site.folder(folder).path);

        let mut reconciler = match OutputReconciler::snapshot(&out_dir) {
            Ok(reconciler) => reconciler,
            Err(e) => {
                tracing::warn!("Skipping output folder {}: {}", out_dir.display(), e);
                self.report.skipped += site.folder(folder).pages.len();
                return;
            }
        };

        for (name, source) in site.folder(folder).passthrough.clone() {
            match fs::copy(&source, out_dir.join(&name)) {
                Ok(_) => {
                    reconciler.legitimize(&name);
                    self.report.copied += 1;
                }
                Err(e) => tracing::error!("Failed to copy {}: {}", source.display(), e),
            }
        }

        if folder == Site::ROOT {
            if let Some((name, xml)) = self.feed {
                if site.folder(folder).passthrough.contains_key(name) {
                    tracing::warn!("Feed {} overwrites the source file of the same name", name);
                }
                match fs::write(out_dir.join(name), xml) {
                    Ok(()) => {
                        reconciler.legitimize(name);
                    }
                    Err(e) => tracing::error!("Failed to write feed {}: {}", name, e),
                }
            }
        }

        for sub in site.folder(folder).subfolders.clone() {
            self.folder(site, sub);
        }

        for id in site.folder(folder).pages.clone() {
            match render_page(site, id, &out_dir, self.pass, self.markdown, self.templates) {
                Ok(written) => {
                    for name in &written {
                        reconciler.legitimize(name);
                    }
                    self.report.pages += 1;
                }
                Err(e) => {
                    tracing::warn!("{}", e);
                    self.report.skipped += 1;
                }
            }
        }

        self.report.deleted += reconciler.sweep().len();
    }
}
