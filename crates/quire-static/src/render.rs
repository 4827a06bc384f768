//! Page rendering.
//!
//! Markdown conversion and template execution are capabilities behind two
//! traits so the dialect and the template language can be swapped without
//! touching the pipeline.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use quire_md::Metadata;
use serde::Serialize;

use crate::config::BuildConfig;
use crate::order::SiteMapEntry;
use crate::templates::TemplateError;
use crate::tree::{PageId, Site};

/// Template used when a page names none.
pub const DEFAULT_TEMPLATE: &str = "default";

/// Metadata key selecting the template.
pub const KEY_TEMPLATE: &str = "Template";

/// Artifact duplicating a folder's index page.
pub const INDEX_FILE: &str = "index.html";

/// Converts a Markdown body to HTML.
pub trait MarkdownRenderer: Send + Sync {
    fn render(&self, body: &[u8]) -> String;
}

/// Executes a named template against a page context.
pub trait TemplateRenderer: Send + Sync {
    fn has_template(&self, name: &str) -> bool;

    fn render(&self, name: &str, context: &RenderContext<'_>) -> Result<Vec<u8>, TemplateError>;
}

/// pulldown-cmark Markdown.
#[derive(Debug, Default, Clone, Copy)]
pub struct PulldownMarkdown;

impl MarkdownRenderer for PulldownMarkdown {
    fn render(&self, body: &[u8]) -> String {
        quire_md::render_markdown(body)
    }
}

/// A link to another page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageLink {
    pub url: String,
    pub slug: String,
    pub title: String,
}

impl PageLink {
    pub fn new(site: &Site, id: PageId) -> Self {
        let page = site.page(id);
        Self {
            url: site.page_url(id),
            slug: page.slug.clone(),
            title: page.title().to_string(),
        }
    }
}

/// The page being rendered.
#[derive(Debug, Clone, Serialize)]
pub struct PageView<'a> {
    pub slug: &'a str,
    pub url: String,
    /// Source file name
    pub source: &'a str,
    /// RFC 3339 publish time
    pub pub_time: String,
    /// RFC 3339 modification time
    pub mod_time: String,
    pub is_index: bool,
    pub prev: Option<PageLink>,
    pub next: Option<PageLink>,
    pub up: Option<PageLink>,
}

/// Site-wide values.
#[derive(Debug, Clone, Serialize)]
pub struct SiteView {
    pub name: String,
    pub tagline: String,
    pub base_url: String,
    pub feed_url: Option<String>,
}

impl SiteView {
    pub fn from_config(config: &BuildConfig) -> Self {
        Self {
            name: config.site.name.clone(),
            tagline: config.site.tagline.clone(),
            base_url: config.site.base_url.clone(),
            feed_url: config.feed_url(),
        }
    }
}

/// Everything a template sees.
#[derive(Debug, Clone, Serialize)]
pub struct RenderContext<'a> {
    pub page: PageView<'a>,
    pub meta: &'a Metadata,
    /// Rendered HTML body
    pub content: &'a str,
    pub site: &'a SiteView,
    pub sitemap: &'a [SiteMapEntry],
    pub recent: &'a [PageLink],
}

/// Per-pass values shared by every page.
#[derive(Debug, Clone)]
pub struct PassData {
    pub site: SiteView,
    pub sitemap: Vec<SiteMapEntry>,
    pub recent: Vec<PageLink>,
}

/// Errors that skip a single page at render time.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Template not found: {name} (page {page})")]
    UnknownTemplate { page: String, name: String },

    #[error("Failed to render {page}: {source}")]
    Template {
        page: String,
        source: TemplateError,
    },

    #[error("Error creating output {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

/// Render one page into `out_dir`.
///
/// The template runs once; its output goes to the page's slug and, for the
/// folder's index page, to [`INDEX_FILE`] as well. Returns the file names
/// written.
pub fn render_page(
    site: &mut Site,
    id: PageId,
    out_dir: &Path,
    pass: &PassData,
    markdown: &dyn MarkdownRenderer,
    templates: &dyn TemplateRenderer,
) -> Result<Vec<String>, RenderError> {
    let template = match site.page(id).meta.get(KEY_TEMPLATE) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => DEFAULT_TEMPLATE.to_string(),
    };
    if !templates.has_template(&template) {
        return Err(RenderError::UnknownTemplate {
            page: site.page_url(id),
            name: template,
        });
    }

    let html = markdown.render(&site.page(id).body);
    site.page_mut(id).content = html;

    let site = &*site;
    let page = site.page(id);
    let is_index = site.folder(page.folder).index == Some(id);
    let link = |target: Option<PageId>| target.map(|t| PageLink::new(site, t));

    let context = RenderContext {
        page: PageView {
            slug: &page.slug,
            url: site.page_url(id),
            source: &page.source_name,
            pub_time: page.pub_time.to_rfc3339(),
            mod_time: page.mod_time.to_rfc3339(),
            is_index,
            prev: link(page.prev),
            next: link(page.next),
            up: link(page.up),
        },
        meta: &page.meta,
        content: &page.content,
        site: &pass.site,
        sitemap: &pass.sitemap,
        recent: &pass.recent,
    };

    let bytes = templates
        .render(&template, &context)
        .map_err(|source| RenderError::Template {
            page: context.page.url.clone(),
            source,
        })?;

    let mut written = Vec::with_capacity(2);
    write_output(out_dir, &page.slug, &bytes)?;
    written.push(page.slug.clone());

    if is_index && page.slug != INDEX_FILE {
        match write_output(out_dir, INDEX_FILE, &bytes) {
            Ok(()) => written.push(INDEX_FILE.to_string()),
            Err(e) => tracing::error!("{}", e),
        }
    }

    Ok(written)
}

fn write_output(out_dir: &Path, name: &str, bytes: &[u8]) -> Result<(), RenderError> {
    let path = out_dir.join(name);
    fs::write(&path, bytes).map_err(|source| RenderError::Write { path, source })
}
