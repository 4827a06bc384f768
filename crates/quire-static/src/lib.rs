//! Static site generator core.
//!
//! Mirrors a source tree of Markdown pages into an output tree of rendered
//! HTML. A pass scans the source, assembles pages from their front matter,
//! orders them, renders each through a template, and finally removes output
//! files that no longer have a source.

pub mod assemble;
pub mod builder;
pub mod config;
pub mod feed;
pub mod order;
pub mod reconcile;
pub mod render;
pub mod scan;
pub mod templates;
pub mod tree;

pub use builder::{BuildError, BuildReport, SiteBuilder};
pub use config::{BuildConfig, SiteMeta};
pub use render::{MarkdownRenderer, PulldownMarkdown, RenderContext, TemplateRenderer};
pub use templates::{TemplateEngine, TemplateError, STARTER_TEMPLATE};
pub use tree::{Folder, FolderId, Page, PageId, Site};
