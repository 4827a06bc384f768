//! Front matter parsing and Markdown rendering.
//!
//! Source articles begin with a block of `Key: value` metadata lines (or a
//! `---` delimited YAML mapping). This crate reads that block off a
//! line-oriented reader, hands back the untouched remainder as the page body,
//! and converts bodies to HTML with pulldown-cmark.

pub mod frontmatter;
pub mod markdown;

pub use frontmatter::{read_body, read_front_matter, FrontMatterError, Metadata};
pub use markdown::render_markdown;
