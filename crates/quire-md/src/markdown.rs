//! Markdown to HTML conversion.

use pulldown_cmark::{html, Options, Parser};

/// Render a Markdown body to HTML.
///
/// Invalid UTF-8 sequences are replaced rather than rejected; the output is
/// whatever pulldown-cmark produces, unchanged.
pub fn render_markdown(body: &[u8]) -> String {
    let source = String::from_utf8_lossy(body);

    let options = Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS;

    let parser = Parser::new_ext(&source, options);

    let mut html_output = String::new();
    html::push_html(&mut html_output, parser);

    html_output
}
