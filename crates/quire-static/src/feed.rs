//! RSS feed of the most recent pages.

use html_escape::encode_text;

use crate::config::SiteMeta;
use crate::tree::{PageId, Site};

/// Render an RSS 2.0 document for `recent`, newest first.
///
/// The output depends only on the pages, so an unchanged site produces an
/// identical feed.
pub fn render_feed(site: &Site, meta: &SiteMeta, feed_url: &str, recent: &[PageId]) -> String {
    let base = meta.base_url.trim_end_matches('/');

    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str(
        "<rss version=\"2.0\" xmlns:atom=\"http://www.w3.org/2005/Atom\">\n<channel>\n",
    );
    element(&mut xml, 1, "title", &meta.name);
    element(&mut xml, 1, "link", &format!("{}/", base));
    element(&mut xml, 1, "description", &meta.tagline);
    xml.push_str(&format!(
        "  <atom:link href=\"{}\" rel=\"self\" type=\"application/rss+xml\"/>\n",
        html_escape::encode_double_quoted_attribute(feed_url)
    ));
    if let Some(newest) = recent.first() {
        element(&mut xml, 1, "lastBuildDate", &site.page(*newest).pub_time.to_rfc2822());
    }

    for id in recent {
        let page = site.page(*id);
        let link = format!("{}{}", base, site.page_url(*id));

        xml.push_str("  <item>\n");
        element(&mut xml, 2, "title", page.title());
        element(&mut xml, 2, "link", &link);
        element(&mut xml, 2, "guid", &link);
        element(&mut xml, 2, "pubDate", &page.pub_time.to_rfc2822());
        if let Some(description) = page.meta.get("Description") {
            element(&mut xml, 2, "description", description);
        }
        if let Some(author) = page.meta.get("Author") {
            element(&mut xml, 2, "author", author);
        }
        xml.push_str("  </item>\n");
    }

    xml.push_str("</channel>\n</rss>\n");
    xml
}

/// Append one `<tag>text</tag>` line, escaping `text`.
fn element(xml: &mut String, depth: usize, tag: &str, text: &str) {
    xml.push_str(&"  ".repeat(depth));
    xml.push_str(&format!("<{tag}>{}</{tag}>\n", encode_text(text)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::recent_pages;
    use crate::tree::test_support::page;

    #[test]
    fn lists_recent_pages_newest_first() {
        let mut site = Site::new();
        let blog = site.add_folder(Site::ROOT, "blog");
        let mut old = page(blog, "old", 2024, 1, 1);
        old.meta.insert("Title", "Fish & Chips");
        site.add_page(old);
        let mut new = page(blog, "new", 2024, 2, 1);
        new.meta.insert("Description", "<fresh>");
        site.add_page(new);

        let meta = SiteMeta {
            name: "Journal".to_string(),
            tagline: "Notes".to_string(),
            base_url: "https://example.org/".to_string(),
        };
        let recent = recent_pages(&site, 5);
        let xml = render_feed(&site, &meta, "https://example.org/rss.xml", &recent);

        assert!(xml.contains("<title>Journal</title>"));
        assert!(xml.contains("<link>https://example.org/</link>"));
        assert!(xml.contains("<title>Fish &amp; Chips</title>"));
        assert!(xml.contains("<description>&lt;fresh&gt;</description>"));

        let newer = xml.find("https://example.org/blog/new").unwrap();
        let older = xml.find("https://example.org/blog/old").unwrap();
        assert!(newer < older);
    }

    #[test]
    fn item_lines_are_indented_and_escaped() {
        let mut site = Site::new();
        let mut post = page(Site::ROOT, "post", 2024, 3, 5);
        post.meta.insert("Author", "Ann <ann@example.org>");
        let id = site.add_page(post);

        let xml = render_feed(&site, &SiteMeta::default(), "http://localhost/rss.xml", &[id]);

        assert!(xml.contains("\n    <author>Ann &lt;ann@example.org&gt;</author>\n"));
        assert!(xml.contains("\n    <link>http://localhost/post</link>\n"));
        assert!(xml.contains("\n  <lastBuildDate>"));
    }

    #[test]
    fn empty_feed_is_still_valid_channel() {
        let site = Site::new();
        let xml = render_feed(&site, &SiteMeta::default(), "http://localhost/rss.xml", &[]);

        assert!(xml.contains("<channel>"));
        assert!(!xml.contains("<item>"));
        assert!(!xml.contains("lastBuildDate"));
    }
}
