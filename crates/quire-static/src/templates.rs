//! Template engine backed by minijinja.
//!
//! Every `*.html` file under the template root is compiled up front. A
//! template is named by its path relative to the root without the
//! extension, so `templates/blog/entry.html` is `blog/entry`.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::DateTime;
use minijinja::{AutoEscape, Environment, ErrorKind};
use walkdir::WalkDir;

use crate::render::{RenderContext, TemplateRenderer, DEFAULT_TEMPLATE};

/// File extension of template sources.
pub const TEMPLATE_EXTENSION: &str = "html";

/// Errors raised while compiling or rendering templates.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Template directory not found: {0}")]
    MissingDirectory(PathBuf),

    #[error("Failed to walk template directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Failed to read template {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("Failed to compile template {name}: {source}")]
    Compile {
        name: String,
        source: minijinja::Error,
    },

    #[error("Default template \"default\" is missing")]
    MissingDefault,

    #[error("Failed to render template {name}: {source}")]
    Render {
        name: String,
        source: minijinja::Error,
    },
}

/// Compiled template set.
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl TemplateEngine {
    /// Compile every template under `dir`.
    pub fn load(dir: &Path) -> Result<Self, TemplateError> {
        if !dir.is_dir() {
            return Err(TemplateError::MissingDirectory(dir.to_path_buf()));
        }

        let mut engine = Self::empty();
        for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
            let entry = entry?;
            let path = entry.path();
            if !entry.file_type().is_file() || is_hidden(path, dir) {
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some(TEMPLATE_EXTENSION) {
                continue;
            }

            let source = fs::read_to_string(path).map_err(|source| TemplateError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            let name = template_name(path.strip_prefix(dir).unwrap_or(path));
            engine.add(name, source)?;
        }

        engine.require_default()?;
        tracing::debug!("Templates compiled from {}", dir.display());
        Ok(engine)
    }

    /// Compile templates from in-memory sources.
    pub fn from_sources<I, N, S>(sources: I) -> Result<Self, TemplateError>
    where
        I: IntoIterator<Item = (N, S)>,
        N: Into<String>,
        S: Into<String>,
    {
        let mut engine = Self::empty();
        for (name, source) in sources {
            engine.add(name.into(), source.into())?;
        }
        engine.require_default()?;
        Ok(engine)
    }

    /// Names of all compiled templates.
    pub fn names(&self) -> Vec<&str> {
        self.env.templates().map(|(name, _)| name).collect()
    }

    fn empty() -> Self {
        let mut env = Environment::new();
        // Names carry no extension, so pick HTML escaping explicitly.
        env.set_auto_escape_callback(|_| AutoEscape::Html);
        env.add_filter("datefmt", datefmt);
        Self { env }
    }

    fn add(&mut self, name: String, source: String) -> Result<(), TemplateError> {
        self.env
            .add_template_owned(name.clone(), source)
            .map_err(|source| TemplateError::Compile { name, source })
    }

    fn require_default(&self) -> Result<(), TemplateError> {
        if self.has_template(DEFAULT_TEMPLATE) {
            Ok(())
        } else {
            Err(TemplateError::MissingDefault)
        }
    }
}

impl TemplateRenderer for TemplateEngine {
    fn has_template(&self, name: &str) -> bool {
        self.env.get_template(name).is_ok()
    }

    fn render(&self, name: &str, context: &RenderContext<'_>) -> Result<Vec<u8>, TemplateError> {
        let render_error = |source: minijinja::Error| TemplateError::Render {
            name: name.to_string(),
            source,
        };

        let tmpl = self.env.get_template(name).map_err(render_error)?;
        let html = tmpl.render(context).map_err(render_error)?;
        Ok(html.into_bytes())
    }
}

/// `{{ page.pub_time | datefmt("%d %B %Y") }}`
fn datefmt(value: String, format: String) -> Result<String, minijinja::Error> {
    let time = DateTime::parse_from_rfc3339(&value).map_err(|e| {
        minijinja::Error::new(
            ErrorKind::InvalidOperation,
            format!("not a timestamp: {value:?} ({e})"),
        )
    })?;

    let mut out = String::new();
    write!(out, "{}", time.format(&format)).map_err(|_| {
        minijinja::Error::new(
            ErrorKind::InvalidOperation,
            format!("invalid date format {format:?}"),
        )
    })?;
    Ok(out)
}

fn template_name(relative: &Path) -> String {
    relative
        .with_extension("")
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn is_hidden(path: &Path, root: &Path) -> bool {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .any(|c| c.as_os_str().to_string_lossy().starts_with('.'))
}

/// Starting point written by `quire init`.
pub const STARTER_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{{ meta.Title | default(page.slug) }} - {{ site.name }}</title>
  {% if meta.Description %}<meta name="description" content="{{ meta.Description }}">{% endif %}
  {% if site.feed_url %}<link rel="alternate" type="application/rss+xml" title="{{ site.name }}" href="{{ site.feed_url }}">{% endif %}
</head>
<body>
  <div class="layout">
    <nav class="sidebar">
      <div class="nav-header">
        <a href="/" class="nav-logo">{{ site.name }}</a>
        {% if site.tagline %}<p class="tagline">{{ site.tagline }}</p>{% endif %}
      </div>
      <ul class="nav-list">
      {% for entry in sitemap %}
        <li class="nav-item depth-{{ entry.depth }}{% if entry.url == page.url %} active{% endif %}">
          <a href="{{ entry.url }}">{{ entry.label }}</a>
        </li>
      {% endfor %}
      </ul>
    </nav>
    <main class="main">
      <article class="doc">
        <p class="meta">{{ meta.PubTime }}{% if meta.Author %} by {{ meta.Author }}{% endif %}</p>
        <div class="content">
          {{ content | safe }}
        </div>
      </article>
      <footer class="pager">
        {% if page.prev %}<a rel="prev" href="{{ page.prev.url }}">{{ page.prev.title }}</a>{% endif %}
        {% if page.up %}<a rel="up" href="{{ page.up.url }}">{{ page.up.title }}</a>{% endif %}
        {% if page.next %}<a rel="next" href="{{ page.next.url }}">{{ page.next.title }}</a>{% endif %}
      </footer>
    </main>
  </div>
</body>
</html>
"##;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{PageLink, PageView, SiteView};
    use quire_md::Metadata;
    use tempfile::tempdir;

    fn context<'a>(meta: &'a Metadata, site: &'a SiteView, content: &'a str) -> RenderContext<'a> {
        RenderContext {
            page: PageView {
                slug: "button",
                url: "/docs/button".to_string(),
                source: "button.md",
                pub_time: "2024-01-02T03:04:05+00:00".to_string(),
                mod_time: "2024-01-02T03:04:05+00:00".to_string(),
                is_index: false,
                prev: None,
                next: Some(PageLink {
                    url: "/docs/card".to_string(),
                    slug: "card".to_string(),
                    title: "Card".to_string(),
                }),
                up: None,
            },
            meta,
            content,
            site,
            sitemap: &[],
            recent: &[],
        }
    }

    fn site_view() -> SiteView {
        SiteView {
            name: "My Docs".to_string(),
            tagline: String::new(),
            base_url: "http://localhost".to_string(),
            feed_url: None,
        }
    }

    #[test]
    fn renders_starter_template() {
        let engine = TemplateEngine::from_sources([("default", STARTER_TEMPLATE)]).unwrap();
        let meta: Metadata = [("Title", "Button"), ("PubTime", "2024-01-02")]
            .into_iter()
            .collect();
        let site = site_view();

        let html = engine
            .render("default", &context(&meta, &site, "<p>Hello world</p>"))
            .unwrap();
        let html = String::from_utf8(html).unwrap();

        assert!(html.contains("<title>Button - My Docs</title>"));
        assert!(html.contains("<p>Hello world</p>"));
        assert!(html.contains(r#"rel="next""#));
        assert!(html.contains(">Card</a>"));
    }

    #[test]
    fn escapes_metadata() {
        let engine = TemplateEngine::from_sources([("default", "{{ meta.Title }}")]).unwrap();
        let meta: Metadata = [("Title", "Fish & <Chips>")].into_iter().collect();
        let site = site_view();

        let html = engine.render("default", &context(&meta, &site, "")).unwrap();

        assert_eq!(String::from_utf8(html).unwrap(), "Fish &amp; &lt;Chips&gt;");
    }

    #[test]
    fn formats_dates() {
        let engine = TemplateEngine::from_sources([(
            "default",
            r#"{{ page.pub_time | datefmt("%d %B %Y") }}"#,
        )])
        .unwrap();
        let meta = Metadata::new();
        let site = site_view();

        let html = engine.render("default", &context(&meta, &site, "")).unwrap();

        assert_eq!(String::from_utf8(html).unwrap(), "02 January 2024");
    }

    #[test]
    fn requires_default_template() {
        let result = TemplateEngine::from_sources([("post", "{{ content }}")]);

        assert!(matches!(result, Err(TemplateError::MissingDefault)));
    }

    #[test]
    fn reports_compile_errors() {
        let result = TemplateEngine::from_sources([("default", "{% if %}")]);

        assert!(matches!(result, Err(TemplateError::Compile { name, .. }) if name == "default"));
    }

    #[test]
    fn loads_nested_directory() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("blog")).unwrap();
        fs::create_dir_all(temp.path().join(".cache")).unwrap();
        fs::write(temp.path().join("base.html"), "[{% block body %}{% endblock %}]").unwrap();
        fs::write(
            temp.path().join("default.html"),
            r#"{% extends "base" %}{% block body %}{{ content | safe }}{% endblock %}"#,
        )
        .unwrap();
        fs::write(temp.path().join("blog/entry.html"), "entry").unwrap();
        fs::write(temp.path().join("notes.txt"), "not a template").unwrap();
        fs::write(temp.path().join(".cache/x.html"), "{% broken").unwrap();

        let engine = TemplateEngine::load(temp.path()).unwrap();
        let mut names = engine.names();
        names.sort();

        assert_eq!(names, vec!["base", "blog/entry", "default"]);

        let meta = Metadata::new();
        let site = site_view();
        let html = engine.render("default", &context(&meta, &site, "<i>x</i>")).unwrap();
        assert_eq!(String::from_utf8(html).unwrap(), "[<i>x</i>]");
    }

    #[test]
    fn missing_directory_is_fatal() {
        let temp = tempdir().unwrap();

        let result = TemplateEngine::load(&temp.path().join("templates"));

        assert!(matches!(result, Err(TemplateError::MissingDirectory(_))));
    }
}
