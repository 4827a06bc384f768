//! Page assembly: one [`Page`] per Markdown file.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone};
use quire_md::{read_body, read_front_matter, FrontMatterError};

use crate::scan::MARKDOWN_SUFFIX;
use crate::tree::{FolderId, Page, Site};

pub const KEY_SLUG: &str = "Slug";
pub const KEY_DATE: &str = "Date";
pub const KEY_INDEX: &str = "Index";
pub const KEY_PUB_TIME: &str = "PubTime";
pub const KEY_MOD_TIME: &str = "ModTime";

/// Date-time layouts tried in order for the `Date` key.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Date-only layouts, tried after [`DATETIME_FORMATS`].
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d %B %Y", "%B %d, %Y", "%d %b %Y"];

/// Errors that skip a single page.
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("Cannot open {path}: {source}")]
    Open { path: PathBuf, source: io::Error },

    #[error("Cannot read meta from {path}: {source}")]
    FrontMatter {
        path: PathBuf,
        source: FrontMatterError,
    },

    #[error("Cannot read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("Invalid slug {slug:?} in {path}")]
    InvalidSlug { path: PathBuf, slug: String },
}

/// Assemble every Markdown file in the tree into pages.
///
/// Returns the number of files skipped because of page-scoped errors.
pub fn assemble_pages(site: &mut Site, source_dir: &Path) -> usize {
    let mut skipped = 0;

    let folders: Vec<FolderId> = site.folder_ids().collect();
    for folder in folders {
        let dir = source_dir.join(&site.folder(folder).path);
        let names = site.folder(folder).markdown.clone();

        for name in names {
            match assemble_page(folder, &dir.join(&name), &name) {
                Ok(page) => {
                    let is_index = page.meta.contains(KEY_INDEX);
                    let id = site.add_page(page);
                    if is_index {
                        site.folder_mut(folder).index = Some(id);
                    }
                }
                Err(e) => {
                    tracing::warn!("{}", e);
                    skipped += 1;
                }
            }
        }
    }

    skipped
}

/// Read one Markdown file and build its page record.
pub fn assemble_page(folder: FolderId, path: &Path, file_name: &str) -> Result<Page, PageError> {
    let file = File::open(path).map_err(|source| PageError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let modified = file
        .metadata()
        .and_then(|m| m.modified())
        .map_err(|source| PageError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    let mod_time = DateTime::<Local>::from(modified);

    let mut reader = BufReader::new(file);
    let mut meta = read_front_matter(&mut reader).map_err(|source| PageError::FrontMatter {
        path: path.to_path_buf(),
        source,
    })?;
    let body = read_body(&mut reader).map_err(|source| PageError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let slug = match meta.get(KEY_SLUG) {
        Some(slug) if !slug.is_empty() => slug.to_string(),
        _ => file_name
            .strip_suffix(MARKDOWN_SUFFIX)
            .unwrap_or(file_name)
            .to_string(),
    };
    if !is_valid_slug(&slug) {
        return Err(PageError::InvalidSlug {
            path: path.to_path_buf(),
            slug,
        });
    }

    let pub_time = meta
        .get(KEY_DATE)
        .and_then(parse_date)
        .unwrap_or(mod_time);

    meta.insert(KEY_SLUG, slug.as_str());
    meta.insert(KEY_PUB_TIME, pub_time.format("%Y-%m-%d").to_string());
    meta.insert(KEY_MOD_TIME, mod_time.format("%H:%M").to_string());

    Ok(Page {
        folder,
        source_name: file_name.to_string(),
        slug,
        pub_time,
        mod_time,
        meta,
        content: String::new(),
        body,
        prev: None,
        next: None,
        up: None,
    })
}

/// Parse a `Date` value, trying each known layout in turn.
///
/// Values without an offset are taken as local time.
pub fn parse_date(value: &str) -> Option<DateTime<Local>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Local));
    }

    let naive = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })?;

    Local.from_local_datetime(&naive).earliest()
}

/// A slug names a single file inside its folder.
fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty() && slug != "." && slug != ".." && !slug.contains(['/', '\\'])
}
