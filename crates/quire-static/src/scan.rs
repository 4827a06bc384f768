//! Source discovery.
//!
//! Mirrors the source directory into a [`Site`] tree, one folder per
//! directory. Hidden entries are ignored, `.md` files become pages later on,
//! everything else is copied through unchanged.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::tree::{FolderId, Site};

/// Suffix of files handed to the page assembler.
pub const MARKDOWN_SUFFIX: &str = ".md";

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("Failed to read source directory {path}: {source}")]
    Root { path: PathBuf, source: io::Error },
}

/// A listed directory entry.
#[derive(Debug)]
struct Entry {
    name: String,
    path: PathBuf,
    is_dir: bool,
}

/// Scan `source_dir` into a folder tree.
///
/// Only an unreadable root is an error. Unreadable subdirectories are logged
/// and left out of the tree without affecting their siblings. A directory
/// resolving to `exclude` (an output root nested in the source) is skipped.
pub fn scan_tree(source_dir: &Path, exclude: Option<&Path>) -> Result<Site, ScanError> {
    let entries = list_dir(source_dir).map_err(|source| ScanError::Root {
        path: source_dir.to_path_buf(),
        source,
    })?;

    let exclude = exclude.and_then(|path| fs::canonicalize(path).ok());

    let mut site = Site::new();
    populate(&mut site, Site::ROOT, entries, exclude.as_deref());
    Ok(site)
}

/// Merge the files under `static_dir` into `site` as pass-through files.
///
/// Folders missing from the source tree are created. A source file with the
/// same name takes precedence over the static one.
pub fn overlay_static(site: &mut Site, static_dir: &Path) {
    if !static_dir.is_dir() {
        tracing::debug!("No static directory at {}", static_dir.display());
        return;
    }

    match list_dir(static_dir) {
        Ok(entries) => overlay(site, Site::ROOT, entries),
        Err(e) => tracing::warn!("Failed to read {}: {}", static_dir.display(), e),
    }
}

pub fn is_markdown(name: &str) -> bool {
    name.len() > MARKDOWN_SUFFIX.len() && name.ends_with(MARKDOWN_SUFFIX)
}

fn populate(site: &mut Site, folder: FolderId, entries: Vec<Entry>, exclude: Option<&Path>) {
    for entry in entries {
        if entry.is_dir {
            if is_excluded(&entry.path, exclude) {
                tracing::debug!("Not scanning output directory {}", entry.path.display());
                continue;
            }
            match list_dir(&entry.path) {
                Ok(children) => {
                    let sub = site.add_folder(folder, &entry.name);
                    populate(site, sub, children, exclude);
                }
                Err(e) => tracing::warn!("Skipping {}: {}", entry.path.display(), e),
            }
        } else if is_markdown(&entry.name) {
            site.folder_mut(folder).markdown.push(entry.name);
        } else {
            site.folder_mut(folder)
                .passthrough
                .insert(entry.name, entry.path);
        }
    }
}

fn overlay(site: &mut Site, folder: FolderId, entries: Vec<Entry>) {
    for entry in entries {
        if entry.is_dir {
            match list_dir(&entry.path) {
                Ok(children) => {
                    let sub = site
                        .subfolder(folder, &entry.name)
                        .unwrap_or_else(|| site.add_folder(folder, &entry.name));
                    overlay(site, sub, children);
                }
                Err(e) => tracing::warn!("Skipping {}: {}", entry.path.display(), e),
            }
        } else {
            site.folder_mut(folder)
                .passthrough
                .entry(entry.name)
                .or_insert(entry.path);
        }
    }
}

fn is_excluded(dir: &Path, exclude: Option<&Path>) -> bool {
    exclude.is_some_and(|exclude| fs::canonicalize(dir).is_ok_and(|dir| dir == exclude))
}

/// List the visible entries of `dir`, sorted by name.
fn list_dir(dir: &Path) -> io::Result<Vec<Entry>> {
    let mut entries = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            tracing::warn!("Skipping non UTF-8 file name {}", path.display());
            continue;
        };
        if name.starts_with('.') {
            continue;
        }

        // Follow symlinks so linked directories are mirrored too.
        let is_dir = match fs::metadata(&path) {
            Ok(meta) => meta.is_dir(),
            Err(e) => {
                tracing::warn!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };

        entries.push(Entry { name, path, is_dir });
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn mirrors_directories_and_partitions_files() {
        let temp = tempdir().unwrap();
        let src = temp.path();
        fs::create_dir_all(src.join("blog/2024")).unwrap();
        fs::write(src.join("index.md"), "Title: Home\n").unwrap();
        fs::write(src.join("logo.png"), [0u8, 1, 2]).unwrap();
        fs::write(src.join("blog/b.md"), "").unwrap();
        fs::write(src.join("blog/a.md"), "").unwrap();
        fs::write(src.join("blog/2024/notes.txt"), "x").unwrap();

        let site = scan_tree(src, None).unwrap();

        let root = site.folder(Site::ROOT);
        assert_eq!(root.markdown, vec!["index.md"]);
        assert_eq!(
            root.passthrough.keys().collect::<Vec<_>>(),
            vec!["logo.png"]
        );

        let blog = site.subfolder(Site::ROOT, "blog").unwrap();
        assert_eq!(site.folder(blog).markdown, vec!["a.md", "b.md"]);

        let year = site.subfolder(blog, "2024").unwrap();
        assert_eq!(site.folder(year).path, PathBuf::from("blog/2024"));
        assert_eq!(
            site.folder(year).passthrough["notes.txt"],
            src.join("blog/2024/notes.txt")
        );
    }

    #[test]
    fn skips_nested_output_directory() {
        let temp = tempdir().unwrap();
        let src = temp.path();
        fs::create_dir_all(src.join("out/blog")).unwrap();
        fs::create_dir_all(src.join("blog")).unwrap();
        fs::write(src.join("out/blog/a"), "rendered").unwrap();
        fs::write(src.join("blog/a.md"), "").unwrap();

        let site = scan_tree(src, Some(&src.join("out"))).unwrap();

        assert!(site.subfolder(Site::ROOT, "out").is_none());
        assert!(site.subfolder(Site::ROOT, "blog").is_some());
    }

    #[test]
    fn ignores_hidden_files_and_directories() {
        let temp = tempdir().unwrap();
        let src = temp.path();
        fs::create_dir_all(src.join(".git")).unwrap();
        fs::write(src.join(".git/HEAD"), "ref").unwrap();
        fs::write(src.join(".draft.md"), "").unwrap();
        fs::write(src.join(".DS_Store"), "").unwrap();

        let site = scan_tree(src, None).unwrap();

        let root = site.folder(Site::ROOT);
        assert!(root.subfolders.is_empty());
        assert!(root.markdown.is_empty());
        assert!(root.passthrough.is_empty());
    }

    #[test]
    fn only_md_suffix_is_markdown() {
        assert!(is_markdown("post.md"));
        assert!(!is_markdown("post.md.bak"));
        assert!(!is_markdown("post.markdown"));
        assert!(!is_markdown(".md"));
    }

    #[test]
    fn missing_root_is_an_error() {
        let temp = tempdir().unwrap();

        let result = scan_tree(&temp.path().join("nope"), None);

        assert!(matches!(result, Err(ScanError::Root { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_subdirectory_is_omitted() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempdir().unwrap();
        let src = temp.path();
        let locked = src.join("locked");
        fs::create_dir_all(&locked).unwrap();
        fs::create_dir_all(src.join("open")).unwrap();
        fs::write(src.join("open/page.md"), "").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users can list the directory anyway.
        let readable = fs::read_dir(&locked).is_ok();
        let site = scan_tree(src, None).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(site.subfolder(Site::ROOT, "locked").is_some(), readable);
        let open = site.subfolder(Site::ROOT, "open").unwrap();
        assert_eq!(site.folder(open).markdown, vec!["page.md"]);
    }

    #[test]
    fn static_overlay_adds_files_and_folders() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("src");
        let stat = temp.path().join("static");
        fs::create_dir_all(&src).unwrap();
        fs::create_dir_all(stat.join("css")).unwrap();
        fs::write(src.join("robots.txt"), "from source").unwrap();
        fs::write(stat.join("robots.txt"), "from static").unwrap();
        fs::write(stat.join("favicon.ico"), "icon").unwrap();
        fs::write(stat.join("css/site.css"), "body{}").unwrap();

        let mut site = scan_tree(&src, None).unwrap();
        overlay_static(&mut site, &stat);

        let root = site.folder(Site::ROOT);
        assert_eq!(root.passthrough["robots.txt"], src.join("robots.txt"));
        assert_eq!(root.passthrough["favicon.ico"], stat.join("favicon.ico"));

        let css = site.subfolder(Site::ROOT, "css").unwrap();
        assert!(site.folder(css).markdown.is_empty());
        assert_eq!(site.folder(css).passthrough["site.css"], stat.join("css/site.css"));
    }

    #[test]
    fn missing_static_dir_is_ignored() {
        let temp = tempdir().unwrap();
        let mut site = scan_tree(temp.path(), None).unwrap();

        overlay_static(&mut site, &temp.path().join("static"));

        assert!(site.folder(Site::ROOT).subfolders.is_empty());
    }
}
