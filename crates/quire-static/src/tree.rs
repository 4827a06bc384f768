//! In-memory mirror of the source tree.
//!
//! Folders and pages live in two arenas owned by [`Site`] and refer to each
//! other by index. The whole structure is rebuilt on every pass and dropped
//! once the pass finishes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use quire_md::Metadata;

/// Index of a folder in [`Site`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FolderId(usize);

/// Index of a page in [`Site`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(usize);

/// One source directory.
#[derive(Debug)]
pub struct Folder {
    /// Path relative to the source and output roots (empty for the root)
    pub path: PathBuf,
    /// Navigation name
    pub name: String,
    pub parent: Option<FolderId>,
    pub subfolders: Vec<FolderId>,
    /// Pages, sorted by publish time once ordering has run
    pub pages: Vec<PageId>,
    /// The page duplicated to `index.html`
    pub index: Option<PageId>,
    /// Markdown file names, in directory order
    pub markdown: Vec<String>,
    /// Pass-through files: output name to absolute source path
    pub passthrough: BTreeMap<String, PathBuf>,
}

/// One Markdown article.
#[derive(Debug, Clone)]
pub struct Page {
    pub folder: FolderId,
    /// Source `.md` file name
    pub source_name: String,
    /// Output file name
    pub slug: String,
    pub pub_time: DateTime<Local>,
    pub mod_time: DateTime<Local>,
    pub meta: Metadata,
    /// Rendered HTML, filled in by the render stage
    pub content: String,
    /// Raw Markdown body bytes
    pub body: Vec<u8>,
    pub prev: Option<PageId>,
    pub next: Option<PageId>,
    pub up: Option<PageId>,
}

impl Page {
    /// Display label: the `Title` metadata, falling back to the slug.
    pub fn title(&self) -> &str {
        match self.meta.get("Title") {
            Some(title) if !title.is_empty() => title,
            _ => &self.slug,
        }
    }
}

/// Folder and page arenas for one pass.
#[derive(Debug)]
pub struct Site {
    folders: Vec<Folder>,
    pages: Vec<Page>,
}

impl Site {
    pub const ROOT: FolderId = FolderId(0);

    /// Create a tree holding only the root folder.
    pub fn new() -> Self {
        Self {
            folders: vec![Folder::new(PathBuf::new(), ".".to_string(), None)],
            pages: Vec::new(),
        }
    }

    /// Append a subfolder named `name` under `parent`.
    pub fn add_folder(&mut self, parent: FolderId, name: &str) -> FolderId {
        let id = FolderId(self.folders.len());
        let path = self.folder(parent).path.join(name);
        self.folders
            .push(Folder::new(path, name.to_string(), Some(parent)));
        self.folder_mut(parent).subfolders.push(id);
        id
    }

    /// Find the direct subfolder of `parent` called `name`.
    pub fn subfolder(&self, parent: FolderId, name: &str) -> Option<FolderId> {
        self.folder(parent)
            .subfolders
            .iter()
            .copied()
            .find(|id| self.folder(*id).name == name)
    }

    /// Append a page to its folder's page list.
    pub fn add_page(&mut self, page: Page) -> PageId {
        let id = PageId(self.pages.len());
        let folder = page.folder;
        self.pages.push(page);
        self.folder_mut(folder).pages.push(id);
        id
    }

    pub fn folder(&self, id: FolderId) -> &Folder {
        &self.folders[id.0]
    }

    pub fn folder_mut(&mut self, id: FolderId) -> &mut Folder {
        &mut self.folders[id.0]
    }

    pub fn page(&self, id: PageId) -> &Page {
        &self.pages[id.0]
    }

    pub fn page_mut(&mut self, id: PageId) -> &mut Page {
        &mut self.pages[id.0]
    }

    pub fn folder_ids(&self) -> impl Iterator<Item = FolderId> {
        (0..self.folders.len()).map(FolderId)
    }

    pub fn page_ids(&self) -> impl Iterator<Item = PageId> {
        (0..self.pages.len()).map(PageId)
    }

    /// Output-relative URL of a folder, with a trailing slash.
    pub fn folder_url(&self, id: FolderId) -> String {
        let path = url_path(&self.folder(id).path);
        if path.is_empty() {
            "/".to_string()
        } else {
            format!("/{path}/")
        }
    }

    /// Output-relative URL of a page.
    pub fn page_url(&self, id: PageId) -> String {
        let page = self.page(id);
        format!("{}{}", self.folder_url(page.folder), page.slug)
    }
}

impl Default for Site {
    fn default() -> Self {
        Self::new()
    }
}

impl Folder {
    fn new(path: PathBuf, name: String, parent: Option<FolderId>) -> Self {
        Self {
            path,
            name,
            parent,
            subfolders: Vec::new(),
            pages: Vec::new(),
            index: None,
            markdown: Vec::new(),
            passthrough: BTreeMap::new(),
        }
    }
}

fn url_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}


#[cfg(test)]
mod tests {
    use super::test_support::page;
    use super::*;

    #[test]
    fn builds_nested_paths_and_urls() {
        let mut site = Site::new();
        let blog = site.add_folder(Site::ROOT, "blog");
        let year = site.add_folder(blog, "2024");
        let post = site.add_page(page(year, "hello", 2024, 1, 1));

        assert_eq!(site.folder(year).path, PathBuf::from("blog/2024"));
        assert_eq!(site.folder_url(Site::ROOT), "/");
        assert_eq!(site.folder_url(year), "/blog/2024/");
        assert_eq!(site.page_url(post), "/blog/2024/hello");
        assert_eq!(site.folder(year).pages, vec![post]);
    }

    #[test]
    fn finds_subfolder_by_name() {
        let mut site = Site::new();
        let docs = site.add_folder(Site::ROOT, "docs");

        assert_eq!(site.subfolder(Site::ROOT, "docs"), Some(docs));
        assert_eq!(site.subfolder(Site::ROOT, "missing"), None);
    }

    #[test]
    fn title_falls_back_to_slug() {
        let mut p = page(Site::ROOT, "about", 2024, 1, 1);
        assert_eq!(p.title(), "about");

        p.meta.insert("Title", "About us");
        assert_eq!(p.title(), "About us");
    }
}
