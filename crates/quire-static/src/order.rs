//! Sibling ordering and navigation.

use serde::Serialize;

use crate::tree::{FolderId, PageId, Site};

/// One flattened navigation record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteMapEntry {
    /// Nesting depth, 0 for the root folder's entries
    pub depth: usize,
    /// Output-relative URL
    pub url: String,
    /// Display label
    pub label: String,
}

/// Sort every folder's pages by publish time.
///
/// The sort is stable: pages with equal times keep the order in which they
/// were read from disk.
pub fn sort_pages(site: &mut Site) {
    let folders: Vec<FolderId> = site.folder_ids().collect();
    for folder in folders {
        let mut pages = std::mem::take(&mut site.folder_mut(folder).pages);
        pages.sort_by_key(|id| site.page(*id).pub_time);
        site.folder_mut(folder).pages = pages;
    }
}

/// Populate prev/next/up links.
///
/// Prev and next point at the sorted neighbours within the folder. Up points
/// at the folder's index page; the index page itself points at its parent
/// folder's index page.
pub fn link_pages(site: &mut Site) {
    let folders: Vec<FolderId> = site.folder_ids().collect();
    for folder in folders {
        let pages = site.folder(folder).pages.clone();
        let index = site.folder(folder).index;
        let parent_index = site
            .folder(folder)
            .parent
            .and_then(|parent| site.folder(parent).index);

        for (i, id) in pages.iter().copied().enumerate() {
            let prev = i.checked_sub(1).map(|j| pages[j]);
            let next = pages.get(i + 1).copied();
            let up = if index == Some(id) { parent_index } else { index };

            let page = site.page_mut(id);
            page.prev = prev;
            page.next = next;
            page.up = up;
        }
    }
}

/// Flatten the folder tree into navigation entries.
///
/// At each folder the pages come first, then each subfolder followed
/// directly by that subfolder's own entries one level deeper.
pub fn build_site_map(site: &Site) -> Vec<SiteMapEntry> {
    let mut entries = Vec::new();
    walk(site, Site::ROOT, 0, &mut entries);
    entries
}

fn walk(site: &Site, folder: FolderId, depth: usize, entries: &mut Vec<SiteMapEntry>) {
    let node = site.folder(folder);

    for id in &node.pages {
        entries.push(SiteMapEntry {
            depth,
            url: site.page_url(*id),
            label: site.page(*id).title().to_string(),
        });
    }

    for sub in &node.subfolders {
        entries.push(SiteMapEntry {
            depth,
            url: site.folder_url(*sub),
            label: site.folder(*sub).name.clone(),
        });
        walk(site, *sub, depth + 1, entries);
    }
}

/// The `count` most recently published pages, newest first.
pub fn recent_pages(site: &Site, count: usize) -> Vec<PageId> {
    let mut pages: Vec<PageId> = site.page_ids().collect();
    pages.sort_by(|a, b| site.page(*b).pub_time.cmp(&site.page(*a).pub_time));
    pages.truncate(count);
    pages
}
