//! Output reconciliation.
//!
//! Before a folder is generated its output directory is snapshotted. Every
//! file the pass copies or renders is struck from the snapshot; whatever is
//! left once the folder is done no longer has a source and is deleted.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Deletion candidates for one output folder.
#[derive(Debug)]
pub struct OutputReconciler {
    dir: PathBuf,
    stale: BTreeSet<String>,
}

impl OutputReconciler {
    /// Create `dir` if needed and record its existing non-directory entries.
    pub fn snapshot(dir: &Path) -> io::Result<Self> {
        fs::create_dir_all(dir)?;

        let mut stale = BTreeSet::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => {
                    stale.insert(name);
                }
                Err(name) => tracing::warn!("Ignoring non UTF-8 output file {:?}", name),
            }
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            stale,
        })
    }

    /// Mark `name` as produced by this pass.
    ///
    /// Returns true if the file predates the pass.
    pub fn legitimize(&mut self, name: &str) -> bool {
        let existed = self.stale.remove(name);
        if existed {
            tracing::debug!("Legitimized {}", self.dir.join(name).display());
        }
        existed
    }

    /// Names still scheduled for deletion.
    pub fn pending(&self) -> impl Iterator<Item = &str> {
        self.stale.iter().map(String::as_str)
    }

    /// Delete every file that was never legitimized.
    ///
    /// Returns the names actually removed. Failures are logged and skipped.
    pub fn sweep(self) -> Vec<String> {
        let mut deleted = Vec::new();
        for name in self.stale {
            let path = self.dir.join(&name);
            match fs::remove_file(&path) {
                Ok(()) => {
                    tracing::debug!("Deleted stale {}", path.display());
                    deleted.push(name);
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!("Failed to delete {}: {}", path.display(), e),
            }
        }
        deleted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn creates_missing_directory() {
        let temp = tempdir().unwrap();
        let dir = temp.path().join("out/blog");

        let reconciler = OutputReconciler::snapshot(&dir).unwrap();

        assert!(dir.is_dir());
        assert_eq!(reconciler.pending().count(), 0);
    }

    #[test]
    fn deletes_only_unlegitimized_files() {
        let temp = tempdir().unwrap();
        let dir = temp.path();
        fs::write(dir.join("keep.html"), "k").unwrap();
        fs::write(dir.join("old.html"), "o").unwrap();
        fs::create_dir(dir.join("sub")).unwrap();

        let mut reconciler = OutputReconciler::snapshot(dir).unwrap();
        assert_eq!(reconciler.pending().collect::<Vec<_>>(), vec!["keep.html", "old.html"]);

        assert!(reconciler.legitimize("keep.html"));
        fs::write(dir.join("new.html"), "n").unwrap();
        assert!(!reconciler.legitimize("new.html"));

        let deleted = reconciler.sweep();

        assert_eq!(deleted, vec!["old.html"]);
        assert!(dir.join("keep.html").exists());
        assert!(dir.join("new.html").exists());
        assert!(!dir.join("old.html").exists());
        assert!(dir.join("sub").is_dir());
    }

    #[test]
    fn tolerates_files_already_gone() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("vanishing"), "").unwrap();

        let reconciler = OutputReconciler::snapshot(temp.path()).unwrap();
        fs::remove_file(temp.path().join("vanishing")).unwrap();

        assert!(reconciler.sweep().is_empty());
    }
}
