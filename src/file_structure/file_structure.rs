use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::filesystem::FileSystem;

use super::{DirEntry, Entry, TreeError};

/// The tree model of one sync directory.
#[derive(Debug, Clone)]
pub struct FileStructure {
    path: PathBuf,
    root: DirEntry,
}

impl FileStructure {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            root: DirEntry::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn root(&self) -> &DirEntry {
        &self.root
    }

    /// Absolute path of an entry given relative to the sync directory.
    pub fn absolute(&self, relative: &Path) -> PathBuf {
        self.path.join(relative)
    }

    /// Rebuilds the tree from the filesystem, dropping all `updated` flags.
    pub fn refresh(&mut self, fs: &dyn FileSystem) -> Result<(), TreeError> {
        self.root = DirEntry::build(fs, &self.path)?;
        debug!(
            "Read {} entries below {}",
            self.root.relative_paths(false).len(),
            self.path.display()
        );
        Ok(())
    }

    /// Flags the entries that changed relative to `snapshot` and returns how
    /// many there are.
    pub fn check(&mut self, snapshot: &DirEntry) -> usize {
        self.root.check(Some(snapshot))
    }

    /// Entries of `snapshot` that no longer exist. [`Self::check`] never
    /// reports these.
    pub fn removed_entries(&self, snapshot: &DirEntry) -> Vec<PathBuf> {
        self.root.removed_paths(snapshot)
    }

    pub fn entry_at(&self, relative: &Path) -> Option<&Entry> {
        self.root.entry_at(relative)
    }

    pub fn all_entries(&self) -> Vec<PathBuf> {
        self.root.relative_paths(false)
    }

    pub fn updated_entries(&self) -> Vec<PathBuf> {
        self.root.relative_paths(true)
    }

    #[cfg(test)]
    pub fn updated_count(&self) -> usize {
        self.root.updated_count()
    }
}

impl fmt::Display for FileStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.path.display())?;
        write!(f, "{}", self.root)
    }
}
