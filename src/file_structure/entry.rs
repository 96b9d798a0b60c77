use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use snafu::{ResultExt, ensure};
use tracing::warn;

use crate::ext::{ModTime, SystemTimeExt};
use crate::filesystem::FileSystem;

use super::{DirectoryNotFoundSnafu, TreeError, WalkSnafu};

/// A node of the in-memory directory tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    File(FileEntry),
    Dir(DirEntry),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileEntry {
    pub modified: ModTime,
    pub updated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DirEntry {
    pub modified: ModTime,
    pub updated: bool,
    pub children: HashMap<String, Entry>,
}

impl Entry {
    pub fn modified(&self) -> ModTime {
        match self {
            Entry::File(file) => file.modified,
            Entry::Dir(dir) => dir.modified,
        }
    }

    pub fn updated(&self) -> bool {
        match self {
            Entry::File(file) => file.updated,
            Entry::Dir(dir) => dir.updated,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Entry::File(_))
    }

    pub fn as_dir(&self) -> Option<&DirEntry> {
        match self {
            Entry::Dir(dir) => Some(dir),
            Entry::File(_) => None,
        }
    }
}

impl FileEntry {
    pub fn new(modified: ModTime) -> Self {
        Self {
            modified,
            updated: false,
        }
    }
}

impl DirEntry {
    /// Walks `path` recursively and builds the tree below it.
    ///
    /// Children that are neither files nor directories (sockets, dangling
    /// links) are skipped.
    pub fn build(fs: &dyn FileSystem, path: &Path) -> Result<Self, TreeError> {
        ensure!(fs.is_dir(path), DirectoryNotFoundSnafu { path });

        let modified = fs.modified(path).context(WalkSnafu { path })?.to_mod_time();
        let mut children = HashMap::new();

        for child in fs.list_children(path).context(WalkSnafu { path })? {
            let Some(name) = fs.name(&child) else {
                continue;
            };

            if fs.is_file(&child) {
                let modified = fs
                    .modified(&child)
                    .context(WalkSnafu { path: &child })?
                    .to_mod_time();
                children.insert(name, Entry::File(FileEntry::new(modified)));
            } else if fs.is_dir(&child) {
                children.insert(name, Entry::Dir(Self::build(fs, &child)?));
            } else {
                warn!(
                    "Skipping {}: neither a file nor a directory",
                    child.display()
                );
            }
        }

        Ok(Self {
            modified,
            updated: false,
            children,
        })
    }

    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.children.get(name)
    }

    /// Looks up an entry by its path relative to this directory.
    pub fn entry_at(&self, relative: &Path) -> Option<&Entry> {
        let mut names = relative
            .iter()
            .map(|name| name.to_string_lossy())
            .peekable();
        let mut current = self;

        while let Some(name) = names.next() {
            let entry = current.get(&name)?;
            if names.peek().is_none() {
                return Some(entry);
            }
            current = entry.as_dir()?;
        }

        None
    }

    /// Flags every entry that differs from `snapshot` and returns how many
    /// were flagged.
    ///
    /// An entry is new when nothing of the same kind sits at its path in the
    /// snapshot. Files are also flagged when strictly newer than their
    /// snapshot counterpart. Directories are never flagged for their own
    /// modification time; their children are checked instead.
    pub fn check(&mut self, snapshot: Option<&DirEntry>) -> usize {
        let mut changed = 0;

        for (name, entry) in &mut self.children {
            let counterpart = snapshot.and_then(|snapshot| snapshot.children.get(name));

            changed += match (entry, counterpart) {
                (Entry::File(file), Some(Entry::File(old))) => {
                    file.updated = file.modified > old.modified;
                    usize::from(file.updated)
                }
                (Entry::Dir(dir), Some(Entry::Dir(old))) => {
                    dir.updated = false;
                    dir.check(Some(old))
                }
                (Entry::File(file), _) => {
                    file.updated = true;
                    1
                }
                (Entry::Dir(dir), _) => {
                    dir.updated = true;
                    1 + dir.check(None)
                }
            };
        }

        changed
    }

    /// Relative paths of the entries of `snapshot` that are gone from this
    /// tree or changed kind. A vanished directory brings everything below
    /// it along.
    pub fn removed_paths(&self, snapshot: &DirEntry) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        self.collect_removed(snapshot, Path::new(""), &mut paths);
        paths
    }

    fn collect_removed(&self, snapshot: &DirEntry, prefix: &Path, paths: &mut Vec<PathBuf>) {
        for (name, old) in &snapshot.children {
            let path = prefix.join(name);
            match (self.children.get(name), old) {
                (Some(Entry::File(_)), Entry::File(_)) => {}
                (Some(Entry::Dir(live)), Entry::Dir(old)) => {
                    live.collect_removed(old, &path, paths);
                }
                (_, Entry::File(_)) => paths.push(path),
                (_, Entry::Dir(old)) => {
                    paths.extend(old.relative_paths(false).into_iter().map(|child| path.join(child)));
                    paths.push(path);
                }
            }
        }
    }

    #[cfg(test)]
    pub fn updated_count(&self) -> usize {
        self.children
            .values()
            .map(|entry| match entry {
                Entry::File(file) => usize::from(file.updated),
                Entry::Dir(dir) => usize::from(dir.updated) + dir.updated_count(),
            })
            .sum()
    }

    /// Relative paths of all entries below this directory. With
    /// `only_updated`, just the flagged ones.
    pub fn relative_paths(&self, only_updated: bool) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        self.collect_paths(Path::new(""), only_updated, &mut paths);
        paths
    }

    fn collect_paths(&self, prefix: &Path, only_updated: bool, paths: &mut Vec<PathBuf>) {
        for (name, entry) in &self.children {
            let path = prefix.join(name);
            if !only_updated || entry.updated() {
                paths.push(path.clone());
            }
            if let Entry::Dir(dir) = entry {
                dir.collect_paths(&path, only_updated, paths);
            }
        }
    }

    /// Folds `other` into this tree keeping the most recent modification time
    /// at every shared path. Entries only present in `other` are copied over.
    /// On a kind mismatch this tree's entry wins.
    pub fn merge_latest(&mut self, other: &DirEntry) {
        self.modified = self.modified.max(other.modified);

        for (name, theirs) in &other.children {
            match (self.children.get_mut(name), theirs) {
                (Some(Entry::File(ours)), Entry::File(theirs)) => {
                    ours.modified = ours.modified.max(theirs.modified);
                }
                (Some(Entry::Dir(ours)), Entry::Dir(theirs)) => ours.merge_latest(theirs),
                (Some(_), _) => {}
                (None, theirs) => {
                    self.children.insert(name.clone(), theirs.clone());
                }
            }
        }
    }

    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = " ".repeat(3 * depth);
        let mut names: Vec<&String> = self.children.keys().collect();
        names.sort();

        for name in names {
            let entry = &self.children[name];
            write!(f, "{indent}{name}")?;
            if let Entry::File(file) = entry {
                write!(f, ": {}", file.modified)?;
            }
            if entry.updated() {
                write!(f, " X")?;
            }
            writeln!(f)?;
            if let Entry::Dir(dir) = entry {
                dir.fmt_indented(f, depth + 1)?;
            }
        }

        Ok(())
    }
}

impl fmt::Display for DirEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}
