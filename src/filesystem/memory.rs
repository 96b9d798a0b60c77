use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, SystemTime};

use snafu::ensure;

use super::{AlreadyExistsSnafu, FileSystem, FsError, NotFoundSnafu};

/// Seconds since the epoch at which the fake clock starts.
const CLOCK_START: u64 = 1_600_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
enum MemoryNode {
    File {
        contents: Vec<u8>,
        modified: SystemTime,
    },
    Directory {
        children: BTreeMap<String, MemoryNode>,
        modified: SystemTime,
    },
}

impl MemoryNode {
    fn directory(modified: SystemTime) -> Self {
        MemoryNode::Directory {
            children: BTreeMap::new(),
            modified,
        }
    }

    fn modified(&self) -> SystemTime {
        match self {
            MemoryNode::File { modified, .. } | MemoryNode::Directory { modified, .. } => *modified,
        }
    }

    fn child(&self, name: &str) -> Option<&MemoryNode> {
        match self {
            MemoryNode::Directory { children, .. } => children.get(name),
            MemoryNode::File { .. } => None,
        }
    }

    fn child_mut(&mut self, name: &str) -> Option<&mut MemoryNode> {
        match self {
            MemoryNode::Directory { children, .. } => children.get_mut(name),
            MemoryNode::File { .. } => None,
        }
    }
}

/// Mutating call recorded by [`MemoryFileSystem`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsOperation {
    Copy { from: PathBuf, to: PathBuf },
    Rename { from: PathBuf, to: PathBuf },
    RemoveFile(PathBuf),
    RemoveTree(PathBuf),
    CreateDir(PathBuf),
}

/// In-memory [`FileSystem`] with a fake clock that advances one second on
/// every mutation. Directory modification times follow their contents the
/// way a real filesystem does.
#[derive(Debug)]
pub struct MemoryFileSystem {
    root: RefCell<MemoryNode>,
    clock: Cell<u64>,
    journal: RefCell<Vec<FsOperation>>,
}

impl Default for MemoryFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self {
            root: RefCell::new(MemoryNode::directory(SystemTime::UNIX_EPOCH)),
            clock: Cell::new(CLOCK_START),
            journal: RefCell::new(Vec::new()),
        }
    }

    fn tick(&self) -> SystemTime {
        let now = self.clock.get() + 1;
        self.clock.set(now);
        SystemTime::UNIX_EPOCH + Duration::from_secs(now)
    }

    fn names(path: &Path) -> Vec<String> {
        path.components()
            .filter_map(|component| match component {
                Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect()
    }

    fn with_node<T>(&self, path: &Path, f: impl FnOnce(Option<&MemoryNode>) -> T) -> T {
        let root = self.root.borrow();
        let mut current = Some(&*root);
        for name in Self::names(path) {
            current = current.and_then(|node| node.child(&name));
        }
        f(current)
    }

    /// Runs `f` on the parent directory's children map of `path`, bumping
    /// the parent's modification time.
    fn with_parent_mut<T>(
        &self,
        path: &Path,
        f: impl FnOnce(&mut BTreeMap<String, MemoryNode>, &str) -> Result<T, FsError>,
    ) -> Result<T, FsError> {
        let mut names = Self::names(path);
        let Some(last) = names.pop() else {
            return NotFoundSnafu { path }.fail();
        };
        let now = self.tick();
        let mut root = self.root.borrow_mut();
        let mut current = &mut *root;
        for name in &names {
            current = match current.child_mut(name) {
                Some(node) => node,
                None => return NotFoundSnafu { path }.fail(),
            };
        }
        match current {
            MemoryNode::Directory { children, modified } => {
                let result = f(children, &last)?;
                *modified = now;
                Ok(result)
            }
            MemoryNode::File { .. } => NotFoundSnafu { path }.fail(),
        }
    }

    fn record(&self, operation: FsOperation) {
        self.journal.borrow_mut().push(operation);
    }

    /// Writes a file, creating missing parent directories.
    pub fn write_file(&self, path: impl AsRef<Path>, contents: &str) {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            self.mkdir_all(parent);
        }
        let modified = self.tick();
        self.with_parent_mut(path, |children, name| {
            children.insert(
                name.to_string(),
                MemoryNode::File {
                    contents: contents.as_bytes().to_vec(),
                    modified,
                },
            );
            Ok(())
        })
        .expect("parent directory was just created");
    }

    pub fn mkdir_all(&self, path: impl AsRef<Path>) {
        let mut current = PathBuf::from("/");
        for name in Self::names(path.as_ref()) {
            current.push(name);
            if !self.exists(&current) {
                let modified = self.tick();
                self.with_parent_mut(&current, |children, name| {
                    children.insert(name.to_string(), MemoryNode::directory(modified));
                    Ok(())
                })
                .expect("parent directory exists");
            }
        }
    }

    /// Rewrites a file's contents with a fresh modification time.
    pub fn touch(&self, path: impl AsRef<Path>, contents: &str) {
        self.write_file(path, contents);
    }

    /// Moves a file or directory without recording it in the journal, the
    /// way a user would outside of the synchronizer.
    pub fn move_path(&self, src: impl AsRef<Path>, dst: impl AsRef<Path>) {
        let node = self
            .with_parent_mut(src.as_ref(), |children, name| {
                children.remove(name).ok_or(FsError::NotFound {
                    path: PathBuf::from(name),
                })
            })
            .expect("source exists");
        self.with_parent_mut(dst.as_ref(), |children, name| {
            children.insert(name.to_string(), node);
            Ok(())
        })
        .expect("destination parent exists");
    }

    pub fn delete(&self, path: impl AsRef<Path>) {
        self.with_parent_mut(path.as_ref(), |children, name| {
            children.remove(name);
            Ok(())
        })
        .expect("parent exists");
    }

    /// Forces the modification time of an existing entry.
    pub fn set_modified(&self, path: impl AsRef<Path>, modified: SystemTime) {
        let mut root = self.root.borrow_mut();
        let mut current = &mut *root;
        for name in Self::names(path.as_ref()) {
            current = current.child_mut(&name).expect("path exists");
        }
        match current {
            MemoryNode::File { modified: time, .. } | MemoryNode::Directory { modified: time, .. } => {
                *time = modified;
            }
        }
    }

    pub fn read(&self, path: impl AsRef<Path>) -> Option<String> {
        self.with_node(path.as_ref(), |node| match node {
            Some(MemoryNode::File { contents, .. }) => {
                Some(String::from_utf8_lossy(contents).into_owned())
            }
            _ => None,
        })
    }

    /// Names of the direct children of a directory, sorted.
    pub fn child_names(&self, path: impl AsRef<Path>) -> Vec<String> {
        self.with_node(path.as_ref(), |node| match node {
            Some(MemoryNode::Directory { children, .. }) => children.keys().cloned().collect(),
            _ => Vec::new(),
        })
    }

    pub fn operations(&self) -> Vec<FsOperation> {
        self.journal.borrow().clone()
    }

    pub fn clear_operations(&self) {
        self.journal.borrow_mut().clear();
    }
}

impl FileSystem for MemoryFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.with_node(path, |node| node.is_some())
    }

    fn is_file(&self, path: &Path) -> bool {
        self.with_node(path, |node| matches!(node, Some(MemoryNode::File { .. })))
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.with_node(path, |node| matches!(node, Some(MemoryNode::Directory { .. })))
    }

    fn list_children(&self, path: &Path) -> Result<Vec<PathBuf>, FsError> {
        self.with_node(path, |node| match node {
            Some(MemoryNode::Directory { children, .. }) => {
                Ok(children.keys().map(|name| path.join(name)).collect())
            }
            _ => NotFoundSnafu { path }.fail(),
        })
    }

    fn modified(&self, path: &Path) -> Result<SystemTime, FsError> {
        self.with_node(path, |node| match node {
            Some(node) => Ok(node.modified()),
            None => NotFoundSnafu { path }.fail(),
        })
    }

    fn same_contents(&self, first: &Path, second: &Path) -> Result<bool, FsError> {
        let contents = |path: &Path| {
            self.with_node(path, |node| match node {
                Some(MemoryNode::File { contents, .. }) => Ok(contents.clone()),
                _ => NotFoundSnafu { path }.fail(),
            })
        };
        Ok(contents(first)? == contents(second)?)
    }

    fn copy_file(&self, src: &Path, dst: &Path) -> Result<(), FsError> {
        let node = self.with_node(src, |node| match node {
            Some(node @ MemoryNode::File { .. }) => Ok(node.clone()),
            _ => NotFoundSnafu { path: src }.fail(),
        })?;
        self.with_parent_mut(dst, |children, name| {
            children.insert(name.to_string(), node);
            Ok(())
        })?;
        self.record(FsOperation::Copy {
            from: src.to_path_buf(),
            to: dst.to_path_buf(),
        });
        Ok(())
    }

    fn rename(&self, src: &Path, dst: &Path) -> Result<PathBuf, FsError> {
        ensure!(!self.exists(dst), AlreadyExistsSnafu { path: dst });
        ensure!(self.exists(src), NotFoundSnafu { path: src });
        self.move_path(src, dst);
        self.record(FsOperation::Rename {
            from: src.to_path_buf(),
            to: dst.to_path_buf(),
        });
        Ok(dst.to_path_buf())
    }

    fn remove_file(&self, path: &Path) -> Result<(), FsError> {
        ensure!(self.is_file(path), NotFoundSnafu { path });
        self.delete(path);
        self.record(FsOperation::RemoveFile(path.to_path_buf()));
        Ok(())
    }

    fn remove_tree(&self, path: &Path) -> Result<(), FsError> {
        ensure!(self.is_dir(path), NotFoundSnafu { path });
        self.delete(path);
        self.record(FsOperation::RemoveTree(path.to_path_buf()));
        Ok(())
    }

    fn create_dir(&self, path: &Path, parents: bool) -> Result<(), FsError> {
        ensure!(!self.exists(path), AlreadyExistsSnafu { path });
        if parents {
            self.mkdir_all(path);
        } else {
            let modified = self.tick();
            self.with_parent_mut(path, |children, name| {
                children.insert(name.to_string(), MemoryNode::directory(modified));
                Ok(())
            })?;
        }
        self.record(FsOperation::CreateDir(path.to_path_buf()));
        Ok(())
    }

    fn current_dir(&self) -> Result<PathBuf, FsError> {
        Ok(PathBuf::from("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_file_creates_parents() {
        let fs = MemoryFileSystem::new();
        fs.write_file("/a/b/c.txt", "hello");

        assert!(fs.is_dir(Path::new("/a/b")));
        assert!(fs.is_file(Path::new("/a/b/c.txt")));
        assert_eq!(fs.read("/a/b/c.txt").as_deref(), Some("hello"));
    }

    #[test]
    fn clock_advances_on_every_write() {
        let fs = MemoryFileSystem::new();
        fs.write_file("/a.txt", "1");
        let first = fs.modified(Path::new("/a.txt")).unwrap();
        fs.touch("/a.txt", "2");
        let second = fs.modified(Path::new("/a.txt")).unwrap();

        assert!(second > first);
    }

    #[test]
    fn directory_time_follows_contents() {
        let fs = MemoryFileSystem::new();
        fs.mkdir_all("/dir");
        let before = fs.modified(Path::new("/dir")).unwrap();
        fs.write_file("/dir/new.txt", "");

        assert!(fs.modified(Path::new("/dir")).unwrap() > before);
    }

    #[test]
    fn copy_keeps_modification_time_and_is_journaled() {
        let fs = MemoryFileSystem::new();
        fs.write_file("/src/a.txt", "data");
        fs.mkdir_all("/dst");

        fs.copy_file(Path::new("/src/a.txt"), Path::new("/dst/a.txt"))
            .unwrap();

        assert_eq!(
            fs.modified(Path::new("/src/a.txt")).unwrap(),
            fs.modified(Path::new("/dst/a.txt")).unwrap()
        );
        assert_eq!(
            fs.operations(),
            vec![FsOperation::Copy {
                from: PathBuf::from("/src/a.txt"),
                to: PathBuf::from("/dst/a.txt"),
            }]
        );
    }

    #[test]
    fn copy_into_missing_directory_fails() {
        let fs = MemoryFileSystem::new();
        fs.write_file("/src/a.txt", "data");

        let result = fs.copy_file(Path::new("/src/a.txt"), Path::new("/nope/a.txt"));

        assert!(matches!(result, Err(FsError::NotFound { .. })));
    }

    #[test]
    fn rename_onto_existing_entry_fails() {
        let fs = MemoryFileSystem::new();
        fs.write_file("/a.txt", "a");
        fs.write_file("/b.txt", "b");

        let result = fs.rename(Path::new("/a.txt"), Path::new("/b.txt"));

        assert!(matches!(result, Err(FsError::AlreadyExists { .. })));
        assert_eq!(fs.read("/b.txt").as_deref(), Some("b"));
    }

    #[test]
    fn remove_tree_drops_descendants() {
        let fs = MemoryFileSystem::new();
        fs.write_file("/root/dir/x.txt", "");
        fs.remove_tree(Path::new("/root/dir")).unwrap();

        assert!(!fs.exists(Path::new("/root/dir/x.txt")));
        assert!(fs.child_names("/root").is_empty());
    }
}
