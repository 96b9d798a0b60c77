//! Filesystem capability used by the tree model and the reconciliation engine.
//!
//! Nothing outside this module touches the OS directly. Every walk, copy,
//! rename and delete goes through [`FileSystem`], which lets the core run
//! against [`MemoryFileSystem`] in tests.

#[cfg(test)]
mod memory;
mod os;

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use snafu::Snafu;

use crate::ext::BestEffortPathExt;

#[cfg(test)]
pub use memory::{FsOperation, MemoryFileSystem};
pub use os::OsFileSystem;

pub trait FileSystem {
    fn exists(&self, path: &Path) -> bool;
    fn is_file(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
    /// Full paths of the direct children of a directory, in no particular order.
    fn list_children(&self, path: &Path) -> Result<Vec<PathBuf>, FsError>;
    fn modified(&self, path: &Path) -> Result<SystemTime, FsError>;
    /// Whether two files hold the same bytes.
    fn same_contents(&self, first: &Path, second: &Path) -> Result<bool, FsError>;

    fn name(&self, path: &Path) -> Option<String> {
        path.file_name()
            .map(|name| name.to_string_lossy().into_owned())
    }

    /// Copies a file, overwriting `dst`. The modification time of `src` is
    /// carried over to `dst`.
    fn copy_file(&self, src: &Path, dst: &Path) -> Result<(), FsError>;
    /// Fails with [`FsError::AlreadyExists`] when `dst` is occupied.
    fn rename(&self, src: &Path, dst: &Path) -> Result<PathBuf, FsError>;
    fn remove_file(&self, path: &Path) -> Result<(), FsError>;
    fn remove_tree(&self, path: &Path) -> Result<(), FsError>;
    fn create_dir(&self, path: &Path, parents: bool) -> Result<(), FsError>;
    fn current_dir(&self) -> Result<PathBuf, FsError>;
}

#[derive(Debug, Snafu)]
pub enum FsError {
    #[snafu(display("Filesystem operation failed on {}", path.best_effort_path_display()))]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Destination {} already exists", path.best_effort_path_display()))]
    AlreadyExists { path: PathBuf },
    #[snafu(display("{} does not exist", path.best_effort_path_display()))]
    NotFound { path: PathBuf },
}
