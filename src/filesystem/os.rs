use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use snafu::{ResultExt, ensure};
use tracing::debug;

use super::{AlreadyExistsSnafu, FileSystem, FsError, IoSnafu};

/// [`FileSystem`] backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn list_children(&self, path: &Path) -> Result<Vec<PathBuf>, FsError> {
        fs::read_dir(path)
            .context(IoSnafu { path })?
            .map(|entry| entry.map(|entry| entry.path()).context(IoSnafu { path }))
            .collect()
    }

    fn modified(&self, path: &Path) -> Result<SystemTime, FsError> {
        fs::metadata(path)
            .and_then(|metadata| metadata.modified())
            .context(IoSnafu { path })
    }

    fn same_contents(&self, first: &Path, second: &Path) -> Result<bool, FsError> {
        let len = |path: &Path| {
            fs::metadata(path)
                .map(|metadata| metadata.len())
                .context(IoSnafu { path })
        };
        if len(first)? != len(second)? {
            return Ok(false);
        }

        let first = fs::read(first).context(IoSnafu { path: first })?;
        let second = fs::read(second).context(IoSnafu { path: second })?;
        Ok(first == second)
    }

    fn copy_file(&self, src: &Path, dst: &Path) -> Result<(), FsError> {
        debug!("Copying {} to {}", src.display(), dst.display());
        let modified = self.modified(src)?;
        fs::copy(src, dst).context(IoSnafu { path: dst })?;
        OpenOptions::new()
            .write(true)
            .open(dst)
            .and_then(|file| file.set_modified(modified))
            .context(IoSnafu { path: dst })
    }

    fn rename(&self, src: &Path, dst: &Path) -> Result<PathBuf, FsError> {
        ensure!(!dst.exists(), AlreadyExistsSnafu { path: dst });
        debug!("Renaming {} to {}", src.display(), dst.display());
        fs::rename(src, dst).context(IoSnafu { path: src })?;
        Ok(dst.to_path_buf())
    }

    fn remove_file(&self, path: &Path) -> Result<(), FsError> {
        debug!("Removing file {}", path.display());
        fs::remove_file(path).context(IoSnafu { path })
    }

    fn remove_tree(&self, path: &Path) -> Result<(), FsError> {
        debug!("Removing directory tree {}", path.display());
        fs::remove_dir_all(path).context(IoSnafu { path })
    }

    fn create_dir(&self, path: &Path, parents: bool) -> Result<(), FsError> {
        debug!("Creating directory {}", path.display());
        if parents {
            fs::create_dir_all(path).context(IoSnafu { path })
        } else {
            fs::create_dir(path).context(IoSnafu { path })
        }
    }

    fn current_dir(&self) -> Result<PathBuf, FsError> {
        std::env::current_dir().context(IoSnafu { path: "." })
    }
}
