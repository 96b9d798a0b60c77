//! In-memory tree model of a sync directory with change tracking.
//!
//! A [`FileStructure`] walks its directory through the filesystem
//! capability and compares the result against the snapshot persisted after
//! the last successful synchronization, flagging every entry that is new or
//! newer. Deleted entries are never flagged; they are listed separately by
//! [`FileStructure::removed_entries`].

mod entry;
#[allow(clippy::module_inception)]
mod file_structure;
mod snapshot;

use std::path::PathBuf;

use snafu::Snafu;

use crate::ext::BestEffortPathExt;
use crate::filesystem::FsError;

pub use entry::{DirEntry, Entry, FileEntry};
pub use file_structure::FileStructure;
pub use snapshot::{Snapshot, SnapshotError};

#[derive(Debug, Snafu)]
pub enum TreeError {
    #[snafu(display("Sync directory {} does not exist", path.best_effort_path_display()))]
    DirectoryNotFound { path: PathBuf },
    #[snafu(display("Failed to read {}", path.best_effort_path_display()))]
    WalkError { path: PathBuf, source: FsError },
}
