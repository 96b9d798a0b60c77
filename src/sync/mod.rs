//! Reconciliation engine: turns two checked trees into the copy, delete and
//! rename calls that make them equal, then folds them into the next baseline.

mod conflict_namer;
mod decision;
mod sync_manager;

use std::path::PathBuf;

use snafu::Snafu;

use crate::ext::BestEffortPathExt;
use crate::file_structure::TreeError;
use crate::filesystem::FsError;

#[cfg(test)]
pub use conflict_namer::{ConflictNamer, MAX_ATTEMPTS};
pub use sync_manager::SyncManager;

#[derive(Debug, Snafu)]
pub enum SyncError {
    #[snafu(display(
        "No free conflict name for {} after {attempts} attempts",
        path.best_effort_path_display()
    ))]
    NameCollisionExhausted { path: PathBuf, attempts: usize },
    #[snafu(display("Failed to {action} {}", path.best_effort_path_display()))]
    OperationError {
        action: &'static str,
        path: PathBuf,
        source: FsError,
    },
    #[snafu(display("Failed to rescan a sync directory"))]
    RefreshError { source: TreeError },
}
