mod config_manager;

use std::path::PathBuf;

use snafu::Snafu;

use crate::ext::BestEffortPathExt;
use crate::file_structure::SnapshotError;

pub use config_manager::ConfigManager;

#[derive(Debug, Snafu)]
pub enum ConfigError {
    #[snafu(display("Failed to read {}", path.best_effort_path_display()))]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to write {}", path.best_effort_path_display()))]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to create config directory {}", path.best_effort_path_display()))]
    CreateDirError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to parse the sync directories file"))]
    ParseError { source: saphyr::ScanError },
    #[snafu(display("Invalid sync directories file: {reason}"))]
    InvalidConfiguration { reason: &'static str },
    #[snafu(display("Failed to render the sync directories file"))]
    EmitError { source: saphyr::EmitError },
    #[snafu(display("Failed to encode the snapshot"))]
    SnapshotEncodeError { source: SnapshotError },
}
