use std::path::PathBuf;
use std::time::Duration;

use crate::cli::Cli;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub config_dir: PathBuf,
    pub interval: Duration,
    pub min_directories: usize,
}

impl From<Cli> for RuntimeConfig {
    fn from(cli: Cli) -> Self {
        Self {
            config_dir: cli.config_dir,
            interval: Duration::from_secs(cli.interval),
            min_directories: usize::try_from(cli.min_directories).unwrap_or(usize::MAX),
        }
    }
}
