use std::path::PathBuf;

use clap::Parser;

use crate::application::data::LogLevel;

/// Keeps two or more local folders in agreement.
#[derive(Parser, Debug, Clone)]
#[command(version)]
pub struct Cli {
    #[clap(long, short, default_value = "warn", value_enum)]
    pub log_level: LogLevel,

    /// Directory holding the sync directory list and the last snapshot
    #[clap(long, short, default_value = ".")]
    pub config_dir: PathBuf,

    /// Seconds to wait between two checks
    #[clap(long, short, default_value_t = 10)]
    pub interval: u64,

    /// How many directories must be configured before syncing starts
    #[clap(long, default_value_t = 2, value_parser = clap::value_parser!(u64).range(2..))]
    pub min_directories: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["syncfiles"]).unwrap();

        assert!(matches!(cli.log_level, LogLevel::Warn));
        assert_eq!(cli.config_dir, PathBuf::from("."));
        assert_eq!(cli.interval, 10);
        assert_eq!(cli.min_directories, 2);
    }

    #[test]
    fn fewer_than_two_directories_is_rejected() {
        assert!(Cli::try_parse_from(["syncfiles", "--min-directories", "1"]).is_err());
    }

    #[test]
    fn short_flags() {
        let cli = Cli::try_parse_from(["syncfiles", "-l", "debug", "-c", "/etc/sync", "-i", "3"])
            .unwrap();

        assert!(matches!(cli.log_level, LogLevel::Debug));
        assert_eq!(cli.config_dir, PathBuf::from("/etc/sync"));
        assert_eq!(cli.interval, 3);
    }
}
