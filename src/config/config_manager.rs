use std::borrow::Cow;
use std::io;
use std::path::{Path, PathBuf};

use compio::fs;
use hashlink::LinkedHashMap;
use saphyr::{LoadableYamlNode, Scalar, Yaml, YamlEmitter};
use snafu::prelude::*;
use tracing::{debug, info, warn};

use crate::ext::{BestEffortPathExt, normalize_path};
use crate::file_structure::Snapshot;
use crate::filesystem::FileSystem;

use super::{
    ConfigError, CreateDirSnafu, EmitSnafu, InvalidConfigurationSnafu, ParseSnafu, ReadSnafu,
    SnapshotEncodeSnafu, WriteSnafu,
};

const DIRECTORIES_FILE_NAME: &str = "sync_directories.yaml";
const SNAPSHOT_FILE_NAME: &str = "last_sync.json";
const DIRECTORIES_KEY: &str = "directories";

/// Reads and writes the two files kept between runs: the list of sync
/// directories and the snapshot of the last successful synchronization.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: PathBuf,
    min_directories: usize,
}

impl ConfigManager {
    pub fn new(config_dir: impl Into<PathBuf>, min_directories: usize) -> Self {
        Self {
            config_dir: config_dir.into(),
            min_directories,
        }
    }

    pub fn min_directories(&self) -> usize {
        self.min_directories
    }

    fn directories_file(&self) -> PathBuf {
        self.config_dir.join(DIRECTORIES_FILE_NAME)
    }

    fn snapshot_file(&self) -> PathBuf {
        self.config_dir.join(SNAPSHOT_FILE_NAME)
    }

    /// Existing, unique directories from the config file, in file order.
    /// A missing file is an empty list.
    pub async fn read_sync_directories(
        &self,
        fs: &dyn FileSystem,
    ) -> Result<Vec<PathBuf>, ConfigError> {
        let path = self.directories_file();
        debug!("Reading sync directories from {}", path.best_effort_path_display());

        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                info!("No sync directories configured yet");
                return Ok(Vec::new());
            }
            Err(source) => return Err(source).context(ReadSnafu { path }),
        };

        let mut directories = Vec::new();
        for candidate in parse_directories(&String::from_utf8_lossy(&bytes))? {
            match self.check_sync_directory(fs, &candidate, &directories) {
                Some(directory) => directories.push(directory),
                None => warn!("Ignoring configured sync directory '{candidate}'"),
            }
        }

        Ok(directories)
    }

    /// Resolves `candidate` to an absolute path and returns it if it names
    /// an existing directory that is not in `existing` yet.
    pub fn check_sync_directory(
        &self,
        fs: &dyn FileSystem,
        candidate: &str,
        existing: &[PathBuf],
    ) -> Option<PathBuf> {
        let candidate = candidate.trim();
        if candidate.is_empty() {
            return None;
        }

        let path = Path::new(candidate);
        let absolute = if path.is_absolute() {
            normalize_path(path)
        } else {
            normalize_path(&fs.current_dir().ok()?.join(path))
        };

        if !fs.is_dir(&absolute) {
            debug!("{} is not a directory", absolute.display());
            return None;
        }
        if existing.contains(&absolute) {
            debug!("{} is already being synchronized", absolute.display());
            return None;
        }

        Some(absolute)
    }

    /// Persists the list if it holds at least the minimum number of
    /// directories. Returns whether the file was written.
    pub async fn write_sync_directories(&self, directories: &[PathBuf]) -> Result<bool, ConfigError> {
        if directories.len() < self.min_directories {
            debug!(
                "Not saving {} sync directories, at least {} are needed",
                directories.len(),
                self.min_directories
            );
            return Ok(false);
        }

        let contents = render_directories(directories)?;
        self.write(self.directories_file(), contents.into_bytes())
            .await?;
        Ok(true)
    }

    /// The snapshot of the last synchronization, or `None` before the first
    /// one. An unreadable snapshot is treated like a missing one.
    pub async fn read_snapshot(&self) -> Option<Snapshot> {
        let path = self.snapshot_file();
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(_) => {
                info!("No previous synchronization found, starting fresh");
                return None;
            }
        };

        match Snapshot::from_json(&String::from_utf8_lossy(&bytes)) {
            Ok(snapshot) => Some(snapshot),
            Err(error) => {
                warn!(
                    "Discarding unreadable snapshot {}: {error}",
                    path.best_effort_path_display()
                );
                None
            }
        }
    }

    pub async fn write_snapshot(&self, snapshot: &Snapshot) -> Result<(), ConfigError> {
        let json = snapshot.to_json().context(SnapshotEncodeSnafu)?;
        self.write(self.snapshot_file(), json.into_bytes()).await
    }

    async fn write(&self, path: PathBuf, bytes: Vec<u8>) -> Result<(), ConfigError> {
        fs::create_dir_all(&self.config_dir)
            .await
            .context(CreateDirSnafu {
                path: &self.config_dir,
            })?;

        debug!("Writing {}", path.best_effort_path_display());
        fs::write(&path, bytes).await.0.context(WriteSnafu { path })?;
        Ok(())
    }
}

fn directories_key<'a>() -> Yaml<'a> {
    Yaml::Value(Scalar::String(Cow::Borrowed(DIRECTORIES_KEY)))
}

/// Pulls the `directories` sequence out of the config file contents.
fn parse_directories(contents: &str) -> Result<Vec<String>, ConfigError> {
    let documents = Yaml::load_from_str(contents).context(ParseSnafu)?;
    let Some(document) = documents.first() else {
        return Ok(Vec::new());
    };

    let top_level = document.as_mapping().context(InvalidConfigurationSnafu {
        reason: "top level should be a map",
    })?;
    let Some(listed) = top_level.get(&directories_key()) else {
        return Ok(Vec::new());
    };

    listed
        .as_sequence()
        .context(InvalidConfigurationSnafu {
            reason: "directories should be a list",
        })?
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .context(InvalidConfigurationSnafu {
                    reason: "every directory should be a string",
                })
        })
        .collect()
}

fn render_directories(directories: &[PathBuf]) -> Result<String, ConfigError> {
    let sequence = directories
        .iter()
        .map(|directory| {
            Yaml::Value(Scalar::String(Cow::Owned(
                directory.to_string_lossy().into_owned(),
            )))
        })
        .collect();

    let mut top_level = LinkedHashMap::new();
    top_level.insert(directories_key(), Yaml::Sequence(sequence));
    let document = Yaml::Mapping(top_level);

    let mut contents = String::new();
    YamlEmitter::new(&mut contents)
        .dump(&document)
        .context(EmitSnafu)?;
    contents.push('\n');
    Ok(contents)
}
