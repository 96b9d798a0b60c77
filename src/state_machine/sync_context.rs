use std::collections::BTreeSet;
use std::error::Error as StdError;
use std::path::{Path, PathBuf};
use std::time::Duration;

use snafu::ChainCompat;
use tracing::{debug, error, info, warn};

use crate::config::{ConfigError, ConfigManager};
use crate::file_structure::{DirEntry, FileStructure};
use crate::filesystem::FileSystem;
use crate::sync::SyncManager;
use crate::ui::SyncUi;

use super::{ErrorId, State, StateError};

/// Everything the states share during one program run.
///
/// Besides the tree models, the only cross-state signals are the captured
/// error, the shutdown request and whether a synchronization is pending.
pub struct SyncContext<'a, U: SyncUi> {
    fs: &'a dyn FileSystem,
    ui: U,
    config: ConfigManager,
    interval: Duration,
    structures: Vec<FileStructure>,
    /// Paths already reported as a file on one side and a directory on
    /// another.
    mismatches: BTreeSet<PathBuf>,
    error: Option<StateError>,
    exit_request: bool,
    sync_required: bool,
}

impl<'a, U: SyncUi> SyncContext<'a, U> {
    pub fn new(fs: &'a dyn FileSystem, ui: U, config: ConfigManager, interval: Duration) -> Self {
        Self {
            fs,
            ui,
            config,
            interval,
            structures: Vec::new(),
            mismatches: BTreeSet::new(),
            error: None,
            exit_request: false,
            sync_required: false,
        }
    }

    #[cfg(test)]
    pub fn ui(&self) -> &U {
        &self.ui
    }

    #[cfg(test)]
    pub fn structures(&self) -> &[FileStructure] {
        &self.structures
    }

    /// Runs the state machine until it reaches [`State::Final`]. Fails with
    /// the error that ended the run, if any.
    pub async fn run(&mut self) -> Result<(), StateError> {
        let mut state = State::Initial;

        loop {
            debug!("Entering {state} state");
            state = match state {
                State::Initial => self.initial().await,
                State::Check => self.check().await,
                State::Wait => self.wait().await,
                State::Sync => self.sync().await,
                State::Error => self.handle_error(),
                State::Final => break,
            };
        }

        info!("Exiting");
        match self.error.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Every transition goes through here so a shutdown request always wins.
    fn transition(&self, next: State) -> State {
        if self.exit_request { State::Final } else { next }
    }

    /// Records `error` and moves to [`State::Error`]. While any tracked
    /// directory is missing the error is treated as a missing directory,
    /// whatever it says.
    fn fail(&mut self, state: State, id: ErrorId, error: &dyn StdError) -> State {
        let id = if self.directory_missing() {
            ErrorId::DirectoryNotFound
        } else {
            id
        };
        let message = ChainCompat::new(error)
            .map(|cause| cause.to_string())
            .collect::<Vec<_>>()
            .join(": ");

        debug!("Captured error in {state} state: {message}");
        self.error = Some(StateError { state, id, message });
        self.transition(State::Error)
    }

    fn directory_missing(&self) -> bool {
        self.structures
            .iter()
            .any(|structure| !self.fs.is_dir(structure.path()))
    }

    async fn initial(&mut self) -> State {
        info!("Initializing");
        self.structures.clear();
        self.mismatches.clear();

        match self.acquire_directories().await {
            Ok(directories) => {
                for directory in &directories {
                    info!("Synchronizing {}", directory.display());
                }
                self.structures = directories.into_iter().map(FileStructure::new).collect();
                self.transition(State::Check)
            }
            Err(error) => self.fail(State::Initial, ErrorId::from(&error), &error),
        }
    }

    /// Reads the configured directories and prompts for more until the
    /// minimum is reached. A list completed by the user is saved.
    async fn acquire_directories(&mut self) -> Result<Vec<PathBuf>, ConfigError> {
        let minimum = self.config.min_directories();
        let mut directories = match self.config.read_sync_directories(self.fs).await {
            Ok(directories) => directories,
            Err(
                error @ (ConfigError::InvalidConfiguration { .. } | ConfigError::ParseError { .. }),
            ) => {
                warn!("{error}, asking for directories instead");
                Vec::new()
            }
            Err(error) => return Err(error),
        };

        let mut prompted = false;
        while directories.len() < minimum {
            let Some(answer) = self.ui.directory_prompt(directories.len(), minimum).await else {
                info!("No directory given, shutting down");
                self.exit_request = true;
                return Ok(directories);
            };

            match self.config.check_sync_directory(self.fs, &answer, &directories) {
                Some(directory) => {
                    directories.push(directory);
                    prompted = true;
                }
                None => warn!("'{answer}' is not an existing directory that is not synchronized yet"),
            }
        }

        if prompted {
            self.config.write_sync_directories(&directories).await?;
        }
        Ok(directories)
    }

    /// The tree of the last synchronization, empty before the first one.
    async fn baseline(&self) -> DirEntry {
        let Some(snapshot) = self.config.read_snapshot().await else {
            return DirEntry::default();
        };

        DirEntry::try_from(&snapshot).unwrap_or_else(|error| {
            warn!("Ignoring previous snapshot: {error}");
            DirEntry::default()
        })
    }

    async fn check(&mut self) -> State {
        debug!("Checking for changes");
        let baseline = self.baseline().await;
        let fs = self.fs;

        if let Err(error) = self
            .structures
            .iter_mut()
            .try_for_each(|structure| structure.refresh(fs))
        {
            return self.fail(State::Check, ErrorId::from(&error), &error);
        }

        let mismatches = SyncManager::kind_mismatches(&self.structures);
        for path in mismatches.difference(&self.mismatches) {
            warn!(
                "{} is a file in one directory and a directory in another, leaving it alone",
                path.display()
            );
        }
        let pending = |path: &Path| !mismatches.iter().any(|skipped| path.starts_with(skipped));

        let (mut changed, mut removed) = (0, 0);
        for structure in &mut self.structures {
            structure.check(&baseline);
            debug!("Checked {structure}");
            changed += structure
                .updated_entries()
                .iter()
                .filter(|path| pending(path.as_path()))
                .count();
            removed += structure
                .removed_entries(&baseline)
                .iter()
                .filter(|path| pending(path.as_path()))
                .count();
        }
        self.mismatches = mismatches;

        if changed + removed > 0 {
            info!("Found {changed} changed and {removed} removed entries");
        }
        self.sync_required = changed + removed > 0;
        self.transition(if self.sync_required {
            State::Sync
        } else {
            State::Wait
        })
    }

    async fn wait(&mut self) -> State {
        if !self.ui.continue_prompt().await {
            info!("Exit requested");
            self.exit_request = true;
            return self.transition(State::Check);
        }

        debug!("Waiting {:?} before the next check", self.interval);
        compio::time::sleep(self.interval).await;
        self.transition(State::Check)
    }

    async fn sync(&mut self) -> State {
        info!("Synchronizing {} directories", self.structures.len());
        let baseline = self.baseline().await;

        let result = SyncManager::new(self.fs).synchronize(&mut self.structures, &baseline);
        let snapshot = match result {
            Ok((snapshot, report)) if report.is_empty() => {
                debug!("Trees were already in agreement");
                snapshot
            }
            Ok((snapshot, report)) => {
                info!("Synchronized: {report}");
                snapshot
            }
            Err(error) => return self.fail(State::Sync, ErrorId::from(&error), &error),
        };

        if let Err(error) = self.config.write_snapshot(&snapshot).await {
            return self.fail(State::Sync, ErrorId::from(&error), &error);
        }

        self.sync_required = false;
        self.transition(State::Wait)
    }

    fn handle_error(&mut self) -> State {
        let next = match &self.error {
            Some(captured) if captured.id == ErrorId::DirectoryNotFound => {
                warn!("{captured}, acquiring directories again");
                State::Initial
            }
            Some(captured) => {
                error!("{captured}");
                State::Final
            }
            None => State::Final,
        };

        if next == State::Initial {
            self.error = None;
        }
        self.transition(next)
    }
}
