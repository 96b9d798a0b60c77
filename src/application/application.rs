use snafu::Snafu;
use snafu::prelude::*;
use tracing::debug;

use crate::application::RuntimeConfig;
use crate::config::ConfigManager;
use crate::filesystem::OsFileSystem;
use crate::state_machine::{StateError, SyncContext};
use crate::ui::ConsoleUi;

pub struct Application;

impl Application {
    pub async fn run(app_config: impl Into<RuntimeConfig>) -> Result<(), ApplicationError> {
        let app_config: RuntimeConfig = app_config.into();
        debug!("Runtime configuration: {app_config:?}");

        let fs = OsFileSystem;
        let config = ConfigManager::new(&app_config.config_dir, app_config.min_directories);

        SyncContext::new(&fs, ConsoleUi::new(), config, app_config.interval)
            .run()
            .await
            .context(SynchronizationSnafu)?;

        Ok(())
    }
}

#[derive(Debug, Snafu)]
pub enum ApplicationError {
    #[snafu(display("Synchronization stopped after an unrecoverable error"))]
    SynchronizationError { source: StateError },
}
