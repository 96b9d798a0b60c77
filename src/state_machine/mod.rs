//! Orchestration of the synchronizer: acquire directories, check them for
//! changes, reconcile, wait, and recover when a directory goes missing.

mod sync_context;

use derive_more::{Display, Error};

use crate::config::ConfigError;
use crate::file_structure::TreeError;
use crate::sync::SyncError;

pub use sync_context::SyncContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum State {
    Initial,
    Check,
    Wait,
    Sync,
    Error,
    Final,
}

/// Classification of an error captured at a state boundary. Only
/// [`ErrorId::DirectoryNotFound`] is recovered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ErrorId {
    DirectoryNotFound,
    NameCollisionExhausted,
    InvalidConfiguration,
    Unexpected,
}

impl From<&TreeError> for ErrorId {
    fn from(error: &TreeError) -> Self {
        match error {
            TreeError::DirectoryNotFound { .. } => ErrorId::DirectoryNotFound,
            TreeError::WalkError { .. } => ErrorId::Unexpected,
        }
    }
}

impl From<&SyncError> for ErrorId {
    fn from(error: &SyncError) -> Self {
        match error {
            SyncError::NameCollisionExhausted { .. } => ErrorId::NameCollisionExhausted,
            SyncError::RefreshError { source } => source.into(),
            SyncError::OperationError { .. } => ErrorId::Unexpected,
        }
    }
}

impl From<&ConfigError> for ErrorId {
    fn from(error: &ConfigError) -> Self {
        match error {
            ConfigError::InvalidConfiguration { .. } | ConfigError::ParseError { .. } => {
                ErrorId::InvalidConfiguration
            }
            _ => ErrorId::Unexpected,
        }
    }
}

/// An error caught while running a state, with where it happened.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
#[display("Error in {state} state ({id}): {message}")]
pub struct StateError {
    pub state: State,
    pub id: ErrorId,
    pub message: String,
}
