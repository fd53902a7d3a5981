//! Shared error types for the services crate.

use thiserror::Error;

use gradeup_core::model::{BankError, SessionError, UserError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `TestLoopService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TestError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("test has not been completed")]
    NotCompleted,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `UserService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum UserServiceError {
    #[error(transparent)]
    User(#[from] UserError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ResultsService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ResultsError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `Navigator`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum NavigationError {
    #[error("cannot {action} from the {from} screen")]
    InvalidTransition {
        from: &'static str,
        action: &'static str,
    },
    #[error(transparent)]
    Bank(#[from] BankError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Bank(#[from] BankError),
}
