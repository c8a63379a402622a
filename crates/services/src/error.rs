//! Shared error types for the services crate.

use thiserror::Error;

use course_core::model::CourseId;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `CourseCatalogService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `CourseViewerService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ViewerError {
    #[error("course {0} not found")]
    CourseNotFound(CourseId),
    #[error("course {0} changed since it was opened; reopen it")]
    StaleViewer(CourseId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Catalog(#[from] course_core::Error),
}
