use thiserror::Error;

use crate::model::{CourseError, ModuleError};
use crate::progress::ProgressError;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Course(#[from] CourseError),
    #[error(transparent)]
    Module(#[from] ModuleError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
}
