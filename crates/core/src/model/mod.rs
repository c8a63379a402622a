mod course;
mod ids;
mod module;

pub use ids::{CourseId, ModuleId, ParseIdError};

pub use course::{Course, CourseError, CourseLevel};
pub use module::{Module, ModuleDuration, ModuleError, ModuleState};
