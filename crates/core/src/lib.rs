#![forbid(unsafe_code)]

pub mod catalog;
pub mod error;
pub mod model;
pub mod progress;
pub mod time;

pub use error::Error;
pub use progress::{CourseProgress, ProgressAction, ProgressError, Transition};
pub use time::{Clock, ClockError};
