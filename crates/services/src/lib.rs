#![forbid(unsafe_code)]

pub mod app_services;
pub mod catalog_service;
pub mod error;
pub mod notifier;
pub mod viewer;

pub use course_core::Clock;

pub use app_services::AppServices;
pub use catalog_service::{CourseCatalogService, CourseSummary};
pub use error::{AppServicesError, CatalogError, ViewerError};
pub use notifier::{Notice, Notifier, RecordingNotifier, TracingNotifier};
pub use viewer::{CompletionOutcome, CourseViewer, CourseViewerService};
