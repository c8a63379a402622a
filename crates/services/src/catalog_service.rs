use std::sync::Arc;

use serde::Serialize;

use course_core::model::{CourseId, CourseLevel, ModuleState};
use storage::repository::{CourseRepository, CourseSnapshot};

use crate::error::CatalogError;

/// Row of the course list: catalog metadata plus derived progress.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseSummary {
    pub id: CourseId,
    pub title: String,
    pub description: String,
    pub rating: f32,
    pub category: Option<String>,
    pub level: Option<CourseLevel>,
    pub total_modules: usize,
    pub completed_modules: usize,
    pub progress_percent: u8,
    pub total_minutes: u32,
    /// Minutes of modules not yet completed.
    pub remaining_minutes: u32,
}

impl CourseSummary {
    #[must_use]
    pub fn from_snapshot(snapshot: &CourseSnapshot) -> Self {
        let CourseSnapshot { course, progress } = snapshot;
        Self {
            id: course.id(),
            title: course.title().to_owned(),
            description: course.description().to_owned(),
            rating: course.rating(),
            category: course.category().map(str::to_owned),
            level: course.level(),
            total_modules: progress.total_count(),
            completed_modules: progress.completed_count(),
            progress_percent: progress.progress_percent(),
            total_minutes: course.total_minutes(),
            remaining_minutes: course
                .modules()
                .iter()
                .filter(|m| !progress.state_of(m.id()).is_some_and(ModuleState::is_completed))
                .map(|m| m.duration().minutes())
                .fold(0, u32::saturating_add),
        }
    }
}

/// Read-only access to the course catalog.
#[derive(Clone)]
pub struct CourseCatalogService {
    courses: Arc<dyn CourseRepository>,
}

impl CourseCatalogService {
    #[must_use]
    pub fn new(courses: Arc<dyn CourseRepository>) -> Self {
        Self { courses }
    }

    /// List courses ordered by ID, up to the given limit.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if repository access fails.
    pub async fn list_courses(&self, limit: u32) -> Result<Vec<CourseSummary>, CatalogError> {
        let snapshots = self.courses.list_courses(limit).await?;
        Ok(snapshots.iter().map(CourseSummary::from_snapshot).collect())
    }

    /// Fetch a course snapshot by ID.
    ///
    /// Returns `Ok(None)` when the course does not exist.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if repository access fails.
    pub async fn get_course(
        &self,
        course_id: CourseId,
    ) -> Result<Option<CourseSnapshot>, CatalogError> {
        Ok(self.courses.get_course(course_id).await?)
    }
}
