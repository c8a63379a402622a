use std::sync::Arc;

use course_core::catalog::demo_catalog;
use storage::repository::{CourseRepository, Storage};

use crate::Clock;
use crate::catalog_service::CourseCatalogService;
use crate::error::AppServicesError;
use crate::notifier::Notifier;
use crate::viewer::CourseViewerService;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    catalog: Arc<CourseCatalogService>,
    viewer: Arc<CourseViewerService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage, seeding the demo catalog
    /// into an empty database.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization or seeding fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Self::from_storage(storage, clock, notifier).await
    }

    /// Build services over in-memory storage seeded with the demo catalog.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if seeding fails.
    pub async fn new_in_memory(
        clock: Clock,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, AppServicesError> {
        Self::from_storage(Storage::in_memory(), clock, notifier).await
    }

    async fn from_storage(
        storage: Storage,
        clock: Clock,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, AppServicesError> {
        ensure_catalog(storage.courses.as_ref()).await?;

        let catalog = Arc::new(CourseCatalogService::new(Arc::clone(&storage.courses)));
        let viewer = Arc::new(CourseViewerService::new(
            clock,
            Arc::clone(&storage.courses),
            Arc::clone(&storage.completions),
            Arc::clone(&storage.progress),
            notifier,
        ));

        Ok(Self { catalog, viewer })
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<CourseCatalogService> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn viewer(&self) -> Arc<CourseViewerService> {
        Arc::clone(&self.viewer)
    }
}

/// Seed the demo catalog when no course exists yet. Returns the number of
/// courses written.
///
/// # Errors
///
/// Returns `AppServicesError` if the catalog cannot be built or stored.
pub async fn ensure_catalog(courses: &dyn CourseRepository) -> Result<usize, AppServicesError> {
    if !courses.list_courses(1).await?.is_empty() {
        return Ok(0);
    }
    seed_catalog(courses).await
}

/// Write every demo course, overwriting stored progress.
///
/// # Errors
///
/// Returns `AppServicesError` if the catalog cannot be built or stored.
pub async fn seed_catalog(courses: &dyn CourseRepository) -> Result<usize, AppServicesError> {
    let catalog = demo_catalog()?;
    for seed in &catalog {
        courses.upsert_course(&seed.course, &seed.progress).await?;
    }
    tracing::info!(courses = catalog.len(), "seeded demo catalog");
    Ok(catalog.len())
}
