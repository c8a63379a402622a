use std::fmt::Write as _;
use std::sync::Arc;

use course_core::model::{Course, CourseId, Module, ModuleId};
use course_core::progress::{CourseProgress, Transition};
use storage::repository::{
    CompletionLogRepository, CompletionRecord, CourseRepository, CourseSnapshot,
    ProgressPersistence, StorageError,
};

use crate::Clock;
use crate::error::ViewerError;
use crate::notifier::{Notice, Notifier};

//
// ─── VIEWER ────────────────────────────────────────────────────────────────────
//

/// One open course: the catalog entry plus the progress being worked on.
///
/// The active module lives here only; it is never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseViewer {
    course: Course,
    progress: CourseProgress,
}

impl CourseViewer {
    #[must_use]
    pub fn from_snapshot(snapshot: CourseSnapshot) -> Self {
        Self {
            course: snapshot.course,
            progress: snapshot.progress,
        }
    }

    #[must_use]
    pub fn course(&self) -> &Course {
        &self.course
    }

    #[must_use]
    pub fn progress(&self) -> &CourseProgress {
        &self.progress
    }

    #[must_use]
    pub fn active_module(&self) -> Option<&Module> {
        self.progress
            .active()
            .and_then(|id| self.course.module(id))
    }

    /// Select a module; locked and unknown modules are ignored.
    pub fn select(&mut self, module_id: ModuleId) -> Transition {
        let (next, transition) = self.progress.select_module(module_id);
        self.progress = next;
        transition
    }
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Result of asking to complete a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionOutcome {
    pub transition: Transition,
    pub completion_id: Option<i64>,
}

/// Opens courses and persists module completions.
#[derive(Clone)]
pub struct CourseViewerService {
    clock: Clock,
    courses: Arc<dyn CourseRepository>,
    completions: Arc<dyn CompletionLogRepository>,
    progress: Arc<dyn ProgressPersistence>,
    notifier: Arc<dyn Notifier>,
}

impl CourseViewerService {
    #[must_use]
    pub fn new(
        clock: Clock,
        courses: Arc<dyn CourseRepository>,
        completions: Arc<dyn CompletionLogRepository>,
        progress: Arc<dyn ProgressPersistence>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            clock,
            courses,
            completions,
            progress,
            notifier,
        }
    }

    /// Open a course from storage with no module selected.
    ///
    /// # Errors
    ///
    /// Returns `ViewerError::CourseNotFound` for unknown ids.
    /// Returns `ViewerError::Storage` if repository access fails.
    pub async fn open_course(&self, course_id: CourseId) -> Result<CourseViewer, ViewerError> {
        let snapshot = self
            .courses
            .get_course(course_id)
            .await?
            .ok_or(ViewerError::CourseNotFound(course_id))?;
        tracing::debug!(course = %course_id, "opened course");
        Ok(CourseViewer::from_snapshot(snapshot))
    }

    /// Select a module in an open viewer. View-local; nothing is stored.
    pub fn select_module(&self, viewer: &mut CourseViewer, module_id: ModuleId) -> Transition {
        let transition = viewer.select(module_id);
        if !matches!(transition, Transition::Selected(_)) {
            tracing::debug!(
                course = %viewer.course.id(),
                module = %module_id,
                ?transition,
                "module selection ignored"
            );
        }
        transition
    }

    /// Complete a module, persist the state change with a completion record,
    /// and send a notice.
    ///
    /// The viewer only advances once storage has accepted the change.
    ///
    /// # Errors
    ///
    /// Returns `ViewerError::StaleViewer` if stored progress moved on since the
    /// viewer was opened, `ViewerError::Storage` if persistence fails. The
    /// viewer is left unchanged either way.
    pub async fn complete_module(
        &self,
        viewer: &mut CourseViewer,
        module_id: ModuleId,
    ) -> Result<CompletionOutcome, ViewerError> {
        let (next, transition) = viewer.progress.complete_module(module_id);
        let Transition::Completed { module, unlocked } = transition else {
            tracing::debug!(
                course = %viewer.course.id(),
                module = %module_id,
                ?transition,
                "completion ignored"
            );
            return Ok(CompletionOutcome {
                transition,
                completion_id: None,
            });
        };

        let course_id = viewer.course.id();
        let record = CompletionRecord::new(course_id, module, self.clock.now());
        let completion_id = match self.progress.record_completion(record, unlocked).await {
            Ok(id) => id,
            Err(StorageError::Conflict) => {
                tracing::warn!(
                    course = %course_id,
                    module = %module,
                    "stored progress changed under an open viewer"
                );
                return Err(ViewerError::StaleViewer(course_id));
            }
            Err(e) => return Err(e.into()),
        };
        viewer.progress = next;

        tracing::info!(
            course = %course_id,
            module = %module,
            unlocked = ?unlocked,
            progress = viewer.progress.progress_percent(),
            "module completed"
        );
        self.notifier.notify(completion_notice(viewer, module, unlocked));

        Ok(CompletionOutcome {
            transition,
            completion_id: Some(completion_id),
        })
    }

    /// Completion history for a course, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `ViewerError::Storage` if repository access fails.
    pub async fn completion_history(
        &self,
        course_id: CourseId,
    ) -> Result<Vec<CompletionRecord>, ViewerError> {
        Ok(self.completions.completions_for_course(course_id).await?)
    }
}

fn completion_notice(
    viewer: &CourseViewer,
    module: ModuleId,
    unlocked: Option<ModuleId>,
) -> Notice {
    let title_of = |id: ModuleId| {
        viewer
            .course
            .module(id)
            .map_or_else(|| id.to_string(), |m| m.title().to_owned())
    };

    let mut description = format!("\"{}\" foi marcado como concluído.", title_of(module));
    if let Some(next) = unlocked {
        let _ = write!(description, " Próximo módulo liberado: \"{}\".", title_of(next));
    }
    if viewer.progress.is_finished() {
        description.push_str(" Curso finalizado!");
    }
    Notice::new("Módulo concluído", description)
}

#[cfg(test)]
mod tests {
    use super::*;

    use course_core::catalog::demo_catalog;
    use course_core::model::ModuleState;
    use course_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    use crate::notifier::RecordingNotifier;

    async fn service() -> (CourseViewerService, RecordingNotifier) {
        let repo = InMemoryRepository::new();
        for seed in demo_catalog().unwrap() {
            repo.upsert_course(&seed.course, &seed.progress)
                .await
                .unwrap();
        }
        let notifier = RecordingNotifier::new();
        let service = CourseViewerService::new(
            Clock::fixed(fixed_now()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            Arc::new(repo),
            Arc::new(notifier.clone()),
        );
        (service, notifier)
    }

    #[tokio::test]
    async fn open_unknown_course_fails() {
        let (service, _) = service().await;
        let err = service.open_course(CourseId::new(9)).await.unwrap_err();
        assert!(matches!(err, ViewerError::CourseNotFound(id) if id == CourseId::new(9)));
    }

    #[tokio::test]
    async fn select_locked_module_keeps_current() {
        let (service, _) = service().await;
        let mut viewer = service.open_course(CourseId::new(2)).await.unwrap();
        assert!(viewer.active_module().is_none());

        service.select_module(&mut viewer, ModuleId::new(4));
        let transition = service.select_module(&mut viewer, ModuleId::new(6));

        assert_eq!(transition, Transition::IgnoredLocked(ModuleId::new(6)));
        assert_eq!(viewer.active_module().unwrap().title(), "Ensino Fundamental I");
    }

    #[tokio::test]
    async fn complete_module_persists_and_notifies() {
        let (service, notifier) = service().await;
        let mut viewer = service.open_course(CourseId::new(2)).await.unwrap();

        let outcome = service
            .complete_module(&mut viewer, ModuleId::new(4))
            .await
            .unwrap();
        assert_eq!(
            outcome.transition,
            Transition::Completed {
                module: ModuleId::new(4),
                unlocked: Some(ModuleId::new(5)),
            }
        );
        assert!(outcome.completion_id.is_some());
        assert_eq!(viewer.progress().completed_count(), 4);

        let reopened = service.open_course(CourseId::new(2)).await.unwrap();
        assert_eq!(
            reopened.progress().state_of(ModuleId::new(5)),
            Some(ModuleState::Unlocked)
        );

        let notices = notifier.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].title, "Módulo concluído");
        assert!(notices[0].description.contains("Ensino Fundamental II"));

        let history = service.completion_history(CourseId::new(2)).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].completed_at, fixed_now());
    }

    #[tokio::test]
    async fn repeated_completion_is_not_persisted_twice() {
        let (service, notifier) = service().await;
        let mut viewer = service.open_course(CourseId::new(2)).await.unwrap();

        service
            .complete_module(&mut viewer, ModuleId::new(4))
            .await
            .unwrap();
        let before = viewer.clone();
        let outcome = service
            .complete_module(&mut viewer, ModuleId::new(4))
            .await
            .unwrap();

        assert_eq!(outcome.transition, Transition::AlreadyCompleted(ModuleId::new(4)));
        assert_eq!(outcome.completion_id, None);
        assert_eq!(viewer, before);
        assert_eq!(notifier.notices().len(), 1);
        assert_eq!(
            service
                .completion_history(CourseId::new(2))
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn stale_viewer_cannot_roll_back_progress() {
        let (service, notifier) = service().await;
        let mut first = service.open_course(CourseId::new(2)).await.unwrap();
        let mut second = service.open_course(CourseId::new(2)).await.unwrap();

        for id in [4, 5] {
            service
                .complete_module(&mut first, ModuleId::new(id))
                .await
                .unwrap();
        }

        let before = second.clone();
        let err = service
            .complete_module(&mut second, ModuleId::new(4))
            .await
            .unwrap_err();
        assert!(matches!(err, ViewerError::StaleViewer(id) if id == CourseId::new(2)));
        assert_eq!(second, before);

        let stored = service.open_course(CourseId::new(2)).await.unwrap();
        assert_eq!(
            stored.progress().state_of(ModuleId::new(5)),
            Some(ModuleState::Completed)
        );
        assert_eq!(
            stored.progress().state_of(ModuleId::new(6)),
            Some(ModuleState::Unlocked)
        );
        assert_eq!(
            service
                .completion_history(CourseId::new(2))
                .await
                .unwrap()
                .len(),
            2
        );
        assert_eq!(notifier.notices().len(), 2);

        // Reopening picks up the newer progress and carries on from there.
        let mut reopened = service.open_course(CourseId::new(2)).await.unwrap();
        let outcome = service
            .complete_module(&mut reopened, ModuleId::new(6))
            .await
            .unwrap();
        assert_eq!(
            outcome.transition,
            Transition::Completed {
                module: ModuleId::new(6),
                unlocked: Some(ModuleId::new(7)),
            }
        );
    }
}
