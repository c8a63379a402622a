use async_trait::async_trait;
use chrono::{DateTime, Utc};
use course_core::model::{Course, CourseId, ModuleId, ModuleState};
use course_core::progress::CourseProgress;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Immutable view of a course and its stored progress.
///
/// Each read hands out a fresh snapshot; the active module is always unset.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseSnapshot {
    pub course: Course,
    pub progress: CourseProgress,
}

impl CourseSnapshot {
    /// Rebuild a snapshot from a course and its stored module states.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the states do not fit the course.
    pub fn from_states(
        course: Course,
        states: impl IntoIterator<Item = (ModuleId, ModuleState)>,
    ) -> Result<Self, StorageError> {
        let progress = CourseProgress::from_states(&course, states)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        Ok(Self { course, progress })
    }
}

/// Persisted record of a module being marked complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRecord {
    pub id: Option<i64>,
    pub course_id: CourseId,
    pub module_id: ModuleId,
    pub completed_at: DateTime<Utc>,
}

impl CompletionRecord {
    #[must_use]
    pub fn new(course_id: CourseId, module_id: ModuleId, completed_at: DateTime<Utc>) -> Self {
        Self {
            id: None,
            course_id,
            module_id,
            completed_at,
        }
    }
}

/// Repository contract for the course catalog.
#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// Persist or update a course together with its module states.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if `progress` belongs to another course,
    /// or other storage errors.
    async fn upsert_course(
        &self,
        course: &Course,
        progress: &CourseProgress,
    ) -> Result<(), StorageError>;

    /// Fetch a course snapshot by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the stored data cannot be read.
    async fn get_course(&self, id: CourseId) -> Result<Option<CourseSnapshot>, StorageError>;

    /// List course snapshots ordered by ID, up to `limit`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the stored data cannot be read.
    async fn list_courses(&self, limit: u32) -> Result<Vec<CourseSnapshot>, StorageError>;
}

/// Read access to the completion history.
#[async_trait]
pub trait CompletionLogRepository: Send + Sync {
    /// Completions for a course ordered by time.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the log cannot be read.
    async fn completions_for_course(
        &self,
        course_id: CourseId,
    ) -> Result<Vec<CompletionRecord>, StorageError>;
}

/// Atomic write of one completion: the module state change, the successor
/// unlock it caused, and the log record.
///
/// Only the delta is written. Each change is guarded by the state it leaves
/// (`unlocked -> completed`, `locked -> unlocked`), so a caller holding an
/// outdated snapshot cannot move stored progress backwards.
#[async_trait]
pub trait ProgressPersistence: Send + Sync {
    /// Complete `completion.module_id`, unlock `unlocked` if given, and append
    /// `completion`, returning the log id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the course or a module is unknown,
    /// `StorageError::Conflict` if stored states no longer allow the change.
    async fn record_completion(
        &self,
        completion: CompletionRecord,
        unlocked: Option<ModuleId>,
    ) -> Result<i64, StorageError>;
}

type StoredCourse = (Course, BTreeMap<ModuleId, ModuleState>);

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    courses: Arc<Mutex<HashMap<CourseId, StoredCourse>>>,
    completions: Arc<Mutex<Vec<CompletionRecord>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_err<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl CourseRepository for InMemoryRepository {
    async fn upsert_course(
        &self,
        course: &Course,
        progress: &CourseProgress,
    ) -> Result<(), StorageError> {
        if progress.course_id() != course.id() {
            return Err(StorageError::Conflict);
        }
        let mut guard = self.courses.lock().map_err(lock_err)?;
        guard.insert(course.id(), (course.clone(), progress.iter().collect()));
        Ok(())
    }

    async fn get_course(&self, id: CourseId) -> Result<Option<CourseSnapshot>, StorageError> {
        let guard = self.courses.lock().map_err(lock_err)?;
        guard
            .get(&id)
            .map(|(course, states)| CourseSnapshot::from_states(course.clone(), states.clone()))
            .transpose()
    }

    async fn list_courses(&self, limit: u32) -> Result<Vec<CourseSnapshot>, StorageError> {
        let guard = self.courses.lock().map_err(lock_err)?;
        let mut ids: Vec<CourseId> = guard.keys().copied().collect();
        ids.sort_unstable();

        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        ids.into_iter()
            .take(limit)
            .filter_map(|id| guard.get(&id))
            .map(|(course, states)| CourseSnapshot::from_states(course.clone(), states.clone()))
            .collect()
    }
}

#[async_trait]
impl CompletionLogRepository for InMemoryRepository {
    async fn completions_for_course(
        &self,
        course_id: CourseId,
    ) -> Result<Vec<CompletionRecord>, StorageError> {
        let guard = self.completions.lock().map_err(lock_err)?;
        let mut out: Vec<CompletionRecord> = guard
            .iter()
            .filter(|c| c.course_id == course_id)
            .cloned()
            .collect();
        out.sort_by_key(|c| (c.completed_at, c.id));
        Ok(out)
    }
}

fn expect_state(
    states: &BTreeMap<ModuleId, ModuleState>,
    id: ModuleId,
    expected: ModuleState,
) -> Result<(), StorageError> {
    match states.get(&id) {
        None => Err(StorageError::NotFound),
        Some(state) if *state == expected => Ok(()),
        Some(_) => Err(StorageError::Conflict),
    }
}

#[async_trait]
impl ProgressPersistence for InMemoryRepository {
    async fn record_completion(
        &self,
        completion: CompletionRecord,
        unlocked: Option<ModuleId>,
    ) -> Result<i64, StorageError> {
        if unlocked == Some(completion.module_id) {
            return Err(StorageError::Conflict);
        }

        let mut courses = self.courses.lock().map_err(lock_err)?;
        let mut log = self.completions.lock().map_err(lock_err)?;

        let (_, states) = courses
            .get_mut(&completion.course_id)
            .ok_or(StorageError::NotFound)?;
        expect_state(states, completion.module_id, ModuleState::Unlocked)?;
        if let Some(next) = unlocked {
            expect_state(states, next, ModuleState::Locked)?;
        }

        states.insert(completion.module_id, ModuleState::Completed);
        if let Some(next) = unlocked {
            states.insert(next, ModuleState::Unlocked);
        }

        let id = i64::try_from(log.len() + 1)
            .map_err(|_| StorageError::Serialization("completion id overflow".into()))?;
        log.push(CompletionRecord {
            id: Some(id),
            ..completion
        });
        Ok(id)
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub courses: Arc<dyn CourseRepository>,
    pub completions: Arc<dyn CompletionLogRepository>,
    pub progress: Arc<dyn ProgressPersistence>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let courses: Arc<dyn CourseRepository> = Arc::new(repo.clone());
        let completions: Arc<dyn CompletionLogRepository> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressPersistence> = Arc::new(repo);
        Self {
            courses,
            completions,
            progress,
        }
    }
}
