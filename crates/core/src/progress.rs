//! Module unlock state machine for a single course.
//!
//! `CourseProgress` is an immutable value: every action produces a new
//! state and a `Transition` describing what happened. The next module to
//! unlock is found by position in the course's module order, never by
//! identifier arithmetic, so sparse or reordered ids behave correctly.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Course, CourseId, ModuleId, ModuleState};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("no state recorded for module {id}")]
    MissingState { id: ModuleId },

    #[error("state recorded for module {id}, which is not part of the course")]
    UnknownModule { id: ModuleId },

    #[error("the first module of a course must start unlocked")]
    FirstModuleLocked,

    #[error("module {id} is locked although the module before it is completed")]
    LockedAfterCompleted { id: ModuleId },
}

//
// ─── ACTIONS ───────────────────────────────────────────────────────────────────
//

/// User-initiated input to the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressAction {
    Select(ModuleId),
    Complete(ModuleId),
}

/// What an action did to the progress state.
///
/// None of these are errors: ignored actions leave the state unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transition {
    Selected(ModuleId),
    Completed {
        module: ModuleId,
        unlocked: Option<ModuleId>,
    },
    AlreadyCompleted(ModuleId),
    IgnoredLocked(ModuleId),
    UnknownModule(ModuleId),
}

//
// ─── PROGRESS ──────────────────────────────────────────────────────────────────
//

/// Progress through one course, keyed by module id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseProgress {
    course_id: CourseId,
    order: Arc<[ModuleId]>,
    states: BTreeMap<ModuleId, ModuleState>,
    active: Option<ModuleId>,
}

impl CourseProgress {
    /// Progress for a course nobody has started: first module unlocked, the rest locked.
    #[must_use]
    pub fn fresh(course: &Course) -> Self {
        let order: Arc<[ModuleId]> = course.module_ids().into();
        let states = order
            .iter()
            .enumerate()
            .map(|(idx, id)| {
                let state = if idx == 0 {
                    ModuleState::Unlocked
                } else {
                    ModuleState::Locked
                };
                (*id, state)
            })
            .collect();

        Self {
            course_id: course.id(),
            order,
            states,
            active: None,
        }
    }

    /// Rehydrate progress from stored per-module states.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::MissingState` if a course module has no state,
    /// `ProgressError::UnknownModule` if a state names a module outside the course,
    /// `ProgressError::FirstModuleLocked` if the first module is locked, and
    /// `ProgressError::LockedAfterCompleted` if a completed module is followed by
    /// a locked one, which no action could ever unlock.
    pub fn from_states(
        course: &Course,
        states: impl IntoIterator<Item = (ModuleId, ModuleState)>,
    ) -> Result<Self, ProgressError> {
        let order: Arc<[ModuleId]> = course.module_ids().into();
        let states: BTreeMap<ModuleId, ModuleState> = states.into_iter().collect();

        if let Some(extra) = states.keys().find(|id| !order.contains(*id)) {
            return Err(ProgressError::UnknownModule { id: *extra });
        }
        if let Some(missing) = order.iter().find(|id| !states.contains_key(*id)) {
            return Err(ProgressError::MissingState { id: *missing });
        }
        if order
            .first()
            .is_some_and(|first| states.get(first) == Some(&ModuleState::Locked))
        {
            return Err(ProgressError::FirstModuleLocked);
        }
        if let Some(pair) = order.windows(2).find(|pair| {
            states.get(&pair[0]) == Some(&ModuleState::Completed)
                && states.get(&pair[1]) == Some(&ModuleState::Locked)
        }) {
            return Err(ProgressError::LockedAfterCompleted { id: pair[1] });
        }

        Ok(Self {
            course_id: course.id(),
            order,
            states,
            active: None,
        })
    }

    /// Run one action through the reducer.
    #[must_use]
    pub fn apply(&self, action: ProgressAction) -> (Self, Transition) {
        match action {
            ProgressAction::Select(id) => self.select_module(id),
            ProgressAction::Complete(id) => self.complete_module(id),
        }
    }

    /// Make `id` the active module unless it is locked or unknown.
    #[must_use]
    pub fn select_module(&self, id: ModuleId) -> (Self, Transition) {
        match self.states.get(&id) {
            None => (self.clone(), Transition::UnknownModule(id)),
            Some(ModuleState::Locked) => (self.clone(), Transition::IgnoredLocked(id)),
            Some(_) => {
                let mut next = self.clone();
                next.active = Some(id);
                (next, Transition::Selected(id))
            }
        }
    }

    /// Mark `id` completed and unlock the module that follows it.
    ///
    /// Completing twice is a no-op. Locked modules cannot be completed: the
    /// only way out of `Locked` is the predecessor's completion.
    #[must_use]
    pub fn complete_module(&self, id: ModuleId) -> (Self, Transition) {
        match self.states.get(&id) {
            None => (self.clone(), Transition::UnknownModule(id)),
            Some(ModuleState::Locked) => (self.clone(), Transition::IgnoredLocked(id)),
            Some(ModuleState::Completed) => (self.clone(), Transition::AlreadyCompleted(id)),
            Some(ModuleState::Unlocked) => {
                let mut next = self.clone();
                next.states.insert(id, ModuleState::Completed);

                let unlocked = self
                    .successor_of(id)
                    .filter(|succ| self.state_of(*succ) == Some(ModuleState::Locked));
                if let Some(succ) = unlocked {
                    next.states.insert(succ, ModuleState::Unlocked);
                }

                (
                    next,
                    Transition::Completed {
                        module: id,
                        unlocked,
                    },
                )
            }
        }
    }

    // Queries
    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    #[must_use]
    pub fn active(&self) -> Option<ModuleId> {
        self.active
    }

    #[must_use]
    pub fn state_of(&self, id: ModuleId) -> Option<ModuleState> {
        self.states.get(&id).copied()
    }

    /// Module states in course order.
    pub fn iter(&self) -> impl Iterator<Item = (ModuleId, ModuleState)> + '_ {
        self.order
            .iter()
            .filter_map(|id| self.states.get(id).map(|state| (*id, *state)))
    }

    /// Module that follows `id` in course order.
    #[must_use]
    pub fn successor_of(&self, id: ModuleId) -> Option<ModuleId> {
        let pos = self.order.iter().position(|m| *m == id)?;
        self.order.get(pos + 1).copied()
    }

    /// First module in course order that is unlocked but not completed.
    #[must_use]
    pub fn next_available(&self) -> Option<ModuleId> {
        self.iter()
            .find(|(_, state)| *state == ModuleState::Unlocked)
            .map(|(id, _)| id)
    }

    #[must_use]
    pub fn total_count(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.states.values().filter(|s| s.is_completed()).count()
    }

    /// Completion percentage rounded half up; 0 for a course without modules.
    #[must_use]
    pub fn progress_percent(&self) -> u8 {
        let total = self.total_count();
        if total == 0 {
            return 0;
        }
        let completed = self.completed_count();
        let pct = (completed * 200 + total) / (total * 2);
        u8::try_from(pct).unwrap_or(100)
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.total_count() > 0 && self.completed_count() == self.total_count()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
