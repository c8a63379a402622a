use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{CourseId, ModuleId};
use crate::model::module::Module;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum CourseError {
    #[error("course title cannot be empty")]
    EmptyTitle,

    #[error("rating must be within 0.0..=5.0, got {provided}")]
    InvalidRating { provided: f32 },

    #[error("module {id} appears more than once")]
    DuplicateModule { id: ModuleId },

    #[error("invalid course level: {raw:?}")]
    InvalidLevel { raw: String },
}

//
// ─── LEVEL ─────────────────────────────────────────────────────────────────────
//

/// Difficulty badge shown next to a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseLevel {
    Basic,
    Intermediate,
    Advanced,
}

impl CourseLevel {
    /// Stable name used by storage backends.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }

    /// Label shown on the course badge.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Basic => "Básico",
            Self::Intermediate => "Intermediário",
            Self::Advanced => "Avançado",
        }
    }
}

impl fmt::Display for CourseLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CourseLevel {
    type Err = CourseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" | "Básico" => Ok(Self::Basic),
            "intermediate" | "Intermediário" => Ok(Self::Intermediate),
            "advanced" | "Avançado" => Ok(Self::Advanced),
            _ => Err(CourseError::InvalidLevel { raw: s.to_owned() }),
        }
    }
}

//
// ─── COURSE ────────────────────────────────────────────────────────────────────
//

/// A training course: catalog metadata plus an ordered chain of modules.
///
/// Module order is the unlock order. Aggregate progress is derived from a
/// `CourseProgress`, never stored on the course itself.
#[derive(Debug, Clone, PartialEq)]
pub struct Course {
    id: CourseId,
    title: String,
    description: String,
    rating: f32,
    category: Option<String>,
    level: Option<CourseLevel>,
    modules: Vec<Module>,
}

impl Course {
    /// Creates a new Course.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::EmptyTitle` for a blank title,
    /// `CourseError::InvalidRating` for a rating outside `0.0..=5.0`,
    /// and `CourseError::DuplicateModule` if two modules share an id.
    pub fn new(
        id: CourseId,
        title: impl Into<String>,
        description: impl Into<String>,
        rating: f32,
        modules: Vec<Module>,
    ) -> Result<Self, CourseError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(CourseError::EmptyTitle);
        }
        if !rating.is_finite() || !(0.0..=5.0).contains(&rating) {
            return Err(CourseError::InvalidRating { provided: rating });
        }

        let mut seen = HashSet::with_capacity(modules.len());
        for module in &modules {
            if !seen.insert(module.id()) {
                return Err(CourseError::DuplicateModule { id: module.id() });
            }
        }

        Ok(Self {
            id,
            title: title.trim().to_owned(),
            description: description.into().trim().to_owned(),
            rating,
            category: None,
            level: None,
            modules,
        })
    }

    /// Attach a catalog category; blank names clear it.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        let category = category.into().trim().to_owned();
        self.category = (!category.is_empty()).then_some(category);
        self
    }

    #[must_use]
    pub fn with_level(mut self, level: CourseLevel) -> Self {
        self.level = Some(level);
        self
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> CourseId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn rating(&self) -> f32 {
        self.rating
    }

    #[must_use]
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    #[must_use]
    pub fn level(&self) -> Option<CourseLevel> {
        self.level
    }

    /// Modules in unlock order.
    #[must_use]
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    #[must_use]
    pub fn module(&self, id: ModuleId) -> Option<&Module> {
        self.modules.iter().find(|m| m.id() == id)
    }

    #[must_use]
    pub fn module_ids(&self) -> Vec<ModuleId> {
        self.modules.iter().map(Module::id).collect()
    }

    #[must_use]
    pub fn total_minutes(&self) -> u32 {
        self.modules
            .iter()
            .map(|m| m.duration().minutes())
            .fold(0, u32::saturating_add)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
