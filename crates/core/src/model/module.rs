use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::ModuleId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ModuleError {
    #[error("module title cannot be empty")]
    EmptyTitle,

    #[error("module duration must be at least one minute")]
    ZeroDuration,

    #[error("invalid duration label: {raw:?}")]
    InvalidDurationLabel { raw: String },

    #[error("invalid module state: {raw:?}")]
    InvalidState { raw: String },
}

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

/// Progress state of a single module.
///
/// Only two forward transitions exist: `Locked -> Unlocked` when the
/// predecessor completes, and `Unlocked -> Completed` on explicit user action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleState {
    Locked,
    Unlocked,
    Completed,
}

impl ModuleState {
    #[must_use]
    pub fn is_locked(self) -> bool {
        matches!(self, Self::Locked)
    }

    #[must_use]
    pub fn is_completed(self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Rebuild a state from the legacy `completed`/`locked` flag pair.
    ///
    /// A completed module is never locked, so `completed` wins.
    #[must_use]
    pub fn from_flags(completed: bool, locked: bool) -> Self {
        match (completed, locked) {
            (true, _) => Self::Completed,
            (false, true) => Self::Locked,
            (false, false) => Self::Unlocked,
        }
    }

    /// Stable name used by storage backends.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Locked => "locked",
            Self::Unlocked => "unlocked",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for ModuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModuleState {
    type Err = ModuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "locked" => Ok(Self::Locked),
            "unlocked" => Ok(Self::Unlocked),
            "completed" => Ok(Self::Completed),
            _ => Err(ModuleError::InvalidState { raw: s.to_owned() }),
        }
    }
}

//
// ─── DURATION ──────────────────────────────────────────────────────────────────
//

/// Length of a module in whole minutes, rendered as `"15 min"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleDuration(u32);

impl ModuleDuration {
    /// # Errors
    ///
    /// Returns `ModuleError::ZeroDuration` for zero minutes.
    pub fn from_minutes(minutes: u32) -> Result<Self, ModuleError> {
        if minutes == 0 {
            return Err(ModuleError::ZeroDuration);
        }
        Ok(Self(minutes))
    }

    #[must_use]
    pub fn minutes(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ModuleDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} min", self.0)
    }
}

impl FromStr for ModuleDuration {
    type Err = ModuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ModuleError::InvalidDurationLabel { raw: s.to_owned() };
        let trimmed = s.trim();
        let digits = trimmed
            .strip_suffix("min")
            .map_or(trimmed, str::trim_end);
        let minutes = digits.parse::<u32>().map_err(|_| invalid())?;
        Self::from_minutes(minutes)
    }
}

//
// ─── MODULE ────────────────────────────────────────────────────────────────────
//

/// Static catalog data for one unit of a course.
///
/// Progress flags are not stored here; see `CourseProgress`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    id: ModuleId,
    title: String,
    duration: ModuleDuration,
    description: String,
    media_ref: Option<String>,
}

impl Module {
    /// Creates a new Module.
    ///
    /// # Errors
    ///
    /// Returns `ModuleError::EmptyTitle` if the title is empty or whitespace-only.
    pub fn new(
        id: ModuleId,
        title: impl Into<String>,
        duration: ModuleDuration,
        description: impl Into<String>,
        media_ref: Option<String>,
    ) -> Result<Self, ModuleError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(ModuleError::EmptyTitle);
        }

        let media_ref = media_ref
            .map(|m| m.trim().to_owned())
            .filter(|m| !m.is_empty());

        Ok(Self {
            id,
            title: title.trim().to_owned(),
            duration,
            description: description.into().trim().to_owned(),
            media_ref,
        })
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> ModuleId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn duration(&self) -> ModuleDuration {
        self.duration
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Optional video or material reference.
    #[must_use]
    pub fn media_ref(&self) -> Option<&str> {
        self.media_ref.as_deref()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_parses_label() {
        let duration: ModuleDuration = "25 min".parse().unwrap();
        assert_eq!(duration.minutes(), 25);
        assert_eq!(duration.to_string(), "25 min");
    }

    #[test]
    fn duration_accepts_bare_minutes() {
        let duration: ModuleDuration = "45".parse().unwrap();
        assert_eq!(duration.minutes(), 45);
    }

    #[test]
    fn duration_rejects_zero_and_garbage() {
        assert_eq!(
            "0 min".parse::<ModuleDuration>().unwrap_err(),
            ModuleError::ZeroDuration
        );
        assert!(matches!(
            "quarter hour".parse::<ModuleDuration>().unwrap_err(),
            ModuleError::InvalidDurationLabel { .. }
        ));
    }

    #[test]
    fn state_from_flags_prefers_completed() {
        assert_eq!(ModuleState::from_flags(true, true), ModuleState::Completed);
        assert_eq!(ModuleState::from_flags(false, true), ModuleState::Locked);
        assert_eq!(ModuleState::from_flags(false, false), ModuleState::Unlocked);
    }

    #[test]
    fn state_round_trips_through_str() {
        for state in [
            ModuleState::Locked,
            ModuleState::Unlocked,
            ModuleState::Completed,
        ] {
            assert_eq!(state.as_str().parse::<ModuleState>().unwrap(), state);
        }
        assert!("done".parse::<ModuleState>().is_err());
    }

    #[test]
    fn module_new_rejects_empty_title() {
        let duration = ModuleDuration::from_minutes(10).unwrap();
        let err = Module::new(ModuleId::new(1), "  ", duration, "", None).unwrap_err();
        assert_eq!(err, ModuleError::EmptyTitle);
    }

    #[test]
    fn module_new_trims_and_filters_media() {
        let duration = ModuleDuration::from_minutes(10).unwrap();
        let module = Module::new(
            ModuleId::new(1),
            "  Intro  ",
            duration,
            " basics ",
            Some("   ".into()),
        )
        .unwrap();
        assert_eq!(module.title(), "Intro");
        assert_eq!(module.description(), "basics");
        assert_eq!(module.media_ref(), None);
    }
}
