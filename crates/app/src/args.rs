use std::fmt;

use course_core::Clock;
use course_core::model::{CourseId, ModuleId};

pub const DB_URL_ENV: &str = "PROFONLINE_DB_URL";
const DEFAULT_DB_URL: &str = "sqlite://profonline.sqlite3";

#[derive(Debug, PartialEq, Eq)]
pub enum ArgsError {
    MissingCommand,
    UnknownCommand(String),
    MissingValue { flag: &'static str },
    MissingArgument { name: &'static str },
    UnknownArg(String),
    InvalidCourseId { raw: String },
    InvalidModuleId { raw: String },
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingCommand => write!(f, "a command is required"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown command: {cmd}"),
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingArgument { name } => write!(f, "missing <{name}>"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidCourseId { raw } => write!(f, "invalid course id: {raw}"),
            ArgsError::InvalidModuleId { raw } => write!(f, "invalid module id: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

/// Where course data lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbTarget {
    Memory,
    Sqlite(String),
}

impl DbTarget {
    fn parse(raw: String) -> Result<Self, ArgsError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ArgsError::InvalidDbUrl { raw });
        }
        if trimmed == "memory" {
            return Ok(Self::Memory);
        }
        Ok(Self::Sqlite(normalize_sqlite_url(trimmed)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Courses,
    Show {
        course_id: CourseId,
        select: Option<ModuleId>,
    },
    Complete {
        course_id: CourseId,
        module_id: ModuleId,
    },
    History {
        course_id: CourseId,
    },
    Seed,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    pub command: Command,
    pub db: DbTarget,
    pub json: bool,
    /// Stamps completions; pinned by `--now`.
    pub clock: Clock,
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_course_id(raw: String) -> Result<CourseId, ArgsError> {
    raw.parse().map_err(|_| ArgsError::InvalidCourseId { raw })
}

fn next_course_id(args: &mut impl Iterator<Item = String>) -> Result<CourseId, ArgsError> {
    args.next()
        .ok_or(ArgsError::MissingArgument { name: "course-id" })
        .and_then(parse_course_id)
}

fn parse_module_id(raw: String) -> Result<ModuleId, ArgsError> {
    raw.parse().map_err(|_| ArgsError::InvalidModuleId { raw })
}

impl Args {
    /// Parse the command line (without the program name).
    ///
    /// `env_db` is the value of `PROFONLINE_DB_URL`, if set; `--db` wins over it.
    pub fn parse(
        argv: impl IntoIterator<Item = String>,
        env_db: Option<String>,
    ) -> Result<Self, ArgsError> {
        let mut db = match env_db {
            Some(raw) => DbTarget::parse(raw)?,
            None => DbTarget::Sqlite(DEFAULT_DB_URL.to_owned()),
        };
        let mut json = false;
        let mut clock = Clock::System;
        let mut select = None;
        let mut positional = Vec::new();

        let mut args = argv.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => db = DbTarget::parse(require_value(&mut args, "--db")?)?,
                "--json" => json = true,
                "--now" => {
                    let raw = require_value(&mut args, "--now")?;
                    clock = Clock::pinned_at(&raw)
                        .map_err(|e| ArgsError::InvalidNow { raw: e.raw })?;
                }
                "--select" => {
                    select = Some(parse_module_id(require_value(&mut args, "--select")?)?);
                }
                "--help" | "-h" => {
                    return Ok(Self {
                        command: Command::Help,
                        db,
                        json,
                        clock,
                    });
                }
                flag if flag.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ => positional.push(arg),
            }
        }

        let mut positional = positional.into_iter();
        let name = positional.next().ok_or(ArgsError::MissingCommand)?;
        let command = match name.as_str() {
            "courses" => Command::Courses,
            "show" => Command::Show {
                course_id: next_course_id(&mut positional)?,
                select,
            },
            "complete" => {
                let course_id = next_course_id(&mut positional)?;
                let module_id = positional
                    .next()
                    .ok_or(ArgsError::MissingArgument { name: "module-id" })
                    .and_then(parse_module_id)?;
                Command::Complete {
                    course_id,
                    module_id,
                }
            }
            "history" => Command::History {
                course_id: next_course_id(&mut positional)?,
            },
            "seed" => Command::Seed,
            _ => return Err(ArgsError::UnknownCommand(name)),
        };

        if let Some(extra) = positional.next() {
            return Err(ArgsError::UnknownArg(extra));
        }

        Ok(Self {
            command,
            db,
            json,
            clock,
        })
    }
}

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  profonline courses                          [--db <url>] [--json]");
    eprintln!("  profonline show <course-id> [--select <module-id>] [--db <url>] [--json]");
    eprintln!("  profonline complete <course-id> <module-id> [--db <url>] [--now <rfc3339>]");
    eprintln!("  profonline history <course-id>              [--db <url>] [--json]");
    eprintln!("  profonline seed                             [--db <url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db {DEFAULT_DB_URL}   (use `memory` for a throwaway catalog)");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  {DB_URL_ENV}, RUST_LOG");
}

pub fn normalize_sqlite_url(raw: &str) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw.to_owned();
    }

    let path_str = raw.strip_prefix("sqlite:").unwrap_or(raw);
    let path = std::path::Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn parses_complete_with_ids() {
        let args = Args::parse(argv(&["complete", "2", "4", "--db", "memory"]), None).unwrap();
        assert_eq!(
            args.command,
            Command::Complete {
                course_id: CourseId::new(2),
                module_id: ModuleId::new(4),
            }
        );
        assert_eq!(args.db, DbTarget::Memory);
        assert_eq!(args.clock, Clock::System);
    }

    #[test]
    fn now_pins_completion_time() {
        let args = Args::parse(
            argv(&["complete", "1", "9", "--now", "2024-03-01T14:30:00Z"]),
            None,
        )
        .unwrap();
        assert_eq!(args.clock.now().to_rfc3339(), "2024-03-01T14:30:00+00:00");

        assert_eq!(
            Args::parse(argv(&["complete", "1", "9", "--now", "ontem"]), None).unwrap_err(),
            ArgsError::InvalidNow {
                raw: "ontem".into()
            }
        );
    }

    #[test]
    fn flag_overrides_environment() {
        let args = Args::parse(
            argv(&["courses", "--db", "sqlite:///tmp/a.db"]),
            Some("memory".into()),
        )
        .unwrap();
        assert_eq!(args.db, DbTarget::Sqlite("sqlite:///tmp/a.db".into()));

        let args = Args::parse(argv(&["courses"]), Some("memory".into())).unwrap();
        assert_eq!(args.db, DbTarget::Memory);
    }

    #[test]
    fn show_accepts_selection_and_json() {
        let args = Args::parse(argv(&["show", "1", "--select", "9", "--json"]), None).unwrap();
        assert_eq!(
            args.command,
            Command::Show {
                course_id: CourseId::new(1),
                select: Some(ModuleId::new(9)),
            }
        );
        assert!(args.json);
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(
            Args::parse(argv(&[]), None).unwrap_err(),
            ArgsError::MissingCommand
        );
        assert_eq!(
            Args::parse(argv(&["complete", "2"]), None).unwrap_err(),
            ArgsError::MissingArgument { name: "module-id" }
        );
        assert_eq!(
            Args::parse(argv(&["show", "two"]), None).unwrap_err(),
            ArgsError::InvalidCourseId { raw: "two".into() }
        );
        assert_eq!(
            Args::parse(argv(&["courses", "--verbose"]), None).unwrap_err(),
            ArgsError::UnknownArg("--verbose".into())
        );
        assert_eq!(
            Args::parse(argv(&["enroll"]), None).unwrap_err(),
            ArgsError::UnknownCommand("enroll".into())
        );
    }

    #[test]
    fn normalizes_relative_sqlite_paths() {
        let url = normalize_sqlite_url("sqlite:data/dev.sqlite3");
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("data/dev.sqlite3"));
    }
}
