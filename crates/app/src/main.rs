use std::process::ExitCode;
use std::sync::Arc;

use course_core::Transition;
use course_core::model::{CourseId, ModuleId, ModuleState};
use serde::Serialize;
use services::app_services::seed_catalog;
use services::{AppServices, CourseViewer, TracingNotifier};
use storage::repository::Storage;
use tracing_subscriber::EnvFilter;

mod args;

use args::{Args, ArgsError, Command, DB_URL_ENV, DbTarget, print_usage};

#[derive(Serialize)]
struct ModuleRow<'a> {
    position: usize,
    id: ModuleId,
    title: &'a str,
    duration: String,
    state: ModuleState,
    active: bool,
    description: &'a str,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn state_marker(state: ModuleState) -> &'static str {
    match state {
        ModuleState::Completed => "[x]",
        ModuleState::Unlocked => "[ ]",
        ModuleState::Locked => "[-]",
    }
}

fn module_rows(viewer: &CourseViewer) -> Vec<ModuleRow<'_>> {
    let active = viewer.progress().active();
    viewer
        .course()
        .modules()
        .iter()
        .enumerate()
        .filter_map(|(idx, module)| {
            let state = viewer.progress().state_of(module.id())?;
            Some(ModuleRow {
                position: idx + 1,
                id: module.id(),
                title: module.title(),
                duration: module.duration().to_string(),
                state,
                active: active == Some(module.id()),
                description: module.description(),
            })
        })
        .collect()
}

fn print_viewer(viewer: &CourseViewer) {
    let course = viewer.course();
    let progress = viewer.progress();
    println!("{} (#{})", course.title(), course.id());
    println!("{}", course.description());
    println!(
        "{} de {} módulos concluídos ({}%) · nota {:.1}",
        progress.completed_count(),
        progress.total_count(),
        progress.progress_percent(),
        course.rating()
    );
    println!();
    for row in module_rows(viewer) {
        let pointer = if row.active { ">" } else { " " };
        println!(
            "{pointer} {} {:>2}. {} ({}) [id {}]",
            state_marker(row.state),
            row.position,
            row.title,
            row.duration,
            row.id
        );
    }
    if let Some(module) = viewer.active_module() {
        println!();
        println!("{}: {}", module.title(), module.description());
    }
}

fn describe(transition: Transition) -> String {
    match transition {
        Transition::Selected(id) => format!("module {id} selected"),
        Transition::Completed {
            module,
            unlocked: Some(next),
        } => format!("module {module} completed; module {next} unlocked"),
        Transition::Completed {
            module,
            unlocked: None,
        } => format!("module {module} completed"),
        Transition::AlreadyCompleted(id) => format!("module {id} was already completed"),
        Transition::IgnoredLocked(id) => format!("module {id} is locked"),
        Transition::UnknownModule(id) => format!("module {id} is not part of this course"),
    }
}

async fn build_services(args: &Args) -> Result<AppServices, Box<dyn std::error::Error>> {
    let notifier = Arc::new(TracingNotifier);
    let services = match &args.db {
        DbTarget::Memory => AppServices::new_in_memory(args.clock, notifier).await?,
        DbTarget::Sqlite(url) => {
            prepare_sqlite_file(url)?;
            AppServices::new_sqlite(url, args.clock, notifier).await?
        }
    };
    Ok(services)
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    if args.command == Command::Seed {
        let storage = match &args.db {
            DbTarget::Memory => Storage::in_memory(),
            DbTarget::Sqlite(url) => {
                prepare_sqlite_file(url)?;
                Storage::sqlite(url).await?
            }
        };
        let written = seed_catalog(storage.courses.as_ref()).await?;
        println!("Seeded {written} courses");
        return Ok(());
    }

    let services = build_services(&args).await?;

    match args.command {
        Command::Courses => {
            let courses = services.catalog().list_courses(128).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&courses)?);
            } else {
                for c in &courses {
                    let badge = match (&c.category, c.level) {
                        (Some(category), Some(level)) => format!(" [{category} · {level}]"),
                        (Some(category), None) => format!(" [{category}]"),
                        (None, Some(level)) => format!(" [{level}]"),
                        (None, None) => String::new(),
                    };
                    println!(
                        "#{} {}{badge} · {}/{} módulos · {}% · {} de {} min restantes",
                        c.id,
                        c.title,
                        c.completed_modules,
                        c.total_modules,
                        c.progress_percent,
                        c.remaining_minutes,
                        c.total_minutes
                    );
                }
            }
        }
        Command::Show { course_id, select } => {
            let viewer_service = services.viewer();
            let mut viewer = viewer_service.open_course(course_id).await?;
            if let Some(module_id) = select {
                let transition = viewer_service.select_module(&mut viewer, module_id);
                if !matches!(transition, Transition::Selected(_)) {
                    eprintln!("{}", describe(transition));
                }
            }
            if args.json {
                println!("{}", serde_json::to_string_pretty(&module_rows(&viewer))?);
            } else {
                print_viewer(&viewer);
            }
        }
        Command::Complete {
            course_id,
            module_id,
        } => {
            let viewer_service = services.viewer();
            let mut viewer = viewer_service.open_course(course_id).await?;
            let outcome = viewer_service
                .complete_module(&mut viewer, module_id)
                .await?;
            println!("{}", describe(outcome.transition));
            println!(
                "progress: {}% ({}/{})",
                viewer.progress().progress_percent(),
                viewer.progress().completed_count(),
                viewer.progress().total_count()
            );
        }
        Command::History { course_id } => {
            let history = history_rows(&services, course_id).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&history)?);
            } else {
                for (module_id, completed_at) in &history {
                    println!("{completed_at}  module {module_id}");
                }
            }
        }
        Command::Seed | Command::Help => {}
    }

    Ok(())
}

async fn history_rows(
    services: &AppServices,
    course_id: CourseId,
) -> Result<Vec<(ModuleId, String)>, Box<dyn std::error::Error>> {
    let records = services.viewer().completion_history(course_id).await?;
    Ok(records
        .into_iter()
        .map(|r| (r.module_id, r.completed_at.to_rfc3339()))
        .collect())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let args = match Args::parse(std::env::args().skip(1), std::env::var(DB_URL_ENV).ok()) {
        Ok(args) => args,
        Err(err) => {
            eprintln!("{err}");
            print_usage();
            return ExitCode::from(2);
        }
    };
    if args.command == Command::Help {
        print_usage();
        return ExitCode::SUCCESS;
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            eprintln!("{err}");
            ExitCode::from(2)
        }
    }
}
