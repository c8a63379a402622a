use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// One schema version: statements applied together in a transaction.
struct Migration {
    version: i64,
    name: &'static str,
    statements: &'static [&'static str],
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "courses, modules and completion log",
        statements: &[
            r"
                CREATE TABLE IF NOT EXISTS courses (
                    id INTEGER PRIMARY KEY,
                    title TEXT NOT NULL,
                    description TEXT NOT NULL,
                    rating REAL NOT NULL CHECK (rating >= 0 AND rating <= 5)
                );
            ",
            r"
                CREATE TABLE IF NOT EXISTS modules (
                    course_id INTEGER NOT NULL,
                    id INTEGER NOT NULL,
                    position INTEGER NOT NULL CHECK (position >= 0),
                    title TEXT NOT NULL,
                    duration_minutes INTEGER NOT NULL CHECK (duration_minutes > 0),
                    description TEXT NOT NULL,
                    media_ref TEXT,
                    state TEXT NOT NULL CHECK (state IN ('locked', 'unlocked', 'completed')),
                    PRIMARY KEY (course_id, id),
                    FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
                );
            ",
            r"
                CREATE TABLE IF NOT EXISTS module_completions (
                    id INTEGER PRIMARY KEY,
                    course_id INTEGER NOT NULL,
                    module_id INTEGER NOT NULL,
                    completed_at TEXT NOT NULL,
                    FOREIGN KEY (course_id, module_id)
                        REFERENCES modules(course_id, id) ON DELETE CASCADE
                );
            ",
            r"
                CREATE INDEX IF NOT EXISTS idx_modules_course_position
                    ON modules (course_id, position);
            ",
            r"
                CREATE INDEX IF NOT EXISTS idx_module_completions_course_time
                    ON module_completions (course_id, completed_at);
            ",
        ],
    },
    Migration {
        version: 2,
        name: "course category and level",
        statements: &[
            "ALTER TABLE courses ADD COLUMN category TEXT;",
            r"
                ALTER TABLE courses ADD COLUMN level TEXT
                    CHECK (level IS NULL OR level IN ('basic', 'intermediate', 'advanced'));
            ",
        ],
    },
];

/// Latest schema version this build knows about.
pub const SCHEMA_VERSION: i64 = 2;

/// Runs the schema migrations that have not been applied yet and returns
/// how many were applied.
pub async fn run_migrations(pool: &SqlitePool) -> Result<usize, SqliteInitError> {
    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    let applied: Vec<i64> = sqlx::query_scalar("SELECT version FROM schema_migrations")
        .fetch_all(pool)
        .await?;

    let mut count = 0;
    for migration in MIGRATIONS.iter().filter(|m| !applied.contains(&m.version)) {
        let mut tx = pool.begin().await?;
        for statement in migration.statements {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(migration.version)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(
            version = migration.version,
            name = migration.name,
            "applied schema migration"
        );
        count += 1;
    }

    tracing::debug!(
        applied = count,
        already_present = applied.len(),
        schema_version = SCHEMA_VERSION,
        "schema up to date"
    );
    Ok(count)
}
