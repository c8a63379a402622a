use std::collections::HashSet;

use course_core::model::{Course, CourseId, CourseLevel};
use course_core::progress::CourseProgress;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{conn, course_id_from_i64, id_to_i64, map_module_row, parse_level, ser};
use crate::repository::{CourseRepository, CourseSnapshot, StorageError};

#[async_trait::async_trait]
impl CourseRepository for SqliteRepository {
    async fn upsert_course(
        &self,
        course: &Course,
        progress: &CourseProgress,
    ) -> Result<(), StorageError> {
        if progress.course_id() != course.id() {
            return Err(StorageError::Conflict);
        }
        let course_id = id_to_i64("course_id", course.id().value())?;

        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query(
            r"
            INSERT INTO courses (id, title, description, rating, category, level)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                description = excluded.description,
                rating = excluded.rating,
                category = excluded.category,
                level = excluded.level
            ",
        )
        .bind(course_id)
        .bind(course.title())
        .bind(course.description())
        .bind(f64::from(course.rating()))
        .bind(course.category())
        .bind(course.level().map(CourseLevel::as_str))
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        let mut kept = HashSet::with_capacity(course.modules().len());
        for (position, module) in course.modules().iter().enumerate() {
            let module_id = id_to_i64("module_id", module.id().value())?;
            let position = i64::try_from(position)
                .map_err(|_| StorageError::Serialization("position overflow".into()))?;
            let state = progress
                .state_of(module.id())
                .ok_or(StorageError::Conflict)?;

            sqlx::query(
                r"
                INSERT INTO modules
                    (course_id, id, position, title, duration_minutes, description, media_ref, state)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(course_id, id) DO UPDATE SET
                    position = excluded.position,
                    title = excluded.title,
                    duration_minutes = excluded.duration_minutes,
                    description = excluded.description,
                    media_ref = excluded.media_ref,
                    state = excluded.state
                ",
            )
            .bind(course_id)
            .bind(module_id)
            .bind(position)
            .bind(module.title())
            .bind(i64::from(module.duration().minutes()))
            .bind(module.description())
            .bind(module.media_ref())
            .bind(state.as_str())
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

            kept.insert(module_id);
        }

        let existing: Vec<i64> = sqlx::query_scalar("SELECT id FROM modules WHERE course_id = ?1")
            .bind(course_id)
            .fetch_all(&mut *tx)
            .await
            .map_err(conn)?;
        for stale in existing.into_iter().filter(|id| !kept.contains(id)) {
            sqlx::query("DELETE FROM modules WHERE course_id = ?1 AND id = ?2")
                .bind(course_id)
                .bind(stale)
                .execute(&mut *tx)
                .await
                .map_err(conn)?;
        }

        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn get_course(&self, id: CourseId) -> Result<Option<CourseSnapshot>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, title, description, rating, category, level
            FROM courses WHERE id = ?1
            ",
        )
        .bind(id_to_i64("course_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        match row {
            Some(row) => self.snapshot_from_row(&row).await.map(Some),
            None => Ok(None),
        }
    }

    async fn list_courses(&self, limit: u32) -> Result<Vec<CourseSnapshot>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, title, description, rating, category, level
            FROM courses
            ORDER BY id ASC
            LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(self.snapshot_from_row(&row).await?);
        }
        Ok(out)
    }
}

impl SqliteRepository {
    async fn snapshot_from_row(&self, row: &SqliteRow) -> Result<CourseSnapshot, StorageError> {
        let course_id: i64 = row.try_get("id").map_err(ser)?;

        let module_rows = sqlx::query(
            r"
            SELECT id, title, duration_minutes, description, media_ref, state
            FROM modules
            WHERE course_id = ?1
            ORDER BY position ASC
            ",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut modules = Vec::with_capacity(module_rows.len());
        let mut states = Vec::with_capacity(module_rows.len());
        for module_row in &module_rows {
            let (module, state) = map_module_row(module_row)?;
            states.push((module.id(), state));
            modules.push(module);
        }

        #[allow(clippy::cast_possible_truncation)]
        let rating = row.try_get::<f64, _>("rating").map_err(ser)? as f32;

        let mut course = Course::new(
            course_id_from_i64(course_id)?,
            row.try_get::<String, _>("title").map_err(ser)?,
            row.try_get::<String, _>("description").map_err(ser)?,
            rating,
            modules,
        )
        .map_err(ser)?;
        if let Some(category) = row.try_get::<Option<String>, _>("category").map_err(ser)? {
            course = course.with_category(category);
        }
        if let Some(level) = row.try_get::<Option<String>, _>("level").map_err(ser)? {
            course = course.with_level(parse_level(&level)?);
        }

        CourseSnapshot::from_states(course, states)
    }
}
